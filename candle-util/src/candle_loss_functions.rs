use candle_core::{Result, Tensor, D};
use candle_nn::ops;

/// Offset added to the reconstruction logits before normalizing.
///
/// The log-softmax is shift-invariant, so this only matters for
/// degenerate inputs; keep it tunable rather than burying it.
pub const RECONSTRUCTION_EPS: f64 = 1e-10;

/// Bag-of-words reconstruction log-likelihood
///
/// llik(i) = sum_w x(i,w) * log_softmax(recon(i,.) + eps)(w)
///
/// The result is not negated; the caller decides the sign of the
/// objective.
///
/// * `recon_nd` - reconstruction logits (n x d)
/// * `x_nd` - observed (possibly fractional) non-negative counts (n x d)
///
pub fn bow_reconstruction_loss(recon_nd: &Tensor, x_nd: &Tensor) -> Result<Tensor> {
    bow_reconstruction_loss_with_eps(recon_nd, x_nd, RECONSTRUCTION_EPS)
}

/// Same as `bow_reconstruction_loss` with an explicit logit offset
pub fn bow_reconstruction_loss_with_eps(
    recon_nd: &Tensor,
    x_nd: &Tensor,
    eps: f64,
) -> Result<Tensor> {
    let log_recon_nd = ops::log_softmax(&(recon_nd + eps)?, D::Minus1)?;
    x_nd.mul(&log_recon_nd)?.sum(D::Minus1)
}

/// KL divergence loss between two Gaussian distributions
///
/// -0.5 * (1 + log(sigma^2) - mu^2 - sigma^2)
///
/// * `z_mean` - mean of Gaussian distribution
/// * `z_lnvar` - log variance of Gaussian distribution
///
pub fn gaussian_kl_loss(z_mean: &Tensor, z_lnvar: &Tensor) -> Result<Tensor> {
    logistic_normal_kl_loss(z_mean, z_lnvar, 0.0, 1.0)
}

/// KL divergence from a diagonal Gaussian posterior to a Gaussian
/// prior with a shared mean and variance
///
/// 0.5 * sum_k [ var/var0 + (mu - mu0)^2/var0 - 1 + log(var0) - log(var) ]
///
/// * `z_mean` - posterior mean (n x k)
/// * `z_lnvar` - posterior log variance (n x k)
/// * `prior_mean` - prior mean `mu0`
/// * `prior_var` - prior variance `var0`
///
pub fn logistic_normal_kl_loss(
    z_mean: &Tensor,
    z_lnvar: &Tensor,
    prior_mean: f64,
    prior_var: f64,
) -> Result<Tensor> {
    let var_ratio = (z_lnvar.exp()? / prior_var)?;
    let mean_term = ((z_mean - prior_mean)?.sqr()? / prior_var)?;
    let log_ratio = (z_lnvar.neg()? + prior_var.ln())?;
    let kl = ((var_ratio + mean_term)? + log_ratio)?;
    (kl - 1.)?.sum(D::Minus1)? * 0.5
}

/// Laplace approximation of a symmetric Dirichlet(1) in the softmax
/// basis: returns `(prior_mean, prior_var)` for `n_topics` topics
pub fn dirichlet_laplace_prior(n_topics: usize) -> (f64, f64) {
    let kk = n_topics.max(1) as f64;
    let alpha = 1.0;
    let prior_mean = 0.0;
    let prior_var = (1.0 / alpha) * (1.0 - 2.0 / kk) + (1.0 / (kk * kk)) * (kk / alpha);
    (prior_mean, prior_var)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_reconstruction_uniform_logits() {
        let device = Device::Cpu;
        let recon = Tensor::zeros((2, 3), candle_core::DType::F32, &device).unwrap();
        let x = Tensor::new(&[[1f32, 2., 0.], [0., 0., 0.]], &device).unwrap();
        let llik = bow_reconstruction_loss(&recon, &x).unwrap();
        let llik: Vec<f32> = llik.to_vec1().unwrap();

        assert_eq!(llik.len(), 2);
        approx::assert_abs_diff_eq!(llik[0], -3. * 3f32.ln(), epsilon = 1e-5);
        approx::assert_abs_diff_eq!(llik[1], 0., epsilon = 1e-8);
    }

    #[test]
    fn test_reconstruction_is_finite_for_extreme_logits() {
        let device = Device::Cpu;
        let recon = Tensor::new(&[[80f32, -80., 0., 0.], [0., 0., 0., 0.]], &device).unwrap();
        let x = Tensor::new(&[[0.5f32, 3., 1., 0.], [2., 0., 0., 1.]], &device).unwrap();
        let llik: Vec<f32> = bow_reconstruction_loss(&recon, &x)
            .unwrap()
            .to_vec1()
            .unwrap();
        assert_eq!(llik.len(), 2);
        assert!(llik.iter().all(|v| v.is_finite() && *v <= 0.));
    }

    #[test]
    fn test_kl_vanishes_at_prior() {
        let device = Device::Cpu;
        let (mu0, var0) = dirichlet_laplace_prior(4);
        let mean = Tensor::full(mu0 as f32, (3, 4), &device).unwrap();
        let lnvar = Tensor::full(var0.ln() as f32, (3, 4), &device).unwrap();
        let kl: Vec<f32> = logistic_normal_kl_loss(&mean, &lnvar, mu0, var0)
            .unwrap()
            .to_vec1()
            .unwrap();
        for v in kl {
            approx::assert_abs_diff_eq!(v, 0., epsilon = 1e-5);
        }
    }

    #[test]
    fn test_gaussian_kl_matches_closed_form() {
        let device = Device::Cpu;
        let mean = Tensor::new(&[[1f32, -1.]], &device).unwrap();
        let lnvar = Tensor::new(&[[0f32, 0.]], &device).unwrap();
        let kl: Vec<f32> = gaussian_kl_loss(&mean, &lnvar).unwrap().to_vec1().unwrap();
        // 0.5 * (1 + 1) for the two unit-shifted coordinates
        approx::assert_abs_diff_eq!(kl[0], 1., epsilon = 1e-6);
    }

    #[test]
    fn test_laplace_prior_variance() {
        let (mu0, var0) = dirichlet_laplace_prior(10);
        assert_eq!(mu0, 0.);
        approx::assert_abs_diff_eq!(var0, 0.9, epsilon = 1e-12);
    }
}

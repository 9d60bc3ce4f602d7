use crate::candle_aux_layers::*;
use crate::candle_loss_functions::{dirichlet_laplace_prior, logistic_normal_kl_loss};
use crate::candle_model_traits::*;
use candle_core::{Result, Tensor};
use candle_nn::{ops, BatchNorm, Linear, ModuleT, VarBuilder};

/// Encoder of a logistic-normal latent space: a Gaussian in `R^K`
/// pushed through the softmax so that samples land on the simplex
pub struct LogisticNormalEncoder {
    n_features: usize,
    n_topics: usize,
    fc: StackLayers<Linear>,
    bn_mean: BatchNorm,
    bn_lnvar: BatchNorm,
    z_mean: Linear,
    z_lnvar: Linear,
    prior_mean: f64,
    prior_var: f64,
}

impl EncoderModuleT for LogisticNormalEncoder {
    fn forward_t(&self, x_nd: &Tensor, train: bool) -> Result<(Tensor, Tensor)> {
        let (z_mean_nk, z_lnvar_nk) = self.latent_gaussian_params(x_nd, train)?;
        let z_nk = self.reparameterize(&z_mean_nk, &z_lnvar_nk, train)?;

        Ok((
            ops::softmax(&z_nk, 1)?,
            logistic_normal_kl_loss(&z_mean_nk, &z_lnvar_nk, self.prior_mean, self.prior_var)?,
        ))
    }

    fn dim_obs(&self) -> usize {
        self.n_features
    }

    fn dim_latent(&self) -> usize {
        self.n_topics
    }
}

impl LogisticNormalEncoder {
    ///
    /// Evaluate latent Gaussian parameters: mu and log_var
    /// z ~ (mu(x), log_var(x))
    pub fn latent_gaussian_params(&self, x_nd: &Tensor, train: bool) -> Result<(Tensor, Tensor)> {
        let min_mean = -(self.n_topics as f64).sqrt().max(4.);
        let max_mean = (self.n_topics as f64).sqrt().max(4.);
        let min_lv = -8.;
        let max_lv = 8.;

        debug_assert_eq!(x_nd.dims().len(), 2);

        let logx_nd = (x_nd + 1.)?.log()?;
        let fc_nl = self.fc.forward_t(&logx_nd, train)?;

        let z_mean_nk = self.z_mean.forward_t(&fc_nl, train)?;
        let z_mean_nk = self
            .bn_mean
            .forward_t(&z_mean_nk, train)?
            .clamp(min_mean, max_mean)?;

        let z_lnvar_nk = self.z_lnvar.forward_t(&fc_nl, train)?;
        let z_lnvar_nk = self
            .bn_lnvar
            .forward_t(&z_lnvar_nk, train)?
            .clamp(min_lv, max_lv)?;

        Ok((z_mean_nk, z_lnvar_nk))
    }

    ///
    /// z = mu + sigma * eps
    /// where eps ~ N(0, 1)
    ///
    /// # Arguments
    /// * `z_mean` - mean of Gaussian distribution
    /// * `z_lnvar` - log variance of Gaussian distribution
    fn reparameterize(&self, z_mean: &Tensor, z_lnvar: &Tensor, train: bool) -> Result<Tensor> {
        if train {
            let eps = Tensor::randn_like(z_mean, 0., 1.)?;
            z_mean + (z_lnvar * 0.5)?.exp()?.mul(&eps)?
        } else {
            Ok(z_mean.clone())
        }
    }

    /// Will create a new logistic-normal encoder module
    /// with these variables:
    ///
    /// * `enc.fc.{}.weight` where {} is the layer index
    /// * `enc.z.mean.weight`, `enc.z.lnvar.weight`
    /// * `enc.bn.mean`, `enc.bn.lnvar` batch-norm statistics
    ///
    /// # Arguments
    /// * `n_features` - vocabulary size
    /// * `n_topics` - the number of topics (latent dimension, at least 2)
    /// * `layers` - fully connected layers, each with the dim
    /// * `dropout` - dropout rate after each hidden layer
    /// * `vs` - variable builder
    pub fn new(
        n_features: usize,
        n_topics: usize,
        layers: &[usize],
        dropout: f32,
        vs: VarBuilder,
    ) -> Result<Self> {
        if n_topics < 2 {
            candle_core::bail!("need at least two topics, got {}", n_topics);
        }

        let bn_config = candle_nn::BatchNormConfig {
            eps: 1e-3,
            remove_mean: true,
            affine: false,
            momentum: 1e-3,
        };

        // (1) data -> fc
        let mut fc = StackLayers::<Linear>::with_dropout(dropout);
        let mut prev_dim = n_features;
        for (j, &next_dim) in layers.iter().enumerate() {
            let _name = format!("enc.fc.{}", j);
            fc.push_with_act(
                candle_nn::linear(prev_dim, next_dim, vs.pp(_name))?,
                candle_nn::Activation::Relu,
            );
            prev_dim = next_dim;
        }

        // (2) fc -> K
        let z_mean = candle_nn::linear(prev_dim, n_topics, vs.pp("enc.z.mean"))?;
        let z_lnvar = candle_nn::linear(prev_dim, n_topics, vs.pp("enc.z.lnvar"))?;
        let bn_mean = candle_nn::batch_norm(n_topics, bn_config, vs.pp("enc.bn.mean"))?;
        let bn_lnvar = candle_nn::batch_norm(n_topics, bn_config, vs.pp("enc.bn.lnvar"))?;

        let (prior_mean, prior_var) = dirichlet_laplace_prior(n_topics);

        Ok(Self {
            n_features,
            n_topics,
            fc,
            bn_mean,
            bn_lnvar,
            z_mean,
            z_lnvar,
            prior_mean,
            prior_var,
        })
    }
}

use crate::candle_model_traits::*;
use candle_core::{Result, Tensor};
use candle_nn::{BatchNorm, Init, ModuleT, VarBuilder};

//////////////////////////////////////////
// Topic decoder with a background bias //
//////////////////////////////////////////

/// logits(i,w) = sum_k theta(i,k) * beta(k,w) + background(w),
/// optionally batch-normalized over the vocabulary
pub struct BackgroundTopicDecoder {
    n_features: usize,
    n_topics: usize,
    beta_kd: Tensor,
    bow_bn: Option<BatchNorm>,
}

impl BackgroundTopicDecoder {
    /// Will create a new topic model decoder with the following parameters:
    /// * `dec.beta` (k x d)
    /// * `dec.bow_bn.{bias,running_mean,running_var}` if `apply_batchnorm`
    pub fn new(
        n_features: usize,
        n_topics: usize,
        apply_batchnorm: bool,
        vs: VarBuilder,
    ) -> Result<Self> {
        let init_ws = candle_nn::init::DEFAULT_KAIMING_NORMAL;
        let beta_kd = vs.get_with_hints((n_topics, n_features), "dec.beta", init_ws)?;

        let bow_bn = if apply_batchnorm {
            Some(Self::unit_scale_batch_norm(n_features, vs.pp("dec.bow_bn"))?)
        } else {
            None
        };

        Ok(Self {
            n_features,
            n_topics,
            beta_kd,
            bow_bn,
        })
    }

    /// Batch norm whose scale stays at 1: only the shift and the running
    /// statistics live in the variable map, the weight is a constant
    fn unit_scale_batch_norm(n_features: usize, vs: VarBuilder) -> Result<BatchNorm> {
        let running_mean = vs.get_with_hints(n_features, "running_mean", Init::Const(0.))?;
        let running_var = vs.get_with_hints(n_features, "running_var", Init::Const(1.))?;
        let bias = vs.get_with_hints(n_features, "bias", Init::Const(0.))?;
        let weight = Tensor::ones(n_features, vs.dtype(), vs.device())?;
        BatchNorm::new_with_momentum(
            n_features,
            running_mean,
            running_var,
            weight,
            bias,
            1e-3,
            1e-3,
        )
    }

    pub fn batch_norm(&self) -> Option<&BatchNorm> {
        self.bow_bn.as_ref()
    }
}

impl DecoderModuleT for BackgroundTopicDecoder {
    fn forward_t(&self, theta_nk: &Tensor, background_d: &Tensor, train: bool) -> Result<Tensor> {
        let logits_nd = theta_nk
            .matmul(&self.beta_kd)?
            .broadcast_add(background_d)?;

        match &self.bow_bn {
            Some(bn) => bn.forward_t(&logits_nd, train),
            None => Ok(logits_nd),
        }
    }

    fn get_dictionary(&self) -> Result<Tensor> {
        Ok(self.beta_kd.clone())
    }

    fn dim_obs(&self) -> usize {
        self.n_features
    }

    fn dim_latent(&self) -> usize {
        self.n_topics
    }
}

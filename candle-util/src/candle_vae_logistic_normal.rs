use crate::candle_decoder_topic::BackgroundTopicDecoder;
use crate::candle_encoder_logistic_normal::LogisticNormalEncoder;
use crate::candle_model_traits::*;

use candle_core::{Result, Tensor};
use candle_nn::VarBuilder;
use log::debug;

/// Hyper-parameters of the logistic-normal topic VAE
#[derive(Clone, Debug)]
pub struct LogisticNormalArgs<'a> {
    pub n_features: usize,
    pub n_topics: usize,
    pub layers: &'a [usize],
    pub dropout: f32,
    pub apply_batchnorm: bool,
}

/// Encoder-decoder pair sharing one latent topic space
pub struct Vae<Enc, Dec>
where
    Enc: EncoderModuleT,
    Dec: DecoderModuleT,
{
    pub encoder: Enc,
    pub decoder: Dec,
}

pub type LogisticNormalVae = Vae<LogisticNormalEncoder, BackgroundTopicDecoder>;

impl<Enc, Dec> Vae<Enc, Dec>
where
    Enc: EncoderModuleT,
    Dec: DecoderModuleT,
{
    /// Build a VAE model
    /// * `encoder` - encoder module
    /// * `decoder` - decoder module
    pub fn build(encoder: Enc, decoder: Dec) -> Self {
        assert_eq!(encoder.dim_latent(), decoder.dim_latent());
        assert_eq!(encoder.dim_obs(), decoder.dim_obs());
        Self { encoder, decoder }
    }
}

impl LogisticNormalVae {
    pub fn new(args: LogisticNormalArgs, vs: VarBuilder) -> Result<Self> {
        let encoder = LogisticNormalEncoder::new(
            args.n_features,
            args.n_topics,
            args.layers,
            args.dropout,
            vs.clone(),
        )?;
        let decoder = BackgroundTopicDecoder::new(
            args.n_features,
            args.n_topics,
            args.apply_batchnorm,
            vs,
        )?;
        debug!(
            "logistic-normal VAE: {} -> {:?} -> {} -> {}",
            args.n_features, args.layers, args.n_topics, args.n_features
        );
        Ok(Self::build(encoder, decoder))
    }
}

impl<Enc, Dec> TopicVaeT for Vae<Enc, Dec>
where
    Enc: EncoderModuleT,
    Dec: DecoderModuleT,
{
    fn forward_t(
        &self,
        x_nd: &Tensor,
        background_d: &Tensor,
        train: bool,
    ) -> Result<TopicVaeOutput> {
        let (theta_nk, kl_n) = self.encoder.forward_t(x_nd, train)?;
        let logits_nd = self.decoder.forward_t(&theta_nk, background_d, train)?;
        Ok(TopicVaeOutput {
            theta_nk,
            logits_nd,
            kl_n,
        })
    }

    fn get_beta(&self) -> Result<Tensor> {
        self.decoder.get_dictionary()
    }

    fn dim_obs(&self) -> usize {
        self.decoder.dim_obs()
    }

    fn dim_latent(&self) -> usize {
        self.decoder.dim_latent()
    }
}

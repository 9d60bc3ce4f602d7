use crate::common::*;
use crate::config::ModelConfig;
use crate::error::LentilError;
use crate::model::{BowTopicModelT, SemiSupervisedBow};
use crate::vocabulary::Vocabulary;

use candle_nn::VarBuilder;
use candle_util::candle_vae_logistic_normal::{LogisticNormalArgs, LogisticNormalVae};
use std::collections::BTreeMap;

/// Everything a model builder needs
pub struct ModelArgs<'a> {
    pub config: &'a ModelConfig,
    pub vocab: Vocabulary,
    /// neural network parameters are created here
    pub vb: VarBuilder<'a>,
    pub device: &'a Device,
}

pub type ModelBuilder = fn(ModelArgs<'_>) -> anyhow::Result<Box<dyn BowTopicModelT>>;

/// Topic models by name
pub struct ModelRegistry {
    builders: BTreeMap<&'static str, ModelBuilder>,
}

impl ModelRegistry {
    /// No model registered
    pub fn empty() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    /// A later registration under the same name wins
    pub fn register(&mut self, name: &'static str, builder: ModelBuilder) {
        self.builders.insert(name, builder);
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.builders.keys().copied()
    }

    pub fn build(
        &self,
        name: &str,
        args: ModelArgs<'_>,
    ) -> anyhow::Result<Box<dyn BowTopicModelT>> {
        let builder = self.builders.get(name).ok_or_else(|| {
            LentilError::configuration(format!(
                "model type `{}` not found; available: {}",
                name,
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })?;
        info!("building `{}`", name);
        builder(args)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        let mut ret = Self::empty();
        ret.register("semi_supervised_bow", build_semi_supervised_bow);
        ret.register("SemiSupervisedBOW", build_semi_supervised_bow);
        ret
    }
}

fn build_semi_supervised_bow(args: ModelArgs<'_>) -> anyhow::Result<Box<dyn BowTopicModelT>> {
    let config = args.config;
    let vae = LogisticNormalVae::new(
        LogisticNormalArgs {
            n_features: args.vocab.len(),
            n_topics: config.n_topics,
            layers: &config.encoder_layers,
            dropout: config.dropout,
            apply_batchnorm: config.apply_batchnorm,
        },
        args.vb,
    )?;
    let model = SemiSupervisedBow::new(config, args.vocab, vae, args.device)?;
    Ok(Box::new(model))
}

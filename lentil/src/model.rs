use crate::background::BackgroundFrequency;
use crate::common::*;
use crate::config::ModelConfig;
use crate::epoch_tracker::EpochTracker;
use crate::error::LentilError;
use crate::kl_annealing::KlWeightScheduler;
use crate::metrics::{MetricName, MetricsRegistry};
use crate::npmi::{CoherenceScorer, ReferenceCorpus};
use crate::topics::*;
use crate::vocabulary::Vocabulary;

use candle_core::Var;
use candle_util::candle_loss_functions::bow_reconstruction_loss;
use candle_util::candle_model_traits::TopicVaeT;
use std::collections::BTreeMap;

/// Output of one minibatch
pub struct BowForwardOutput {
    /// `-sum_n elbo(n)`, to be minimized
    pub loss: Tensor,
    /// per-document evidence lower bound (n)
    pub elbo_n: Tensor,
    /// topic proportions (n x k)
    pub theta_nk: Tensor,
    /// reconstruction logits (n x d)
    pub logits_nd: Tensor,
}

/// A topic model of bag-of-words documents trained by minibatches
pub trait BowTopicModelT {
    /// Assemble the objective of a minibatch.
    ///
    /// The epoch-boundary work (topics, NPMI) and the KL weight update
    /// both run first, keyed on `epoch_num`.
    fn forward(
        &mut self,
        bow_nd: &Tensor,
        epoch_num: usize,
        train: bool,
    ) -> anyhow::Result<BowForwardOutput>;

    /// Topic proportions without sampling or any bookkeeping
    fn evaluate(&self, bow_nd: &Tensor) -> anyhow::Result<Tensor>;

    /// Averages since the last reset plus `npmi` when a reference
    /// corpus is configured
    fn get_metrics(&mut self, reset: bool) -> BTreeMap<&'static str, f64>;

    /// Runs only on the first call of a new epoch number; `true` if it did
    fn compute_custom_metrics_once_per_epoch(&mut self, epoch_num: usize) -> anyhow::Result<bool>;

    /// The `bg` row followed by each topic's top `k` words
    fn extract_topics(&self, k: usize) -> anyhow::Result<Vec<Topic>>;

    /// Topic-word weights (k x d)
    fn get_beta(&self) -> anyhow::Result<Tensor>;

    /// Current background log-frequencies (d)
    fn get_background(&self) -> anyhow::Result<Vec<f32>>;

    /// Parameters living outside the variable map the VAE was built in
    fn trainable_vars(&self) -> Vec<Var>;

    fn kl_weight(&self) -> f64;

    fn current_npmi(&self) -> f64;
}

/// Logistic-normal topic VAE with a background log-frequency bias,
/// annealed KL weight and per-epoch topic tracking
pub struct SemiSupervisedBow<V: TopicVaeT> {
    vocab: Vocabulary,
    vae: V,
    background: BackgroundFrequency,
    extractor: TopicExtractor,
    kl_weight_annealing: Option<String>,
    kl_scheduler: KlWeightScheduler,
    metric_epoch_tracker: EpochTracker,
    metrics: MetricsRegistry,
    scorer: Option<Box<dyn CoherenceScorer>>,
    cur_npmi: f64,
    track_topics: bool,
    top_k: usize,
}

impl<V: TopicVaeT> SemiSupervisedBow<V> {
    /// * `config` - model settings; an unknown annealing schedule is
    ///   rejected before anything is read from disk
    /// * `vocab` - the `vae` vocabulary, one column of the data per token
    /// * `vae` - encoder/decoder over `vocab.len()` features
    /// * `device` - where the background vector lives
    pub fn new(
        config: &ModelConfig,
        vocab: Vocabulary,
        vae: V,
        device: &Device,
    ) -> anyhow::Result<Self> {
        let kl_scheduler = KlWeightScheduler::new(config.kl_weight_annealing.as_deref())?;

        if vae.dim_obs() != vocab.len() {
            return Err(
                LentilError::dimension_mismatch("vocabulary size", vae.dim_obs(), vocab.len())
                    .into(),
            );
        }

        let background = BackgroundFrequency::from_file(
            &vocab,
            config.background_data_path.as_deref(),
            config.update_background_freq,
            device,
        )?;

        let scorer = match config.ref_directory.as_deref() {
            Some(dir) => {
                let corpus = ReferenceCorpus::from_directory(dir)?;
                Some(Box::new(corpus) as Box<dyn CoherenceScorer>)
            }
            None => None,
        };

        info!(
            "topic model: {} words, {} topics, KL annealing: {}",
            vocab.len(),
            vae.dim_latent(),
            kl_scheduler.schedule()
        );

        Ok(Self {
            extractor: TopicExtractor::new(&vocab),
            vocab,
            vae,
            background,
            kl_weight_annealing: config.kl_weight_annealing.clone(),
            kl_scheduler,
            metric_epoch_tracker: EpochTracker::default(),
            metrics: MetricsRegistry::new(),
            scorer,
            cur_npmi: f64::NAN,
            track_topics: config.track_topics,
            top_k: config.top_k,
        })
    }

    /// Replace (or add) the coherence scorer used at epoch boundaries
    pub fn with_coherence_scorer(mut self, scorer: Box<dyn CoherenceScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn vae(&self) -> &V {
        &self.vae
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Step the KL weight; the schedule name is checked on every call
    pub fn update_kld_weight(
        &mut self,
        epoch_num: usize,
        schedule: Option<&str>,
    ) -> anyhow::Result<()> {
        self.kl_scheduler.update_with(epoch_num, schedule)?;
        Ok(())
    }

    /// Log the topic table and persist it as
    /// `<serialization_dir>/topics/topics_<epoch>.txt`
    pub fn update_topics(&self, epoch_num: usize, topics: &[Topic]) -> anyhow::Result<()> {
        info!("topics at epoch {}\n{}", epoch_num, render_topics_table(topics));
        match self.vocab.serialization_dir() {
            Some(dir) => {
                let path = write_topics_file(dir, epoch_num, topics)?;
                debug!("wrote {}", path.display());
            }
            None => debug!("no serialization directory; topics are not saved"),
        }
        Ok(())
    }

    fn record_metrics(
        &mut self,
        bow_nd: &Tensor,
        recon_n: &Tensor,
        kl_n: &Tensor,
        loss: &Tensor,
    ) -> anyhow::Result<()> {
        let nkld = kl_n.mean_all()?.to_scalar::<f32>()? as f64;
        let nll = -(recon_n.mean_all()?.to_scalar::<f32>()? as f64);
        let recon_tot = recon_n.sum_all()?.to_scalar::<f32>()? as f64;
        let ntokens = bow_nd.sum_all()?.to_scalar::<f32>()? as f64;

        self.metrics.record(MetricName::Nkld, nkld)?;
        self.metrics.record(MetricName::Nll, nll)?;
        self.metrics.record(MetricName::Elbo, loss.to_scalar::<f32>()? as f64)?;
        if ntokens > 0.0 {
            self.metrics.record(MetricName::Perp, (-recon_tot / ntokens).exp())?;
        }
        Ok(())
    }
}

impl<V: TopicVaeT> BowTopicModelT for SemiSupervisedBow<V> {
    fn forward(
        &mut self,
        bow_nd: &Tensor,
        epoch_num: usize,
        train: bool,
    ) -> anyhow::Result<BowForwardOutput> {
        self.compute_custom_metrics_once_per_epoch(epoch_num)?;
        self.kl_scheduler
            .update_with(epoch_num, self.kl_weight_annealing.as_deref())?;

        let out = self
            .vae
            .forward_t(bow_nd, self.background.as_tensor(), train)?;

        let recon_n = bow_reconstruction_loss(&out.logits_nd, bow_nd)?;
        let elbo_n = (&recon_n - (&out.kl_n * self.kl_scheduler.weight())?)?;
        let loss = elbo_n.sum_all()?.neg()?;

        self.record_metrics(bow_nd, &recon_n, &out.kl_n, &loss)?;

        Ok(BowForwardOutput {
            loss,
            elbo_n,
            theta_nk: out.theta_nk,
            logits_nd: out.logits_nd,
        })
    }

    fn evaluate(&self, bow_nd: &Tensor) -> anyhow::Result<Tensor> {
        let out = self
            .vae
            .forward_t(bow_nd, self.background.as_tensor(), false)?;
        Ok(out.theta_nk)
    }

    fn get_metrics(&mut self, reset: bool) -> BTreeMap<&'static str, f64> {
        let mut ret = self.metrics.get_all(reset);
        if self.scorer.is_some() {
            ret.insert("npmi", self.cur_npmi);
        }
        ret
    }

    fn compute_custom_metrics_once_per_epoch(
        &mut self,
        epoch_num: usize,
    ) -> anyhow::Result<bool> {
        if !self.metric_epoch_tracker.advance(epoch_num) {
            return Ok(false);
        }

        if !self.track_topics && self.scorer.is_none() {
            return Ok(true);
        }

        let topics = self.extract_topics(self.top_k)?;

        if self.track_topics {
            self.update_topics(epoch_num, &topics)?;
        }

        if let Some(scorer) = self.scorer.as_ref() {
            self.cur_npmi = scorer.score(&topics)?;
            info!("NPMI at epoch {}: {:.4}", epoch_num, self.cur_npmi);
        }
        Ok(true)
    }

    fn extract_topics(&self, k: usize) -> anyhow::Result<Vec<Topic>> {
        let background = self.background.to_vec()?;
        let beta_kd = self.vae.get_beta()?;
        self.extractor.extract_tensor(&background, &beta_kd, k)
    }

    fn get_beta(&self) -> anyhow::Result<Tensor> {
        Ok(self.vae.get_beta()?)
    }

    fn get_background(&self) -> anyhow::Result<Vec<f32>> {
        self.background.to_vec()
    }

    fn trainable_vars(&self) -> Vec<Var> {
        self.background.trainable_var().cloned().into_iter().collect()
    }

    fn kl_weight(&self) -> f64 {
        self.kl_scheduler.weight()
    }

    fn current_npmi(&self) -> f64 {
        self.cur_npmi
    }
}

use crate::common::*;
use crate::config::ModelConfig;
use crate::error::LentilError;
use crate::registry::{ModelArgs, ModelRegistry};
use crate::vocabulary::{Vocabulary, VAE_NAMESPACE};

use candle_nn::{AdamW, Optimizer};
use candle_util::candle_data_loader::*;
use candle_util::candle_inference::TrainConfig;
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressDrawTarget};
use matrix_util::mtx_io::read_mtx_triplets;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(ValueEnum, Clone, Debug, PartialEq)]
#[clap(rename_all = "lowercase")]
pub enum ComputeDevice {
    Cpu,
    Cuda,
    Metal,
}

#[derive(Args, Debug)]
pub struct FitArgs {
    #[arg(
        required = true,
        help = "Bag-of-words count file",
        long_help = "Document x word counts in matrix market format (`.mtx` or `.mtx.gz`).\n\
		     Each column corresponds to a line of the vocabulary file."
    )]
    bow_file: Box<str>,

    #[arg(
        long,
        short = 'w',
        required = true,
        help = "Vocabulary file",
        long_help = "Vocabulary file, one token per line, in the column order of the counts."
    )]
    vocab_file: Box<str>,

    #[arg(
        long,
        short,
        required = true,
        help = "Serialization directory",
        long_help = "Output directory for results:\n\
		     - {out}/config.json\n\
		     - {out}/topics/topics_{epoch}.txt\n\
		     - {out}/metrics.json\n\
		     - {out}/beta.tsv.gz\n\
		     - {out}/theta.tsv.gz\n"
    )]
    out: Box<str>,

    #[arg(
        long,
        short = 'm',
        default_value = "semi_supervised_bow",
        help = "Model type",
        long_help = "Name of a registered topic model."
    )]
    model: String,

    #[arg(
        short = 't',
        long,
        default_value_t = 20,
        help = "Number of latent topics",
        long_help = "Number of latent topics (at least 2)."
    )]
    n_topics: usize,

    #[arg(
        long,
        short = 'e',
        value_delimiter(','),
        default_values_t = vec![300],
        help = "Encoder layers",
        long_help = "Encoder layers (comma-separated).\n\
		     Specify the size of each hidden layer in the encoder model.\n\
		     Example: 300,100"
    )]
    encoder_layers: Vec<usize>,

    #[arg(long, default_value_t = 0.2, help = "Encoder dropout rate")]
    dropout: f32,

    #[arg(
        long,
        short = 'k',
        default_value_t = 20,
        help = "Words per topic",
        long_help = "Number of top words per topic in the topic tables."
    )]
    top_k: usize,

    #[arg(
        long,
        short = 'b',
        help = "Background frequency file",
        long_help = "JSON object mapping each token to its corpus frequency.\n\
		     Without it, the background starts at zero."
    )]
    background_data_path: Option<Box<str>>,

    #[arg(
        long,
        short = 'r',
        help = "Reference corpus directory for NPMI",
        long_help = "Directory with a `*.mtx` (or `*.mtx.gz`) document x word count file\n\
		     and a `*.json` token-to-column map.\n\
		     NPMI of the topics is computed once per epoch."
    )]
    ref_directory: Option<Box<str>>,

    #[arg(
        long,
        help = "KL weight annealing",
        long_help = "KL weight annealing schedule: linear, sigmoid or constant.\n\
		     - linear: min(1, epoch / 50)\n\
		     - sigmoid: 1 / (1 + exp(-0.25 * (epoch - 15)))\n\
		     Unset means constant weight 1."
    )]
    kl_weight_annealing: Option<String>,

    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        help = "Learn background frequencies"
    )]
    update_background_freq: bool,

    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        help = "Save topics every epoch"
    )]
    track_topics: bool,

    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        help = "Batch-normalize reconstruction logits"
    )]
    apply_batchnorm: bool,

    #[arg(
        long,
        short = 'i',
        default_value_t = 200,
        help = "Number of training epochs"
    )]
    epochs: usize,

    #[arg(
        long,
        default_value_t = 200,
        help = "Minibatch size",
        long_help = "Minibatch size for training.\n\
		     Controls the number of documents per training batch."
    )]
    minibatch_size: usize,

    #[arg(
        long,
        default_value_t = 1e-3,
        help = "Learning rate",
        long_help = "Learning rate for optimization.\n\
		     Controls the step size for parameter updates."
    )]
    learning_rate: f32,

    #[arg(
        long,
        value_enum,
        default_value = "cpu",
        help = "Candle device",
        long_help = "Candle device to use for computation.\n\
		     Options: cpu, cuda, metal."
    )]
    device: ComputeDevice,

    #[arg(
        long,
        default_value_t = 0,
        help = "A device for cuda",
        long_help = "For cuda or meta, we may want to choose a different device."
    )]
    device_no: usize,

    #[arg(
        long,
        short,
        help = "Verbosity",
        long_help = "Enable verbose output.\n\
		     Prints additional information during execution."
    )]
    verbose: bool,
}

impl FitArgs {
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            background_data_path: self.background_data_path.as_deref().map(PathBuf::from),
            ref_directory: self.ref_directory.as_deref().map(PathBuf::from),
            kl_weight_annealing: self.kl_weight_annealing.clone(),
            update_background_freq: self.update_background_freq,
            track_topics: self.track_topics,
            apply_batchnorm: self.apply_batchnorm,
            n_topics: self.n_topics,
            encoder_layers: self.encoder_layers.clone(),
            dropout: self.dropout,
            top_k: self.top_k,
        }
    }

    pub fn train_config(&self) -> anyhow::Result<TrainConfig> {
        let device = match self.device {
            ComputeDevice::Metal => Device::new_metal(self.device_no)?,
            ComputeDevice::Cuda => Device::new_cuda(self.device_no)?,
            _ => Device::Cpu,
        };
        Ok(TrainConfig {
            learning_rate: self.learning_rate,
            batch_size: self.minibatch_size,
            num_epochs: self.epochs,
            device,
            verbose: self.verbose,
        })
    }
}

pub fn fit_topic_model(args: &FitArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    if args.minibatch_size == 0 {
        return Err(LentilError::configuration("minibatch size must be positive").into());
    }

    let out_dir = Path::new(args.out.as_ref());
    mkdir(out_dir)?;

    // 1. vocabulary and data
    let vocab = Vocabulary::from_file(VAE_NAMESPACE, args.vocab_file.as_ref())?
        .with_serialization_dir(out_dir);

    let counts = read_mtx_triplets(args.bow_file.as_ref())?;
    if counts.ncols != vocab.len() {
        return Err(
            LentilError::dimension_mismatch("count columns", vocab.len(), counts.ncols).into(),
        );
    }
    info!(
        "read {} documents x {} words from {}",
        counts.nrows, counts.ncols, args.bow_file
    );
    let mut data = InMemoryData::from_triplets(&counts.triplets, counts.nrows, counts.ncols)?;

    // 2. model
    let config = args.model_config();
    let train_config = args.train_config()?;
    let dev = &train_config.device;
    write_json(&config, out_dir.join("config.json"))?;

    let parameters = candle_nn::VarMap::new();
    let vb = candle_nn::VarBuilder::from_varmap(&parameters, DType::F32, dev);

    let mut model = ModelRegistry::default().build(
        &args.model,
        ModelArgs {
            config: &config,
            vocab,
            vb,
            device: dev,
        },
    )?;

    // 3. training
    let mut vars = parameters.all_vars();
    vars.extend(model.trainable_vars());
    let mut adam = AdamW::new_lr(vars, train_config.learning_rate as f64)?;

    let pb = ProgressBar::new(train_config.num_epochs as u64);
    if train_config.verbose {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    info!("Start training ...");
    let mut metrics_trace: Vec<BTreeMap<&'static str, f64>> = vec![];

    for epoch in 0..train_config.num_epochs {
        data.shuffle_minibatch(train_config.batch_size)?;
        for b in 0..data.num_minibatch() {
            let mb = data.minibatch_data(b, dev)?;
            let out = model.forward(&mb.input, epoch, true)?;
            adam.backward_step(&out.loss)?;
        }

        let metrics = model.get_metrics(true);
        info!(
            "[{}] KL weight {:.3}, {}",
            epoch,
            model.kl_weight(),
            format_metrics(&metrics)
        );
        metrics_trace.push(metrics);
        pb.inc(1);
    }
    pb.finish_and_clear();

    // topics of the final state
    model.compute_custom_metrics_once_per_epoch(train_config.num_epochs)?;
    write_json(&metrics_trace, out_dir.join("metrics.json"))?;

    // 4. parameters and latent states
    info!("Writing down the model parameters");
    let beta_kd = model
        .get_beta()?
        .to_device(&Device::Cpu)?
        .to_vec2::<f32>()?;
    write_tsv(&beta_kd, out_dir.join("beta.tsv.gz"))?;

    info!("Writing down the latent states");
    data.ordered_minibatch(train_config.batch_size);
    let mut theta_nk: Vec<Vec<f32>> = Vec::with_capacity(data.num_rows());
    for b in 0..data.num_minibatch() {
        let mb = data.minibatch_data(b, dev)?;
        let theta = model
            .evaluate(&mb.input)?
            .to_device(&Device::Cpu)?
            .to_vec2::<f32>()?;
        theta_nk.extend(theta);
    }
    write_tsv(&theta_nk, out_dir.join("theta.tsv.gz"))?;

    info!("Done");
    Ok(())
}

/// `name=value` pairs in name order
pub fn format_metrics(metrics: &BTreeMap<&'static str, f64>) -> String {
    metrics
        .iter()
        .map(|(k, v)| format!("{}={:.4}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

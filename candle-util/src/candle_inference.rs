/// Optimizer settings of a minibatch training run
#[derive(Clone, Debug)]
pub struct TrainConfig {
    /// AdamW step size
    pub learning_rate: f32,
    /// documents per minibatch
    pub batch_size: usize,
    pub num_epochs: usize,
    /// where parameters and minibatches live
    pub device: candle_core::Device,
    /// log every epoch instead of drawing a progress bar
    pub verbose: bool,
}

pub mod candle_aux_layers;
pub mod candle_data_loader;
pub mod candle_data_loader_util;
pub mod candle_decoder_topic;
pub mod candle_encoder_logistic_normal;
pub mod candle_inference;
pub mod candle_loss_functions;
pub mod candle_model_traits;
pub mod candle_vae_logistic_normal;

pub use candle_core;
pub use candle_nn;

pub mod background;
pub mod common;
pub mod config;
pub mod epoch_tracker;
pub mod error;
pub mod fit_topic;
pub mod kl_annealing;
pub mod metrics;
pub mod model;
pub mod npmi;
pub mod registry;
pub mod score_topics;
pub mod topics;
pub mod vocabulary;

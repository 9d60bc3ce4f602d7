use crate::topics::DEFAULT_TOP_K;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings of a bag-of-words topic model, saved next to its outputs
/// as `config.json`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// JSON object of token -> frequency
    pub background_data_path: Option<PathBuf>,
    /// directory with a `*.mtx[.gz]` count matrix and a `*.json` vocabulary
    pub ref_directory: Option<PathBuf>,
    /// "linear", "sigmoid", "constant" or unset (constant)
    pub kl_weight_annealing: Option<String>,
    /// learn the background log-frequencies with everything else
    pub update_background_freq: bool,
    /// write out top words every epoch
    pub track_topics: bool,
    /// batch-normalize the reconstruction logits
    pub apply_batchnorm: bool,
    pub n_topics: usize,
    pub encoder_layers: Vec<usize>,
    pub dropout: f32,
    /// words per topic in the topic tables
    pub top_k: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            background_data_path: None,
            ref_directory: None,
            kl_weight_annealing: None,
            update_background_freq: true,
            track_topics: true,
            apply_batchnorm: true,
            n_topics: 20,
            encoder_layers: vec![300],
            dropout: 0.2,
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: ModelConfig =
            serde_json::from_str(r#"{"n_topics": 5, "kl_weight_annealing": "linear"}"#).unwrap();
        assert_eq!(config.n_topics, 5);
        assert_eq!(config.kl_weight_annealing.as_deref(), Some("linear"));
        assert!(config.update_background_freq);
        assert!(config.track_topics);
        assert_eq!(config.top_k, DEFAULT_TOP_K);
    }
}

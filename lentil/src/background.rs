use crate::common::*;
use crate::error::LentilError;
use crate::vocabulary::*;

use candle_core::Var;
use std::collections::HashMap;
use std::path::Path;

/// Frequency assigned to special tokens and tokens missing from the
/// background file before taking the log
pub const BACKGROUND_FLOOR: f64 = 1e-12;

///
/// Log-frequency of each vocabulary entry, in index order
///
/// * `vocab` - vocabulary of the decoder
/// * `bg_file` - JSON object `token -> frequency`; keys may also be
///   stringified indices. Without a file, or when the file does not
///   exist, every entry is `0`.
///
pub fn compute_background_log_frequency(
    vocab: &Vocabulary,
    bg_file: Option<&Path>,
) -> anyhow::Result<Vec<f32>> {
    let Some(bg_file) = bg_file else {
        return Ok(vec![0f32; vocab.len()]);
    };

    if !bg_file.exists() {
        warn!(
            "no background frequency file at {}; starting from zeros",
            bg_file.display()
        );
        return Ok(vec![0f32; vocab.len()]);
    }

    let precomputed: HashMap<String, f64> = read_json(bg_file)?;

    let mut nmissing = 0;
    let log_freq = vocab
        .tokens()
        .iter()
        .enumerate()
        .map(|(i, token)| {
            let token: &str = token;
            let freq = if SPECIAL_TOKENS.contains(&token) {
                None
            } else {
                precomputed
                    .get(token)
                    .or_else(|| precomputed.get(&i.to_string()))
                    .copied()
                    .filter(|&f| f > 0.0 && f.is_finite())
            };
            if freq.is_none() {
                nmissing += 1;
            }
            freq.unwrap_or(BACKGROUND_FLOOR).ln() as f32
        })
        .collect::<Vec<_>>();

    if nmissing > 0 {
        debug!(
            "{} of {} tokens fell back to the background floor",
            nmissing,
            vocab.len()
        );
    }
    info!(
        "background frequencies of {} tokens from {}",
        vocab.len(),
        bg_file.display()
    );
    Ok(log_freq)
}

enum BackgroundParam {
    Learnable(Var),
    Fixed(Tensor),
}

/// The decoder's log-frequency bias; learnable or frozen by construction
pub struct BackgroundFrequency {
    param: BackgroundParam,
}

impl BackgroundFrequency {
    pub fn new(log_freq: Vec<f32>, trainable: bool, device: &Device) -> anyhow::Result<Self> {
        let nn = log_freq.len();
        let tensor = Tensor::from_vec(log_freq, nn, device)?;
        let param = if trainable {
            BackgroundParam::Learnable(Var::from_tensor(&tensor)?)
        } else {
            BackgroundParam::Fixed(tensor)
        };
        Ok(Self { param })
    }

    /// Load from an optional frequency file, see
    /// `compute_background_log_frequency`
    pub fn from_file(
        vocab: &Vocabulary,
        bg_file: Option<&Path>,
        trainable: bool,
        device: &Device,
    ) -> anyhow::Result<Self> {
        let log_freq = compute_background_log_frequency(vocab, bg_file)?;
        if log_freq.len() != vocab.len() {
            return Err(
                LentilError::dimension_mismatch("background", vocab.len(), log_freq.len()).into(),
            );
        }
        Self::new(log_freq, trainable, device)
    }

    pub fn as_tensor(&self) -> &Tensor {
        match &self.param {
            BackgroundParam::Learnable(var) => var.as_tensor(),
            BackgroundParam::Fixed(tensor) => tensor,
        }
    }

    /// The variable to hand to the optimizer, if any
    pub fn trainable_var(&self) -> Option<&Var> {
        match &self.param {
            BackgroundParam::Learnable(var) => Some(var),
            BackgroundParam::Fixed(_) => None,
        }
    }

    pub fn is_trainable(&self) -> bool {
        self.trainable_var().is_some()
    }

    /// Current values on the host
    pub fn to_vec(&self) -> anyhow::Result<Vec<f32>> {
        Ok(self
            .as_tensor()
            .to_device(&Device::Cpu)?
            .to_dtype(DType::F32)?
            .to_vec1()?)
    }

    pub fn len(&self) -> usize {
        self.as_tensor().elem_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::from_tokens(VAE_NAMESPACE, ["@@UNKNOWN@@", "apple", "berry", "cherry"]).unwrap()
    }

    #[test]
    fn test_without_file_is_zero() {
        let bg = BackgroundFrequency::from_file(&vocab(), None, true, &Device::Cpu).unwrap();
        assert_eq!(bg.to_vec().unwrap(), vec![0.; 4]);
        assert!(bg.is_trainable());
    }

    #[test]
    fn test_log_frequency_with_floor() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bg.json");
        std::fs::write(&file, r#"{"apple": 0.5, "cherry": 0.25, "@@UNKNOWN@@": 0.9}"#).unwrap();

        let bg =
            BackgroundFrequency::from_file(&vocab(), Some(&file), false, &Device::Cpu).unwrap();
        assert!(!bg.is_trainable());
        assert!(bg.trainable_var().is_none());

        let v = bg.to_vec().unwrap();
        let floor = BACKGROUND_FLOOR.ln() as f32;
        approx::assert_abs_diff_eq!(v[0], floor, epsilon = 1e-3);
        approx::assert_abs_diff_eq!(v[1], 0.5f32.ln(), epsilon = 1e-6);
        approx::assert_abs_diff_eq!(v[2], floor, epsilon = 1e-3);
        approx::assert_abs_diff_eq!(v[3], 0.25f32.ln(), epsilon = 1e-6);
    }

    #[test]
    fn test_missing_file_falls_back_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nope.json");
        let bg = BackgroundFrequency::from_file(&vocab(), Some(&file), true, &Device::Cpu).unwrap();
        assert_eq!(bg.to_vec().unwrap(), vec![0.; 4]);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.json");
        std::fs::write(&file, "[1, 2").unwrap();
        assert!(BackgroundFrequency::from_file(&vocab(), Some(&file), true, &Device::Cpu).is_err());
    }
}

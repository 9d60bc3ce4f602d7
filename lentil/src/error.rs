//! Error kinds of the topic model.

use thiserror::Error;

/// Errors raised by the topic model and its collaborators.
#[derive(Debug, Error)]
pub enum LentilError {
    /// A setting the caller must fix, e.g., an unknown annealing schedule.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A lookup by name or path that has no match.
    #[error("not found: {0}")]
    NotFound(String),

    /// Two sizes that must agree do not.
    #[error("dimension mismatch for {what}: expected {expected}, actual {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Candle(#[from] candle_util::candle_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LentilError {
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn dimension_mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, LentilError>;



use thiserror::Error;

use crate::embedding::EmbeddingError;


#[derive(Error, Debug)]
pub enum HskgError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Incomplete data: {0}")]
    IncompleteData(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HskgError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn incomplete(message: impl Into<String>) -> Self {
        Self::IncompleteData(message.into())
    }

    /// Configuration-class failures are never worth retrying.
    pub fn is_fatal_config(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::DimensionMismatch { .. })
    }
}

impl From<config::ConfigError> for HskgError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}


pub type Result<T> = std::result::Result<T, HskgError>;

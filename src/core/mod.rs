

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheStats, EmbeddingCache};
pub use config::{HskgConfig, validate_threshold};
pub use error::{HskgError, Result};

pub mod attach;
pub mod hashing;
pub mod http;
pub mod provider;

use std::sync::Arc;

use thiserror::Error;

pub use attach::{EmbeddingOptions, EmbeddingReport, attach_embeddings};
pub use hashing::HashingEmbedder;
pub use http::{HttpApi, HttpEmbedder};
pub use provider::EmbeddingProvider;

use crate::core::{HskgConfig, HskgError, Result};


#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty text")]
    EmptyText,
}


pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {

    pub fn from_config(config: &HskgConfig) -> Result<Arc<dyn EmbeddingProvider>> {
        let dimension = Some(config.embedding_dimension);
        let provider: Arc<dyn EmbeddingProvider> =
            match config.embedding_provider.to_lowercase().as_str() {
                "hashing" => Arc::new(HashingEmbedder::new(config.embedding_dimension)),
                "ollama" => Arc::new(HttpEmbedder::new(
                    HttpApi::Ollama,
                    config.embedding_url.clone(),
                    config.embedding_model.clone(),
                    None,
                    dimension,
                    config.embedding_timeout,
                )?),
                "openai" => Arc::new(HttpEmbedder::new(
                    HttpApi::OpenAi,
                    config.embedding_url.clone(),
                    config.embedding_model.clone(),
                    config.embedding_api_key.clone(),
                    dimension,
                    config.embedding_timeout,
                )?),
                other => {
                    return Err(HskgError::config(format!(
                        "unknown embedding_provider: {other}. Supported: hashing, ollama, openai"
                    )));
                }
            };
        Ok(provider)
    }
}

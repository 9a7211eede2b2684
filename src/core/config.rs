

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{HskgError, Result};
use crate::graph::BuilderConfig;
use crate::nlp::VocabularyConfig;


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HskgConfig {

    pub similarity_threshold: f64,
    pub graph_boost: f64,
    pub top_k: usize,
    pub tile_size: usize,
    pub symbolic_group_cap: Option<usize>,


    pub relevance_min_shared_tokens: usize,
    pub threshold_sweep: Vec<f64>,
    pub recall_ks: Vec<usize>,
    pub query_sample_size: Option<usize>,
    pub query_sample_seed: u64,


    pub max_item_chars: usize,
    pub vocabulary: Option<VocabularyConfig>,


    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_url: String,
    #[serde(skip_serializing)]
    pub embedding_api_key: Option<String>,
    pub embedding_dimension: usize,
    pub embedding_timeout: u64,
    pub embedding_batch_size: usize,
    pub embedding_concurrency: usize,
    pub cache_size: usize,
}

impl HskgConfig {

    pub fn new() -> Self {
        Self {
            similarity_threshold: crate::DEFAULT_SIMILARITY_THRESHOLD,
            graph_boost: crate::DEFAULT_GRAPH_BOOST,
            top_k: crate::DEFAULT_TOP_K,
            tile_size: 256,
            symbolic_group_cap: None,

            relevance_min_shared_tokens: 3,
            threshold_sweep: vec![0.6, 0.7, 0.75, 0.8, 0.9],
            recall_ks: vec![1, 3, 5, 10],
            query_sample_size: None,
            query_sample_seed: 42,

            max_item_chars: 2000,
            vocabulary: None,

            embedding_provider: "hashing".to_string(),
            embedding_model: crate::DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            embedding_api_key: None,
            embedding_dimension: crate::DEFAULT_EMBEDDING_DIMENSION,
            embedding_timeout: 30,
            embedding_batch_size: 32,
            embedding_concurrency: 4,
            cache_size: crate::DEFAULT_CACHE_SIZE,
        }
    }


    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Some(threshold) = env_parse("HSKG_SIMILARITY_THRESHOLD") {
            config.similarity_threshold = threshold;
        }
        if let Some(boost) = env_parse("HSKG_GRAPH_BOOST") {
            config.graph_boost = boost;
        }
        if let Some(k) = env_parse("HSKG_TOP_K") {
            config.top_k = k;
        }
        if let Some(size) = env_parse("HSKG_QUERY_SAMPLE_SIZE") {
            config.query_sample_size = Some(size);
        }
        if let Some(seed) = env_parse("HSKG_QUERY_SAMPLE_SEED") {
            config.query_sample_seed = seed;
        }
        if let Ok(provider) = std::env::var("HSKG_EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }
        if let Ok(model) = std::env::var("HSKG_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Ok(url) = std::env::var("HSKG_EMBEDDING_URL") {
            config.embedding_url = url;
        }
        if let Ok(key) = std::env::var("HSKG_EMBEDDING_API_KEY") {
            config.embedding_api_key = Some(key);
        }
        if let Some(dimension) = env_parse("HSKG_EMBEDDING_DIMENSION") {
            config.embedding_dimension = dimension;
        }

        config
    }

    /// Layers a config file (any format the `config` crate understands) under
    /// `HSKG_*` environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("HSKG").try_parsing(true))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }


    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.similarity_threshold)?;
        for threshold in &self.threshold_sweep {

            if !threshold.is_finite() {
                return Err(HskgError::config(format!(
                    "threshold_sweep contains non-finite value {threshold}"
                )));
            }
        }
        if !self.graph_boost.is_finite() || self.graph_boost < 0.0 {
            return Err(HskgError::config(format!(
                "graph_boost must be a non-negative number, got {}",
                self.graph_boost
            )));
        }
        if self.top_k == 0 {
            return Err(HskgError::config("top_k must be at least 1"));
        }
        if self.recall_ks.iter().any(|k| *k == 0) {
            return Err(HskgError::config("recall_ks must not contain 0"));
        }
        if self.tile_size == 0 {
            return Err(HskgError::config("tile_size must be at least 1"));
        }
        if matches!(self.symbolic_group_cap, Some(cap) if cap < 2) {
            return Err(HskgError::config("symbolic_group_cap must be at least 2"));
        }
        if self.embedding_dimension == 0 {
            return Err(HskgError::config("embedding_dimension must be at least 1"));
        }
        if self.embedding_batch_size == 0 || self.embedding_concurrency == 0 {
            return Err(HskgError::config(
                "embedding_batch_size and embedding_concurrency must be at least 1",
            ));
        }
        if self.max_item_chars == 0 {
            return Err(HskgError::config("max_item_chars must be at least 1"));
        }
        match self.embedding_provider.to_lowercase().as_str() {
            "hashing" => {}
            "ollama" | "openai" => {
                url::Url::parse(&self.embedding_url).map_err(|e| {
                    HskgError::config(format!("invalid embedding_url {}: {e}", self.embedding_url))
                })?;
            }
            other => {
                return Err(HskgError::config(format!(
                    "unknown embedding_provider: {other}"
                )));
            }
        }
        Ok(())
    }


    pub fn builder_config(&self) -> BuilderConfig {
        BuilderConfig {
            tile_size: self.tile_size,
            symbolic_group_cap: self.symbolic_group_cap,
        }
    }
}

impl Default for HskgConfig {
    fn default() -> Self {
        Self::new()
    }
}


pub fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold.is_nan() || !(-1.0..=1.0).contains(&threshold) {
        return Err(HskgError::config(format!(
            "similarity threshold must lie in [-1, 1], got {threshold}"
        )));
    }
    Ok(())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = HskgConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.similarity_threshold, 0.75);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.relevance_min_shared_tokens, 3);
    }

    #[test]
    fn test_threshold_out_of_range() {
        assert!(validate_threshold(1.0).is_ok());
        assert!(validate_threshold(-1.0).is_ok());
        assert!(matches!(validate_threshold(1.01), Err(HskgError::Configuration(_))));
        assert!(matches!(validate_threshold(f64::NAN), Err(HskgError::Configuration(_))));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = HskgConfig {
            embedding_provider: "word2vec".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_remote_provider_requires_url() {
        let config = HskgConfig {
            embedding_provider: "ollama".to_string(),
            embedding_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_partial_toml() {
        let dir = std::env::temp_dir().join(format!("hskg-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hskg.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "similarity_threshold = 0.6").unwrap();
        writeln!(file, "top_k = 10").unwrap();
        drop(file);

        let config = HskgConfig::from_file(&path).unwrap();
        assert_eq!(config.similarity_threshold, 0.6);
        assert_eq!(config.top_k, 10);
        assert_eq!(config.graph_boost, 0.1);

        std::fs::remove_dir_all(&dir).ok();
    }
}

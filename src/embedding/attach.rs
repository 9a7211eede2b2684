use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info};

use super::{EmbeddingError, EmbeddingProvider};
use crate::core::{EmbeddingCache, HskgConfig, HskgError, Result};
use crate::nlp::{ConceptId, ConceptUniverse};


#[derive(Debug, Clone, Copy)]
pub struct EmbeddingOptions {
    pub batch_size: usize,
    pub concurrency: usize,
}

impl Default for EmbeddingOptions {
    fn default() -> Self {
        Self {
            batch_size: 32,
            concurrency: 4,
        }
    }
}

impl From<&HskgConfig> for EmbeddingOptions {
    fn from(config: &HskgConfig) -> Self {
        Self {
            batch_size: config.embedding_batch_size.max(1),
            concurrency: config.embedding_concurrency.max(1),
        }
    }
}


#[derive(Debug, Clone, Default, Serialize)]
pub struct EmbeddingReport {
    pub provider: String,
    pub model: String,
    pub embedded_concepts: usize,
    pub distinct_texts: usize,
    pub cache_hits: usize,
    pub requested: usize,
    pub dimension: Option<usize>,
}


/// Attaches a vector to every concept that lacks one. Concepts sharing a
/// normalized key share a single request; cached keys skip the provider.
/// Every vector is checked for dimension before the first one is attached.
pub async fn attach_embeddings(
    universe: &mut ConceptUniverse,
    provider: &dyn EmbeddingProvider,
    cache: &EmbeddingCache,
    options: &EmbeddingOptions,
) -> Result<EmbeddingReport> {
    let model = provider.model_name().to_string();
    let mut report = EmbeddingReport {
        provider: provider.provider_name().to_string(),
        model: model.clone(),
        ..Default::default()
    };

    let mut by_key: BTreeMap<String, Vec<ConceptId>> = BTreeMap::new();
    for id in universe.missing_vectors() {
        if let Some(concept) = universe.get(id) {
            by_key.entry(concept.key.clone()).or_default().push(id);
        }
    }
    report.distinct_texts = by_key.len();

    let mut expected = provider.dimension().or(universe.dimension());
    let mut resolved: BTreeMap<String, Arc<[f32]>> = BTreeMap::new();
    let mut pending: Vec<String> = Vec::new();
    for key in by_key.keys() {
        match cache.get(&model, key) {
            Some(vector) if expected.is_none_or(|d| d == vector.len()) => {
                report.cache_hits += 1;
                resolved.insert(key.clone(), vector);
            }
            Some(vector) => {
                debug!(
                    "Ignoring cached embedding for '{}' with dimension {}",
                    key,
                    vector.len()
                );
                pending.push(key.clone());
            }
            None => pending.push(key.clone()),
        }
    }
    report.requested = pending.len();

    let batches: Vec<Vec<String>> = pending
        .chunks(options.batch_size.max(1))
        .map(<[String]>::to_vec)
        .collect();
    debug!(
        "Embedding {} texts in {} batches ({} cached)",
        pending.len(),
        batches.len(),
        report.cache_hits
    );

    let results: Vec<(Vec<String>, std::result::Result<Vec<Vec<f32>>, EmbeddingError>)> =
        stream::iter(batches.into_iter().map(|batch| async move {
            let result = provider.embed_batch(&batch).await;
            (batch, result)
        }))
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;

    for (batch, result) in results {
        let vectors = result?;
        if vectors.len() != batch.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "provider returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            ))
            .into());
        }
        for (key, vector) in batch.into_iter().zip(vectors) {
            let dimension = *expected.get_or_insert(vector.len());
            if vector.len() != dimension {
                return Err(HskgError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            let vector: Arc<[f32]> = vector.into();
            cache.insert(&model, &key, Arc::clone(&vector));
            resolved.insert(key, vector);
        }
    }

    let mut assignments: Vec<(Vec<ConceptId>, &Arc<[f32]>)> = Vec::with_capacity(by_key.len());
    for (key, ids) in by_key {
        let vector = resolved
            .get(&key)
            .ok_or_else(|| HskgError::incomplete(format!("no embedding produced for '{key}'")))?;
        let dimension = *expected.get_or_insert(vector.len());
        if vector.len() != dimension {
            return Err(HskgError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }
        assignments.push((ids, vector));
    }

    for (ids, vector) in assignments {
        for id in ids {
            universe.attach_vector(id, vector.to_vec())?;
            report.embedded_concepts += 1;
        }
    }
    report.dimension = universe.dimension();

    info!(
        "Attached {} embeddings ({} distinct, {} cache hits, {} requested, provider={})",
        report.embedded_concepts,
        report.distinct_texts,
        report.cache_hits,
        report.requested,
        report.provider
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::nlp::{ConceptCandidate, Side};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        inner: HashingEmbedder,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text).await
        }

        fn dimension(&self) -> Option<usize> {
            self.inner.dimension()
        }

        fn provider_name(&self) -> &str {
            "counting"
        }

        fn model_name(&self) -> &str {
            "counting-16"
        }
    }

    struct WrongDimension;

    #[async_trait]
    impl EmbeddingProvider for WrongDimension {
        async fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0, 0.0])
        }

        fn dimension(&self) -> Option<usize> {
            Some(2)
        }

        fn provider_name(&self) -> &str {
            "wrong"
        }

        fn model_name(&self) -> &str {
            "wrong"
        }
    }

    struct UnsizedProvider;

    #[async_trait]
    impl EmbeddingProvider for UnsizedProvider {
        async fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> Option<usize> {
            None
        }

        fn provider_name(&self) -> &str {
            "unsized"
        }

        fn model_name(&self) -> &str {
            "unsized"
        }
    }

    fn universe(texts: &[(&str, Side)]) -> ConceptUniverse {
        let mut universe = ConceptUniverse::new();
        for (text, side) in texts {
            universe.insert(ConceptCandidate::new(text, *side, None)).unwrap();
        }
        universe
    }

    #[tokio::test]
    async fn test_shared_keys_embedded_once() {
        let mut universe = universe(&[
            ("Menu", Side::Source),
            ("menu", Side::Target),
            ("search bar", Side::Source),
        ]);
        let provider = CountingProvider {
            inner: HashingEmbedder::new(16),
            calls: AtomicUsize::new(0),
        };
        let cache = EmbeddingCache::new(100);

        let report = attach_embeddings(&mut universe, &provider, &cache, &EmbeddingOptions::default())
            .await
            .unwrap();

        assert_eq!(report.embedded_concepts, 3);
        assert_eq!(report.distinct_texts, 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert!(universe.missing_vectors().is_empty());
        assert_eq!(universe.get(ConceptId(0)).unwrap().vector, universe.get(ConceptId(1)).unwrap().vector);
        assert_eq!(universe.dimension(), Some(16));
    }

    #[tokio::test]
    async fn test_cache_reused_across_universes() {
        let provider = CountingProvider {
            inner: HashingEmbedder::new(16),
            calls: AtomicUsize::new(0),
        };
        let cache = EmbeddingCache::new(100);
        let options = EmbeddingOptions { batch_size: 1, concurrency: 2 };

        let mut first = universe(&[("login form", Side::Source)]);
        attach_embeddings(&mut first, &provider, &cache, &options).await.unwrap();

        let mut second = universe(&[("login form", Side::Target), ("footer", Side::Target)]);
        let report = attach_embeddings(&mut second, &provider, &cache, &options).await.unwrap();

        assert_eq!(report.cache_hits, 1);
        assert_eq!(report.requested, 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_fatal() {
        let mut universe = universe(&[("menu", Side::Source)]);
        let cache = EmbeddingCache::new(10);
        let err = attach_embeddings(&mut universe, &WrongDimension, &cache, &EmbeddingOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HskgError::DimensionMismatch { expected: 2, actual: 3 }));
        assert!(err.is_fatal_config());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_stale_cached_dimension_is_re_requested() {
        let provider = HashingEmbedder::new(8);
        let cache = EmbeddingCache::new(10);
        cache.insert(provider.model_name(), "aaa", Arc::from(vec![1.0_f32, 0.0]));

        let mut universe = universe(&[("aaa", Side::Source), ("bbb", Side::Target)]);
        let report = attach_embeddings(&mut universe, &provider, &cache, &EmbeddingOptions::default())
            .await
            .unwrap();

        assert_eq!(report.cache_hits, 0);
        assert_eq!(report.requested, 2);
        assert_eq!(report.embedded_concepts, 2);
        assert_eq!(universe.dimension(), Some(8));
        assert_eq!(cache.get(provider.model_name(), "aaa").unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_inconsistent_cache_leaves_universe_untouched() {
        let provider = UnsizedProvider;
        let cache = EmbeddingCache::new(10);
        cache.insert("unsized", "aaa", Arc::from(vec![1.0_f32, 0.0]));
        cache.insert("unsized", "bbb", Arc::from(vec![1.0_f32, 0.0, 0.0]));

        let mut universe = universe(&[("aaa", Side::Source), ("bbb", Side::Target)]);
        let err = attach_embeddings(&mut universe, &provider, &cache, &EmbeddingOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, HskgError::DimensionMismatch { expected: 2, actual: 3 }));
        assert_eq!(universe.missing_vectors().len(), 2);
        assert_eq!(universe.dimension(), None);
    }

    #[test]
    fn test_nothing_to_embed() {
        let mut universe = ConceptUniverse::new();
        let cache = EmbeddingCache::new(10);
        let report = tokio_test::block_on(attach_embeddings(
            &mut universe,
            &HashingEmbedder::new(8),
            &cache,
            &EmbeddingOptions::default(),
        ))
        .unwrap();
        assert_eq!(report.embedded_concepts, 0);
        assert_eq!(report.requested, 0);
    }
}

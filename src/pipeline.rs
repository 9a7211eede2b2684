use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::core::{CacheStats, EmbeddingCache, HskgConfig, Result};
use crate::embedding::{EmbeddingOptions, EmbeddingProvider, EmbeddingReport, attach_embeddings};
use crate::evaluation::{
    AblationRow, AblationVariant, BaselineReport, EvaluationHarness, EvaluationMetrics,
    QuerySample, RecallPoint,
};
use crate::graph::{Graph, GraphBuilder, GraphStats};
use crate::nlp::{ConceptUniverse, NormalizationReport, Normalizer, RawItem, Side};
use crate::retrieval::RetrievalEngine;


#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub generated_at: DateTime<Utc>,
    pub config: HskgConfig,
    pub normalization: NormalizationReport,
    pub embedding: EmbeddingReport,
    pub cache: CacheStats,
    pub graph: GraphStats,
    pub sample: QuerySample,
    pub sample_seed: Option<u64>,
    pub queries: usize,
    pub metrics: EvaluationMetrics,
    pub recall_curve: Vec<RecallPoint>,
    pub baselines: BaselineReport,
    pub threshold_sweep: Vec<AblationRow>,
    pub ablations: Vec<AblationRow>,
}


/// Everything a run produced, for callers that also want the graph.
pub struct PipelineOutput {
    pub report: EvaluationReport,
    pub universe: ConceptUniverse,
    pub graph: Graph,
}


pub struct Pipeline {
    config: HskgConfig,
    normalizer: Normalizer,
    builder: GraphBuilder,
    harness: EvaluationHarness,
}

impl Pipeline {

    pub fn from_config(config: HskgConfig) -> Result<Self> {
        config.validate()?;

        let normalizer = Normalizer::from_config(&config)?;
        let builder = GraphBuilder::new(config.builder_config());
        let harness = EvaluationHarness::with_token_overlap(
            config.top_k,
            RetrievalEngine::new(config.graph_boost),
            config.relevance_min_shared_tokens,
        );

        info!(
            "Pipeline ready: threshold={}, boost={}, k={}, provider={}",
            config.similarity_threshold, config.graph_boost, config.top_k, config.embedding_provider
        );

        Ok(Self {
            config,
            normalizer,
            builder,
            harness,
        })
    }

    pub fn config(&self) -> &HskgConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn builder(&self) -> &GraphBuilder {
        &self.builder
    }

    pub fn harness(&self) -> &EvaluationHarness {
        &self.harness
    }


    pub async fn run(
        &self,
        items: &[RawItem],
        provider: &dyn EmbeddingProvider,
    ) -> Result<EvaluationReport> {
        Ok(self.run_detailed(items, provider).await?.report)
    }

    /// normalize → embed → hybrid build → evaluate, baselines, sweeps.
    pub async fn run_detailed(
        &self,
        items: &[RawItem],
        provider: &dyn EmbeddingProvider,
    ) -> Result<PipelineOutput> {
        let config = &self.config;

        let mut universe = ConceptUniverse::new();
        let normalization = self.normalizer.normalize_batch(items, &mut universe)?;

        let cache = EmbeddingCache::new(config.cache_size);
        let embedding = attach_embeddings(
            &mut universe,
            provider,
            &cache,
            &EmbeddingOptions::from(config),
        )
        .await?;

        let graph = self.builder.build(&universe, config.similarity_threshold)?;

        let sample = QuerySample::from_options(config.query_sample_size, config.query_sample_seed);
        let queries = sample.select(&universe.side_ids(Side::Source));

        let metrics = self.harness.evaluate(&queries, &graph, &universe)?;
        let recall_curve = self
            .harness
            .recall_curve(&config.recall_ks, &queries, &graph, &universe)?;
        let baselines =
            self.harness
                .baselines(&queries, &graph, &universe, config.similarity_threshold)?;
        let threshold_sweep = self.harness.threshold_sweep(
            &self.builder,
            &universe,
            &queries,
            &config.threshold_sweep,
        );
        let ablations = self.harness.ablation_sweep(
            &self.builder,
            &universe,
            &queries,
            &AblationVariant::standard(config.similarity_threshold),
        );

        info!(
            "Evaluation complete: {} queries, recall@{}={:.3}, raw recall={:.3}",
            queries.len(),
            metrics.k,
            metrics.recall_at_k,
            baselines.raw_similarity.recall_at_k
        );

        let report = EvaluationReport {
            generated_at: Utc::now(),
            config: config.clone(),
            normalization,
            embedding,
            cache: cache.stats(),
            graph: GraphStats::compute(&graph),
            sample,
            sample_seed: sample.seed(),
            queries: queries.len(),
            metrics,
            recall_curve,
            baselines,
            threshold_sweep,
            ablations,
        };

        Ok(PipelineOutput {
            report,
            universe,
            graph,
        })
    }
}

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::metrics::{EvaluationMetrics, QueryOutcome, RecallPoint, calculate_metrics};
use super::oracle::{RelevanceOracle, TokenOverlapOracle};
use super::tfidf::{TFIDF_HIT_THRESHOLD, TfidfBaseline, tfidf_similarity};
use crate::core::{HskgError, Result};
use crate::graph::{EdgePolicy, Graph, GraphBuilder, GraphStats};
use crate::nlp::{ConceptId, ConceptUniverse};
use crate::retrieval::RetrievalEngine;


#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum AblationVariant {
    Full { threshold: f64 },
    SymbolicOnly,
    SemanticOnly { threshold: f64 },
}

impl AblationVariant {
    pub fn policy(&self) -> EdgePolicy {
        match *self {
            Self::Full { threshold } => EdgePolicy::Hybrid { threshold },
            Self::SymbolicOnly => EdgePolicy::SymbolicOnly,
            Self::SemanticOnly { threshold } => EdgePolicy::SemanticOnly { threshold },
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Full { threshold } => format!("full@{threshold}"),
            Self::SymbolicOnly => "symbolic_only".to_string(),
            Self::SemanticOnly { threshold } => format!("semantic_only@{threshold}"),
        }
    }

    /// Full, symbolic-only and semantic-only at one threshold.
    pub fn standard(threshold: f64) -> Vec<Self> {
        vec![
            Self::Full { threshold },
            Self::SymbolicOnly,
            Self::SemanticOnly { threshold },
        ]
    }
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AblationResult {
    pub graph: GraphStats,
    pub metrics: EvaluationMetrics,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AblationRow {
    pub label: String,
    pub variant: AblationVariant,
    pub outcome: std::result::Result<AblationResult, String>,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineReport {
    pub tfidf: TfidfBaseline,
    pub raw_similarity: EvaluationMetrics,
    pub category_cooccurrence: f64,
    pub similarity_hit_theta: f64,
    pub similarity_hit_rate: f64,
}


pub struct EvaluationHarness {
    k: usize,
    engine: RetrievalEngine,
    oracle: Arc<dyn RelevanceOracle>,
}

impl EvaluationHarness {
    pub fn new(k: usize, engine: RetrievalEngine, oracle: Arc<dyn RelevanceOracle>) -> Self {
        Self { k, engine, oracle }
    }

    /// Token-overlap oracle with `min_shared` shared tokens.
    pub fn with_token_overlap(k: usize, engine: RetrievalEngine, min_shared: usize) -> Self {
        Self::new(k, engine, Arc::new(TokenOverlapOracle::new(min_shared)))
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn engine(&self) -> &RetrievalEngine {
        &self.engine
    }

    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    pub fn outcomes(
        &self,
        queries: &[ConceptId],
        graph: &Graph,
        universe: &ConceptUniverse,
        k: usize,
    ) -> Result<Vec<QueryOutcome>> {
        self.outcomes_with(&self.engine, queries, graph, universe, k)
    }

    fn outcomes_with(
        &self,
        engine: &RetrievalEngine,
        queries: &[ConceptId],
        graph: &Graph,
        universe: &ConceptUniverse,
        k: usize,
    ) -> Result<Vec<QueryOutcome>> {
        queries
            .par_iter()
            .map(|query| {
                let results = engine.retrieve(*query, graph, universe, k)?;
                let query_text = concept_text(universe, *query)?;
                let relevant = results
                    .iter()
                    .map(|r| {
                        concept_text(universe, r.id)
                            .map(|candidate| self.oracle.is_relevant(query_text, candidate))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(QueryOutcome {
                    query: *query,
                    results,
                    relevant,
                })
            })
            .collect()
    }


    pub fn evaluate(
        &self,
        queries: &[ConceptId],
        graph: &Graph,
        universe: &ConceptUniverse,
    ) -> Result<EvaluationMetrics> {
        let outcomes = self.outcomes(queries, graph, universe, self.k)?;
        Ok(calculate_metrics(self.k, &outcomes))
    }

    /// Recall@K for each K, from a single retrieval at the largest K.
    pub fn recall_curve(
        &self,
        ks: &[usize],
        queries: &[ConceptId],
        graph: &Graph,
        universe: &ConceptUniverse,
    ) -> Result<Vec<RecallPoint>> {
        let Some(max_k) = ks.iter().copied().max() else {
            return Ok(Vec::new());
        };
        if ks.contains(&0) {
            return Err(HskgError::Validation("recall K values must be at least 1".to_string()));
        }

        let outcomes = self.outcomes(queries, graph, universe, max_k)?;
        let mut ks = ks.to_vec();
        ks.sort_unstable();
        ks.dedup();

        Ok(ks
            .into_iter()
            .map(|k| {
                let truncated: Vec<QueryOutcome> = outcomes.iter().map(|o| o.truncated(k)).collect();
                RecallPoint {
                    k,
                    recall: calculate_metrics(k, &truncated).recall_at_k,
                }
            })
            .collect())
    }

    /// Rebuilds the graph per variant and evaluates it. A failing variant
    /// produces an error row; the remaining variants still run.
    pub fn ablation_sweep(
        &self,
        builder: &GraphBuilder,
        universe: &ConceptUniverse,
        queries: &[ConceptId],
        variants: &[AblationVariant],
    ) -> Vec<AblationRow> {
        variants
            .iter()
            .map(|variant| {
                let label = variant.label();
                let outcome = builder
                    .build_with(universe, variant.policy())
                    .and_then(|graph| {
                        let metrics = self.evaluate(queries, &graph, universe)?;
                        Ok(AblationResult {
                            graph: GraphStats::compute(&graph),
                            metrics,
                        })
                    })
                    .map_err(|e| {
                        warn!("Ablation variant {} failed: {}", label, e);
                        e.to_string()
                    });

                if let Ok(result) = &outcome {
                    info!(
                        "Ablation {}: recall@{}={:.3}, mrr={:.3}",
                        label, self.k, result.metrics.recall_at_k, result.metrics.mrr
                    );
                }
                AblationRow {
                    label,
                    variant: *variant,
                    outcome,
                }
            })
            .collect()
    }


    pub fn threshold_sweep(
        &self,
        builder: &GraphBuilder,
        universe: &ConceptUniverse,
        queries: &[ConceptId],
        thresholds: &[f64],
    ) -> Vec<AblationRow> {
        let variants: Vec<AblationVariant> = thresholds
            .iter()
            .map(|threshold| AblationVariant::Full { threshold: *threshold })
            .collect();
        self.ablation_sweep(builder, universe, queries, &variants)
    }


    pub fn raw_similarity(
        &self,
        queries: &[ConceptId],
        graph: &Graph,
        universe: &ConceptUniverse,
    ) -> Result<EvaluationMetrics> {
        let outcomes = self.outcomes_with(&RetrievalEngine::raw(), queries, graph, universe, self.k)?;
        Ok(calculate_metrics(self.k, &outcomes))
    }

    /// Fraction of queries whose top-K holds a candidate with base
    /// similarity at least `theta`.
    pub fn similarity_hit_rate(
        &self,
        queries: &[ConceptId],
        graph: &Graph,
        universe: &ConceptUniverse,
        theta: f64,
    ) -> Result<f64> {
        if queries.is_empty() {
            return Ok(0.0);
        }
        let outcomes = self.outcomes(queries, graph, universe, self.k)?;
        let hits = outcomes
            .iter()
            .filter(|o| o.results.iter().any(|r| r.similarity >= theta))
            .count();
        Ok(hits as f64 / queries.len() as f64)
    }


    pub fn baselines(
        &self,
        queries: &[ConceptId],
        graph: &Graph,
        universe: &ConceptUniverse,
        theta: f64,
    ) -> Result<BaselineReport> {
        Ok(BaselineReport {
            tfidf: tfidf_similarity(queries, universe, self.k, TFIDF_HIT_THRESHOLD),
            raw_similarity: self.raw_similarity(queries, graph, universe)?,
            category_cooccurrence: category_cooccurrence(queries, universe),
            similarity_hit_theta: theta,
            similarity_hit_rate: self.similarity_hit_rate(queries, graph, universe, theta)?,
        })
    }
}


/// Fraction of queries whose category label also occurs on the opposite
/// side. Uncategorized queries count as misses.
pub fn category_cooccurrence(queries: &[ConceptId], universe: &ConceptUniverse) -> f64 {
    if queries.is_empty() {
        return 0.0;
    }
    let hits = queries
        .iter()
        .filter_map(|id| universe.get(*id))
        .filter(|query| {
            query.category.is_some_and(|category| {
                universe.iter().any(|c| {
                    c.side == query.side.opposite()
                        && c.category.is_some_and(|other| other.label() == category.label())
                })
            })
        })
        .count();
    hits as f64 / queries.len() as f64
}

fn concept_text(universe: &ConceptUniverse, id: ConceptId) -> Result<&str> {
    universe
        .get(id)
        .map(|c| c.text.as_str())
        .ok_or_else(|| HskgError::Validation(format!("unknown concept {id}")))
}

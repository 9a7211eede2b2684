use serde::Serialize;

use crate::nlp::ConceptId;
use crate::retrieval::RetrievedConcept;


/// Ranked results for one query with per-candidate relevance judgements.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub query: ConceptId,
    pub results: Vec<RetrievedConcept>,
    pub relevant: Vec<bool>,
}

impl QueryOutcome {
    /// Same outcome restricted to the first `k` results.
    pub fn truncated(&self, k: usize) -> QueryOutcome {
        let n = k.min(self.results.len());
        QueryOutcome {
            query: self.query,
            results: self.results[..n].to_vec(),
            relevant: self.relevant[..n.min(self.relevant.len())].to_vec(),
        }
    }

    pub fn first_relevant_rank(&self) -> Option<usize> {
        self.relevant.iter().position(|r| *r).map(|pos| pos + 1)
    }
}


#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationMetrics {
    pub k: usize,
    pub queries: usize,
    pub hits: usize,
    pub recall_at_k: f64,
    pub precision_at_k: f64,
    pub mrr: f64,
    pub avg_similarity_at_k: f64,
    pub avg_score_at_k: f64,
    pub boosted_fraction: f64,
}

impl EvaluationMetrics {
    pub fn empty(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecallPoint {
    pub k: usize,
    pub recall: f64,
}


pub fn calculate_metrics(k: usize, outcomes: &[QueryOutcome]) -> EvaluationMetrics {
    if outcomes.is_empty() {
        return EvaluationMetrics::empty(k);
    }

    let queries = outcomes.len();
    let hits = outcomes
        .iter()
        .filter(|o| o.relevant.iter().any(|r| *r))
        .count();

    let precision_sum: f64 = outcomes
        .iter()
        .filter(|o| !o.results.is_empty())
        .map(|o| o.relevant.iter().filter(|r| **r).count() as f64 / o.results.len() as f64)
        .sum();

    let reciprocal_sum: f64 = outcomes
        .iter()
        .filter_map(QueryOutcome::first_relevant_rank)
        .map(|rank| 1.0 / rank as f64)
        .sum();

    let returned: Vec<&RetrievedConcept> = outcomes.iter().flat_map(|o| o.results.iter()).collect();
    let (avg_similarity_at_k, avg_score_at_k, boosted_fraction) = if returned.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let n = returned.len() as f64;
        (
            returned.iter().map(|r| r.similarity).sum::<f64>() / n,
            returned.iter().map(|r| r.score).sum::<f64>() / n,
            returned.iter().filter(|r| r.boosted()).count() as f64 / n,
        )
    };

    EvaluationMetrics {
        k,
        queries,
        hits,
        recall_at_k: hits as f64 / queries as f64,
        precision_at_k: precision_sum / queries as f64,
        mrr: reciprocal_sum / queries as f64,
        avg_similarity_at_k,
        avg_score_at_k,
        boosted_fraction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeKind;

    fn outcome(query: u32, judged: &[(f64, bool, bool)]) -> QueryOutcome {
        QueryOutcome {
            query: ConceptId(query),
            results: judged
                .iter()
                .enumerate()
                .map(|(i, (sim, _, boosted))| RetrievedConcept {
                    id: ConceptId(100 + i as u32),
                    score: if *boosted { sim + 0.1 } else { *sim },
                    similarity: *sim,
                    via: boosted.then_some(EdgeKind::Semantic),
                })
                .collect(),
            relevant: judged.iter().map(|(_, rel, _)| *rel).collect(),
        }
    }

    #[test]
    fn test_empty_queries_are_zero() {
        let metrics = calculate_metrics(5, &[]);
        assert_eq!(metrics, EvaluationMetrics::empty(5));
        assert_eq!(metrics.recall_at_k, 0.0);
        assert!(!metrics.mrr.is_nan());
    }

    #[test]
    fn test_metrics() {
        let outcomes = vec![
            outcome(0, &[(0.9, false, true), (0.8, true, false)]),
            outcome(1, &[(0.5, false, false), (0.4, false, false)]),
        ];
        let metrics = calculate_metrics(2, &outcomes);

        assert_eq!(metrics.queries, 2);
        assert_eq!(metrics.hits, 1);
        assert!((metrics.recall_at_k - 0.5).abs() < 1e-12);
        assert!((metrics.precision_at_k - 0.25).abs() < 1e-12);
        assert!((metrics.mrr - 0.25).abs() < 1e-12);
        assert!((metrics.avg_similarity_at_k - 0.65).abs() < 1e-12);
        assert!((metrics.avg_score_at_k - 0.675).abs() < 1e-12);
        assert!((metrics.boosted_fraction - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_truncated() {
        let full = outcome(0, &[(0.9, false, false), (0.8, true, false), (0.7, true, false)]);
        let top1 = full.truncated(1);
        assert_eq!(top1.results.len(), 1);
        assert_eq!(top1.first_relevant_rank(), None);
        assert_eq!(full.first_relevant_rank(), Some(2));
        assert_eq!(full.truncated(10), full);
    }
}

use rayon::prelude::*;
use tracing::debug;

use super::ranking::{RetrievedConcept, select_top_k};
use crate::core::{HskgError, Result};
use crate::graph::Graph;
use crate::graph::similarity::{cosine_with_norms, l2_norm};
use crate::nlp::{ConceptId, ConceptUniverse};


/// Ranks opposite-side concepts for a query by cosine similarity, adding a
/// fixed boost to candidates the graph connects to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalEngine {
    graph_boost: f64,
}

impl Default for RetrievalEngine {
    fn default() -> Self {
        Self::new(crate::DEFAULT_GRAPH_BOOST)
    }
}

impl RetrievalEngine {
    pub fn new(graph_boost: f64) -> Self {
        Self { graph_boost }
    }

    /// Unboosted engine: scores are raw cosine similarity.
    pub fn raw() -> Self {
        Self::new(0.0)
    }

    pub fn graph_boost(&self) -> f64 {
        self.graph_boost
    }


    pub fn retrieve(
        &self,
        query: ConceptId,
        graph: &Graph,
        universe: &ConceptUniverse,
        k: usize,
    ) -> Result<Vec<RetrievedConcept>> {
        if k == 0 {
            return Err(HskgError::Validation("k must be at least 1".to_string()));
        }

        let concept = universe
            .get(query)
            .ok_or_else(|| HskgError::Validation(format!("unknown query concept {query}")))?;
        let query_vector = concept
            .vector
            .as_deref()
            .ok_or_else(|| HskgError::incomplete(format!("query concept {query} has no vector")))?;
        let query_norm = l2_norm(query_vector);
        let wanted = concept.side.opposite();

        let scored = universe
            .iter()
            .filter(|c| c.side == wanted)
            .map(|candidate| {
                let vector = candidate.vector.as_deref().ok_or_else(|| {
                    HskgError::incomplete(format!("candidate concept {} has no vector", candidate.id))
                })?;
                let similarity = cosine_with_norms(query_vector, vector, query_norm, l2_norm(vector));
                let via = if self.graph_boost > 0.0 {
                    graph.connection(query, candidate.id)
                } else {
                    None
                };
                let boost = if via.is_some() { self.graph_boost } else { 0.0 };
                Ok(RetrievedConcept {
                    id: candidate.id,
                    score: similarity + boost,
                    similarity,
                    via,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let ranked = select_top_k(scored, k);
        debug!("Retrieved {} candidates for {}", ranked.len(), query);
        Ok(ranked)
    }

    /// Runs independent queries in parallel; results keep query order.
    pub fn retrieve_batch(
        &self,
        queries: &[ConceptId],
        graph: &Graph,
        universe: &ConceptUniverse,
        k: usize,
    ) -> Result<Vec<Vec<RetrievedConcept>>> {
        queries
            .par_iter()
            .map(|query| self.retrieve(*query, graph, universe, k))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, EdgePolicy, GraphBuilder};
    use crate::nlp::{Category, ConceptCandidate, Side, SourceCategory, TargetCategory};

    fn universe(items: &[(&str, Side, Option<Category>, [f32; 2])]) -> ConceptUniverse {
        let mut universe = ConceptUniverse::new();
        for (text, side, category, vector) in items {
            let id = universe.insert(ConceptCandidate::new(text, *side, *category)).unwrap();
            universe.attach_vector(id, vector.to_vec()).unwrap();
        }
        universe
    }

    fn scenario() -> ConceptUniverse {
        universe(&[
            ("button too small", Side::Source, Some(Category::Source(SourceCategory::Interaction)), [1.0, 0.0]),
            ("button size specification", Side::Target, Some(Category::Target(TargetCategory::Interaction)), [0.8, 0.6]),
            ("footer links", Side::Target, Some(Category::Target(TargetCategory::Item)), [0.6, -0.8]),
            ("login fails", Side::Source, Some(Category::Source(SourceCategory::User)), [0.0, 1.0]),
        ])
    }

    #[test]
    fn test_graph_boost_applied_to_connected_candidate() {
        let universe = scenario();
        let graph = GraphBuilder::default().build(&universe, 0.75).unwrap();
        let results = RetrievalEngine::default()
            .retrieve(ConceptId(0), &graph, &universe, 5)
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, ConceptId(1));
        assert_eq!(results[0].via, Some(EdgeKind::Semantic));
        assert!((results[0].score - results[0].similarity - 0.1).abs() < 1e-9);
        assert!(results.iter().all(|r| universe.get(r.id).unwrap().side == Side::Target));
    }

    #[test]
    fn test_no_boost_without_edge() {
        let universe = scenario();
        let graph = GraphBuilder::default().build(&universe, 0.9).unwrap();
        let results = RetrievalEngine::default()
            .retrieve(ConceptId(0), &graph, &universe, 5)
            .unwrap();

        assert!(results.iter().all(|r| r.via.is_none() && r.score == r.similarity));
    }

    #[test]
    fn test_raw_engine_ignores_graph() {
        let universe = scenario();
        let graph = GraphBuilder::default().build(&universe, 0.75).unwrap();

        let raw = RetrievalEngine::raw()
            .retrieve(ConceptId(0), &graph, &universe, 2)
            .unwrap();
        let ids: Vec<_> = raw.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![ConceptId(1), ConceptId(2)]);
        assert!(raw.iter().all(|r| !r.boosted() && r.score == r.similarity));
    }

    #[test]
    fn test_symbolic_edges_never_cross_sides() {
        let universe = scenario();
        let graph = GraphBuilder::default()
            .build_with(&universe, EdgePolicy::SymbolicOnly)
            .unwrap();
        let results = RetrievalEngine::default()
            .retrieve(ConceptId(0), &graph, &universe, 5)
            .unwrap();
        assert!(results.iter().all(|r| r.via.is_none()));
    }

    #[test]
    fn test_errors() {
        let universe = scenario();
        let graph = GraphBuilder::default().build(&universe, 0.75).unwrap();
        let engine = RetrievalEngine::default();

        assert!(matches!(
            engine.retrieve(ConceptId(99), &graph, &universe, 5),
            Err(HskgError::Validation(_))
        ));
        assert!(matches!(
            engine.retrieve(ConceptId(0), &graph, &universe, 0),
            Err(HskgError::Validation(_))
        ));

        let mut partial = scenario();
        partial.insert(ConceptCandidate::new("dark mode", Side::Target, None)).unwrap();
        assert!(matches!(
            engine.retrieve(ConceptId(0), &graph, &partial, 5),
            Err(HskgError::IncompleteData(_))
        ));
    }

    #[test]
    fn test_batch_matches_single_queries() {
        let universe = scenario();
        let graph = GraphBuilder::default().build(&universe, 0.75).unwrap();
        let engine = RetrievalEngine::default();
        let queries = [ConceptId(0), ConceptId(3), ConceptId(1)];

        let batch = engine.retrieve_batch(&queries, &graph, &universe, 2).unwrap();
        for (query, results) in queries.iter().zip(&batch) {
            assert_eq!(results, &engine.retrieve(*query, &graph, &universe, 2).unwrap());
        }
        assert_eq!(batch[2].len(), 2);
    }
}

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::models::{EdgePolicy, Graph, NodeRecord, SymbolicClique};
use super::similarity::pairwise_edges;
use crate::core::{HskgError, Result, validate_threshold};
use crate::nlp::{Category, ConceptId, ConceptUniverse};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
    pub tile_size: usize,
    /// Groups larger than this are split, in id order, into consecutive
    /// cliques of at most `cap` members.
    pub symbolic_group_cap: Option<usize>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            tile_size: 256,
            symbolic_group_cap: None,
        }
    }
}


#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    config: BuilderConfig,
}

impl GraphBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }


    pub fn build(&self, universe: &ConceptUniverse, threshold: f64) -> Result<Graph> {
        self.build_with(universe, EdgePolicy::Hybrid { threshold })
    }


    pub fn build_with(&self, universe: &ConceptUniverse, policy: EdgePolicy) -> Result<Graph> {
        let started = Instant::now();
        if let Some(threshold) = policy.threshold() {
            validate_threshold(threshold)?;
        }

        let nodes: Vec<NodeRecord> = universe
            .iter()
            .map(|c| NodeRecord {
                id: c.id,
                side: c.side,
                category: c.category,
            })
            .collect();

        let cliques = if policy.symbolic() {
            self.symbolic_cliques(universe)
        } else {
            Vec::new()
        };

        let semantic = match policy.threshold() {
            Some(threshold) if policy.semantic() => {
                let vectors = collect_vectors(universe)?;
                pairwise_edges(&vectors, threshold, self.config.tile_size)
            }
            _ => Vec::new(),
        };

        let graph = Graph::new(policy, nodes, cliques, semantic);
        info!(
            "Graph built: policy={}, nodes={}, symbolic_edges={}, semantic_edges={}, cliques={}, elapsed_ms={}",
            policy,
            graph.node_count(),
            graph.symbolic_edge_count(),
            graph.semantic_edge_count(),
            graph.cliques().len(),
            started.elapsed().as_millis()
        );
        Ok(graph)
    }

    fn symbolic_cliques(&self, universe: &ConceptUniverse) -> Vec<SymbolicClique> {
        let mut groups: BTreeMap<Category, Vec<ConceptId>> = BTreeMap::new();
        for concept in universe.iter() {
            if let Some(category) = concept.category {
                groups.entry(category).or_default().push(concept.id);
            }
        }

        let cap = self.config.symbolic_group_cap.map(|c| c.max(2));
        let mut cliques = Vec::new();
        for (category, members) in groups {
            if members.len() < 2 {
                continue;
            }
            match cap {
                Some(cap) if members.len() > cap => {
                    debug!(
                        "Splitting {} group of {} into cliques of {}",
                        category,
                        members.len(),
                        cap
                    );
                    cliques.extend(
                        members
                            .chunks(cap)
                            .filter(|chunk| chunk.len() >= 2)
                            .map(|chunk| SymbolicClique {
                                category,
                                members: chunk.to_vec(),
                            }),
                    );
                }
                _ => cliques.push(SymbolicClique { category, members }),
            }
        }
        cliques
    }
}

fn collect_vectors(universe: &ConceptUniverse) -> Result<Vec<&[f32]>> {
    let missing = universe.missing_vectors();
    if let Some(first) = missing.first() {
        return Err(HskgError::incomplete(format!(
            "{} concepts lack vectors (first: {first}); semantic edges need every vector",
            missing.len()
        )));
    }

    let mut expected: Option<usize> = None;
    universe
        .iter()
        .map(|concept| {
            let vector = concept.vector.as_deref().unwrap_or_default();
            let dimension = *expected.get_or_insert(vector.len());
            if vector.len() != dimension {
                return Err(HskgError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            Ok(vector)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeKind;
    use crate::nlp::{ConceptCandidate, Side, SourceCategory, TargetCategory};

    fn universe(items: &[(&str, Side, Option<Category>, Vec<f32>)]) -> ConceptUniverse {
        let mut universe = ConceptUniverse::new();
        for (text, side, category, vector) in items {
            let id = universe
                .insert(ConceptCandidate::new(text, *side, *category))
                .unwrap();
            universe.attach_vector(id, vector.clone()).unwrap();
        }
        universe
    }

    fn interaction_pair() -> ConceptUniverse {
        universe(&[
            (
                "button too small",
                Side::Source,
                Some(Category::Source(SourceCategory::Interaction)),
                vec![1.0, 0.0],
            ),
            (
                "button size specification",
                Side::Target,
                Some(Category::Target(TargetCategory::Interaction)),
                vec![0.8, 0.6],
            ),
        ])
    }

    #[test]
    fn test_cross_side_semantic_edge_above_threshold() {
        let graph = GraphBuilder::default().build(&interaction_pair(), 0.75).unwrap();

        assert_eq!(graph.symbolic_edge_count(), 0);
        assert_eq!(graph.semantic_edge_count(), 1);
        let edge = graph.semantic_edges()[0];
        assert_eq!(edge.endpoints(), (ConceptId(0), ConceptId(1)));
        assert_eq!(edge.kind, EdgeKind::Semantic);
        assert!((edge.weight - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_no_semantic_edge_below_threshold() {
        let graph = GraphBuilder::default().build(&interaction_pair(), 0.9).unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.connected(ConceptId(0), ConceptId(1)));
    }

    #[test]
    fn test_symbolic_cliques_per_side_category() {
        let state = Some(Category::Source(SourceCategory::State));
        let universe = universe(&[
            ("slow", Side::Source, state, vec![1.0, 0.0]),
            ("crash", Side::Source, state, vec![0.0, 1.0]),
            ("freeze", Side::Source, state, vec![-1.0, 0.0]),
            ("reduce load time", Side::Target, Some(Category::Target(TargetCategory::Fix)), vec![0.0, -1.0]),
        ]);

        let graph = GraphBuilder::default()
            .build_with(&universe, EdgePolicy::SymbolicOnly)
            .unwrap();
        assert_eq!(graph.cliques().len(), 1);
        assert_eq!(graph.symbolic_edge_count(), 3);
        assert_eq!(graph.semantic_edge_count(), 0);
        assert!(graph.connected(ConceptId(0), ConceptId(2)));
        assert!(!graph.connected(ConceptId(0), ConceptId(3)));
    }

    #[test]
    fn test_symbolic_group_cap_chunks_in_id_order() {
        let user = Some(Category::Source(SourceCategory::User));
        let items: Vec<_> = (0..5)
            .map(|i| ("account", Side::Source, user, vec![i as f32, 1.0]))
            .collect();
        let universe = universe(&items);

        let builder = GraphBuilder::new(BuilderConfig {
            tile_size: 256,
            symbolic_group_cap: Some(2),
        });
        let graph = builder.build_with(&universe, EdgePolicy::SymbolicOnly).unwrap();

        let members: Vec<_> = graph.cliques().iter().map(|c| c.members.clone()).collect();
        assert_eq!(
            members,
            vec![vec![ConceptId(0), ConceptId(1)], vec![ConceptId(2), ConceptId(3)]]
        );
        assert_eq!(graph.symbolic_edge_count(), 2);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let builder = GraphBuilder::default();
        let pair = interaction_pair();
        assert!(matches!(builder.build(&pair, 1.5), Err(HskgError::Configuration(_))));
        assert!(matches!(builder.build(&pair, f64::NAN), Err(HskgError::Configuration(_))));
        assert!(builder.build_with(&pair, EdgePolicy::SymbolicOnly).is_ok());
    }

    #[test]
    fn test_missing_vectors_only_fail_semantic_builds() {
        let mut universe = ConceptUniverse::new();
        universe
            .insert(ConceptCandidate::new("menu", Side::Source, None))
            .unwrap();
        let builder = GraphBuilder::default();

        assert!(matches!(builder.build(&universe, 0.5), Err(HskgError::IncompleteData(_))));
        assert!(builder.build_with(&universe, EdgePolicy::SymbolicOnly).is_ok());
    }

    #[test]
    fn test_empty_universe() {
        let graph = GraphBuilder::default().build(&ConceptUniverse::new(), 0.75).unwrap();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }
}

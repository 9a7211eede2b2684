use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::models::{EdgeKind, Graph};
use crate::core::Result;
use crate::nlp::{Category, ConceptId, ConceptUniverse, Side};


#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub source_nodes: usize,
    pub target_nodes: usize,
    pub symbolic_edges: usize,
    pub semantic_edges: usize,
    pub cross_side_semantic_edges: usize,
    pub cliques: usize,
    pub largest_clique: usize,
    pub mean_semantic_weight: f64,
    /// Keyed `side:label`; uncategorized concepts count under `side:none`.
    pub nodes_per_category: BTreeMap<String, usize>,
}

impl GraphStats {
    pub fn compute(graph: &Graph) -> Self {
        let nodes = graph.nodes();
        let source_nodes = nodes.iter().filter(|n| n.side == Side::Source).count();

        let mut nodes_per_category = BTreeMap::new();
        for node in nodes {
            let key = match node.category {
                Some(category) => category.to_string(),
                None => format!("{}:none", node.side),
            };
            *nodes_per_category.entry(key).or_insert(0) += 1;
        }

        let side_of = |id: ConceptId| graph.node(id).map(|n| n.side);
        let semantic = graph.semantic_edges();
        let cross_side_semantic_edges = semantic
            .iter()
            .filter(|e| side_of(e.a) != side_of(e.b))
            .count();
        let mean_semantic_weight = if semantic.is_empty() {
            0.0
        } else {
            semantic.iter().map(|e| e.weight).sum::<f64>() / semantic.len() as f64
        };

        Self {
            nodes: nodes.len(),
            source_nodes,
            target_nodes: nodes.len() - source_nodes,
            symbolic_edges: graph.symbolic_edge_count(),
            semantic_edges: semantic.len(),
            cross_side_semantic_edges,
            cliques: graph.cliques().len(),
            largest_clique: graph
                .cliques()
                .iter()
                .map(|c| c.members.len())
                .max()
                .unwrap_or(0),
            mean_semantic_weight,
            nodes_per_category,
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportNode {
    pub id: ConceptId,
    pub side: Side,
    pub category: Option<Category>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportEdge {
    pub a: ConceptId,
    pub b: ConceptId,
    pub kind: EdgeKind,
    pub weight: f64,
}


/// Attributed node/edge lists for external graph tooling. Symbolic cliques
/// are expanded here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
}

impl GraphExport {
    pub fn from_graph(graph: &Graph, universe: &ConceptUniverse) -> Self {
        let nodes = graph
            .nodes()
            .iter()
            .map(|node| ExportNode {
                id: node.id,
                side: node.side,
                category: node.category,
                text: universe
                    .get(node.id)
                    .map(|c| c.text.clone())
                    .unwrap_or_default(),
            })
            .collect();

        let mut edges: Vec<ExportEdge> = graph
            .edges()
            .map(|e| ExportEdge {
                a: e.a,
                b: e.b,
                kind: e.kind,
                weight: e.weight,
            })
            .collect();
        edges.sort_by(|x, y| (x.a, x.b, x.kind).cmp(&(y.a, y.b, y.kind)));

        Self { nodes, edges }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        info!(
            "Graph export written to {} ({} nodes, {} edges)",
            path.display(),
            self.nodes.len(),
            self.edges.len()
        );
        Ok(())
    }
}

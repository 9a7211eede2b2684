use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::nlp::{Category, ConceptId, Side};


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EdgeKind {
    Symbolic,
    Semantic,
}


/// Undirected edge in canonical orientation (`a < b`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub a: ConceptId,
    pub b: ConceptId,
    pub kind: EdgeKind,
    pub weight: f64,
}

impl Edge {
    /// Returns `None` for self-pairs.
    pub fn new(x: ConceptId, y: ConceptId, kind: EdgeKind, weight: f64) -> Option<Self> {
        let (a, b) = match x.cmp(&y) {
            std::cmp::Ordering::Less => (x, y),
            std::cmp::Ordering::Greater => (y, x),
            std::cmp::Ordering::Equal => return None,
        };
        Some(Self { a, b, kind, weight })
    }

    pub fn endpoints(&self) -> (ConceptId, ConceptId) {
        (self.a, self.b)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum EdgePolicy {
    Hybrid { threshold: f64 },
    SymbolicOnly,
    SemanticOnly { threshold: f64 },
}

impl EdgePolicy {
    pub fn threshold(&self) -> Option<f64> {
        match self {
            Self::Hybrid { threshold } | Self::SemanticOnly { threshold } => Some(*threshold),
            Self::SymbolicOnly => None,
        }
    }

    pub fn symbolic(&self) -> bool {
        matches!(self, Self::Hybrid { .. } | Self::SymbolicOnly)
    }

    pub fn semantic(&self) -> bool {
        matches!(self, Self::Hybrid { .. } | Self::SemanticOnly { .. })
    }
}

impl std::fmt::Display for EdgePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hybrid { threshold } => write!(f, "hybrid(t={threshold})"),
            Self::SymbolicOnly => write!(f, "symbolic_only"),
            Self::SemanticOnly { threshold } => write!(f, "semantic_only(t={threshold})"),
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: ConceptId,
    pub side: Side,
    pub category: Option<Category>,
}


/// Every pair of members is joined by one symbolic edge of weight 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolicClique {
    pub category: Category,
    pub members: Vec<ConceptId>,
}

impl SymbolicClique {
    pub fn edge_count(&self) -> usize {
        let n = self.members.len();
        n * n.saturating_sub(1) / 2
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.members.iter().enumerate().flat_map(move |(i, a)| {
            self.members[i + 1..]
                .iter()
                .filter_map(move |b| Edge::new(*a, *b, EdgeKind::Symbolic, 1.0))
        })
    }
}


/// Hybrid concept graph. Frozen after construction.
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) policy: EdgePolicy,
    pub(crate) nodes: Vec<NodeRecord>,
    pub(crate) cliques: Vec<SymbolicClique>,
    pub(crate) clique_of: Vec<Option<usize>>,
    pub(crate) semantic: Vec<Edge>,
    pub(crate) semantic_adjacency: Vec<Vec<(ConceptId, f64)>>,
}

impl Graph {
    pub(crate) fn new(
        policy: EdgePolicy,
        nodes: Vec<NodeRecord>,
        cliques: Vec<SymbolicClique>,
        semantic: Vec<Edge>,
    ) -> Self {
        let mut clique_of = vec![None; nodes.len()];
        for (idx, clique) in cliques.iter().enumerate() {
            for member in &clique.members {
                if let Some(slot) = clique_of.get_mut(member.index()) {
                    *slot = Some(idx);
                }
            }
        }

        let mut semantic_adjacency: Vec<Vec<(ConceptId, f64)>> = vec![Vec::new(); nodes.len()];
        for edge in &semantic {
            semantic_adjacency[edge.a.index()].push((edge.b, edge.weight));
            semantic_adjacency[edge.b.index()].push((edge.a, edge.weight));
        }
        for neighbours in &mut semantic_adjacency {
            neighbours.sort_by_key(|(id, _)| *id);
        }

        Self {
            policy,
            nodes,
            cliques,
            clique_of,
            semantic,
            semantic_adjacency,
        }
    }

    pub fn policy(&self) -> EdgePolicy {
        self.policy
    }

    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    pub fn node(&self, id: ConceptId) -> Option<&NodeRecord> {
        self.nodes.get(id.index())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn cliques(&self) -> &[SymbolicClique] {
        &self.cliques
    }

    /// Semantic edges sorted by `(a, b)`.
    pub fn semantic_edges(&self) -> &[Edge] {
        &self.semantic
    }

    pub fn symbolic_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.cliques.iter().flat_map(|clique| clique.edges())
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.symbolic_edges().chain(self.semantic.iter().copied())
    }

    pub fn symbolic_edge_count(&self) -> usize {
        self.cliques.iter().map(SymbolicClique::edge_count).sum()
    }

    pub fn semantic_edge_count(&self) -> usize {
        self.semantic.len()
    }

    pub fn edge_count(&self) -> usize {
        self.symbolic_edge_count() + self.semantic_edge_count()
    }

    pub fn has_symbolic(&self, a: ConceptId, b: ConceptId) -> bool {
        if a == b {
            return false;
        }
        match (self.clique_slot(a), self.clique_slot(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    pub fn semantic_weight(&self, a: ConceptId, b: ConceptId) -> Option<f64> {
        let neighbours = self.semantic_adjacency.get(a.index())?;
        neighbours
            .binary_search_by_key(&b, |(id, _)| *id)
            .ok()
            .map(|pos| neighbours[pos].1)
    }

    pub fn edge_kinds(&self, a: ConceptId, b: ConceptId) -> Vec<EdgeKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.has_symbolic(a, b) {
            kinds.push(EdgeKind::Symbolic);
        }
        if self.semantic_weight(a, b).is_some() {
            kinds.push(EdgeKind::Semantic);
        }
        kinds
    }

    pub fn connected(&self, a: ConceptId, b: ConceptId) -> bool {
        self.has_symbolic(a, b) || self.semantic_weight(a, b).is_some()
    }

    /// Strongest connecting edge kind; semantic wins when both exist.
    pub fn connection(&self, a: ConceptId, b: ConceptId) -> Option<EdgeKind> {
        if self.semantic_weight(a, b).is_some() {
            Some(EdgeKind::Semantic)
        } else if self.has_symbolic(a, b) {
            Some(EdgeKind::Symbolic)
        } else {
            None
        }
    }

    pub fn degree(&self, id: ConceptId) -> usize {
        let symbolic = self
            .clique_slot(id)
            .map(|idx| self.cliques[idx].members.len() - 1)
            .unwrap_or(0);
        let semantic = self
            .semantic_adjacency
            .get(id.index())
            .map(Vec::len)
            .unwrap_or(0);
        symbolic + semantic
    }

    /// Neighbours of `id` as `(neighbour, kind, weight)`, sorted by neighbour
    /// then kind. A pair joined by both kinds appears once per kind.
    pub fn neighbors(&self, id: ConceptId, kind: Option<EdgeKind>) -> Vec<(ConceptId, EdgeKind, f64)> {
        let wants = |k: EdgeKind| kind.is_none_or(|wanted| wanted == k);
        let mut out = Vec::new();

        if wants(EdgeKind::Symbolic) {
            if let Some(idx) = self.clique_slot(id) {
                out.extend(
                    self.cliques[idx]
                        .members
                        .iter()
                        .filter(|member| **member != id)
                        .map(|member| (*member, EdgeKind::Symbolic, 1.0)),
                );
            }
        }
        if wants(EdgeKind::Semantic) {
            if let Some(adjacent) = self.semantic_adjacency.get(id.index()) {
                out.extend(adjacent.iter().map(|(other, w)| (*other, EdgeKind::Semantic, *w)));
            }
        }

        out.sort_by_key(|(other, k, _)| (*other, *k));
        out
    }

    fn clique_slot(&self, id: ConceptId) -> Option<usize> {
        self.clique_of.get(id.index()).copied().flatten()
    }
}

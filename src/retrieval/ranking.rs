use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::graph::EdgeKind;
use crate::nlp::ConceptId;


#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievedConcept {
    pub id: ConceptId,
    /// Base similarity plus the graph boost, if any.
    pub score: f64,
    pub similarity: f64,
    pub via: Option<EdgeKind>,
}

impl RetrievedConcept {
    pub fn boosted(&self) -> bool {
        self.via.is_some()
    }
}


/// Score descending, then id ascending.
pub fn compare_ranked(a: &RetrievedConcept, b: &RetrievedConcept) -> Ordering {
    b.score.total_cmp(&a.score).then(a.id.cmp(&b.id))
}


pub fn select_top_k(mut scored: Vec<RetrievedConcept>, k: usize) -> Vec<RetrievedConcept> {
    if k == 0 {
        return Vec::new();
    }
    if scored.len() > k {
        scored.select_nth_unstable_by(k - 1, compare_ranked);
        scored.truncate(k);
    }
    scored.sort_by(compare_ranked);
    scored
}

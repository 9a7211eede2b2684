use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::Serialize;

use crate::nlp::{ConceptId, ConceptUniverse, content_tokens};

pub const TFIDF_HIT_THRESHOLD: f64 = 0.5;


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TfidfBaseline {
    pub k: usize,
    pub theta: f64,
    pub queries: usize,
    pub recall_at_k: f64,
    pub avg_top_k_similarity: f64,
}

type SparseVector = BTreeMap<String, f64>;

/// L2-normalized TF-IDF vectors over stop-word-filtered tokens, one per
/// concept, with smoothed idf `ln((1 + n) / (1 + df)) + 1`.
fn tfidf_vectors(universe: &ConceptUniverse) -> Vec<SparseVector> {
    let documents: Vec<Vec<String>> = universe.iter().map(|c| content_tokens(&c.text)).collect();

    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for tokens in &documents {
        let mut seen: Vec<&str> = tokens.iter().map(String::as_str).collect();
        seen.sort_unstable();
        seen.dedup();
        for token in seen {
            *document_frequency.entry(token).or_default() += 1;
        }
    }

    let n = documents.len() as f64;
    documents
        .iter()
        .map(|tokens| {
            let mut vector: SparseVector = BTreeMap::new();
            for token in tokens {
                *vector.entry(token.clone()).or_default() += 1.0;
            }
            for (token, weight) in vector.iter_mut() {
                let df = document_frequency.get(token.as_str()).copied().unwrap_or(0) as f64;
                *weight *= ((1.0 + n) / (1.0 + df)).ln() + 1.0;
            }
            let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                vector.values_mut().for_each(|w| *w /= norm);
            }
            vector
        })
        .collect()
}

fn sparse_dot(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(token, w)| large.get(token).map(|other| w * other))
        .sum()
}

/// Lexical baseline: each query ranks the opposite side by TF-IDF cosine.
/// A query hits when any of its top `k` reaches `theta`. Queries without
/// opposite-side candidates are skipped.
pub fn tfidf_similarity(
    queries: &[ConceptId],
    universe: &ConceptUniverse,
    k: usize,
    theta: f64,
) -> TfidfBaseline {
    let vectors = tfidf_vectors(universe);

    let per_query: Vec<(bool, f64)> = queries
        .par_iter()
        .filter_map(|id| {
            let query = universe.get(*id)?;
            let mut sims: Vec<f64> = universe
                .iter()
                .filter(|c| c.side == query.side.opposite())
                .map(|c| sparse_dot(&vectors[id.index()], &vectors[c.id.index()]))
                .collect();
            if sims.is_empty() || k == 0 {
                return None;
            }
            sims.sort_unstable_by(|a, b| b.total_cmp(a));
            sims.truncate(k);
            let hit = sims.iter().any(|s| *s >= theta);
            let avg = sims.iter().sum::<f64>() / sims.len() as f64;
            Some((hit, avg))
        })
        .collect();

    let counted = per_query.len();
    let (recall_at_k, avg_top_k_similarity) = if counted == 0 {
        (0.0, 0.0)
    } else {
        let hits = per_query.iter().filter(|(hit, _)| *hit).count();
        let avg = per_query.iter().map(|(_, avg)| avg).sum::<f64>();
        (hits as f64 / counted as f64, avg / counted as f64)
    };

    TfidfBaseline {
        k,
        theta,
        queries: counted,
        recall_at_k,
        avg_top_k_similarity,
    }
}

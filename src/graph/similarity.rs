use rayon::prelude::*;
use tracing::debug;

use super::models::{Edge, EdgeKind};
use crate::nlp::ConceptId;


pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}


/// Cosine similarity with precomputed norms; zero norm gives 0.
#[inline]
pub fn cosine_with_norms(a: &[f32], b: &[f32], norm_a: f32, norm_b: f32) -> f64 {
    if a.len() != b.len() || a.is_empty() || norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot(a, b) / (norm_a * norm_b)) as f64
}


pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    cosine_with_norms(a, b, l2_norm(a), l2_norm(b))
}


/// All pairs `(i, j)`, `i < j`, with cosine at or above `threshold`, as
/// semantic edges sorted by `(a, b)`. Index `i` maps to `ConceptId(i)`.
///
/// The index range is cut into tiles of `tile_size`; upper-triangular tile
/// pairs run in parallel and only keep pairs above threshold.
pub fn pairwise_edges(vectors: &[&[f32]], threshold: f64, tile_size: usize) -> Vec<Edge> {
    let n = vectors.len();
    if n < 2 {
        return Vec::new();
    }

    let tile_size = tile_size.max(1);
    let norms: Vec<f32> = vectors.par_iter().map(|v| l2_norm(v)).collect();
    let tiles = n.div_ceil(tile_size);
    let tile_pairs: Vec<(usize, usize)> = (0..tiles)
        .flat_map(|ti| (ti..tiles).map(move |tj| (ti, tj)))
        .collect();

    debug!(
        "Pairwise similarity: {} vectors, {} tiles, {} tile pairs",
        n,
        tiles,
        tile_pairs.len()
    );

    let mut edges: Vec<Edge> = tile_pairs
        .into_par_iter()
        .flat_map_iter(|(ti, tj)| {
            let rows = ti * tile_size..((ti + 1) * tile_size).min(n);
            let cols_end = ((tj + 1) * tile_size).min(n);

            let mut found = Vec::new();
            for i in rows {
                let cols_start = if ti == tj { i + 1 } else { tj * tile_size };
                for j in cols_start..cols_end {
                    let sim = cosine_with_norms(vectors[i], vectors[j], norms[i], norms[j]);
                    if sim >= threshold {
                        if let Some(edge) = Edge::new(
                            ConceptId(i as u32),
                            ConceptId(j as u32),
                            EdgeKind::Semantic,
                            sim,
                        ) {
                            found.push(edge);
                        }
                    }
                }
            }
            found
        })
        .collect();

    edges.sort_by(|x, y| x.a.cmp(&y.a).then(x.b.cmp(&y.b)));
    edges
}

//! Cosine-similarity ranking of candidate vectors against a query vector.

use std::cmp::Ordering;

/// Cosine similarity between two vectors. Defined as 0.0 when either vector
/// has zero norm, so degenerate embeddings never poison a ranking.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot / (norm_a * norm_b)
}

/// Score every candidate against the query and return the top `k` as
/// `(candidate_index, score)` pairs, highest score first.
///
/// The sort is stable, so exact ties keep the original candidate order —
/// rankings are deterministic and reproducible. Zero candidates yield an
/// empty result without error.
pub fn rank(query: &[f32], candidates: &[Vec<f32>], k: usize) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(idx, candidate)| (idx, cosine_similarity(query, candidate)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    scored
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

//! Pure vector geometry. Cosine distance is the single metric used across
//! the whole pipeline — builder, representatives, and refinement all call
//! into here, so the metric can never drift between components.

use thema_core::errors::ClusterError;
use thema_core::review::ReviewId;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Cosine similarity between two vectors, computed in f64.
/// Returns 0.0 for zero-length, mismatched, or zero-magnitude inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut mag_a, mut mag_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// Cosine distance: `1 − similarity`. Degenerate inputs land at 1.0.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - cosine_similarity(a, b)
}

/// Per-dimension arithmetic mean of the input vectors.
pub fn centroid(vectors: &[&[f32]]) -> Result<Vec<f32>, ClusterError> {
    let first = vectors.first().ok_or_else(|| ClusterError::EmptyInput {
        operation: "centroid".into(),
    })?;
    let dim = first.len();

    let mut sums = vec![0.0f64; dim];
    for v in vectors {
        if v.len() != dim {
            return Err(ClusterError::DimensionMismatch {
                expected: dim,
                actual: v.len(),
            });
        }
        for (s, x) in sums.iter_mut().zip(v.iter()) {
            *s += *x as f64;
        }
    }

    let n = vectors.len() as f64;
    Ok(sums.into_iter().map(|s| (s / n) as f32).collect())
}

/// L2-normalize a vector; zero vectors pass through unchanged.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < f32::EPSILON {
        v.to_vec()
    } else {
        v.iter().map(|x| x / norm).collect()
    }
}

/// Sort (id, distance) pairs ascending by distance, ties broken by review
/// id ascending — the deterministic ordering guarantee.
pub fn order_by_distance(mut pairs: Vec<(ReviewId, f64)>) -> Vec<(ReviewId, f64)> {
    pairs.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    pairs
}

/// Seeded nonlinear projection to `target_dim` dimensions: a fixed random
/// projection matrix followed by tanh squashing. Deterministic under the
/// seed; used only when `reduce_dimensions` is set.
pub fn project_nonlinear(vectors: &[Vec<f32>], target_dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let source_dim = first.len();
    if source_dim <= target_dim {
        return vectors.to_vec();
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let scale = 1.0 / (target_dim as f32).sqrt();
    let matrix: Vec<Vec<f32>> = (0..target_dim)
        .map(|_| (0..source_dim).map(|_| rng.gen_range(-1.0..1.0) * scale).collect())
        .collect();

    vectors
        .iter()
        .map(|v| {
            matrix
                .iter()
                .map(|row| {
                    let dot: f32 = row.iter().zip(v.iter()).map(|(r, x)| r * x).sum();
                    dot.tanh()
                })
                .collect()
        })
        .collect()
}

//! Seeded Lloyd-iteration k-means over cosine distance.
//!
//! Initialization draws centers with a ChaCha8 RNG from a fixed seed, so
//! identical inputs always produce identical partitions — a hard
//! requirement for the determinism property of the whole engine.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use thema_core::errors::ClusterError;

use crate::geometry::{centroid, cosine_distance};

/// Result of one k-means run.
#[derive(Debug, Clone)]
pub struct KMeansRun {
    /// Cluster index per input vector, parallel to the input.
    pub assignments: Vec<usize>,
    /// Final cluster centers.
    pub centroids: Vec<Vec<f32>>,
    /// Sum of member-to-centroid distances — the quality value fed to the
    /// knee selector.
    pub inertia: f64,
    pub iterations: usize,
}

/// Run k-means with `k` clusters. `k` is clamped to the input size.
pub fn run_kmeans(
    embeddings: &[Vec<f32>],
    k: usize,
    max_iters: usize,
    seed: u64,
) -> Result<KMeansRun, ClusterError> {
    if embeddings.is_empty() {
        return Err(ClusterError::EmptyInput {
            operation: "run_kmeans".into(),
        });
    }
    if k == 0 {
        return Err(ClusterError::ClusteringFailed {
            reason: "k must be at least 1".into(),
        });
    }

    let n = embeddings.len();
    let k = k.min(n);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut centroids: Vec<Vec<f32>> =
        embeddings.choose_multiple(&mut rng, k).cloned().collect();
    let mut assignments = vec![0usize; n];
    let mut iterations = 0;

    for _ in 0..max_iters {
        iterations += 1;

        // Assign each vector to its nearest centroid. Strict less-than
        // keeps the lowest cluster index on exact distance ties.
        let mut changed = false;
        for (i, emb) in embeddings.iter().enumerate() {
            let mut best = 0usize;
            let mut best_dist = f64::INFINITY;
            for (c, center) in centroids.iter().enumerate() {
                let d = cosine_distance(emb, center);
                if d < best_dist {
                    best = c;
                    best_dist = d;
                }
            }
            if assignments[i] != best {
                assignments[i] = best;
                changed = true;
            }
        }

        if !changed {
            break;
        }

        // Recompute centroids; an emptied cluster keeps its old center.
        for c in 0..k {
            let members: Vec<&[f32]> = embeddings
                .iter()
                .zip(assignments.iter())
                .filter(|&(_, a)| *a == c)
                .map(|(e, _)| e.as_slice())
                .collect();
            if !members.is_empty() {
                centroids[c] = centroid(&members)?;
            }
        }
    }

    let inertia = embeddings
        .iter()
        .zip(assignments.iter())
        .map(|(e, &a)| cosine_distance(e, &centroids[a]))
        .sum();

    Ok(KMeansRun {
        assignments,
        centroids,
        inertia,
        iterations,
    })
}

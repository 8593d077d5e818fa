use serde::{Deserialize, Serialize};

use super::defaults;

/// How the cluster builder partitions the review set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartitionStrategy {
    /// K-means over a candidate count range; the knee selector picks the
    /// count. Produces an empty unclustered pool.
    FixedCount { min_count: usize, max_count: usize },
    /// HDBSCAN; low-density points are rejected as noise into the pool.
    DensityBased {
        min_cluster_size: usize,
        min_samples: usize,
    },
}

impl Default for PartitionStrategy {
    fn default() -> Self {
        Self::FixedCount {
            min_count: defaults::DEFAULT_MIN_COUNT,
            max_count: defaults::DEFAULT_MAX_COUNT,
        }
    }
}

/// Cluster builder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub strategy: PartitionStrategy,
    /// Fallback count when the quality curve is degenerate.
    pub fallback_count: usize,
    /// Apply the nonlinear dimensionality reduction before partitioning.
    pub reduce_dimensions: bool,
    /// Seed for k-means initialization and the projection.
    pub seed: u64,
    /// Lloyd-iteration cap for k-means.
    pub kmeans_max_iters: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            strategy: PartitionStrategy::default(),
            fallback_count: defaults::DEFAULT_FALLBACK_COUNT,
            reduce_dimensions: false,
            seed: defaults::DEFAULT_SEED,
            kmeans_max_iters: defaults::DEFAULT_KMEANS_MAX_ITERS,
        }
    }
}

impl ClusteringConfig {
    /// Convenience constructor for a density-based run.
    pub fn density(min_cluster_size: usize, min_samples: usize) -> Self {
        Self {
            strategy: PartitionStrategy::DensityBased {
                min_cluster_size,
                min_samples,
            },
            ..Self::default()
        }
    }
}

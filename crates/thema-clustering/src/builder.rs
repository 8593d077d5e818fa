//! Cluster builder: partitions the embedded review set into groups plus
//! an unclustered pool, per the configured strategy.
//!
//! Contract: every input review lands in exactly one output location.
//! Fixed-count partitions leave the pool empty; density-based partitions
//! reject low-density points into it as noise.

use std::collections::{BTreeMap, BTreeSet};

use hdbscan::{Hdbscan, HdbscanHyperParams};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use thema_core::config::{ClusteringConfig, PartitionStrategy};
use thema_core::constants::REDUCED_DIMENSIONS;
use thema_core::errors::{ClusterError, ThemaError, ThemaResult};
use thema_core::models::{Group, GroupId};
use thema_core::review::{ReviewCatalog, ReviewId};

use crate::geometry::{centroid, cosine_distance, l2_normalize, project_nonlinear};
use crate::kmeans::run_kmeans;
use crate::knee::select_count;

/// A freshly built partition: groups with geometry attached, plus the
/// noise pool (empty for fixed-count strategies).
#[derive(Debug, Clone)]
pub struct ClusterOutput {
    pub groups: BTreeMap<GroupId, Group>,
    pub pool: BTreeSet<ReviewId>,
}

/// Partition the catalog into groups according to `config`.
pub fn build_clusters(
    catalog: &ReviewCatalog,
    config: &ClusteringConfig,
) -> ThemaResult<ClusterOutput> {
    if catalog.is_empty() {
        return Err(ClusterError::EmptyInput {
            operation: "build_clusters".into(),
        }
        .into());
    }

    // BTreeMap iteration fixes the id order once for the whole build.
    let ids: Vec<&ReviewId> = catalog.keys().collect();
    let embeddings: Vec<&[f32]> = catalog.values().map(|r| r.embedding.as_slice()).collect();

    let dim = embeddings[0].len();
    for e in &embeddings {
        if e.len() != dim {
            return Err(ClusterError::DimensionMismatch {
                expected: dim,
                actual: e.len(),
            }
            .into());
        }
    }

    // Feature preparation: normalize, then optionally project. Features
    // drive partitioning only — group geometry below always comes from
    // the original embeddings.
    let mut features: Vec<Vec<f32>> = embeddings.iter().map(|e| l2_normalize(e)).collect();
    if config.reduce_dimensions {
        features = project_nonlinear(&features, REDUCED_DIMENSIONS, config.seed);
        debug!(dimensions = REDUCED_DIMENSIONS, "applied pre-partition projection");
    }

    let (clusters, noise) = match &config.strategy {
        PartitionStrategy::FixedCount {
            min_count,
            max_count,
        } => fixed_count_partition(&features, *min_count, *max_count, config)?,
        PartitionStrategy::DensityBased {
            min_cluster_size,
            min_samples,
        } => density_partition(&features, *min_cluster_size, *min_samples)?,
    };

    // Number groups by smallest member id so output is independent of
    // cluster label order.
    let mut member_sets: Vec<BTreeSet<ReviewId>> = clusters
        .into_iter()
        .map(|idxs| idxs.into_iter().map(|i| ids[i].clone()).collect())
        .collect();
    member_sets.sort_by(|a, b| a.first().cmp(&b.first()));

    let mut groups = BTreeMap::new();
    for (n, members) in member_sets.into_iter().enumerate() {
        let mut group = Group::new(GroupId(n as u64), members);
        refresh_geometry(&mut group, catalog)?;
        groups.insert(group.id, group);
    }

    let pool: BTreeSet<ReviewId> = noise.into_iter().map(|i| ids[i].clone()).collect();

    info!(
        groups = groups.len(),
        pooled = pool.len(),
        total = catalog.len(),
        "cluster build complete"
    );
    Ok(ClusterOutput { groups, pool })
}

/// Recompute a group's centroid and mean intra-group distance from the
/// catalog. Called on every membership change — derived geometry is never
/// allowed to go stale.
pub fn refresh_geometry(group: &mut Group, catalog: &ReviewCatalog) -> ThemaResult<()> {
    let mut vectors = Vec::with_capacity(group.members.len());
    for id in &group.members {
        let review = catalog.get(id).ok_or_else(|| ThemaError::PartitionViolation {
            details: format!("group {} references unknown review {id}", group.id),
        })?;
        vectors.push(review.embedding.as_slice());
    }

    group.centroid = centroid(&vectors)?;
    group.mean_distance = vectors
        .iter()
        .map(|v| cosine_distance(v, &group.centroid))
        .sum::<f64>()
        / vectors.len() as f64;
    Ok(())
}

/// K-means sweep over the candidate range, knee selection, final run at
/// the chosen count. Returns (clusters, noise) as index sets; noise is
/// always empty here.
fn fixed_count_partition(
    features: &[Vec<f32>],
    min_count: usize,
    max_count: usize,
    config: &ClusteringConfig,
) -> ThemaResult<(Vec<Vec<usize>>, Vec<usize>)> {
    let n = features.len();
    if n < 2 {
        return Err(ClusterError::InsufficientData { needed: 2, got: n }.into());
    }

    let lo = min_count.max(2);
    let hi = max_count.min(n);
    if lo > hi {
        return Err(ClusterError::InsufficientData {
            needed: min_count,
            got: n,
        }
        .into());
    }

    let chosen = if lo == hi {
        lo
    } else {
        let counts: Vec<usize> = (lo..=hi).collect();
        let inertias: Vec<f64> = counts
            .par_iter()
            .map(|&k| run_kmeans(features, k, config.kmeans_max_iters, config.seed).map(|r| r.inertia))
            .collect::<Result<_, _>>()?;

        let fallback = config.fallback_count.clamp(lo, hi);
        let outcome = select_count(&counts, &inertias, fallback)?;
        debug!(?outcome, "cluster count selected");
        outcome.count()
    };

    let run = run_kmeans(features, chosen, config.kmeans_max_iters, config.seed)?;

    let mut clusters: Vec<Vec<usize>> = vec![Vec::new(); run.centroids.len()];
    for (i, &a) in run.assignments.iter().enumerate() {
        clusters[a].push(i);
    }
    clusters.retain(|c| !c.is_empty());

    Ok((clusters, Vec::new()))
}

/// HDBSCAN partition; negative labels are noise. A failed clustering run
/// degrades to all-noise rather than failing the build.
fn density_partition(
    features: &[Vec<f32>],
    min_cluster_size: usize,
    min_samples: usize,
) -> ThemaResult<(Vec<Vec<usize>>, Vec<usize>)> {
    let n = features.len();
    if n < min_cluster_size {
        return Err(ClusterError::InsufficientData {
            needed: min_cluster_size,
            got: n,
        }
        .into());
    }

    let hyper_params = HdbscanHyperParams::builder()
        .min_cluster_size(min_cluster_size)
        .min_samples(min_samples)
        .build();

    let features_owned: Vec<Vec<f32>> = features.to_vec();
    let clusterer = Hdbscan::new(&features_owned, hyper_params);
    let labels = match clusterer.cluster() {
        Ok(l) => l,
        Err(e) => {
            warn!(error = ?e, "HDBSCAN failed; treating all points as noise");
            return Ok((Vec::new(), (0..n).collect()));
        }
    };

    let mut cluster_map: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    let mut noise = Vec::new();
    for (idx, &label) in labels.iter().enumerate() {
        if label < 0 {
            noise.push(idx);
        } else {
            cluster_map.entry(label).or_default().push(idx);
        }
    }

    Ok((cluster_map.into_values().collect(), noise))
}

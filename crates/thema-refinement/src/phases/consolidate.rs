//! Consolidating: propose merges between near-duplicate relevant groups
//! and splits of incohesive ones, judge each proposal, and apply the
//! accepted ones.
//!
//! Proposals are computed once from a snapshot taken at phase entry; a
//! group participates in at most one applied operation per iteration, so
//! an accepted merge never cascades into further merges or splits within
//! the same pass.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use thema_clustering::geometry::cosine_distance;
use thema_clustering::{build_clusters, refresh_geometry};
use thema_core::config::{ClusteringConfig, PartitionStrategy, ThemaConfig};
use thema_core::errors::{ClusterError, JudgeError, ThemaError, ThemaResult};
use thema_core::models::{AppliedOp, Group, GroupId, Provenance, RefinementState, Relevance};
use thema_core::review::ReviewCatalog;
use thema_core::traits::{Decision, Judge, MergeProposal, SplitProposal};

use super::{fan_out, PhaseStats};
use crate::retry::call_with_policy;

/// Proposal key. Derive order makes all merges sort before all splits, so
/// merge decisions are applied first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum OpKey {
    Merge(GroupId, GroupId),
    Split(GroupId),
}

struct Snapshot {
    id: GroupId,
    centroid: Vec<f32>,
    mean_distance: f64,
    size: usize,
    summary: String,
}

pub async fn run(
    state: &mut RefinementState,
    catalog: &ReviewCatalog,
    judge: &Arc<dyn Judge>,
    config: &ThemaConfig,
) -> ThemaResult<PhaseStats> {
    // Only relevant groups with a summary describing their present
    // membership are eligible. The snapshot is fixed for the whole phase.
    let snapshot: Vec<Snapshot> = state
        .relevant_groups()
        .filter(|g| g.summary_current())
        .map(|g| Snapshot {
            id: g.id,
            centroid: g.centroid.clone(),
            mean_distance: g.mean_distance,
            size: g.len(),
            summary: g.summary.as_ref().map(|s| s.text.clone()).unwrap_or_default(),
        })
        .collect();

    let refinement = &config.refinement;
    let mut tasks: Vec<(OpKey, BoxFuture<'static, Result<Decision, JudgeError>>)> = Vec::new();

    for (i, left) in snapshot.iter().enumerate() {
        for right in &snapshot[i + 1..] {
            let distance = cosine_distance(&left.centroid, &right.centroid);
            if distance >= refinement.merge_threshold {
                continue;
            }
            let proposal = MergeProposal {
                left: left.id,
                right: right.id,
                left_summary: left.summary.clone(),
                right_summary: right.summary.clone(),
                centroid_distance: distance,
            };
            let judge = Arc::clone(judge);
            let cfg = refinement.clone();
            tasks.push((
                OpKey::Merge(left.id, right.id),
                Box::pin(async move {
                    call_with_policy(&cfg, || judge.review_merge(&proposal)).await
                }),
            ));
        }
    }

    for snap in &snapshot {
        if snap.mean_distance <= refinement.split_threshold {
            continue;
        }
        let proposal = SplitProposal {
            group: snap.id,
            summary: snap.summary.clone(),
            mean_distance: snap.mean_distance,
            size: snap.size,
        };
        let judge = Arc::clone(judge);
        let cfg = refinement.clone();
        tasks.push((
            OpKey::Split(snap.id),
            Box::pin(async move {
                call_with_policy(&cfg, || judge.review_split(&proposal)).await
            }),
        ));
    }

    let mut stats = PhaseStats {
        calls: tasks.len(),
        ..PhaseStats::default()
    };
    let mut touched: BTreeSet<GroupId> = BTreeSet::new();

    for (key, result) in fan_out(tasks, refinement.max_concurrency).await {
        let decision = match result {
            Ok(d) => d,
            Err(JudgeError::Unavailable { reason }) => {
                stats.unavailable += 1;
                warn!(?key, %reason, "consolidation proposal dropped, judge unavailable");
                continue;
            }
            Err(e) => {
                // Conservative default: an unanswerable proposal is a
                // rejection.
                warn!(?key, error = %e, "consolidation proposal treated as rejected");
                continue;
            }
        };
        if !decision.is_accept() {
            debug!(?key, "proposal rejected");
            continue;
        }

        match key {
            OpKey::Merge(left, right) => {
                if touched.contains(&left) || touched.contains(&right) {
                    debug!(%left, %right, "merge skipped, group already consolidated this pass");
                    continue;
                }
                apply_merge(state, catalog, left, right)?;
                touched.insert(left);
                touched.insert(right);
                stats.accepted += 1;
            }
            OpKey::Split(source) => {
                if touched.contains(&source) {
                    debug!(%source, "split skipped, group already consolidated this pass");
                    continue;
                }
                if apply_split(state, catalog, source, &config.clustering)? {
                    touched.insert(source);
                    stats.accepted += 1;
                }
            }
        }
    }

    Ok(stats)
}

/// Replace `left` and `right` with a fresh group holding their union. The
/// new group has no summary yet, so the next iteration re-summarizes it.
fn apply_merge(
    state: &mut RefinementState,
    catalog: &ReviewCatalog,
    left: GroupId,
    right: GroupId,
) -> ThemaResult<()> {
    let a = state
        .groups
        .remove(&left)
        .ok_or_else(|| missing_group(left, "merge"))?;
    let b = match state.groups.remove(&right) {
        Some(b) => b,
        None => {
            state.groups.insert(left, a);
            return Err(missing_group(right, "merge"));
        }
    };

    let winner = state.allocate_group_id();
    let members = a.members.into_iter().chain(b.members).collect();
    let mut merged = Group::new(winner, members);
    merged.provenance = Provenance::Merged;
    merged.relevance = Relevance::Relevant;
    refresh_geometry(&mut merged, catalog)?;
    state.groups.insert(winner, merged);

    state.record(AppliedOp::Merged {
        winner,
        absorbed: vec![left, right],
    });
    debug!(%winner, %left, %right, "groups merged");
    Ok(())
}

/// Replace `source` with the groups produced by re-partitioning its
/// members into two. Returns false when the group is too small to split.
fn apply_split(
    state: &mut RefinementState,
    catalog: &ReviewCatalog,
    source: GroupId,
    clustering: &ClusteringConfig,
) -> ThemaResult<bool> {
    let group = state
        .groups
        .remove(&source)
        .ok_or_else(|| missing_group(source, "split"))?;

    let sub_catalog: ReviewCatalog = group
        .members
        .iter()
        .filter_map(|id| catalog.get(id).map(|r| (id.clone(), r.clone())))
        .collect();
    if sub_catalog.len() != group.members.len() {
        state.groups.insert(source, group);
        return Err(missing_group(source, "split"));
    }

    let sub_config = ClusteringConfig {
        strategy: PartitionStrategy::FixedCount {
            min_count: 2,
            max_count: 2,
        },
        reduce_dimensions: false,
        ..clustering.clone()
    };
    let output = match build_clusters(&sub_catalog, &sub_config) {
        Ok(o) => o,
        Err(ThemaError::ClusterError(ClusterError::InsufficientData { needed, got })) => {
            warn!(%source, needed, got, "split skipped, group too small to re-partition");
            state.groups.insert(source, group);
            return Ok(false);
        }
        Err(e) => {
            state.groups.insert(source, group);
            return Err(e);
        }
    };

    let mut replacements = Vec::with_capacity(output.groups.len());
    for (_, piece) in output.groups {
        let id = state.allocate_group_id();
        let mut replacement = Group::new(id, piece.members);
        replacement.provenance = Provenance::Split;
        refresh_geometry(&mut replacement, catalog)?;
        state.groups.insert(id, replacement);
        replacements.push(id);
    }

    state.record(AppliedOp::Split {
        source,
        replacements: replacements.clone(),
    });
    debug!(%source, ?replacements, "group split");
    Ok(true)
}

fn missing_group(id: GroupId, operation: &str) -> ThemaError {
    ThemaError::PartitionViolation {
        details: format!("group {id} vanished during {operation}"),
    }
}

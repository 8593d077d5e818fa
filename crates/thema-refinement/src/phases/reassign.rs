//! Reassigning: offer each pooled review to its nearest relevant group,
//! one judge decision per review.

use std::sync::Arc;

use tracing::{debug, warn};

use thema_clustering::geometry::cosine_distance;
use thema_clustering::refresh_geometry;
use thema_core::config::RefinementConfig;
use thema_core::errors::{JudgeError, ThemaError, ThemaResult};
use thema_core::models::{AppliedOp, GroupId, Provenance, RefinementState};
use thema_core::review::{ReviewCatalog, ReviewId};
use thema_core::traits::{Judge, ReassignProposal};

use super::{fan_out, PhaseStats};
use crate::retry::call_with_policy;

/// Propose every pending pooled review to its nearest relevant group.
///
/// Rejections (including timeouts and malformed verdicts) bump the
/// review's consecutive-rejection count; a review that reaches the
/// configured cap is marked unassignable and leaves the active pool.
pub async fn run(
    state: &mut RefinementState,
    catalog: &ReviewCatalog,
    judge: &Arc<dyn Judge>,
    config: &RefinementConfig,
) -> ThemaResult<PhaseStats> {
    // Targets are fixed at phase entry. Only relevant groups whose
    // summary describes their present membership are eligible, so every
    // proposal carries real evidence; a group reshaped earlier in the
    // iteration becomes a target again once it is re-summarized.
    let targets: Vec<(GroupId, Vec<f32>, String)> = state
        .relevant_groups()
        .filter(|g| g.summary_current())
        .map(|g| {
            (
                g.id,
                g.centroid.clone(),
                g.summary.as_ref().map(|s| s.text.clone()).unwrap_or_default(),
            )
        })
        .collect();
    if targets.is_empty() {
        return Ok(PhaseStats::default());
    }

    let mut tasks = Vec::new();
    let mut destinations = std::collections::BTreeMap::new();
    for id in state.pool.pending.keys() {
        let review = catalog.get(id).ok_or_else(|| ThemaError::PartitionViolation {
            details: format!("pooled review {id} missing from catalog"),
        })?;

        // Nearest centroid; ties break toward the smaller group id.
        let mut best: Option<(f64, GroupId, &str)> = None;
        for (gid, centroid, summary) in &targets {
            let d = cosine_distance(&review.embedding, centroid);
            if best.map_or(true, |(bd, _, _)| d < bd) {
                best = Some((d, *gid, summary.as_str()));
            }
        }
        let (distance, group, summary) = match best {
            Some(b) => b,
            None => continue,
        };
        destinations.insert(id.clone(), group);

        let proposal = ReassignProposal {
            review: id.clone(),
            title: review.review_title.clone(),
            body: review.review_details.clone(),
            group,
            group_summary: summary.to_string(),
            centroid_distance: distance,
        };
        let judge = Arc::clone(judge);
        let cfg = config.clone();
        tasks.push((id.clone(), async move {
            call_with_policy(&cfg, || judge.review_reassignment(&proposal)).await
        }));
    }

    let mut stats = PhaseStats {
        calls: tasks.len(),
        ..PhaseStats::default()
    };

    for (review_id, result) in fan_out(tasks, config.max_concurrency).await {
        let accepted = match result {
            Ok(decision) => decision.is_accept(),
            Err(JudgeError::Unavailable { reason }) => {
                stats.unavailable += 1;
                warn!(review = %review_id, %reason, "reassignment skipped, judge unavailable");
                continue;
            }
            Err(e) => {
                warn!(review = %review_id, error = %e, "reassignment treated as rejected");
                false
            }
        };

        if accepted {
            let group_id = *destinations.get(&review_id).ok_or_else(|| {
                ThemaError::PartitionViolation {
                    details: format!("no destination recorded for review {review_id}"),
                }
            })?;
            let group = state
                .groups
                .get_mut(&group_id)
                .ok_or_else(|| ThemaError::PartitionViolation {
                    details: format!("group {group_id} vanished during reassigning"),
                })?;
            group.members.insert(review_id.clone());
            group.provenance = Provenance::Reassigned;
            refresh_geometry(group, catalog)?;
            state.pool.remove(&review_id);
            state.record(AppliedOp::Reassigned {
                review: review_id.clone(),
                group: group_id,
            });
            stats.accepted += 1;
            debug!(review = %review_id, group = %group_id, "review reassigned");
        } else {
            reject(state, &review_id, config.max_reassign_attempts);
        }
    }

    Ok(stats)
}

fn reject(state: &mut RefinementState, review_id: &ReviewId, cap: u32) {
    if let Some(count) = state.pool.record_rejection(review_id) {
        if count >= cap {
            state.pool.mark_unassignable(review_id);
            state.record(AppliedOp::MarkedUnassignable {
                review: review_id.clone(),
            });
            debug!(review = %review_id, rejections = count, "review marked unassignable");
        }
    }
}

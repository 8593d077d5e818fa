//! Summarizing and Annotating: refresh stale group summaries from
//! representative evidence and apply the judge's relevance verdicts.

use std::sync::Arc;

use tracing::{debug, warn};

use thema_clustering::representatives;
use thema_core::config::RefinementConfig;
use thema_core::errors::{JudgeError, ThemaResult};
use thema_core::models::{AppliedOp, GroupSummary, Provenance, RefinementState, Relevance};
use thema_core::review::ReviewCatalog;
use thema_core::traits::{Judge, RepresentativeReview, SummaryRequest};

use super::{fan_out, PhaseStats};
use crate::retry::call_with_policy;

/// Summarize every group whose stored summary no longer matches its
/// membership, then annotate relevance from the verdicts.
///
/// Groups with a current summary are skipped without a judge call — the
/// phase is idempotent over unchanged memberships. A failed call leaves
/// its group stale; the next iteration retries it.
pub async fn run(
    state: &mut RefinementState,
    catalog: &ReviewCatalog,
    judge: &Arc<dyn Judge>,
    config: &RefinementConfig,
) -> ThemaResult<PhaseStats> {
    let mut tasks = Vec::new();
    for group in state.groups.values() {
        if group.summary_current() {
            continue;
        }

        let mut reps = Vec::new();
        for (id, _) in representatives(group, catalog, config.representatives)? {
            let review = catalog.get(&id).ok_or_else(|| {
                thema_core::ThemaError::PartitionViolation {
                    details: format!("group {} references unknown review {id}", group.id),
                }
            })?;
            reps.push(RepresentativeReview {
                id,
                title: review.review_title.clone(),
                body: review.review_details.clone(),
                rating: review.review_rating,
            });
        }
        let request = SummaryRequest {
            group: group.id,
            representatives: reps,
        };

        let judge = Arc::clone(judge);
        let config = config.clone();
        tasks.push((group.id, async move {
            call_with_policy(&config, || judge.summarize(&request)).await
        }));
    }

    let mut stats = PhaseStats {
        calls: tasks.len(),
        ..PhaseStats::default()
    };

    for (group_id, result) in fan_out(tasks, config.max_concurrency).await {
        match result {
            Ok(verdict) => {
                let group = state
                    .groups
                    .get_mut(&group_id)
                    .ok_or_else(|| thema_core::ThemaError::PartitionViolation {
                        details: format!("group {group_id} vanished during summarizing"),
                    })?;
                group.relevance = if verdict.relevant {
                    Relevance::Relevant
                } else {
                    Relevance::Irrelevant
                };
                group.summary = Some(GroupSummary {
                    text: verdict.summary,
                    relevant: verdict.relevant,
                    members_digest: group.members_digest(),
                });
                group.provenance = Provenance::Annotated;
                let relevance = group.relevance;
                state.record(AppliedOp::Summarized { group: group_id });
                state.record(AppliedOp::Annotated {
                    group: group_id,
                    relevance,
                });
                debug!(group = %group_id, ?relevance, "group summarized");
            }
            Err(JudgeError::Unavailable { reason }) => {
                stats.unavailable += 1;
                warn!(group = %group_id, %reason, "summarizing skipped, judge unavailable");
            }
            Err(e) => {
                warn!(group = %group_id, error = %e, "summarizing failed, group stays stale");
            }
        }
    }

    Ok(stats)
}

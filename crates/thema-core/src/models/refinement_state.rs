use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::{ThemaError, ThemaResult};
use crate::review::{ReviewCatalog, ReviewId};

use super::group::{Group, GroupId, Relevance};
use super::pool::UnclusteredPool;

/// One applied refinement operation. The log makes a run auditable and a
/// serialized state resumable without replaying judge calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AppliedOp {
    Summarized { group: GroupId },
    Annotated { group: GroupId, relevance: Relevance },
    Merged { winner: GroupId, absorbed: Vec<GroupId> },
    Split { source: GroupId, replacements: Vec<GroupId> },
    Reassigned { review: ReviewId, group: GroupId },
    MarkedUnassignable { review: ReviewId },
}

/// Why a refinement run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Termination {
    Converged,
    MaxIterationsReached,
    Aborted { detail: String },
}

/// The orchestrator's working state: groups, pool, iteration counter,
/// operation log, and termination reason.
///
/// Mutated once per loop iteration; immutable once `termination` is set.
/// Fully serializable so a cancelled run resumes from its last
/// fully-applied phase boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementState {
    pub groups: BTreeMap<GroupId, Group>,
    pub pool: UnclusteredPool,
    pub iteration: u32,
    pub op_log: Vec<AppliedOp>,
    pub termination: Option<Termination>,
    next_group_id: u64,
}

impl RefinementState {
    pub fn new(groups: BTreeMap<GroupId, Group>, pool: UnclusteredPool) -> Self {
        let next_group_id = groups.keys().map(|g| g.0 + 1).max().unwrap_or(0);
        Self {
            groups,
            pool,
            iteration: 0,
            op_log: Vec::new(),
            termination: None,
            next_group_id,
        }
    }

    /// Allocate the next sequential group id.
    pub fn allocate_group_id(&mut self) -> GroupId {
        let id = GroupId(self.next_group_id);
        self.next_group_id += 1;
        id
    }

    pub fn is_terminal(&self) -> bool {
        self.termination.is_some()
    }

    pub fn record(&mut self, op: AppliedOp) {
        self.op_log.push(op);
    }

    /// Groups currently flagged relevant, in id order.
    pub fn relevant_groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values().filter(|g| g.is_relevant())
    }

    /// Verify the strict partition invariant against the original catalog:
    /// every review id appears in exactly one group, or in the pending
    /// pool, or in the unassignable set — no duplicates, no losses.
    pub fn verify_partition(&self, catalog: &ReviewCatalog) -> ThemaResult<()> {
        let mut seen: BTreeSet<&ReviewId> = BTreeSet::new();

        let members = self.groups.values().flat_map(|g| g.members.iter());
        let pooled = self.pool.pending.keys().chain(self.pool.unassignable.iter());

        for id in members.chain(pooled) {
            if !catalog.contains_key(id) {
                return Err(ThemaError::PartitionViolation {
                    details: format!("unknown review {id} present in state"),
                });
            }
            if !seen.insert(id) {
                return Err(ThemaError::PartitionViolation {
                    details: format!("review {id} appears more than once"),
                });
            }
        }

        if seen.len() != catalog.len() {
            let missing: Vec<String> = catalog
                .keys()
                .filter(|id| !seen.contains(id))
                .map(|id| id.to_string())
                .collect();
            return Err(ThemaError::PartitionViolation {
                details: format!("{} reviews lost: {}", missing.len(), missing.join(", ")),
            });
        }
        Ok(())
    }
}

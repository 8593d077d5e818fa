use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::review::ReviewId;

/// Reviews not currently assigned to any group.
///
/// `pending` maps each pooled review to its count of *consecutive* judge
/// rejections; a review that crosses the configured attempt cap moves to
/// `unassignable`, where it is retained for the final report — deferred,
/// never dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnclusteredPool {
    pub pending: BTreeMap<ReviewId, u32>,
    pub unassignable: BTreeSet<ReviewId>,
}

impl UnclusteredPool {
    pub fn new(ids: impl IntoIterator<Item = ReviewId>) -> Self {
        Self {
            pending: ids.into_iter().map(|id| (id, 0)).collect(),
            unassignable: BTreeSet::new(),
        }
    }

    /// Total reviews still tracked by the pool, unassignable included.
    pub fn len(&self) -> usize {
        self.pending.len() + self.unassignable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.unassignable.is_empty()
    }

    /// True when refinement has nothing left to place: the pool is empty
    /// or every remaining member is explicitly unassignable.
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove an accepted review from the pool.
    pub fn remove(&mut self, id: &ReviewId) -> bool {
        self.pending.remove(id).is_some()
    }

    /// Record a judge rejection. Returns the new consecutive count, or
    /// `None` if the review is not pending.
    pub fn record_rejection(&mut self, id: &ReviewId) -> Option<u32> {
        let count = self.pending.get_mut(id)?;
        *count += 1;
        Some(*count)
    }

    /// Move a review out of the active pool after exhausting its attempts.
    pub fn mark_unassignable(&mut self, id: &ReviewId) -> bool {
        if self.pending.remove(id).is_some() {
            self.unassignable.insert(id.clone());
            true
        } else {
            false
        }
    }
}

//! Refinement phases. Each phase fans judge calls out concurrently under
//! the configured worker limit, then applies results sequentially in key
//! order so the resulting state is independent of completion order.

pub mod consolidate;
pub mod reassign;
pub mod summarize;

use std::future::Future;

use futures::stream::{self, StreamExt};

/// What a phase did, as seen by the orchestrator's convergence and outage
/// checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseStats {
    /// Judge calls issued (after per-call retry resolution).
    pub calls: usize,
    /// Calls that ended `Unavailable` with retries exhausted.
    pub unavailable: usize,
    /// Structural changes applied: merges, splits, and reassignments.
    /// Summaries and annotations do not count.
    pub accepted: usize,
}

impl PhaseStats {
    /// True when the judge was reached for none of the issued calls.
    pub fn total_outage(&self) -> bool {
        self.calls > 0 && self.unavailable == self.calls
    }
}

/// Drive `tasks` with at most `limit` in flight, then return the results
/// sorted by key. Completion order never leaks into the output.
pub(crate) async fn fan_out<K, T, Fut>(tasks: Vec<(K, Fut)>, limit: usize) -> Vec<(K, T)>
where
    K: Ord,
    Fut: Future<Output = T>,
{
    let mut results: Vec<(K, T)> = stream::iter(
        tasks
            .into_iter()
            .map(|(key, fut)| async move { (key, fut.await) }),
    )
    .buffer_unordered(limit.max(1))
    .collect()
    .await;

    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}

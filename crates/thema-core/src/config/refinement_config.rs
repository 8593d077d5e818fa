use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;
use crate::constants::DEFAULT_REPRESENTATIVES;

/// Refinement orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementConfig {
    /// Iteration cap for the refinement loop.
    pub max_iterations: u32,
    /// Centroid distance below which two relevant groups are proposed for
    /// a merge.
    pub merge_threshold: f64,
    /// Mean intra-group distance above which a group is proposed for a
    /// split.
    pub split_threshold: f64,
    /// Consecutive rejections before a pooled review is unassignable.
    pub max_reassign_attempts: u32,
    /// Bounded worker limit for concurrent judge calls within a phase.
    pub max_concurrency: usize,
    /// Per-call judge timeout, seconds.
    pub judge_timeout_secs: u64,
    /// Retry cap for transient judge unavailability.
    pub judge_retries: u32,
    /// Base backoff between retries, milliseconds (doubles per attempt).
    pub retry_backoff_ms: u64,
    /// Representative reviews passed to the judge as evidence.
    pub representatives: usize,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            max_iterations: defaults::DEFAULT_MAX_ITERATIONS,
            merge_threshold: defaults::DEFAULT_MERGE_THRESHOLD,
            split_threshold: defaults::DEFAULT_SPLIT_THRESHOLD,
            max_reassign_attempts: defaults::DEFAULT_MAX_REASSIGN_ATTEMPTS,
            max_concurrency: defaults::DEFAULT_MAX_CONCURRENCY,
            judge_timeout_secs: defaults::DEFAULT_JUDGE_TIMEOUT_SECS,
            judge_retries: defaults::DEFAULT_JUDGE_RETRIES,
            retry_backoff_ms: defaults::DEFAULT_RETRY_BACKOFF_MS,
            representatives: DEFAULT_REPRESENTATIVES,
        }
    }
}

impl RefinementConfig {
    pub fn judge_timeout(&self) -> Duration {
        Duration::from_secs(self.judge_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

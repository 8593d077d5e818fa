//! Default values for tunable parameters. Merge and split thresholds and
//! the reassignment cap are configuration, not hard-coded constants;
//! these are the documented defaults.

/// Fallback group count when the quality curve is degenerate.
pub const DEFAULT_FALLBACK_COUNT: usize = 3;

/// Candidate count range for the fixed-count strategy.
pub const DEFAULT_MIN_COUNT: usize = 2;
pub const DEFAULT_MAX_COUNT: usize = 50;

/// Minimum group size for the density-based strategy.
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 2;

/// Neighborhood size (min samples) for the density-based strategy.
pub const DEFAULT_MIN_SAMPLES: usize = 1;

/// RNG seed for k-means initialization and the optional projection.
pub const DEFAULT_SEED: u64 = 42;

/// Lloyd-iteration cap for k-means.
pub const DEFAULT_KMEANS_MAX_ITERS: usize = 64;

/// Iteration cap for the refinement loop.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Centroid cosine distance below which two relevant groups become a
/// merge proposal.
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.15;

/// Mean intra-group cosine distance above which a group becomes a split
/// proposal.
pub const DEFAULT_SPLIT_THRESHOLD: f64 = 0.35;

/// Consecutive rejections before a pooled review is marked unassignable.
pub const DEFAULT_MAX_REASSIGN_ATTEMPTS: u32 = 3;

/// Bounded worker limit for concurrent judge calls within a phase.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Per-call judge timeout, seconds.
pub const DEFAULT_JUDGE_TIMEOUT_SECS: u64 = 30;

/// Retry cap for transient judge unavailability.
pub const DEFAULT_JUDGE_RETRIES: u32 = 3;

/// Base backoff between judge retries, milliseconds (doubles per attempt).
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;

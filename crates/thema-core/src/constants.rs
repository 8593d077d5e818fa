/// Thema system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of representative reviews shown to the judge and in reports.
pub const DEFAULT_REPRESENTATIVES: usize = 5;

/// Consecutive iterations of total judge outage before the run aborts.
pub const JUDGE_OUTAGE_ITERATIONS: u32 = 2;

/// Rating scale bounds for review records.
pub const MIN_RATING: f32 = 1.0;
pub const MAX_RATING: f32 = 5.0;

/// Target dimensionality for the optional pre-partition projection.
pub const REDUCED_DIMENSIONS: usize = 32;

/// Errors from geometry utilities and the cluster builder.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("empty input: {operation} requires at least one vector")]
    EmptyInput { operation: String },

    #[error("insufficient data: {needed} reviews required, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("clustering failed: {reason}")]
    ClusteringFailed { reason: String },
}

//! Error taxonomy for the thema workspace.
//!
//! Each concern has its own thiserror enum; `ThemaError` aggregates them
//! with `#[from]` conversions so call sites can use `?` freely.

mod cluster_error;
mod embedding_error;
mod judge_error;

pub use cluster_error::ClusterError;
pub use embedding_error::EmbeddingError;
pub use judge_error::JudgeError;

/// Convenience alias used across the workspace.
pub type ThemaResult<T> = Result<T, ThemaError>;

/// Top-level error type for the thema engine.
#[derive(Debug, thiserror::Error)]
pub enum ThemaError {
    #[error("clustering error: {0}")]
    ClusterError(#[from] ClusterError),

    #[error("judge error: {0}")]
    JudgeError(#[from] JudgeError),

    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("refinement already in progress")]
    AlreadyRunning,

    #[error("partition invariant violated: {details}")]
    PartitionViolation { details: String },

    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

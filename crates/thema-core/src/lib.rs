//! # thema-core
//!
//! Foundation crate for the thema review-clustering engine.
//! Defines all types, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod review;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::{ClusteringConfig, PartitionStrategy, RefinementConfig, ThemaConfig};
pub use errors::{ThemaError, ThemaResult};
pub use models::{
    AppliedOp, Group, GroupId, GroupSummary, Provenance, RefinementState, Relevance, Termination,
    UnclusteredPool,
};
pub use review::{Review, ReviewCatalog, ReviewId};

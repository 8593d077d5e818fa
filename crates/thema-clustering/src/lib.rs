//! # thema-clustering
//!
//! Partitions embedded reviews into groups: geometry utilities, knee-point
//! cluster-count selection, seeded k-means (fixed-count) and HDBSCAN
//! (density-based) builders, and the representative selector.

pub mod builder;
pub mod geometry;
pub mod kmeans;
pub mod knee;
pub mod representatives;

pub use builder::{build_clusters, refresh_geometry, ClusterOutput};
pub use knee::{select_count, KneeOutcome};
pub use representatives::representatives;

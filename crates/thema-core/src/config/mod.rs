//! Configuration structs: every tunable of the engine, serde-derived
//! with defaults, loadable from TOML.

pub mod clustering_config;
pub mod defaults;
pub mod refinement_config;

pub use clustering_config::{ClusteringConfig, PartitionStrategy};
pub use refinement_config::RefinementConfig;

use serde::{Deserialize, Serialize};

use crate::errors::{ThemaError, ThemaResult};

/// Top-level configuration for a thema run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemaConfig {
    pub clustering: ClusteringConfig,
    pub refinement: RefinementConfig,
}

impl ThemaConfig {
    /// Parse a TOML document into a config, falling back to defaults for
    /// every omitted field.
    pub fn from_toml(text: &str) -> ThemaResult<Self> {
        toml::from_str(text).map_err(|e| ThemaError::ConfigError {
            reason: e.to_string(),
        })
    }
}

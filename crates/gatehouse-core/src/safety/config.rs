//! Protected-resource configuration loading.
//!
//! Resources live in a TOML document loaded once at startup and merged over
//! the built-in [`ProtectedResourceSet::standard`] catalogue. The list is
//! not mutable at runtime.
//!
//! ```toml
//! [[resource]]
//! identifier = "pve2"
//! kind = "node"
//! dependents = ["backup jobs"]
//!
//! [[resource]]
//! identifier = "211"
//! kind = "vmid"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::domain::{GatewayError, Result};

use super::resource::{ProtectedResource, ProtectedResourceSet};

#[derive(Debug, Deserialize)]
struct ResourceConfigFile {
    #[serde(default)]
    resource: Vec<ProtectedResource>,
}

impl ProtectedResourceSet {
    /// Parse a TOML resource config.
    ///
    /// Empty identifiers and unknown kinds are fatal — a half-loaded
    /// protection list is worse than a startup failure.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let parsed: ResourceConfigFile = toml::from_str(input)
            .map_err(|e| GatewayError::InvalidResourceConfig(e.to_string()))?;
        for resource in &parsed.resource {
            if resource.identifier.trim().is_empty() {
                return Err(GatewayError::InvalidResourceConfig(
                    "resource with empty identifier".to_string(),
                ));
            }
        }
        Ok(Self {
            resources: parsed.resource,
        })
    }

    /// Load a TOML resource config from disk and merge it over the standard
    /// catalogue.
    pub fn load(path: &Path) -> Result<Self> {
        let input = std::fs::read_to_string(path)?;
        let loaded = Self::from_toml_str(&input)?;
        let mut set = Self::standard();
        set.extend(loaded);
        Ok(set)
    }
}

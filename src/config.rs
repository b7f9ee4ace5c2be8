//! Startup configuration: relation catalog plus resolver settings.
//!
//! Loaded once, validated, then shared read-only (usually behind an `Arc`).
//! Every section is optional; omitted sections take the built-in defaults.
//!
//! ```toml
//! [resolver]
//! max_passes = 32
//! support_gain = 1.0
//!
//! [[catalog.supports]]
//! name = "Accid-Note"
//! source = "Accidental"
//! target = "Head"
//! layout = { type = "SourceLeftOfTarget" }
//!
//! [catalog.supports.connection]
//! x_in_gap_max = 0.2
//! x_out_gap_max = 2.0
//! y_gap_max = 0.4
//! in_weights = { x = 1.0, y = 4.0 }
//! out_weights = { x = 1.0, y = 4.0 }
//! target_coeff = 0.0
//! ```

use std::path::Path;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::RelationCatalog;
use crate::resolver::ResolverConfig;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SigConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub catalog: RelationCatalog,
}

impl SigConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SigConfig =
            toml::from_str(content).map_err(|e| Error::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: SigConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json` file, or TOML for any other extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            _ => Self::from_toml_str(&content)?,
        };
        debug!(
            path = %path.display(),
            supports = config.catalog.supports.len(),
            exclusions = config.catalog.exclusions.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.resolver.validate()?;
        self.catalog.validate()
    }
}

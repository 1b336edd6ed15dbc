//! Engine configuration.
//!
//! Stored as a JSON object on disk; every field is optional:
//! ```json
//! {
//!   "pass_threshold": 10.0,
//!   "compensation_threshold": 10.0,
//!   "scale_max": 20.0,
//!   "table": { "bands": [ { "lower_bound": 0, "upper_bound": 7, "letter": "F", "gpa": 0.0 } ] }
//! }
//! ```

use crate::engine::equivalence::EquivalenceTable;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV: &str = "TRANSCRIPT_CONFIG";

/// Thresholds and equivalence table used by every conversion.
///
/// Built once at start-up and shared read-only between requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum grade for a course to earn its credits directly.
    pub pass_threshold: f64,
    /// Minimum weighted average for failed courses to be compensated.
    pub compensation_threshold: f64,
    /// Top of the grading scale.
    pub scale_max: f64,
    pub table: EquivalenceTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pass_threshold: 10.0,
            compensation_threshold: 10.0,
            scale_max: 20.0,
            table: EquivalenceTable::french_default(),
        }
    }
}

impl EngineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid config '{}'", path.display()))?;
        info!(path = %path.display(), bands = config.table.bands().len(), "Engine config loaded");
        Ok(config)
    }

    /// Loads from `path` if given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

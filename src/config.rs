//! Tunables for the state aggregator and render model.
//!
//! Mirrors `mash-installer`'s small `Config` struct: a plain data holder
//! constructed with sensible defaults, optionally overridden from a TOML
//! file on disk. None of these values change the *meaning* of a parsed
//! line, only the aggregator's time-based policies (spec §4.2, §9).

use crate::errors::{ProgressError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How long an aggregate per-operation speed remains "fresh" (spec §3).
pub const DEFAULT_SPEED_FRESHNESS_SECS: f64 = 2.0;
/// How long a completed file stays visible after its last update (spec §4.2).
pub const DEFAULT_COMPLETED_GRACE_SECS: f64 = 0.5;
/// How long an idle, incomplete file is tolerated before eviction (spec §4.2).
pub const DEFAULT_IDLE_EVICTION_SECS: f64 = 30.0;
/// Minimum time a summary widget is held before transitioning to file-list mode (spec §4.3).
pub const DEFAULT_SUMMARY_HOLD_SECS: f64 = 0.5;
/// Summary widget mutation throttle (spec §4.3).
pub const DEFAULT_SUMMARY_THROTTLE_SECS: f64 = 0.1;
/// Minimum time the render model holds a "BSA building" interpretation (spec §4.3).
pub const DEFAULT_BSA_HOLD_SECS: f64 = 1.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub speed_freshness_secs: f64,
    pub completed_grace_secs: f64,
    pub idle_eviction_secs: f64,
    pub summary_hold_secs: f64,
    pub summary_throttle_secs: f64,
    pub bsa_hold_secs: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            speed_freshness_secs: DEFAULT_SPEED_FRESHNESS_SECS,
            completed_grace_secs: DEFAULT_COMPLETED_GRACE_SECS,
            idle_eviction_secs: DEFAULT_IDLE_EVICTION_SECS,
            summary_hold_secs: DEFAULT_SUMMARY_HOLD_SECS,
            summary_throttle_secs: DEFAULT_SUMMARY_THROTTLE_SECS,
            bsa_hold_secs: DEFAULT_BSA_HOLD_SECS,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|source| ProgressError::ConfigLoad {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.speed_freshness_secs, 2.0);
        assert_eq!(cfg.completed_grace_secs, 0.5);
        assert_eq!(cfg.idle_eviction_secs, 30.0);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.toml");
        std::fs::write(&path, "idle_eviction_secs = 60.0\n").unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.idle_eviction_secs, 60.0);
        assert_eq!(cfg.speed_freshness_secs, 2.0);
    }
}

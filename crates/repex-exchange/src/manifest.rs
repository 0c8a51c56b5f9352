use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use repex_core::errors::ErrorInfo;
use repex_core::RepexError;
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;

/// Structured manifest describing a completed or aborted run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// UTC timestamp at which the manifest was emitted.
    #[serde(default)]
    pub written_at: String,
    /// Configuration used for the run.
    pub config: RunConfig,
    /// Master seed used to derive exchange substreams.
    pub master_seed: u64,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// Cycles fully completed before the run ended.
    pub cycles_completed: usize,
    /// Exchange decisions that produced a swap.
    pub exchanges_performed: usize,
    /// History file produced during the run (relative to run directory).
    pub history_file: Option<PathBuf>,
    /// Execution profile file (relative to run directory).
    pub profile_file: Option<PathBuf>,
}

impl RunManifest {
    /// Current UTC timestamp in the format used by `written_at`.
    pub fn timestamp_now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Writes the manifest to a JSON file, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), RepexError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                RepexError::Serde(
                    ErrorInfo::new("manifest-mkdir", err.to_string())
                        .with_context("path", parent.display().to_string()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            RepexError::Serde(
                ErrorInfo::new("manifest-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            RepexError::Serde(
                ErrorInfo::new("manifest-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, RepexError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            RepexError::Serde(
                ErrorInfo::new("manifest-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            RepexError::Serde(
                ErrorInfo::new("manifest-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}

//! Persisted version stamp.
//!
//! A small JSON record of the last successfully extracted/activated engine
//! version. Read by the extraction skip check; written only after a
//! successful extraction or activation.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::device_abi;

/// Errors loading or saving the stamp.
#[derive(Debug, Error)]
pub enum StampError {
    /// I/O failure reading or writing the stamp file.
    #[error("Stamp I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stamp file exists but is not valid JSON.
    #[error("Stamp parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Record of the last successfully materialized engine version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStamp {
    /// Engine library version.
    pub version: u32,
    /// Device ABI the payload was extracted for.
    pub abi: String,
    /// When the stamp was written.
    pub activated_at: DateTime<Utc>,
}

impl VersionStamp {
    /// Create a stamp for the current device ABI.
    #[must_use]
    pub fn new(version: u32) -> Self {
        Self {
            version,
            abi: device_abi().to_string(),
            activated_at: Utc::now(),
        }
    }

    /// Load the stamp, returning `Ok(None)` when none has been written yet.
    pub fn load(path: &Path) -> Result<Option<Self>, StampError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Persist the stamp.
    pub fn save(&self, path: &Path) -> Result<(), StampError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        tracing::debug!(path = %path.display(), version = self.version, "Version stamp saved");
        Ok(())
    }

    /// Whether this stamp covers `version` on the current device ABI.
    #[must_use]
    pub fn matches(&self, version: u32) -> bool {
        self.version == version && self.abi == device_abi()
    }
}

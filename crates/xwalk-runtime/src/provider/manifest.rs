//! Engine manifest - version facts shipped next to the engine library.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use xwalk_core::ProviderError;

/// Manifest file name inside an engine directory.
pub const MANIFEST_FILE: &str = "engine.json";

/// Version facts and library identity declared by an engine package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineManifest {
    /// File name of the engine library inside the same directory.
    pub library: String,
    /// The engine's declared library API version.
    pub library_version: u32,
    /// The oldest host API version this engine still supports.
    pub min_host_version: u32,
    /// Hex SHA-256 digest of the library file; present in shared packages,
    /// absent for the embedded payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl EngineManifest {
    /// Load a manifest from `path`.
    ///
    /// A missing file reads as "no engine here"; an unreadable or
    /// malformed file is reported as an invalid manifest.
    pub fn load(path: &Path) -> Result<Self, ProviderError> {
        if !path.exists() {
            return Err(ProviderError::not_found(format!(
                "no engine manifest at {}",
                path.display()
            )));
        }
        let raw = fs::read_to_string(path).map_err(|e| ProviderError::InvalidManifest {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ProviderError::InvalidManifest {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }

    /// Persist the manifest; used by packaging tooling and tests.
    pub fn save(&self, path: &Path) -> Result<(), ProviderError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            ProviderError::InvalidManifest {
                path: path.display().to_string(),
                detail: e.to_string(),
            }
        })?;
        fs::write(path, json).map_err(|e| ProviderError::InvalidManifest {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }
}

//! Path resolution for the per-application runtime data root.
//!
//! Provides semantic errors for path operations without exposing
//! adapter-specific concerns.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the system data directory.
    #[error("Cannot determine system data directory")]
    NoDataDir,

    /// An empty application id was provided.
    #[error("Application id cannot be empty")]
    EmptyAppId,
}

/// Resolve the per-application data root.
///
/// The extracted engine payload, version stamp and downloaded artifacts all
/// live under this directory, namespaced by `app_id`.
pub fn data_root(app_id: &str) -> Result<PathBuf, PathError> {
    if app_id.is_empty() {
        return Err(PathError::EmptyAppId);
    }
    let base = dirs::data_dir().ok_or(PathError::NoDataDir)?;
    Ok(base.join(app_id).join("xwalk"))
}

/// Private directory holding the extracted engine libraries.
///
/// Mutated only by the extractor, and only while the acquisition slot is
/// held.
#[must_use]
pub fn library_dir(root: &Path) -> PathBuf {
    root.join("lib")
}

/// Directory for in-flight engine downloads.
#[must_use]
pub fn download_dir(root: &Path) -> PathBuf {
    root.join("downloads")
}

/// Location of the persisted version stamp.
#[must_use]
pub fn stamp_path(root: &Path) -> PathBuf {
    root.join("runtime-stamp.json")
}

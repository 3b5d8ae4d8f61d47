//! Runtime library status, acquisition mode and version compatibility.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Outcome of the engine version-compatibility check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryStatus {
    /// The located engine satisfies both version constraints.
    Matched,
    /// No engine could be located, or the load probe failed.
    NotFound,
    /// The located package failed its integrity/signature check.
    SignatureCheckError,
    /// The engine requires a newer host than this application.
    NewerVersion,
    /// The engine is older than the host's minimum requirement.
    OlderVersion,
}

impl LibraryStatus {
    /// Convert to string representation for logs and persistence.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::NotFound => "not_found",
            Self::SignatureCheckError => "signature_check_error",
            Self::NewerVersion => "newer_version",
            Self::OlderVersion => "older_version",
        }
    }

    /// Whether the updater can remediate this status.
    ///
    /// A signature failure never self-heals; only a fresh resolution can
    /// clear it.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::NewerVersion | Self::OlderVersion
        )
    }
}

impl std::fmt::Display for LibraryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the engine was (or will be) obtained.
///
/// Set once per coordinator lifetime after a successful location; it does
/// not change without a full reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    /// The engine ships inside the host application itself.
    Embedded,
    /// The engine is installed as a separate, independently updated package.
    Shared,
    /// The engine was fetched on demand from a configured URL.
    Download,
}

impl AcquisitionMode {
    /// Display name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::Shared => "shared",
            Self::Download => "download",
        }
    }
}

impl std::fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Version facts declared by a located engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineDescriptor {
    /// Where this engine came from.
    pub mode: AcquisitionMode,
    /// The engine's declared library API version.
    pub library_version: u32,
    /// The oldest host API version this engine still supports.
    pub min_host_version: u32,
    /// Directory the engine was resolved from, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_path: Option<PathBuf>,
}

/// Version facts compiled into the host application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRequirements {
    /// The newest engine API version the host understands.
    pub api_version: u32,
    /// The oldest engine the host accepts.
    pub min_engine_version: u32,
    /// Version of the engine payload bundled with the application, used by
    /// the extraction stamp check.
    pub bundled_version: u32,
}

/// Classify a located engine against the host's requirements.
///
/// `OlderVersion` is checked before `NewerVersion`; for a malformed
/// configuration where both constraints fail, the older-engine remedy
/// (update the engine) wins.
#[must_use]
pub const fn classify_compatibility(
    host: &HostRequirements,
    engine: &EngineDescriptor,
) -> LibraryStatus {
    if host.min_engine_version > engine.library_version {
        LibraryStatus::OlderVersion
    } else if host.api_version < engine.min_host_version {
        LibraryStatus::NewerVersion
    } else {
        LibraryStatus::Matched
    }
}

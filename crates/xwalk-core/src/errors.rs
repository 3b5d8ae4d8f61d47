//! Error types for the acquisition pipeline.
//!
//! These errors are designed to be serializable so they can ride inside
//! [`crate::events::ActivationEvent`] without depending on non-serializable
//! types like `std::io::Error`; I/O failures are captured as kind + message
//! strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runtime::LibraryStatus;

/// Error type for bundle extraction.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExtractError {
    /// The compressed stream ended before the full container header.
    #[error("Compressed header too short: got {got} bytes, need {need}")]
    HeaderTooShort {
        /// Bytes actually available.
        got: u64,
        /// Bytes the header requires.
        need: u64,
    },

    /// The LZMA payload could not be decoded.
    #[error("LZMA decode failed for {resource}: {message}")]
    DecodeFailed {
        /// Resource being extracted.
        resource: String,
        /// Decoder error message.
        message: String,
    },

    /// A mandatory compressed resource is missing from the bundle.
    #[error("Missing bundle resource: {name}")]
    MissingResource {
        /// Name of the missing resource.
        name: String,
    },

    /// I/O error during extraction.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g. "NotFound", "PermissionDenied").
        kind: String,
        /// Detailed error message.
        message: String,
    },

    /// Extraction was cancelled by the caller.
    #[error("Extraction cancelled")]
    Cancelled,
}

impl ExtractError {
    /// Create an I/O error from a `std::io::Error`.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    /// Create a decode error for a resource.
    pub fn decode(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DecodeFailed {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Error type for engine download/update operations.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum DownloadError {
    /// Network/HTTP error during download.
    #[error("Network error: {message}")]
    Network {
        /// Detailed error message.
        message: String,
        /// HTTP status code if available.
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },

    /// The target storage device disappeared mid-transfer.
    #[error("Storage device not found: {message}")]
    DeviceNotFound {
        /// Platform-reported reason.
        message: String,
    },

    /// Not enough space to store the artifact.
    #[error("Insufficient space: {message}")]
    InsufficientSpace {
        /// Platform-reported reason.
        message: String,
    },

    /// The transfer stayed paused past the configured poll budget.
    #[error("Download stalled: paused for {paused_polls} polls")]
    StalledTimeout {
        /// Paused polls observed before giving up.
        paused_polls: u32,
    },

    /// Download was cancelled by the caller.
    #[error("Download cancelled")]
    Cancelled,

    /// I/O error while writing the artifact.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error.
        kind: String,
        /// Detailed error message.
        message: String,
    },

    /// General/uncategorized error.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl DownloadError {
    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a network error with HTTP status code.
    pub fn network_with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Network {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create an I/O error from a `std::io::Error`.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if retrying the download could succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::StalledTimeout { .. } | Self::Io { .. }
        )
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Error type for engine provider resolution and initialization.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProviderError {
    /// No engine package could be resolved.
    #[error("Engine not found: {detail}")]
    NotFound {
        /// What was looked for and where.
        detail: String,
    },

    /// The engine manifest was unreadable or malformed.
    #[error("Invalid engine manifest at {path}: {detail}")]
    InvalidManifest {
        /// Manifest location.
        path: String,
        /// Parse/read failure detail.
        detail: String,
    },

    /// The package contents do not match the declared signature.
    #[error("Package signature mismatch: expected {expected}, got {actual}")]
    SignatureMismatch {
        /// Digest declared by the manifest.
        expected: String,
        /// Digest computed over the package library.
        actual: String,
    },

    /// The library-load probe failed.
    #[error("Library load probe failed: {detail}")]
    LoadFailed {
        /// Loader error detail.
        detail: String,
    },

    /// A required engine entry point is missing from the library.
    #[error("Missing engine symbol: {symbol}")]
    MissingSymbol {
        /// Name of the unresolved symbol.
        symbol: String,
    },

    /// Engine initialization failed after a successful load.
    #[error("Engine initialization failed: {detail}")]
    InitFailed {
        /// Initialization failure detail.
        detail: String,
    },
}

impl ProviderError {
    /// Create a not-found error.
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound {
            detail: detail.into(),
        }
    }

    /// Map this error to the library status it classifies as.
    ///
    /// Signature mismatches are the only non-`NotFound` classification; any
    /// other resolution or probe failure reads as an absent engine.
    #[must_use]
    pub const fn library_status(&self) -> LibraryStatus {
        match self {
            Self::SignatureMismatch { .. } => LibraryStatus::SignatureCheckError,
            _ => LibraryStatus::NotFound,
        }
    }
}

/// Terminal activation failure surfaced to the embedding application.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivationError {
    /// Bundle extraction failed.
    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// Engine download failed.
    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    /// Engine provider failed during docking or activation.
    #[error("Provider failed: {0}")]
    Provider(#[from] ProviderError),

    /// No compatible engine could be obtained.
    #[error("No compatible engine: {status}")]
    Incompatible {
        /// The final compatibility classification.
        status: LibraryStatus,
    },

    /// The engine must be installed out-of-band (store redirect issued).
    #[error("Engine install pending via store page for {package_id}")]
    InstallPending {
        /// Package the user was redirected to.
        package_id: String,
    },
}

//! Activation events - discriminated union for all acquisition phase changes.
//!
//! The embedding application observes the whole pipeline through this one
//! enum on a single channel; there are no per-phase listener interfaces.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{ActivationError, DownloadError};
use crate::runtime::{AcquisitionMode, LibraryStatus};

/// Coarse pipeline phase an event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationPhase {
    /// Bundle extraction.
    Decompress,
    /// Engine location and compatibility check.
    Dock,
    /// Engine download/update.
    Download,
    /// Final engine initialization.
    Activate,
}

/// Fault kinds raised by the engine capability layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFaultKind {
    /// Engine initialization failed after a successful load.
    InitFailed,
    /// A required entry point could not be resolved.
    MissingSymbol,
}

/// Single discriminated union for all activation events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivationEvent {
    /// Bundle extraction has started.
    DecompressStarted,

    /// Bundle extraction was cancelled; partial output has been removed.
    DecompressCancelled,

    /// Bundle extraction completed and the payload is in place.
    DecompressCompleted,

    /// Engine location / compatibility check has started.
    DockStarted,

    /// The compatibility check did not produce a usable engine.
    DockFailed {
        /// Classification that blocked activation.
        status: LibraryStatus,
    },

    /// A compatible engine was located.
    DockCompleted {
        /// How the engine was obtained.
        mode: AcquisitionMode,
    },

    /// An engine download has started.
    DownloadStarted {
        /// Resolved download URL.
        url: String,
    },

    /// Progress update for an in-flight download.
    DownloadProgress {
        /// Bytes downloaded so far.
        downloaded: u64,
        /// Total bytes to download (0 when unknown).
        total: u64,
        /// Progress percentage (0.0 - 100.0).
        percentage: f64,
    },

    /// Download was cancelled; the partial artifact has been removed.
    DownloadCancelled,

    /// Download failed.
    DownloadFailed {
        /// What went wrong.
        error: DownloadError,
    },

    /// Download completed and the artifact was handed to the installer.
    DownloadCompleted {
        /// Path of the downloaded artifact.
        artifact: PathBuf,
    },

    /// Engine initialization has started.
    ActivateStarted,

    /// The engine is initialized and ready.
    ActivateCompleted {
        /// Version of the activated engine.
        version: u32,
    },

    /// The engine capability layer hit an incompatibility.
    ProviderFault {
        /// Fault kind.
        kind: ProviderFaultKind,
        /// Human-readable detail (symbol name, init failure reason).
        detail: String,
    },

    /// The acquisition sequence ended in a terminal failure.
    ActivationFailed {
        /// The terminal error.
        error: ActivationError,
    },
}

impl ActivationEvent {
    /// Create a download progress event.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn download_progress(downloaded: u64, total: u64) -> Self {
        let percentage = if total > 0 {
            (downloaded as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Self::DownloadProgress {
            downloaded,
            total,
            percentage,
        }
    }

    /// The phase this event belongs to.
    #[must_use]
    pub const fn phase(&self) -> ActivationPhase {
        match self {
            Self::DecompressStarted | Self::DecompressCancelled | Self::DecompressCompleted => {
                ActivationPhase::Decompress
            }
            Self::DockStarted | Self::DockFailed { .. } | Self::DockCompleted { .. } => {
                ActivationPhase::Dock
            }
            Self::DownloadStarted { .. }
            | Self::DownloadProgress { .. }
            | Self::DownloadCancelled
            | Self::DownloadFailed { .. }
            | Self::DownloadCompleted { .. } => ActivationPhase::Download,
            Self::ActivateStarted
            | Self::ActivateCompleted { .. }
            | Self::ProviderFault { .. }
            | Self::ActivationFailed { .. } => ActivationPhase::Activate,
        }
    }

    /// Get the event name for wire protocols.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::DecompressStarted => "activation:decompress_started",
            Self::DecompressCancelled => "activation:decompress_cancelled",
            Self::DecompressCompleted => "activation:decompress_completed",
            Self::DockStarted => "activation:dock_started",
            Self::DockFailed { .. } => "activation:dock_failed",
            Self::DockCompleted { .. } => "activation:dock_completed",
            Self::DownloadStarted { .. } => "activation:download_started",
            Self::DownloadProgress { .. } => "activation:download_progress",
            Self::DownloadCancelled => "activation:download_cancelled",
            Self::DownloadFailed { .. } => "activation:download_failed",
            Self::DownloadCompleted { .. } => "activation:download_completed",
            Self::ActivateStarted => "activation:activate_started",
            Self::ActivateCompleted { .. } => "activation:activate_completed",
            Self::ProviderFault { .. } => "activation:provider_fault",
            Self::ActivationFailed { .. } => "activation:failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_event_calculates_percentage() {
        let event = ActivationEvent::download_progress(500, 1000);
        match event {
            ActivationEvent::DownloadProgress { percentage, .. } => {
                assert!((percentage - 50.0).abs() < 0.01);
            }
            other => panic!("Expected DownloadProgress, got {other:?}"),
        }
    }

    #[test]
    fn unknown_total_reports_zero_percentage() {
        match ActivationEvent::download_progress(500, 0) {
            ActivationEvent::DownloadProgress { percentage, .. } => {
                assert!(percentage.abs() < f64::EPSILON);
            }
            other => panic!("Expected DownloadProgress, got {other:?}"),
        }
    }

    #[test]
    fn events_carry_their_phase() {
        assert_eq!(
            ActivationEvent::DecompressStarted.phase(),
            ActivationPhase::Decompress
        );
        assert_eq!(
            ActivationEvent::DockFailed {
                status: LibraryStatus::NotFound
            }
            .phase(),
            ActivationPhase::Dock
        );
        assert_eq!(
            ActivationEvent::DownloadCancelled.phase(),
            ActivationPhase::Download
        );
        assert_eq!(
            ActivationEvent::ActivateCompleted { version: 7 }.phase(),
            ActivationPhase::Activate
        );
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = ActivationEvent::DockFailed {
            status: LibraryStatus::OlderVersion,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"dock_failed\""));
        assert!(json.contains("older_version"));
    }
}

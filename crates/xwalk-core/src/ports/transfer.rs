//! Transfer backend port.
//!
//! The updater drives downloads through this seam: start a transfer, poll
//! its status on a fixed cadence, cancel it cooperatively. The concrete
//! HTTP implementation lives in the update crate; tests script the port
//! directly.

use std::path::Path;

use async_trait::async_trait;

use crate::errors::DownloadError;

/// Observed state of an in-flight transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferStatus {
    /// Bytes are flowing.
    Running {
        /// Bytes received so far.
        downloaded: u64,
        /// Total bytes expected (0 when unknown).
        total: u64,
    },
    /// The transfer made no progress this poll.
    Paused {
        /// Backend-reported reason.
        reason: String,
    },
    /// The transfer finished and the artifact is complete.
    Successful,
    /// The transfer failed.
    Failed {
        /// Backend-reported failure.
        error: DownloadError,
    },
}

/// Handle to one in-flight transfer.
#[async_trait]
pub trait TransferHandle: Send {
    /// Observe the current transfer status.
    async fn poll(&mut self) -> TransferStatus;

    /// Cancel the transfer and remove the partial artifact.
    async fn cancel(&mut self) -> Result<(), DownloadError>;
}

/// Port for starting background transfers.
#[async_trait]
pub trait TransferBackend: Send + Sync {
    /// Begin transferring `url` into `dest`.
    async fn start(
        &self,
        url: &str,
        dest: &Path,
    ) -> Result<Box<dyn TransferHandle>, DownloadError>;
}

//! The update driver: store redirect or polled background download.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, interval};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use xwalk_core::{
    ActivationEvent, DownloadError, EngineInstaller, EventEmitterPort, LibraryStatus,
    RuntimeConfig, TransferBackend, TransferStatus, paths,
};

/// Minimum spacing between emitted progress events.
const PROGRESS_THROTTLE: Duration = Duration::from_millis(250);

/// How an acquisition request was satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// An artifact was downloaded and handed to the installer.
    Installed,
    /// The user was redirected to the shared package's store page; the
    /// install completes out-of-band.
    StoreRedirect,
}

/// Dependencies for creating an updater.
pub struct UpdaterDeps {
    /// Transfer backend performing the actual byte movement.
    pub transfer: Arc<dyn TransferBackend>,
    /// Installer receiving the finished artifact.
    pub installer: Arc<dyn EngineInstaller>,
    /// Event channel for download phase events.
    pub emitter: Arc<dyn EventEmitterPort>,
}

/// Drives acquisition of a missing or incompatible engine.
pub struct Updater {
    config: RuntimeConfig,
    transfer: Arc<dyn TransferBackend>,
    installer: Arc<dyn EngineInstaller>,
    emitter: Arc<dyn EventEmitterPort>,
}

impl Updater {
    /// Create an updater from its dependencies.
    #[must_use]
    pub fn new(config: RuntimeConfig, deps: UpdaterDeps) -> Self {
        Self {
            config,
            transfer: deps.transfer,
            installer: deps.installer,
            emitter: deps.emitter,
        }
    }

    /// Remediate a recoverable compatibility status.
    ///
    /// Downloads and installs the engine when a download URL is
    /// configured, otherwise opens the shared package's store page.
    pub async fn acquire(
        &self,
        status: LibraryStatus,
        cancel: &CancellationToken,
    ) -> Result<UpdateOutcome, DownloadError> {
        debug_assert!(
            status.is_recoverable(),
            "updater invoked for non-recoverable status {status}"
        );

        match self.config.resolved_download_url() {
            Some(url) => {
                info!(status = %status, url, "Acquiring engine via direct download");
                let artifact = self.download(&url, cancel).await?;
                self.installer.install(&artifact)?;
                Ok(UpdateOutcome::Installed)
            }
            None => {
                info!(
                    status = %status,
                    package = %self.config.package_id,
                    "No download URL configured, redirecting to store page"
                );
                self.installer.open_store_page(&self.config.package_id)?;
                Ok(UpdateOutcome::StoreRedirect)
            }
        }
    }

    /// Run one polled download to completion.
    async fn download(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        let dest = self.artifact_path(url)?;

        self.emitter.emit(ActivationEvent::DownloadStarted {
            url: url.to_string(),
        });

        let mut handle = self.transfer.start(url, &dest).await?;

        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut paused_polls: u32 = 0;
        let mut last_progress: Option<Instant> = None;

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    let _ = handle.cancel().await;
                    self.emitter.emit(ActivationEvent::DownloadCancelled);
                    info!(url, "Download cancelled");
                    return Err(DownloadError::Cancelled);
                }

                _ = ticker.tick() => {
                    match handle.poll().await {
                        TransferStatus::Running { downloaded, total } => {
                            let due = last_progress
                                .is_none_or(|at| at.elapsed() >= PROGRESS_THROTTLE);
                            if due {
                                self.emitter
                                    .emit(ActivationEvent::download_progress(downloaded, total));
                                last_progress = Some(Instant::now());
                            }
                        }
                        TransferStatus::Paused { reason } => {
                            // Cumulative, never reset: a transfer that keeps
                            // alternating paused/running still terminates.
                            paused_polls += 1;
                            if paused_polls >= self.config.max_paused_polls {
                                warn!(url, paused_polls, reason, "Download stalled past poll budget");
                                let _ = handle.cancel().await;
                                let error = DownloadError::StalledTimeout { paused_polls };
                                self.emitter.emit(ActivationEvent::DownloadFailed {
                                    error: error.clone(),
                                });
                                return Err(error);
                            }
                        }
                        TransferStatus::Successful => {
                            info!(url, artifact = %dest.display(), "Download completed");
                            self.emitter.emit(ActivationEvent::DownloadCompleted {
                                artifact: dest.clone(),
                            });
                            return Ok(dest);
                        }
                        TransferStatus::Failed { error } => {
                            warn!(url, error = %error, "Download failed");
                            self.emitter.emit(ActivationEvent::DownloadFailed {
                                error: error.clone(),
                            });
                            return Err(error);
                        }
                    }
                }
            }
        }
    }

    /// Destination path for the downloaded artifact.
    fn artifact_path(&self, url: &str) -> Result<PathBuf, DownloadError> {
        let root = match &self.config.data_root {
            Some(root) => root.clone(),
            None => paths::data_root(&self.config.app_id)
                .map_err(|e| DownloadError::other(e.to_string()))?,
        };

        let name = url
            .split('?')
            .next()
            .and_then(|base| base.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .unwrap_or("engine-update.bin");

        Ok(paths::download_dir(&root).join(name))
    }
}

//! Streaming HTTP implementation of the transfer port.
//!
//! The transfer runs as a spawned task writing chunks to the destination
//! file and publishing byte counts through shared atomics; the handle's
//! `poll` reads those counters and derives a `Paused` status when no bytes
//! moved between polls. Cancellation aborts the task and removes the
//! partial artifact.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use xwalk_core::{DownloadError, TransferBackend, TransferHandle, TransferStatus};

/// Transfer backend over HTTP(S).
#[derive(Clone, Default)]
pub struct HttpTransfer {
    client: reqwest::Client,
}

impl HttpTransfer {
    /// Create a backend with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferBackend for HttpTransfer {
    async fn start(
        &self,
        url: &str,
        dest: &Path,
    ) -> Result<Box<dyn TransferHandle>, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::network_with_status(
                format!("download request rejected for {url}"),
                status.as_u16(),
            ));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::from_io_error(&e))?;
        }

        let total = response.content_length().unwrap_or(0);
        let shared = Arc::new(Shared {
            downloaded: AtomicU64::new(0),
            total: AtomicU64::new(total),
            outcome: std::sync::Mutex::new(None),
        });

        let token = CancellationToken::new();
        let task = tokio::spawn(run_transfer(
            response,
            dest.to_path_buf(),
            Arc::clone(&shared),
            token.clone(),
        ));

        debug!(url, dest = %dest.display(), total, "HTTP transfer started");

        Ok(Box::new(HttpTransferHandle {
            dest: dest.to_path_buf(),
            token,
            shared,
            task: Some(task),
            last_seen: u64::MAX,
        }))
    }
}

struct Shared {
    downloaded: AtomicU64,
    total: AtomicU64,
    outcome: std::sync::Mutex<Option<Result<(), DownloadError>>>,
}

impl Shared {
    fn finish(&self, result: Result<(), DownloadError>) {
        let mut outcome = self.outcome.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *outcome = Some(result);
    }

    fn finished(&self) -> Option<Result<(), DownloadError>> {
        self.outcome
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

async fn run_transfer(
    response: reqwest::Response,
    dest: PathBuf,
    shared: Arc<Shared>,
    token: CancellationToken,
) {
    tokio::select! {
        biased;

        () = token.cancelled() => {
            let _ = tokio::fs::remove_file(&dest).await;
            shared.finish(Err(DownloadError::Cancelled));
        }

        result = copy_stream(response, &dest, &shared) => {
            if result.is_err() {
                // Leave nothing partial behind on failure either
                let _ = tokio::fs::remove_file(&dest).await;
            }
            shared.finish(result);
        }
    }
}

async fn copy_stream(
    response: reqwest::Response,
    dest: &Path,
    shared: &Shared,
) -> Result<(), DownloadError> {
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| DownloadError::from_io_error(&e))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DownloadError::network(e.to_string()))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::from_io_error(&e))?;
        downloaded += chunk.len() as u64;
        shared.downloaded.store(downloaded, Ordering::Relaxed);
    }

    file.flush()
        .await
        .map_err(|e| DownloadError::from_io_error(&e))?;
    Ok(())
}

struct HttpTransferHandle {
    dest: PathBuf,
    token: CancellationToken,
    shared: Arc<Shared>,
    task: Option<tokio::task::JoinHandle<()>>,
    last_seen: u64,
}

#[async_trait]
impl TransferHandle for HttpTransferHandle {
    async fn poll(&mut self) -> TransferStatus {
        if let Some(result) = self.shared.finished() {
            return match result {
                Ok(()) => TransferStatus::Successful,
                Err(error) => TransferStatus::Failed { error },
            };
        }

        let downloaded = self.shared.downloaded.load(Ordering::Relaxed);
        let total = self.shared.total.load(Ordering::Relaxed);

        // No byte movement between two polls reads as a stall; the updater
        // budgets how many of these it tolerates.
        let status = if downloaded == self.last_seen {
            TransferStatus::Paused {
                reason: "no progress since last poll".to_string(),
            }
        } else {
            TransferStatus::Running { downloaded, total }
        };
        self.last_seen = downloaded;
        status
    }

    async fn cancel(&mut self) -> Result<(), DownloadError> {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        // The worker removes the file itself; this covers the window where
        // it never got to run.
        let _ = tokio::fs::remove_file(&self.dest).await;
        Ok(())
    }
}

impl Drop for HttpTransferHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

//! Updater behavior: poll-loop timeout, cancellation cleanup, progress
//! events, install hand-off and store redirect.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use xwalk_core::{
    ActivationEvent, DownloadError, EngineInstaller, EventEmitterPort, LibraryStatus,
    RuntimeConfig, TransferBackend, TransferHandle, TransferStatus,
};
use xwalk_update::{UpdateOutcome, Updater, UpdaterDeps};

/// Emitter that records every event for assertions.
#[derive(Clone, Default)]
struct CaptureEmitter {
    events: Arc<Mutex<Vec<ActivationEvent>>>,
}

impl CaptureEmitter {
    fn events(&self) -> Vec<ActivationEvent> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, pred: impl Fn(&ActivationEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl EventEmitterPort for CaptureEmitter {
    fn emit(&self, event: ActivationEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn clone_box(&self) -> Box<dyn EventEmitterPort> {
        Box::new(self.clone())
    }
}

/// Installer that records calls.
#[derive(Clone, Default)]
struct RecordingInstaller {
    installed: Arc<Mutex<Vec<PathBuf>>>,
    store_pages: Arc<Mutex<Vec<String>>>,
}

impl EngineInstaller for RecordingInstaller {
    fn install(&self, artifact: &Path) -> Result<(), DownloadError> {
        self.installed.lock().unwrap().push(artifact.to_path_buf());
        Ok(())
    }

    fn open_store_page(&self, package_id: &str) -> Result<(), DownloadError> {
        self.store_pages.lock().unwrap().push(package_id.to_string());
        Ok(())
    }
}

/// Transfer backend replaying a scripted status sequence.
#[derive(Clone)]
struct ScriptedBackend {
    script: Vec<TransferStatus>,
    cycle: bool,
    cancelled: Arc<AtomicBool>,
    simulate_partial: bool,
}

impl ScriptedBackend {
    fn new(script: Vec<TransferStatus>) -> Self {
        Self {
            script,
            cycle: false,
            cancelled: Arc::new(AtomicBool::new(false)),
            simulate_partial: false,
        }
    }

    fn cycling(script: Vec<TransferStatus>) -> Self {
        Self {
            cycle: true,
            ..Self::new(script)
        }
    }
}

#[async_trait]
impl TransferBackend for ScriptedBackend {
    async fn start(
        &self,
        _url: &str,
        dest: &Path,
    ) -> Result<Box<dyn TransferHandle>, DownloadError> {
        if self.simulate_partial {
            std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
            std::fs::write(dest, b"partial bytes").unwrap();
        }
        Ok(Box::new(ScriptedHandle {
            script: self.script.clone(),
            cycle: self.cycle,
            index: 0,
            cancelled: Arc::clone(&self.cancelled),
            dest: dest.to_path_buf(),
        }))
    }
}

struct ScriptedHandle {
    script: Vec<TransferStatus>,
    cycle: bool,
    index: usize,
    cancelled: Arc<AtomicBool>,
    dest: PathBuf,
}

#[async_trait]
impl TransferHandle for ScriptedHandle {
    async fn poll(&mut self) -> TransferStatus {
        let pick = if self.cycle {
            self.index % self.script.len()
        } else {
            self.index.min(self.script.len() - 1)
        };
        self.index += 1;
        self.script[pick].clone()
    }

    async fn cancel(&mut self) -> Result<(), DownloadError> {
        self.cancelled.store(true, Ordering::SeqCst);
        let _ = std::fs::remove_file(&self.dest);
        Ok(())
    }
}

fn test_config(data_root: &Path) -> RuntimeConfig {
    RuntimeConfig {
        download_url: Some("https://runtime.example.com/engine.pkg".to_string()),
        data_root: Some(data_root.to_path_buf()),
        poll_interval: Duration::from_millis(1),
        max_paused_polls: 4,
        ..RuntimeConfig::default()
    }
}

fn build_updater(
    config: RuntimeConfig,
    backend: ScriptedBackend,
) -> (Updater, CaptureEmitter, RecordingInstaller) {
    let emitter = CaptureEmitter::default();
    let installer = RecordingInstaller::default();
    let updater = Updater::new(
        config,
        UpdaterDeps {
            transfer: Arc::new(backend),
            installer: Arc::new(installer.clone()),
            emitter: Arc::new(emitter.clone()),
        },
    );
    (updater, emitter, installer)
}

#[tokio::test]
async fn successful_download_is_handed_to_installer() {
    let dir = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::new(vec![
        TransferStatus::Running {
            downloaded: 512,
            total: 1024,
        },
        TransferStatus::Running {
            downloaded: 1024,
            total: 1024,
        },
        TransferStatus::Successful,
    ]);
    let (updater, emitter, installer) = build_updater(test_config(dir.path()), backend);

    let outcome = updater
        .acquire(LibraryStatus::NotFound, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, UpdateOutcome::Installed);

    let installed = installer.installed.lock().unwrap().clone();
    assert_eq!(installed.len(), 1);
    assert!(installed[0].ends_with("downloads/engine.pkg"));

    assert_eq!(
        emitter.count(|e| matches!(e, ActivationEvent::DownloadStarted { .. })),
        1
    );
    assert!(emitter.count(|e| matches!(e, ActivationEvent::DownloadProgress { .. })) >= 1);
    assert_eq!(
        emitter.count(|e| matches!(e, ActivationEvent::DownloadCompleted { .. })),
        1
    );
}

#[tokio::test]
async fn paused_polls_past_budget_time_out() {
    let dir = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::new(vec![TransferStatus::Paused {
        reason: "queued behind other transfers".to_string(),
    }]);
    let cancelled = Arc::clone(&backend.cancelled);
    let (updater, emitter, _) = build_updater(test_config(dir.path()), backend);

    let err = updater
        .acquire(LibraryStatus::OlderVersion, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, DownloadError::StalledTimeout { paused_polls: 4 });
    // The stalled transfer itself was cancelled to release its resources
    assert!(cancelled.load(Ordering::SeqCst));
    assert_eq!(
        emitter.count(|e| matches!(
            e,
            ActivationEvent::DownloadFailed {
                error: DownloadError::StalledTimeout { .. }
            }
        )),
        1
    );
}

#[tokio::test]
async fn alternating_paused_running_still_terminates() {
    let dir = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::cycling(vec![
        TransferStatus::Running {
            downloaded: 1,
            total: 0,
        },
        TransferStatus::Paused {
            reason: "flapping".to_string(),
        },
    ]);
    let (updater, _, _) = build_updater(test_config(dir.path()), backend);

    // Paused polls accumulate across intervening Running polls, so this
    // must terminate rather than loop forever.
    let err = updater
        .acquire(LibraryStatus::NotFound, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, DownloadError::StalledTimeout { paused_polls: 4 });
}

#[tokio::test]
async fn cancellation_removes_partial_artifact_and_notifies_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut backend = ScriptedBackend::cycling(vec![TransferStatus::Running {
        downloaded: 10,
        total: 0,
    }]);
    backend.simulate_partial = true;
    let cancelled = Arc::clone(&backend.cancelled);
    let (updater, emitter, installer) = build_updater(test_config(dir.path()), backend);

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = updater.acquire(LibraryStatus::NotFound, &cancel).await.unwrap_err();

    assert_eq!(err, DownloadError::Cancelled);
    assert!(cancelled.load(Ordering::SeqCst));
    assert!(!dir.path().join("downloads/engine.pkg").exists());
    assert_eq!(
        emitter.count(|e| matches!(e, ActivationEvent::DownloadCancelled)),
        1
    );
    assert!(installer.installed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn backend_failure_is_surfaced_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let failure = DownloadError::InsufficientSpace {
        message: "only 3 MB free".to_string(),
    };
    let backend = ScriptedBackend::new(vec![
        TransferStatus::Running {
            downloaded: 10,
            total: 100,
        },
        TransferStatus::Failed {
            error: failure.clone(),
        },
    ]);
    let (updater, emitter, _) = build_updater(test_config(dir.path()), backend);

    let err = updater
        .acquire(LibraryStatus::NotFound, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, failure.clone());
    assert_eq!(
        emitter.count(|e| matches!(
            e,
            ActivationEvent::DownloadFailed { error } if *error == failure
        )),
        1
    );
}

#[tokio::test]
async fn missing_download_url_redirects_to_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = RuntimeConfig {
        download_url: None,
        package_id: "org.example.engine".to_string(),
        data_root: Some(dir.path().to_path_buf()),
        ..RuntimeConfig::default()
    };
    let backend = ScriptedBackend::new(vec![TransferStatus::Successful]);
    let (updater, emitter, installer) = build_updater(config, backend);

    let outcome = updater
        .acquire(LibraryStatus::NotFound, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, UpdateOutcome::StoreRedirect);
    assert_eq!(
        installer.store_pages.lock().unwrap().clone(),
        vec!["org.example.engine".to_string()]
    );
    assert_eq!(
        emitter.count(|e| matches!(e, ActivationEvent::DownloadStarted { .. })),
        0
    );
}

#[tokio::test]
async fn abi_suffix_reaches_the_transfer_url() {
    let dir = tempfile::tempdir().unwrap();
    let config = RuntimeConfig {
        append_abi: true,
        ..test_config(dir.path())
    };
    let backend = ScriptedBackend::new(vec![TransferStatus::Successful]);
    let (updater, emitter, _) = build_updater(config, backend);

    updater
        .acquire(LibraryStatus::NotFound, &CancellationToken::new())
        .await
        .unwrap();

    let started_url = emitter
        .events()
        .into_iter()
        .find_map(|e| match e {
            ActivationEvent::DownloadStarted { url } => Some(url),
            _ => None,
        })
        .unwrap();
    assert!(started_url.contains("arch="));
}

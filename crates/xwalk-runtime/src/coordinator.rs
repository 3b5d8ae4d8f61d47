//! The activation coordinator state machine.
//!
//! Sequences Decompress → Locate → (Update) → Activate for one engine
//! acquisition, holding the single active-task slot: a second start while
//! a sequence is in flight is rejected, and a finished coordinator stays
//! `Ready` for its lifetime. All phase changes are published as
//! [`ActivationEvent`]s on the injected emitter.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use xwalk_core::{
    ActivationError, ActivationEvent, DownloadError, EngineContext, EngineProvider,
    EventEmitterPort, ExtractError, HostRequirements, LibraryStatus, ProviderError,
    ProviderFaultKind, RuntimeConfig, VersionStamp, paths,
};
use xwalk_extract::{BundleExtractor, extract_in_background};
use xwalk_update::{UpdateOutcome, Updater};

/// State of the acquisition sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivationState {
    /// No sequence has run yet.
    Idle,
    /// Extracting the bundled engine payload.
    Decompressing,
    /// Locating an engine and checking compatibility.
    Locating,
    /// Acquiring a missing or incompatible engine.
    Docking,
    /// Initializing the matched engine.
    Activating,
    /// The engine is initialized; terminal for this coordinator.
    Ready,
    /// The sequence was cancelled during decompression; absorbing.
    Cancelled,
    /// The sequence failed; absorbing.
    Failed,
}

impl ActivationState {
    /// Display name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Decompressing => "decompressing",
            Self::Locating => "locating",
            Self::Docking => "docking",
            Self::Activating => "activating",
            Self::Ready => "ready",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// Whether a sequence is currently running.
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        matches!(
            self,
            Self::Decompressing | Self::Locating | Self::Docking | Self::Activating
        )
    }

    /// Whether the sequence has ended.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Cancelled | Self::Failed)
    }
}

impl std::fmt::Display for ActivationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of asking the coordinator to start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new sequence was started.
    Started,
    /// A sequence is already in flight; nothing was spawned.
    AlreadyRunning,
    /// The engine is already activated; nothing to do.
    AlreadyReady,
}

impl StartOutcome {
    /// Whether this call started a sequence.
    #[must_use]
    pub const fn is_started(self) -> bool {
        matches!(self, Self::Started)
    }
}

/// Dependencies for creating a coordinator.
pub struct CoordinatorDeps {
    /// Acquisition configuration.
    pub config: RuntimeConfig,
    /// Host version requirements.
    pub host: HostRequirements,
    /// Bundle extractor.
    pub extractor: Arc<BundleExtractor>,
    /// Engine locator.
    pub locator: crate::CoreLocator,
    /// Update driver.
    pub updater: Arc<Updater>,
    /// Activation event channel.
    pub emitter: Arc<dyn EventEmitterPort>,
}

/// Coordinates one engine acquisition/activation sequence at a time.
///
/// Owned explicitly by the embedder's composition root; all state lives on
/// this object, never in process globals.
pub struct ActivationCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    config: RuntimeConfig,
    host: HostRequirements,
    extractor: Arc<BundleExtractor>,
    locator: crate::CoreLocator,
    updater: Arc<Updater>,
    emitter: Arc<dyn EventEmitterPort>,
    state_tx: watch::Sender<ActivationState>,
    cancel: Mutex<CancellationToken>,
}

impl ActivationCoordinator {
    /// Create a coordinator from its dependencies.
    #[must_use]
    pub fn new(deps: CoordinatorDeps) -> Self {
        let (state_tx, _) = watch::channel(ActivationState::Idle);
        Self {
            inner: Arc::new(Inner {
                config: deps.config,
                host: deps.host,
                extractor: deps.extractor,
                locator: deps.locator,
                updater: deps.updater,
                emitter: deps.emitter,
                state_tx,
                cancel: Mutex::new(CancellationToken::new()),
            }),
        }
    }

    /// Current state of the sequence.
    #[must_use]
    pub fn state(&self) -> ActivationState {
        *self.inner.state_tx.borrow()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ActivationState> {
        self.inner.state_tx.subscribe()
    }

    /// Start the acquisition sequence.
    ///
    /// Never blocks. While a sequence is in flight this returns
    /// [`StartOutcome::AlreadyRunning`] and spawns nothing; once `Ready`
    /// it returns [`StartOutcome::AlreadyReady`] for the coordinator's
    /// lifetime. A `Cancelled` or `Failed` sequence may be restarted.
    pub fn start(&self) -> StartOutcome {
        let mut outcome = StartOutcome::Started;

        // The claim check and the transition happen under the watch lock,
        // so two racing starts cannot both claim the slot.
        let claimed = self.inner.state_tx.send_if_modified(|state| {
            if *state == ActivationState::Ready {
                outcome = StartOutcome::AlreadyReady;
                return false;
            }
            if state.is_in_flight() {
                outcome = StartOutcome::AlreadyRunning;
                return false;
            }
            *state = ActivationState::Decompressing;
            true
        });

        if claimed {
            let token = CancellationToken::new();
            *self
                .inner
                .cancel
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = token.clone();

            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                run_sequence(inner, token).await;
            });
        }

        outcome
    }

    /// Cancel the in-flight sequence, if any.
    pub fn cancel(&self) {
        self.inner
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    /// Wait for the running sequence to reach a terminal state.
    pub async fn wait_terminal(&self) -> ActivationState {
        let mut rx = self.inner.state_tx.subscribe();
        loop {
            let state = *rx.borrow_and_update();
            if state.is_terminal() {
                return state;
            }
            if rx.changed().await.is_err() {
                return *rx.borrow();
            }
        }
    }
}

impl Inner {
    fn set_state(&self, to: ActivationState) {
        debug!(state = %to, "Activation state change");
        self.state_tx.send_modify(|state| *state = to);
    }

    /// Phase transition with an ordering assertion; an out-of-order
    /// advance is an integration bug, not a runtime condition.
    fn advance(&self, from: ActivationState, to: ActivationState) {
        self.state_tx.send_modify(|state| {
            assert!(
                *state == from,
                "invalid activation phase transition {state} -> {to}, expected to come from {from}"
            );
            *state = to;
        });
        debug!(from = %from, to = %to, "Activation phase advanced");
    }

    fn emit(&self, event: ActivationEvent) {
        self.emitter.emit(event);
    }

    fn fail(&self, error: ActivationError) {
        warn!(error = %error, "Activation sequence failed");
        self.emit(ActivationEvent::ActivationFailed { error });
        self.set_state(ActivationState::Failed);
    }

    fn data_root(&self) -> Result<std::path::PathBuf, ActivationError> {
        match &self.config.data_root {
            Some(root) => Ok(root.clone()),
            None => paths::data_root(&self.config.app_id).map_err(|e| {
                ActivationError::Extract(ExtractError::Io {
                    kind: "DataRoot".to_string(),
                    message: e.to_string(),
                })
            }),
        }
    }
}

/// Drive one full acquisition sequence on its own task.
async fn run_sequence(inner: Arc<Inner>, cancel: CancellationToken) {
    let data_root = match inner.data_root() {
        Ok(root) => root,
        Err(e) => {
            inner.fail(e);
            return;
        }
    };
    let stamp_path = paths::stamp_path(&data_root);

    // Decompress phase; skipped entirely when nothing is bundled or the
    // stamp already covers the bundled version.
    if inner.extractor.bundle_present() {
        let stamp = match VersionStamp::load(&stamp_path) {
            Ok(stamp) => stamp,
            Err(e) => {
                // An unreadable stamp is not fatal, it just forces a
                // re-extraction.
                warn!(error = %e, "Version stamp unreadable, re-extracting");
                None
            }
        };

        if inner
            .extractor
            .is_extraction_needed(stamp.as_ref(), inner.host.bundled_version)
        {
            inner.emit(ActivationEvent::DecompressStarted);

            match extract_in_background(Arc::clone(&inner.extractor), cancel.clone()).await {
                Ok(()) => {
                    if let Err(e) = VersionStamp::new(inner.host.bundled_version).save(&stamp_path)
                    {
                        warn!(error = %e, "Failed to persist extraction stamp");
                    }
                    inner.emit(ActivationEvent::DecompressCompleted);
                }
                Err(ExtractError::Cancelled) => {
                    info!("Extraction cancelled");
                    inner.emit(ActivationEvent::DecompressCancelled);
                    inner.set_state(ActivationState::Cancelled);
                    return;
                }
                Err(e) => {
                    inner.fail(ActivationError::Extract(e));
                    return;
                }
            }
        }
    }

    inner.advance(ActivationState::Decompressing, ActivationState::Locating);

    // Dock phase: locate, and keep re-locating after each successful
    // update until a compatible engine appears.
    let (provider, engine_version) = loop {
        inner.emit(ActivationEvent::DockStarted);
        let location = inner.locator.locate();

        match location.status {
            LibraryStatus::Matched => {
                let Some(provider) = location.provider else {
                    unreachable!("locator returned Matched without a provider");
                };
                let version = location
                    .descriptor
                    .as_ref()
                    .map_or(inner.host.bundled_version, |d| d.library_version);
                info!(mode = %provider.mode(), version, "Engine docked");
                inner.emit(ActivationEvent::DockCompleted {
                    mode: provider.mode(),
                });
                break (provider, version);
            }

            status if status.is_recoverable() => {
                inner.emit(ActivationEvent::DockFailed { status });
                inner.advance(ActivationState::Locating, ActivationState::Docking);

                match inner.updater.acquire(status, &cancel).await {
                    Ok(UpdateOutcome::Installed) => {
                        inner.advance(ActivationState::Docking, ActivationState::Locating);
                    }
                    Ok(UpdateOutcome::StoreRedirect) => {
                        inner.fail(ActivationError::InstallPending {
                            package_id: inner.config.package_id.clone(),
                        });
                        return;
                    }
                    Err(DownloadError::Cancelled) => {
                        inner.fail(ActivationError::Download(DownloadError::Cancelled));
                        return;
                    }
                    Err(e) => {
                        inner.fail(ActivationError::Download(e));
                        return;
                    }
                }
            }

            status => {
                // Signature failure never self-heals; no update attempt.
                inner.emit(ActivationEvent::DockFailed { status });
                inner.fail(ActivationError::Incompatible { status });
                return;
            }
        }
    };

    // Activate phase
    inner.advance(ActivationState::Locating, ActivationState::Activating);
    inner.emit(ActivationEvent::ActivateStarted);

    let ctx = EngineContext {
        app_id: inner.config.app_id.clone(),
        lib_dir: inner.extractor.lib_dir().to_path_buf(),
    };

    match provider.initialize(&ctx) {
        Ok(()) => {
            if let Err(e) = VersionStamp::new(engine_version).save(&stamp_path) {
                warn!(error = %e, "Failed to persist activation stamp");
            }
            info!(version = engine_version, "Engine activated");
            inner.set_state(ActivationState::Ready);
            inner.emit(ActivationEvent::ActivateCompleted {
                version: engine_version,
            });
        }
        Err(e) => {
            let (kind, detail) = provider_fault(&e);
            inner.emit(ActivationEvent::ProviderFault { kind, detail });
            inner.fail(ActivationError::Provider(e));
        }
    }
}

/// Map a provider error to the granular fault event it raises.
fn provider_fault(error: &ProviderError) -> (ProviderFaultKind, String) {
    match error {
        ProviderError::MissingSymbol { symbol } => {
            (ProviderFaultKind::MissingSymbol, symbol.clone())
        }
        other => (ProviderFaultKind::InitFailed, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_and_in_flight_classification() {
        assert!(ActivationState::Ready.is_terminal());
        assert!(ActivationState::Cancelled.is_terminal());
        assert!(ActivationState::Failed.is_terminal());
        assert!(!ActivationState::Idle.is_terminal());

        assert!(ActivationState::Decompressing.is_in_flight());
        assert!(ActivationState::Locating.is_in_flight());
        assert!(ActivationState::Docking.is_in_flight());
        assert!(ActivationState::Activating.is_in_flight());
        assert!(!ActivationState::Ready.is_in_flight());
    }

    #[test]
    fn start_outcome_flags() {
        assert!(StartOutcome::Started.is_started());
        assert!(!StartOutcome::AlreadyRunning.is_started());
        assert!(!StartOutcome::AlreadyReady.is_started());
    }
}

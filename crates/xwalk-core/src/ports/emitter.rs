//! Activation event emitter port.
//!
//! Abstracts event delivery so the coordinator and updater can publish
//! phase changes without coupling to a transport.

use tokio::sync::mpsc;

use crate::events::ActivationEvent;

/// Port for emitting activation events.
///
/// Implementations handle the actual delivery (channels, FFI callbacks,
/// logs). `emit` must not block.
pub trait EventEmitterPort: Send + Sync {
    /// Emit an activation event.
    fn emit(&self, event: ActivationEvent);

    /// Clone this emitter into a boxed trait object.
    fn clone_box(&self) -> Box<dyn EventEmitterPort>;
}

/// A no-op emitter for tests and contexts that poll state instead.
#[derive(Debug, Clone, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    /// Create a new no-op emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EventEmitterPort for NoopEmitter {
    fn emit(&self, _event: ActivationEvent) {
        // Intentionally do nothing
    }

    fn clone_box(&self) -> Box<dyn EventEmitterPort> {
        Box::new(self.clone())
    }
}

/// Emitter backed by an unbounded tokio channel.
///
/// The receiving half is handed to whoever renders the pipeline (CLI
/// progress output, embedder callback pump). Send failures mean the
/// receiver is gone and are deliberately ignored; a dropped observer must
/// not fail the pipeline.
#[derive(Clone)]
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<ActivationEvent>,
}

impl ChannelEmitter {
    /// Create an emitter and the receiver draining it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ActivationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventEmitterPort for ChannelEmitter {
    fn emit(&self, event: ActivationEvent) {
        let _ = self.tx.send(event);
    }

    fn clone_box(&self) -> Box<dyn EventEmitterPort> {
        Box::new(self.clone())
    }
}

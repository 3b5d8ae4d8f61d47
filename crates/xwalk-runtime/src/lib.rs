//! Engine providers and the activation coordinator.
//!
//! This crate owns the docking logic (embedded-first, shared-fallback
//! engine resolution with version classification) and the state machine
//! sequencing Decompress → Locate → (Update) → Activate. The coordinator
//! is an explicitly owned object wired at the composition root; there is
//! no process-global state.

mod coordinator;
mod locator;
pub mod provider;

pub use coordinator::{
    ActivationCoordinator, ActivationState, CoordinatorDeps, StartOutcome,
};
pub use locator::{CoreLocator, Location};
pub use provider::{
    EmbeddedEngineProvider, EngineManifest, MANIFEST_FILE, SharedEngineProvider,
};

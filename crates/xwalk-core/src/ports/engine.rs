//! Engine capability port.
//!
//! The native engine is an opaque collaborator; the pipeline only ever
//! talks to it through this trait. The embedded and shared resolutions are
//! two implementations of the same capability surface.

use std::path::PathBuf;

use crate::errors::ProviderError;
use crate::runtime::{AcquisitionMode, EngineDescriptor};

/// Host-side context handed to the engine at initialization.
#[derive(Clone, Debug)]
pub struct EngineContext {
    /// Application identifier (namespaces persisted state).
    pub app_id: String,
    /// Private directory holding the extracted engine payload.
    pub lib_dir: PathBuf,
}

/// Capability surface of a resolvable engine.
///
/// `descriptor` and `probe_load` are expected to be fast and synchronous;
/// they run on the caller's task. Any error from either reads as "this
/// resolution is unusable" and the locator falls through to the next
/// provider.
pub trait EngineProvider: Send + Sync {
    /// Which resolution this provider implements.
    fn mode(&self) -> AcquisitionMode;

    /// Read the engine's declared version facts.
    ///
    /// For the shared resolution this also verifies the package signature;
    /// a mismatch surfaces as [`ProviderError::SignatureMismatch`].
    fn descriptor(&self) -> Result<EngineDescriptor, ProviderError>;

    /// Cheap library-load probe; proves the engine binary is loadable
    /// without initializing it.
    fn probe_load(&self) -> Result<(), ProviderError>;

    /// Initialize the engine. Called exactly once per successful
    /// acquisition sequence, only after a `Matched` classification.
    fn initialize(&self, ctx: &EngineContext) -> Result<(), ProviderError>;
}

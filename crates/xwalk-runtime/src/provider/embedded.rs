//! Embedded engine resolution.
//!
//! The engine payload lives in the application's private library
//! directory, materialized there by the extractor. Version facts come
//! from the manifest extracted alongside the library.

use std::path::PathBuf;

use tracing::debug;

use xwalk_core::{AcquisitionMode, EngineContext, EngineDescriptor, EngineProvider, ProviderError};

use super::manifest::{EngineManifest, MANIFEST_FILE};
use super::{probe_library, resolve_init};

/// Provider for the engine bundled inside the host application.
pub struct EmbeddedEngineProvider {
    lib_dir: PathBuf,
}

impl EmbeddedEngineProvider {
    /// Create a provider over the private library directory.
    #[must_use]
    pub fn new(lib_dir: impl Into<PathBuf>) -> Self {
        Self {
            lib_dir: lib_dir.into(),
        }
    }

    fn manifest(&self) -> Result<EngineManifest, ProviderError> {
        EngineManifest::load(&self.lib_dir.join(MANIFEST_FILE))
    }
}

impl EngineProvider for EmbeddedEngineProvider {
    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::Embedded
    }

    fn descriptor(&self) -> Result<EngineDescriptor, ProviderError> {
        let manifest = self.manifest()?;
        Ok(EngineDescriptor {
            mode: AcquisitionMode::Embedded,
            library_version: manifest.library_version,
            min_host_version: manifest.min_host_version,
            package_path: Some(self.lib_dir.clone()),
        })
    }

    fn probe_load(&self) -> Result<(), ProviderError> {
        let manifest = self.manifest()?;
        probe_library(&self.lib_dir.join(&manifest.library))
    }

    fn initialize(&self, ctx: &EngineContext) -> Result<(), ProviderError> {
        let manifest = self.manifest()?;
        debug!(app_id = %ctx.app_id, library = %manifest.library, "Initializing embedded engine");
        resolve_init(&self.lib_dir.join(&manifest.library))
    }
}

//! Engine installer port.

use std::path::Path;

use crate::errors::DownloadError;

/// Port for handing acquired engine artifacts to the platform installer,
/// or for redirecting the user to the store page of the shared package.
pub trait EngineInstaller: Send + Sync {
    /// Install a downloaded engine artifact.
    fn install(&self, artifact: &Path) -> Result<(), DownloadError>;

    /// Open the store page for the shared engine package.
    fn open_store_page(&self, package_id: &str) -> Result<(), DownloadError>;
}

/// Installer that does nothing; used in tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct NoopInstaller;

impl EngineInstaller for NoopInstaller {
    fn install(&self, _artifact: &Path) -> Result<(), DownloadError> {
        Ok(())
    }

    fn open_store_page(&self, _package_id: &str) -> Result<(), DownloadError> {
        Ok(())
    }
}

//! Shared engine resolution.
//!
//! The engine is installed as a separate, independently updated package.
//! Before any version facts are trusted, the package library is verified
//! against the digest its manifest declares; a mismatch classifies as a
//! signature check failure and never self-heals.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tracing::debug;

use xwalk_core::{AcquisitionMode, EngineContext, EngineDescriptor, EngineProvider, ProviderError};

use super::manifest::{EngineManifest, MANIFEST_FILE};
use super::{probe_library, resolve_init};

/// Provider for an engine installed as a separate package.
pub struct SharedEngineProvider {
    package_dir: PathBuf,
}

impl SharedEngineProvider {
    /// Create a provider over a shared package directory.
    #[must_use]
    pub fn new(package_dir: impl Into<PathBuf>) -> Self {
        Self {
            package_dir: package_dir.into(),
        }
    }

    fn manifest(&self) -> Result<EngineManifest, ProviderError> {
        EngineManifest::load(&self.package_dir.join(MANIFEST_FILE))
    }

    /// Verify the package library against the manifest's declared digest.
    fn verify_signature(&self, manifest: &EngineManifest) -> Result<(), ProviderError> {
        let Some(expected) = manifest.signature.as_deref() else {
            return Err(ProviderError::InvalidManifest {
                path: self.package_dir.join(MANIFEST_FILE).display().to_string(),
                detail: "shared package manifest carries no signature".to_string(),
            });
        };

        let library = self.package_dir.join(&manifest.library);
        let bytes = fs::read(&library).map_err(|e| {
            ProviderError::not_found(format!("cannot read {}: {e}", library.display()))
        })?;
        let actual = hex_digest(&bytes);

        if actual != expected.to_ascii_lowercase() {
            return Err(ProviderError::SignatureMismatch {
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(())
    }
}

impl EngineProvider for SharedEngineProvider {
    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::Shared
    }

    fn descriptor(&self) -> Result<EngineDescriptor, ProviderError> {
        let manifest = self.manifest()?;
        self.verify_signature(&manifest)?;
        Ok(EngineDescriptor {
            mode: AcquisitionMode::Shared,
            library_version: manifest.library_version,
            min_host_version: manifest.min_host_version,
            package_path: Some(self.package_dir.clone()),
        })
    }

    fn probe_load(&self) -> Result<(), ProviderError> {
        let manifest = self.manifest()?;
        probe_library(&self.package_dir.join(&manifest.library))
    }

    fn initialize(&self, ctx: &EngineContext) -> Result<(), ProviderError> {
        let manifest = self.manifest()?;
        debug!(
            app_id = %ctx.app_id,
            package = %self.package_dir.display(),
            "Initializing shared engine"
        );
        resolve_init(&self.package_dir.join(&manifest.library))
    }
}

/// Hex-encode the SHA-256 digest of `bytes`.
fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        write!(&mut out, "{b:02x}").unwrap();
    }
    out
}

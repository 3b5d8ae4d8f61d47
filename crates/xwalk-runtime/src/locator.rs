//! Engine location: embedded-first resolution with shared fallback and
//! version compatibility classification.

use std::sync::Arc;

use tracing::debug;

use xwalk_core::{
    EngineDescriptor, EngineProvider, HostRequirements, LibraryStatus, ProviderError,
    classify_compatibility,
};

/// Outcome of one location pass.
pub struct Location {
    /// Compatibility classification of the best resolution attempted.
    pub status: LibraryStatus,
    /// Version facts of the located engine, when one was readable.
    pub descriptor: Option<EngineDescriptor>,
    /// The provider to activate through; present only on `Matched`.
    pub provider: Option<Arc<dyn EngineProvider>>,
}

/// Resolves an engine by walking providers in priority order.
///
/// Providers are tried in the order given (embedded first by convention);
/// the first `Matched` resolution wins. When none matches, the surfaced
/// status is that of the last resolution attempted, so a shared-package
/// failure is what reaches the updater.
pub struct CoreLocator {
    host: HostRequirements,
    providers: Vec<Arc<dyn EngineProvider>>,
}

impl CoreLocator {
    /// Create a locator over an ordered provider chain.
    #[must_use]
    pub fn new(host: HostRequirements, providers: Vec<Arc<dyn EngineProvider>>) -> Self {
        Self { host, providers }
    }

    /// The host version requirements this locator classifies against.
    #[must_use]
    pub const fn host(&self) -> &HostRequirements {
        &self.host
    }

    /// Run one location pass over the provider chain.
    pub fn locate(&self) -> Location {
        let mut status = LibraryStatus::NotFound;
        let mut descriptor = None;

        for provider in &self.providers {
            let mode = provider.mode();
            match Self::resolve(provider.as_ref()) {
                Ok(found) => {
                    let classified = classify_compatibility(&self.host, &found);
                    if classified == LibraryStatus::Matched {
                        debug!(mode = %mode, version = found.library_version, "Engine matched");
                        return Location {
                            status: LibraryStatus::Matched,
                            descriptor: Some(found),
                            provider: Some(Arc::clone(provider)),
                        };
                    }
                    debug!(
                        mode = %mode,
                        status = %classified,
                        engine_version = found.library_version,
                        "Engine located but incompatible"
                    );
                    status = classified;
                    descriptor = Some(found);
                }
                Err(e) => {
                    debug!(mode = %mode, error = %e, "Engine resolution failed");
                    status = e.library_status();
                    descriptor = None;
                }
            }
        }

        Location {
            status,
            descriptor,
            provider: None,
        }
    }

    /// Read the descriptor and run the load probe for one provider.
    fn resolve(provider: &dyn EngineProvider) -> Result<EngineDescriptor, ProviderError> {
        let descriptor = provider.descriptor()?;
        provider.probe_load()?;
        Ok(descriptor)
    }
}

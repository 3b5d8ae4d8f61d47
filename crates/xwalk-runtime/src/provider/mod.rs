//! Concrete engine providers.
//!
//! Two implementations of the engine capability surface: the embedded
//! resolution (engine payload extracted into the application's private
//! library directory) and the shared resolution (engine installed as a
//! separate package, verified by digest before use).

mod embedded;
mod manifest;
mod shared;

pub use embedded::EmbeddedEngineProvider;
pub use manifest::{EngineManifest, MANIFEST_FILE};
pub use shared::SharedEngineProvider;

use std::path::Path;

use xwalk_core::ProviderError;

/// Entry point every engine library must export.
const INIT_SYMBOL: &[u8] = b"xwalk_engine_init\0";

/// Prove the engine binary is loadable without initializing it.
fn probe_library(path: &Path) -> Result<(), ProviderError> {
    if !path.exists() {
        return Err(ProviderError::not_found(format!(
            "engine library missing at {}",
            path.display()
        )));
    }

    // SAFETY: the probe only opens and closes the library; the engine's
    // load-time initializers are designed to run at dlopen time.
    let library = unsafe { libloading::Library::new(path) }.map_err(|e| {
        ProviderError::LoadFailed {
            detail: e.to_string(),
        }
    })?;
    drop(library);
    Ok(())
}

/// Load the engine library and resolve its init entry point.
fn resolve_init(path: &Path) -> Result<(), ProviderError> {
    // SAFETY: as in `probe_library`; the symbol is only resolved here,
    // invocation is the native engine's concern.
    let library = unsafe { libloading::Library::new(path) }.map_err(|e| {
        ProviderError::LoadFailed {
            detail: e.to_string(),
        }
    })?;
    let symbol = unsafe { library.get::<unsafe extern "C" fn()>(INIT_SYMBOL) };
    symbol.map(|_| ()).map_err(|_| ProviderError::MissingSymbol {
        symbol: "xwalk_engine_init".to_string(),
    })
}

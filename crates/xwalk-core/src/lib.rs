//! Core domain types and port definitions for the runtime acquisition layer.
//!
//! Everything in this crate is adapter-free: concrete extraction, transfer
//! and engine-loading machinery lives in the sibling crates and reaches the
//! rest of the system only through the port traits defined here.

pub mod config;
pub mod errors;
pub mod events;
pub mod paths;
pub mod ports;
pub mod runtime;
pub mod stamp;

// Re-export commonly used types for convenience
pub use config::{RuntimeConfig, device_abi};
pub use errors::{ActivationError, DownloadError, ExtractError, ProviderError};
pub use events::{ActivationEvent, ActivationPhase, ProviderFaultKind};
pub use ports::{
    ChannelEmitter, EngineContext, EngineInstaller, EngineProvider, EventEmitterPort, NoopEmitter,
    NoopInstaller, TransferBackend, TransferHandle, TransferStatus,
};
pub use runtime::{
    AcquisitionMode, EngineDescriptor, HostRequirements, LibraryStatus, classify_compatibility,
};
pub use stamp::{StampError, VersionStamp};

// Re-export path utilities
pub use paths::{PathError, data_root, download_dir, library_dir, stamp_path};

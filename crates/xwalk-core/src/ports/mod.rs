//! Port definitions - the seams between the acquisition pipeline and its
//! adapters (engine loader, transfer backend, installer, event transport).

mod emitter;
mod engine;
mod installer;
mod transfer;

pub use emitter::{ChannelEmitter, EventEmitterPort, NoopEmitter};
pub use engine::{EngineContext, EngineProvider};
pub use installer::{EngineInstaller, NoopInstaller};
pub use transfer::{TransferBackend, TransferHandle, TransferStatus};

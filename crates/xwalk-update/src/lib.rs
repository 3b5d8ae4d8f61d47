//! Engine download and update driver.
//!
//! Given a recoverable compatibility status, the updater either redirects
//! the user to the shared package's store page or performs a polled
//! background download of the engine artifact, reporting progress through
//! the activation event channel and handing the finished artifact to the
//! platform installer.

mod http;
mod updater;

pub use http::HttpTransfer;
pub use updater::{UpdateOutcome, Updater, UpdaterDeps};

//! Runtime acquisition configuration.
//!
//! Built once at the composition root from application metadata and passed
//! into the coordinator; nothing in the pipeline reads ambient state.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for one acquisition pipeline.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Application identifier; namespaces the data root.
    pub app_id: String,
    /// Identifier of the shared engine package (store page target).
    pub package_id: String,
    /// Direct engine download URL from application metadata, if any.
    pub download_url: Option<String>,
    /// Append `?arch=<device-abi>` to the download URL.
    pub append_abi: bool,
    /// Directory holding the compressed engine bundle shipped with the
    /// application; `None` when the application bundles no payload.
    pub bundle_dir: Option<PathBuf>,
    /// Mandatory compressed resource names inside the bundle.
    pub resources: Vec<String>,
    /// Directory a shared engine package would be installed under.
    pub shared_package_dir: Option<PathBuf>,
    /// Override for the per-application data root (tests, portable mode).
    pub data_root: Option<PathBuf>,
    /// Cadence of the download status poll loop.
    pub poll_interval: Duration,
    /// Cumulative paused polls tolerated before a download is declared
    /// stalled. The default corresponds to roughly ten minutes at the
    /// default poll cadence.
    pub max_paused_polls: u32,
}

/// Default download poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default paused-poll budget (~10 minutes of 100 ms polling).
pub const DEFAULT_MAX_PAUSED_POLLS: u32 = 6000;

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            app_id: "xwalk".to_string(),
            package_id: "org.xwalk.core".to_string(),
            download_url: None,
            append_abi: false,
            bundle_dir: None,
            resources: Vec::new(),
            shared_package_dir: None,
            data_root: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_paused_polls: DEFAULT_MAX_PAUSED_POLLS,
        }
    }
}

impl RuntimeConfig {
    /// The download URL with the ABI query parameter applied when
    /// configured.
    #[must_use]
    pub fn resolved_download_url(&self) -> Option<String> {
        let url = self.download_url.as_ref()?;
        if self.append_abi {
            let sep = if url.contains('?') { '&' } else { '?' };
            Some(format!("{url}{sep}arch={}", device_abi()))
        } else {
            Some(url.clone())
        }
    }
}

/// The device ABI string used for stamps and download URLs.
#[must_use]
pub fn device_abi() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "x86",
        "arm" => "armeabi-v7a",
        "aarch64" => "arm64-v8a",
        other => other,
    }
}

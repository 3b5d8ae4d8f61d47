//! Atomic bundle extraction with cooperative cancellation.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use xwalk_core::{ExtractError, VersionStamp};

use crate::container;

/// File suffix of compressed resources inside the bundle directory.
pub const COMPRESSED_SUFFIX: &str = ".lzma";

/// Extracts the mandatory compressed resources of an engine bundle into
/// the private library directory.
///
/// Each resource is decoded into a named temp file inside the destination
/// directory and renamed over the final path only on success, so the
/// directory is always either fully-present-old or absent, never partial.
pub struct BundleExtractor {
    bundle_dir: PathBuf,
    lib_dir: PathBuf,
    resources: Vec<String>,
}

impl BundleExtractor {
    /// Create an extractor for `resources` under `bundle_dir`, extracting
    /// into `lib_dir`.
    #[must_use]
    pub fn new(
        bundle_dir: impl Into<PathBuf>,
        lib_dir: impl Into<PathBuf>,
        resources: Vec<String>,
    ) -> Self {
        Self {
            bundle_dir: bundle_dir.into(),
            lib_dir: lib_dir.into(),
            resources,
        }
    }

    /// The private library directory this extractor materializes into.
    #[must_use]
    pub fn lib_dir(&self) -> &Path {
        &self.lib_dir
    }

    /// Whether a compressed bundle is present at all.
    ///
    /// When nothing is bundled the decompress phase is skipped entirely.
    #[must_use]
    pub fn bundle_present(&self) -> bool {
        self.resources
            .iter()
            .any(|name| self.compressed_path(name).exists())
    }

    /// Whether extraction has to run, given the persisted stamp and the
    /// version of the bundled payload.
    #[must_use]
    pub fn is_extraction_needed(&self, stamp: Option<&VersionStamp>, bundled_version: u32) -> bool {
        match stamp {
            Some(stamp) if stamp.matches(bundled_version) => {
                debug!(version = bundled_version, "Stamp matches, skipping extraction");
                false
            }
            _ => true,
        }
    }

    /// Extract every mandatory resource.
    ///
    /// The cancellation token is honored between resources and between
    /// read chunks inside the decoder; on cancellation the in-progress
    /// temp file is removed and [`ExtractError::Cancelled`] is returned.
    pub fn extract_all(&self, cancel: &CancellationToken) -> Result<(), ExtractError> {
        fs::create_dir_all(&self.lib_dir).map_err(|e| ExtractError::from_io_error(&e))?;

        for name in &self.resources {
            if cancel.is_cancelled() {
                return Err(ExtractError::Cancelled);
            }
            self.extract_one(name, cancel)?;
        }

        info!(
            resources = self.resources.len(),
            lib_dir = %self.lib_dir.display(),
            "Bundle extraction completed"
        );
        Ok(())
    }

    fn extract_one(&self, name: &str, cancel: &CancellationToken) -> Result<(), ExtractError> {
        let src = self.compressed_path(name);
        if !src.exists() {
            return Err(ExtractError::MissingResource {
                name: name.to_string(),
            });
        }

        let file = File::open(&src).map_err(|e| ExtractError::from_io_error(&e))?;
        let mut reader = CancelReader {
            inner: BufReader::new(file),
            cancel: cancel.clone(),
        };

        // Header validation happens before any destination file is created.
        let header = container::read_header(&mut reader).map_err(|e| cancelled_or(cancel, e))?;

        // Temp file lives in the destination directory so the final rename
        // stays on one filesystem; it is deleted on drop if we bail early.
        let tmp =
            NamedTempFile::new_in(&self.lib_dir).map_err(|e| ExtractError::from_io_error(&e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            container::decode(&header, reader, &mut writer, name)
                .map_err(|e| cancelled_or(cancel, e))?;
            writer.flush().map_err(|e| ExtractError::from_io_error(&e))?;
        }

        let dest = self.lib_dir.join(name);
        tmp.persist(&dest)
            .map_err(|e| ExtractError::from_io_error(&e.error))?;

        debug!(resource = name, dest = %dest.display(), "Extracted bundle resource");
        Ok(())
    }

    fn compressed_path(&self, name: &str) -> PathBuf {
        self.bundle_dir.join(format!("{name}{COMPRESSED_SUFFIX}"))
    }
}

/// Run the extractor on a blocking worker thread.
///
/// The extractor's public surface never blocks the caller; all decoding
/// happens inside `spawn_blocking`.
pub async fn extract_in_background(
    extractor: Arc<BundleExtractor>,
    cancel: CancellationToken,
) -> Result<(), ExtractError> {
    match tokio::task::spawn_blocking(move || extractor.extract_all(&cancel)).await {
        Ok(result) => result,
        Err(join_err) => Err(ExtractError::Io {
            kind: "JoinError".to_string(),
            message: join_err.to_string(),
        }),
    }
}

/// Collapse any mid-extraction error into `Cancelled` once the token has
/// fired; the I/O error it provoked is an artifact of the cancellation.
fn cancelled_or(cancel: &CancellationToken, err: ExtractError) -> ExtractError {
    if cancel.is_cancelled() {
        ExtractError::Cancelled
    } else {
        err
    }
}

/// Reader adapter that fails the stream once the token fires.
struct CancelReader<R> {
    inner: R,
    cancel: CancellationToken,
}

impl<R: Read> Read for CancelReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(io::Error::other("extraction cancelled"));
        }
        self.inner.read(buf)
    }
}

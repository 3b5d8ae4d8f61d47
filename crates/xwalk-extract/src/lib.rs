//! Bundle extraction.
//!
//! Decodes the LZMA-alone compressed engine payload shipped inside the
//! host application and materializes it atomically in the private library
//! directory. Extraction is the only writer of that directory, runs on a
//! blocking worker thread, and honors cooperative cancellation between
//! work units.

pub mod container;
mod extractor;

pub use extractor::{BundleExtractor, COMPRESSED_SUFFIX, extract_in_background};

//! LZMA-alone container format.
//!
//! The bundled payload uses the classic LZMA-alone layout: a 5-byte
//! properties header, an 8-byte little-endian uncompressed-size field
//! (all-ones when the size is unknown and the stream carries an end
//! marker), then the compressed payload.

use std::io::{self, BufReader, Cursor, Read, Write};

use xwalk_core::ExtractError;

/// Length of the LZMA properties field.
pub const PROPS_LEN: usize = 5;

/// Length of the full container header (properties + size).
pub const HEADER_LEN: usize = 13;

/// Size field value meaning "unknown, stream has an end marker".
const UNKNOWN_SIZE: u64 = u64::MAX;

/// Validated container header.
#[derive(Clone, Copy, Debug)]
pub struct ContainerHeader {
    raw: [u8; HEADER_LEN],
}

impl ContainerHeader {
    /// The 5 LZMA properties bytes.
    #[must_use]
    pub fn properties(&self) -> &[u8] {
        &self.raw[..PROPS_LEN]
    }

    /// Declared uncompressed size, `None` when the stream is
    /// end-marker-terminated.
    #[must_use]
    pub fn uncompressed_size(&self) -> Option<u64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.raw[PROPS_LEN..]);
        let size = u64::from_le_bytes(bytes);
        (size != UNKNOWN_SIZE).then_some(size)
    }

    /// The raw header bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; HEADER_LEN] {
        &self.raw
    }
}

/// Read and validate the 13-byte container header.
///
/// Fails with [`ExtractError::HeaderTooShort`] before any output is
/// produced when the stream ends early.
pub fn read_header<R: Read>(input: &mut R) -> Result<ContainerHeader, ExtractError> {
    let mut raw = [0u8; HEADER_LEN];
    let got = read_to_buffer(input, &mut raw).map_err(|e| ExtractError::from_io_error(&e))?;

    if got < HEADER_LEN {
        let need = if got < PROPS_LEN { PROPS_LEN } else { HEADER_LEN };
        return Err(ExtractError::HeaderTooShort {
            got: got as u64,
            need: need as u64,
        });
    }

    Ok(ContainerHeader { raw })
}

/// Decode the payload following `header` into `output`.
///
/// `rest` must be positioned immediately after the header bytes.
pub fn decode<R: Read, W: Write>(
    header: &ContainerHeader,
    rest: R,
    output: &mut W,
    resource: &str,
) -> Result<(), ExtractError> {
    // The decoder consumes the whole container, so splice the validated
    // header back in front of the remaining stream.
    let mut chained = BufReader::new(Cursor::new(*header.as_bytes()).chain(rest));

    lzma_rs::lzma_decompress(&mut chained, output).map_err(|e| match e {
        lzma_rs::error::Error::IoError(err) => ExtractError::from_io_error(&err),
        other => ExtractError::decode(resource, format!("{other:?}")),
    })
}

/// Fill `buf` as far as the stream allows, returning the byte count.
fn read_to_buffer<R: Read>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

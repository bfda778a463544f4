//! XFDL forms (`.xfd`, `.frm`)
//!
//! A compressed form starts with a marker line, followed by base64 text. The
//! decoded bytes are a run of frames: two big-endian `u16` lengths
//! (compressed, uncompressed) and a gzip member stripped of its first four
//! header bytes. Restoring those four bytes makes each frame inflatable.

use std::io::{Cursor, Read};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::read::GzDecoder;

use super::{EmbeddedDocument, embedded_documents};
use crate::error::{Result, SourceError};

/// First line of a compressed form
pub const XFD_GZIP_MARKER: &[u8] = b"application/x-xfdl;content-encoding=\"asc-gzip\"";

/// gzip magic, deflate method, no flags
const GZIP_HEADER_PREFIX: [u8; 4] = [31, 139, 8, 0];

pub fn is_compressed(raw: &[u8]) -> bool {
    raw.starts_with(XFD_GZIP_MARKER)
}

/// The XFDL XML body; uncompressed forms are returned as they are
pub fn decode(container: &str, raw: &[u8]) -> Result<Vec<u8>> {
    if !is_compressed(raw) {
        return Ok(raw.to_vec());
    }
    let body = match raw.iter().position(|&b| b == b'\n') {
        Some(idx) => &raw[idx + 1..],
        None => &[][..],
    };
    let compact: Vec<u8> = body
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let frames = STANDARD
        .decode(&compact)
        .map_err(|e| SourceError::format(container, None, format!("invalid base64: {}", e)))?;

    let mut xml = Vec::new();
    let mut i = 0usize;
    while i < frames.len() {
        let Some(lengths) = frames.get(i..i + 4) else {
            return Err(SourceError::format(
                container,
                None,
                format!("truncated frame header at offset {}", i),
            ));
        };
        let compressed_len = u16::from_be_bytes([lengths[0], lengths[1]]) as usize;
        let uncompressed_len = u16::from_be_bytes([lengths[2], lengths[3]]) as u64;
        // the length bytes double as the gzip timestamp field
        let Some(member) = frames.get(i..i + compressed_len) else {
            return Err(SourceError::format(
                container,
                None,
                format!("frame at offset {} runs past end of data", i),
            ));
        };
        let mut gzip = GZIP_HEADER_PREFIX.to_vec();
        gzip.extend_from_slice(member);
        GzDecoder::new(Cursor::new(gzip))
            .take(uncompressed_len)
            .read_to_end(&mut xml)
            .map_err(|e| {
                SourceError::format(container, None, format!("corrupt frame at offset {}: {}", i, e))
            })?;
        i += compressed_len + 4;
    }
    Ok(xml)
}

/// `<data>` entries with their `<filename>` and `<mimedata>`
pub fn parse_documents(container: &str, xml: &str) -> Result<Vec<EmbeddedDocument>> {
    embedded_documents(container, xml, "data", "filename", "mimedata")
}

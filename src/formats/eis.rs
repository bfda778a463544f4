//! EDGAR Interchange Specification envelopes
//!
//! The file is a sequence of `[u32 big-endian length][zlib stream]` chunks
//! that inflate to one XML document. A file already starting with `<?xml` is
//! the uncompressed form.

use std::io::Read;
use std::sync::OnceLock;

use flate2::read::ZlibDecoder;
use regex::Regex;

use super::{EmbeddedDocument, embedded_documents};
use crate::encoding::UTF8_BOM;
use crate::error::{Result, SourceError};

static SUBMISSION_REGEX: OnceLock<Regex> = OnceLock::new();

fn submission_regex() -> &'static Regex {
    SUBMISSION_REGEX.get_or_init(|| {
        Regex::new(r"^\s*(<\?xml[^?]+\?>)?\s*(<!--.*?-->\s*)*<(\w+:)?edgarSubmission")
            .expect("Failed to compile EDGAR submission regex")
    })
}

/// Whether an `.xml` file is an uncompressed EDGAR submission envelope
pub fn is_submission(raw: &[u8]) -> bool {
    let raw = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
    let head = String::from_utf8_lossy(&raw[..raw.len().min(256)]);
    submission_regex().is_match(&head)
}

/// Whether `raw` is uncompressed XML rather than length-prefixed chunks
pub fn is_plain_xml(raw: &[u8]) -> bool {
    let raw = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
    raw.starts_with(b"<?xml")
}

/// Inflate the chunk sequence into the XML body
pub fn decode(container: &str, raw: &[u8]) -> Result<Vec<u8>> {
    if is_plain_xml(raw) {
        return Ok(raw.to_vec());
    }
    let mut xml = Vec::new();
    let mut pos = 0usize;
    while pos < raw.len() {
        let Some(prefix) = raw.get(pos..pos + 4) else {
            return Err(SourceError::format(
                container,
                None,
                format!("truncated chunk length at offset {}", pos),
            ));
        };
        let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        pos += 4;
        let Some(chunk) = raw.get(pos..pos + len) else {
            return Err(SourceError::format(
                container,
                None,
                format!("chunk of {} bytes at offset {} runs past end of file", len, pos),
            ));
        };
        ZlibDecoder::new(chunk)
            .read_to_end(&mut xml)
            .map_err(|e| SourceError::format(container, None, format!("corrupt chunk: {}", e)))?;
        pos += len;
    }
    Ok(xml)
}

/// `<document>` entries with their `<conformedName>` and `<contents>`
pub fn parse_documents(container: &str, xml: &str) -> Result<Vec<EmbeddedDocument>> {
    embedded_documents(container, xml, "document", "conformedName", "contents")
}

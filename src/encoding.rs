//! In-memory readers and text decoding for extracted members

use std::io::{self, BufRead, Cursor, Read, Seek, SeekFrom};
use std::sync::OnceLock;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::Regex;
use tracing::debug;

use crate::error::{Result, SourceError};

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

static ENCODING_DECL_REGEX: OnceLock<Regex> = OnceLock::new();
static XML_DECL_REGEX: OnceLock<Regex> = OnceLock::new();

fn encoding_decl_regex() -> &'static Regex {
    ENCODING_DECL_REGEX.get_or_init(|| {
        Regex::new(r#"^\s*<\?xml[^>]*?encoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#)
            .expect("Failed to compile encoding declaration regex")
    })
}

fn xml_decl_regex() -> &'static Regex {
    XML_DECL_REGEX.get_or_init(|| {
        Regex::new(r"^\s*<\?xml[^>]*\?>").expect("Failed to compile XML declaration regex")
    })
}

/// Seekable in-memory reader that carries the logical path it was read from
#[derive(Debug, Clone)]
pub struct NamedBuffer {
    name: String,
    cursor: Cursor<Vec<u8>>,
}

impl NamedBuffer {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            cursor: Cursor::new(content),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.cursor.get_ref()
    }

    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.cursor.into_inner()
    }
}

impl Read for NamedBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl BufRead for NamedBuffer {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.cursor.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.cursor.consume(amt)
    }
}

impl Seek for NamedBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

/// Encoding named by a byte order mark or the XML declaration, else UTF-8
pub fn detect_encoding(bytes: &[u8]) -> String {
    if bytes.starts_with(UTF8_BOM) {
        return "utf-8-sig".to_string();
    }
    if bytes.starts_with(b"\xFF\xFE") {
        return "utf-16le".to_string();
    }
    if bytes.starts_with(b"\xFE\xFF") {
        return "utf-16be".to_string();
    }
    let head = &bytes[..bytes.len().min(200)];
    let head = String::from_utf8_lossy(head);
    encoding_decl_regex()
        .captures(&head)
        .map(|caps| caps[1].to_ascii_lowercase())
        .unwrap_or_else(|| "utf-8".to_string())
}

/// Encoding for a WHATWG or Python-style label (`utf-8-sig`, `latin-1`, `shift_jis`)
pub fn lookup_encoding(label: &str) -> Option<&'static Encoding> {
    let label = label.trim().to_ascii_lowercase();
    match label.as_str() {
        "utf-8-sig" | "utf8-sig" => return Some(UTF_8),
        "latin-1" => return Some(WINDOWS_1252),
        _ => {}
    }
    Encoding::for_label(label.as_bytes())
        .or_else(|| Encoding::for_label(label.replace('_', "-").as_bytes()))
        .or_else(|| Encoding::for_label(label.replace('-', "_").as_bytes()))
}

/// Decode `bytes` as `encoding`; a byte order mark wins over the label.
///
/// Unknown labels and malformed input are format errors.
pub fn decode_text(name: &str, bytes: &[u8], encoding: &str) -> Result<String> {
    let Some(declared) = lookup_encoding(encoding) else {
        return Err(SourceError::format(
            name,
            None,
            format!("unknown encoding {}", encoding),
        ));
    };
    let (text, used, had_errors) = declared.decode(bytes);
    if had_errors {
        return Err(SourceError::format(
            name,
            None,
            format!("invalid {} data", used.name()),
        ));
    }
    if used != declared {
        debug!(
            name,
            declared = declared.name(),
            used = used.name(),
            "byte order mark overrides encoding"
        );
    }
    Ok(text.into_owned())
}

/// Remove a leading `<?xml ...?>` declaration
pub fn strip_xml_declaration(text: &str) -> String {
    xml_decl_regex().replace(text, "").into_owned()
}

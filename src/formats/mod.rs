//! Container formats a file source can open

pub mod eis;
pub mod package;
pub mod rss;
pub mod tar_archive;
pub mod xfd;
pub mod zip_archive;

use std::fmt;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::encoding::UTF8_BOM;
use crate::error::{Result, SourceError};
use crate::path_util::is_http_url;

/// What a file source is backed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Plain,
    Zip,
    TarGz,
    Eis,
    Xfd,
    Rss,
    InstalledPackage,
}

impl SourceKind {
    /// Kind implied by a URL or path.
    ///
    /// `.xml` is treated as EIS only when `check_if_xml_is_eis` is set; the
    /// content is probed again on open.
    pub fn detect(url: &str, check_if_xml_is_eis: bool) -> Self {
        let lower = url.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            SourceKind::Zip
        } else if lower.ends_with(".tar.gz") {
            SourceKind::TarGz
        } else if lower.ends_with(".eis") {
            SourceKind::Eis
        } else if lower.ends_with(".xfd") || lower.ends_with(".frm") {
            SourceKind::Xfd
        } else if lower.ends_with(".rss") {
            SourceKind::Rss
        } else if lower.ends_with(".taxonomypackage.xml") && !is_http_url(url) {
            SourceKind::InstalledPackage
        } else if lower.ends_with(".xml") && check_if_xml_is_eis {
            SourceKind::Eis
        } else if !is_http_url(url) && package::is_package_dir(Path::new(url)) {
            SourceKind::InstalledPackage
        } else {
            SourceKind::Plain
        }
    }

    pub fn is_archive(self) -> bool {
        self != SourceKind::Plain
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Plain => "plain",
            SourceKind::Zip => "zip",
            SourceKind::TarGz => "tar.gz",
            SourceKind::Eis => "eis",
            SourceKind::Xfd => "xfd",
            SourceKind::Rss => "rss",
            SourceKind::InstalledPackage => "installed package",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document carried base64-encoded inside an EIS or XFD envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedDocument {
    pub name: String,
    pub payload: String,
}

impl EmbeddedDocument {
    /// Decoded bytes, without a UTF-8 byte order mark
    pub fn decode(&self, container: &str) -> Result<Vec<u8>> {
        let compact: String = self
            .payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| SourceError::format(container, Some(&self.name), e))?;
        Ok(match bytes.strip_prefix(UTF8_BOM) {
            Some(rest) => rest.to_vec(),
            None => bytes,
        })
    }
}

pub(crate) fn parse_xml<'a>(container: &str, text: &'a str) -> Result<roxmltree::Document<'a>> {
    let mut options = roxmltree::ParsingOptions::default();
    options.allow_dtd = true;
    roxmltree::Document::parse_with_options(text, options)
        .map_err(|e| SourceError::format(container, None, e))
}

/// Text of the first child element named `local_name`, in any namespace
pub(crate) fn child_text(node: roxmltree::Node<'_, '_>, local_name: &str) -> Option<String> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == local_name)
        .map(|child| child.text().unwrap_or("").trim().to_string())
}

/// Documents found as `<doc_tag><name_tag/><content_tag/></doc_tag>`
pub(crate) fn embedded_documents(
    container: &str,
    xml: &str,
    doc_tag: &str,
    name_tag: &str,
    content_tag: &str,
) -> Result<Vec<EmbeddedDocument>> {
    let document = parse_xml(container, xml)?;
    let documents = document
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == doc_tag)
        .filter_map(|node| {
            let name = child_text(node, name_tag)?;
            let payload = node
                .children()
                .find(|c| c.is_element() && c.tag_name().name() == content_tag)
                .map(|c| c.text().unwrap_or("").to_string())
                .unwrap_or_default();
            Some(EmbeddedDocument { name, payload })
        })
        .collect();
    Ok(documents)
}

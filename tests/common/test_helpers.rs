use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::{GzEncoder, ZlibEncoder};
use tempfile::TempDir;

use filing_source::config::Config;
use filing_source::formats::xfd::XFD_GZIP_MARKER;

/// A scratch cache root with its own config
pub struct TestCacheEnv {
    pub temp_dir: TempDir,
    pub config: Config,
}

impl TestCacheEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = Config::default();
        config.cache.directory = temp_dir.path().join("cache");
        config.cache.app_dir = temp_dir.path().join("app");
        config.cache.max_age_hours = 24;
        config.network.retry_attempts = 3;
        config.network.retry_delay_ms = 0;
        config.runtime.interactive = false;
        config.runtime.work_offline = false;
        config.runtime.managed_environment = false;
        Self { temp_dir, config }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.config.cache.directory.clone()
    }

    /// Write `content` at `relative` under the scratch directory
    pub fn write_file(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }
}

impl Default for TestCacheEnv {
    fn default() -> Self {
        Self::new()
    }
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .expect("Failed to start zip entry");
        writer.write_all(content).expect("Failed to write zip entry");
    }
    writer.finish().expect("Failed to finish zip").into_inner()
}

pub fn build_tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, *content)
            .expect("Failed to append tar entry");
    }
    builder
        .into_inner()
        .expect("Failed to finish tar")
        .finish()
        .expect("Failed to finish gzip")
}

pub fn gzip(content: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content).expect("Failed to gzip");
    encoder.finish().expect("Failed to gzip")
}

/// EIS envelope XML holding `documents`
pub fn eis_xml(documents: &[(&str, &[u8])]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<edgarSubmission xmlns=\"http://www.sec.gov/edgar/common\"><documents>",
    );
    for (name, content) in documents {
        xml.push_str(&format!(
            "<document><conformedName>{}</conformedName><contents>{}</contents></document>",
            name,
            STANDARD.encode(content)
        ));
    }
    xml.push_str("</documents></edgarSubmission>");
    xml
}

/// Compressed EIS file: length-prefixed zlib chunks
pub fn build_eis(documents: &[(&str, &[u8])]) -> Vec<u8> {
    let xml = eis_xml(documents);
    let mut out = Vec::new();
    for piece in xml.as_bytes().chunks(64) {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(piece).expect("Failed to compress");
        let compressed = encoder.finish().expect("Failed to compress");
        out.extend_from_slice(&(compressed.len() as u32).to_be_bytes());
        out.extend_from_slice(&compressed);
    }
    out
}

/// Compressed XFDL form holding `documents`
pub fn build_xfd(documents: &[(&str, &[u8])]) -> Vec<u8> {
    let mut xml = String::from(
        "<?xml version=\"1.0\"?><XFDL xmlns=\"http://www.PureEdge.com/XFDL/6.5\"><globalpage>",
    );
    for (name, content) in documents {
        xml.push_str(&format!(
            "<data sid=\"{}\"><filename>{}</filename><mimetype>text/xml</mimetype><mimedata>{}</mimedata></data>",
            name.replace(['\\', ':', '/'], "_"),
            name,
            STANDARD.encode(content)
        ));
    }
    xml.push_str("</globalpage></XFDL>");

    let mut frames = Vec::new();
    for piece in xml.as_bytes().chunks(1024) {
        let gzip = gzip(piece);
        frames.extend_from_slice(&((gzip.len() - 8) as u16).to_be_bytes());
        frames.extend_from_slice(&(piece.len() as u16).to_be_bytes());
        frames.extend_from_slice(&gzip[8..]);
    }
    let mut raw = XFD_GZIP_MARKER.to_vec();
    raw.push(b'\n');
    for line in STANDARD.encode(&frames).as_bytes().chunks(76) {
        raw.extend_from_slice(line);
        raw.push(b'\n');
    }
    raw
}

/// EDGAR RSS feed with one item per `(company, instance url)`
pub fn rss_feed(items: &[(&str, &str)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0" xmlns:edgar="http://www.sec.gov/Archives/edgar"><channel><title>XBRL feed</title>"#,
    );
    for (company, url) in items {
        xml.push_str(&format!(
            r#"<item><title>{company} (10-K)</title><description>10-K</description><pubDate>Fri, 01 Mar 2024 16:05:00 EST</pubDate>
<edgar:xbrlFiling><edgar:companyName>{company}</edgar:companyName><edgar:formType>10-K</edgar:formType>
<edgar:filingDate>03/01/2024</edgar:filingDate><edgar:cikNumber>0000001</edgar:cikNumber><edgar:period>20231231</edgar:period>
<edgar:xbrlFiles><edgar:xbrlFile edgar:sequence="1" edgar:url="{url}" edgar:description="XBRL INSTANCE DOCUMENT"/></edgar:xbrlFiles>
</edgar:xbrlFiling></item>"#
        ));
    }
    xml.push_str("<item><title>No instance</title></item></channel></rss>");
    xml
}

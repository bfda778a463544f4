//! Splitting logical paths into an archive part and a member part
//!
//! A path such as `filings/report.zip/docs/instance.xml` names the member
//! `docs/instance.xml` inside `filings/report.zip`. A marker only counts when
//! the prefix before it really is a container: an existing file on disk or a
//! well-formed HTTP URL. A directory that happens to be named `foo.zip` is not
//! an archive.

use std::path::{MAIN_SEPARATOR, Path};
use std::sync::OnceLock;

use crate::path_util::is_http_url;

/// Suffixes that mark a container when followed by a separator
pub const ARCHIVE_SUFFIXES: [&str; 7] = [
    ".zip",
    ".tar.gz",
    ".eis",
    ".xml",
    ".xfd",
    ".frm",
    ".taxonomyPackage.xml",
];

/// Lower-cased `<suffix><sep>` markers for `/` and, where different, the
/// host separator
pub fn archive_path_separators() -> &'static [String] {
    static SEPARATORS: OnceLock<Vec<String>> = OnceLock::new();
    SEPARATORS.get_or_init(|| {
        let mut separators = Vec::new();
        for suffix in ARCHIVE_SUFFIXES {
            let suffix = suffix.to_ascii_lowercase();
            separators.push(format!("{}/", suffix));
            if MAIN_SEPARATOR != '/' {
                separators.push(format!("{}{}", suffix, MAIN_SEPARATOR));
            }
        }
        separators
    })
}

/// Split `path` at the first archive marker whose prefix is a real container.
///
/// Markers match regardless of ASCII case. `.xml` is only considered a
/// marker when `check_if_xml_is_eis` is set.
/// Returns `(archive, member)` with the separator removed.
pub fn split_archive_path(path: &str, check_if_xml_is_eis: bool) -> Option<(String, String)> {
    split_archive_path_with(path, check_if_xml_is_eis, is_container_prefix)
}

/// Like [`split_archive_path`], with a caller-supplied test for the prefix.
///
/// Used to find archives nested inside an open container, where the prefix
/// exists only as a member name.
pub fn split_archive_path_with<F>(
    path: &str,
    check_if_xml_is_eis: bool,
    is_container: F,
) -> Option<(String, String)>
where
    F: Fn(&str) -> bool,
{
    let lower = path.to_ascii_lowercase();
    for separator in archive_path_separators() {
        if !check_if_xml_is_eis && separator.starts_with(".xml") {
            continue;
        }
        let Some(idx) = lower.find(separator.as_str()) else {
            continue;
        };
        let archive_end = idx + separator.len() - 1;
        let archive = &path[..archive_end];
        if is_container(archive) {
            let member = &path[archive_end + 1..];
            return Some((archive.to_string(), member.to_string()));
        }
    }
    None
}

/// Whether `path` names something that can hold members.
///
/// HTTP URLs are accepted on syntax alone.
pub fn is_container_prefix(path: &str) -> bool {
    if is_http_url(path) {
        return url::Url::parse(path)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
            .unwrap_or(false);
    }
    Path::new(path).is_file()
}

/// Whether `path` ends with one of the container suffixes
pub fn has_archive_suffix(path: &str, check_if_xml_is_eis: bool) -> bool {
    let lower = path.to_ascii_lowercase();
    archive_path_separators().iter().any(|separator| {
        let suffix = &separator[..separator.len() - 1];
        (check_if_xml_is_eis || suffix != ".xml") && lower.ends_with(suffix)
    })
}

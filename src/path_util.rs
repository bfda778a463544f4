//! Path and URL normalization
//!
//! Canonicalizes references against a base that may be a local path or an
//! HTTP URL. HTTP bases get purely lexical `/` normalization; local bases use
//! the host path rules.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Whether `s` is an `http://` or `https://` URL
pub fn is_http_url(s: &str) -> bool {
    let lower = s.get(..8).map(str::to_ascii_lowercase).unwrap_or_default();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Remove a `file://` or `file:\` prefix
pub fn strip_file_scheme(s: &str) -> &str {
    s.strip_prefix("file://")
        .or_else(|| s.strip_prefix("file:\\"))
        .unwrap_or(s)
}

/// Split `scheme://rest` into its two halves
pub fn split_scheme(url: &str) -> Option<(&str, &str)> {
    url.split_once("://")
}

/// Percent-decode a string, replacing invalid UTF-8 sequences
pub fn unquote(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Lexical `/` normalization: collapses `.`, `..` and repeated separators.
///
/// Mirrors POSIX `normpath`: an empty result becomes `.`, and `..` segments
/// that would climb above a relative root are kept.
pub fn posix_normpath(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Lexical normalization of a host filesystem path
pub fn normalize_os_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    let mut normal_depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => result.push(prefix.as_os_str()),
            Component::RootDir => result.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if normal_depth > 0 {
                    result.pop();
                    normal_depth -= 1;
                } else if !result.has_root() {
                    result.push("..");
                }
            }
            Component::Normal(name) => {
                result.push(name);
                normal_depth += 1;
            }
        }
    }
    if result.as_os_str().is_empty() {
        result.push(".");
    }
    result
}

/// Normalize the path part of an HTTP URL, keeping a trailing `/`.
///
/// The authority is left alone and `..` never climbs above the URL root.
pub fn normalize_http_url(url: &str) -> String {
    let Some((scheme, rest)) = split_scheme(url) else {
        return url.to_string();
    };
    let rest = rest.replace('\\', "/");
    let Some(idx) = rest.find('/') else {
        return format!("{}://{}", scheme, rest);
    };
    let (authority, path) = rest.split_at(idx);
    let mut normed = posix_normpath(path);
    if path.ends_with('/') && normed != "/" {
        normed.push('/');
    }
    format!("{}://{}{}", scheme, authority, normed)
}

/// Directory part of a `/`-separated path (everything before the last `/`)
fn posix_dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Resolve `path` against an optional `base`.
///
/// Absolute paths and HTTP URLs come back unchanged apart from `file://`
/// stripping and lexical cleanup. A relative path without a base resolves
/// against the process working directory.
pub fn normalize(path: &str, base: Option<&str>) -> String {
    if path.is_empty() {
        return String::new();
    }
    let path = strip_file_scheme(path);
    let base = base.filter(|b| !b.is_empty()).map(strip_file_scheme);

    let normed = if is_http_url(path) || Path::new(path).is_absolute() {
        path.to_string()
    } else {
        let mut relative = path.to_string();
        if let Some(b) = base
            && !is_http_url(b)
            && relative.contains('%')
        {
            relative = unquote(&relative);
        }
        match base {
            Some(b) if is_http_url(b) => {
                let (scheme, rest) = split_scheme(b).unwrap_or(("http", b));
                let joined = format!("{}/{}", posix_dirname(rest), relative);
                format!("{}://{}", scheme, joined)
            }
            Some(b) => {
                let b = if b.contains('%') { unquote(b) } else { b.to_string() };
                let dir = Path::new(&b).parent().map(Path::to_path_buf).unwrap_or_default();
                dir.join(&relative).to_string_lossy().into_owned()
            }
            None => {
                let cwd = std::env::current_dir().unwrap_or_default();
                cwd.join(&relative).to_string_lossy().into_owned()
            }
        }
    };

    if is_http_url(&normed) {
        normalize_http_url(&normed)
    } else {
        normalize_os_path(Path::new(&normed))
            .to_string_lossy()
            .into_owned()
    }
}

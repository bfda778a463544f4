//! Bijection between URLs and paths inside the cache directory
//!
//! Layout: `<cache>/<scheme>/<host>[/^port<port>][/^user<user>]/<path segments>`.
//! Characters the host filesystem cannot store are written as `^NNN` (three
//! digit decimal code point), and a trailing `/` becomes the
//! [`DIRECTORY_INDEX`] sentinel so that `a/` and `a` never collide.
//! Segments spelled `.` or `..` are escaped too, so every mapped path stays
//! below the cache root. Empty segments (`a//b`) are collapsed: both spellings
//! share one cache file and map back to the single-slash URL.

use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::path_util::split_scheme;

/// Stands in for the empty last segment of a URL ending in `/`
pub const DIRECTORY_INDEX: &str = "!~DirectoryIndex~!";

const PORT_MARKER: &str = "^port";
const USER_MARKER: &str = "^user";

fn encode_regex() -> &'static Regex {
    static ENCODE: OnceLock<Regex> = OnceLock::new();
    ENCODE.get_or_init(|| {
        let pattern = if cfg!(windows) {
            r#"[<>:"\\|?*^]"#
        } else {
            r"[:^]"
        };
        Regex::new(pattern).expect("escape pattern is valid")
    })
}

fn decode_regex() -> &'static Regex {
    static DECODE: OnceLock<Regex> = OnceLock::new();
    DECODE.get_or_init(|| Regex::new(r"\^([0-9]{3})").expect("decode pattern is valid"))
}

/// Escape one path segment
pub fn encode_segment(segment: &str) -> String {
    encode_regex()
        .replace_all(segment, |caps: &Captures| {
            let ch = caps[0].chars().next().unwrap_or('^');
            format!("^{:03}", ch as u32)
        })
        .into_owned()
}

/// [`encode_segment`] for a component that becomes a directory entry.
/// `.` and `..` are written as `^046` runs.
fn encode_component(segment: &str) -> String {
    match segment {
        "." | ".." => "^046".repeat(segment.len()),
        _ => encode_segment(segment),
    }
}

/// Undo [`encode_segment`]
pub fn decode_segment(segment: &str) -> String {
    decode_regex()
        .replace_all(segment, |caps: &Captures| {
            caps[1]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Maps URLs to cache paths and back for one cache root
#[derive(Debug, Clone)]
pub struct CacheCodec {
    cache_dir: PathBuf,
}

impl CacheCodec {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cache location for `url`. Non-URL input is returned as a plain path.
    pub fn url_to_cache_path(&self, url: &str) -> PathBuf {
        let Some((scheme, rest)) = split_scheme(url) else {
            return PathBuf::from(url);
        };
        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
            None => (rest, None),
        };
        let (user, host_port) = match authority.rsplit_once('@') {
            Some((user, host_port)) => (Some(user), host_port),
            None => (None, authority),
        };
        let (host, port) = split_port(host_port);

        let mut cache_path = self.cache_dir.join(encode_component(scheme));
        cache_path.push(encode_component(host));
        if let Some(port) = port {
            cache_path.push(format!("{}{}", PORT_MARKER, encode_segment(port)));
        }
        if let Some(user) = user {
            cache_path.push(format!("{}{}", USER_MARKER, encode_segment(user)));
        }
        if let Some(path) = path {
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                cache_path.push(encode_component(segment));
            }
            if path.is_empty() || path.ends_with('/') {
                cache_path.push(DIRECTORY_INDEX);
            }
        }
        cache_path
    }

    /// URL for a path inside the cache, or `None` for paths elsewhere
    pub fn cache_path_to_url(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.cache_dir).ok()?;
        let mut parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if parts.len() < 2 {
            return None;
        }
        let scheme = decode_segment(&parts.remove(0));
        let mut authority = decode_segment(&parts.remove(0));
        if let Some(port) = parts.first().and_then(|p| p.strip_prefix(PORT_MARKER)) {
            authority = format!("{}:{}", authority, decode_segment(port));
            parts.remove(0);
        }
        if let Some(user) = parts.first().and_then(|p| p.strip_prefix(USER_MARKER)) {
            authority = format!("{}@{}", decode_segment(user), authority);
            parts.remove(0);
        }
        let mut url = format!("{}://{}", scheme, authority);
        for part in &parts {
            url.push('/');
            if part != DIRECTORY_INDEX {
                url.push_str(&decode_segment(part));
            }
        }
        Some(url)
    }
}

fn split_port(host_port: &str) -> (&str, Option<&str>) {
    // bracketed IPv6 literals carry colons of their own
    let search_from = host_port.rfind(']').unwrap_or(0);
    match host_port[search_from..].rfind(':') {
        Some(idx) => {
            let idx = search_from + idx;
            (&host_port[..idx], Some(&host_port[idx + 1..]))
        }
        None => (host_port, None),
    }
}

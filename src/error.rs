use std::path::PathBuf;

use thiserror::Error;

/// Main library error type that encompasses all possible failure modes
///
/// A missing member, a broken container and a network failure are separate
/// variants.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} for {url} - {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Request timeout: {url} after {timeout_seconds} seconds")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("Incomplete read retrieving {url}: {details}")]
    IncompleteRead { url: String, details: String },

    #[error("'{scheme}' authentication for realm '{realm}' is required to access {url}")]
    AuthenticationRequired {
        url: String,
        scheme: String,
        realm: String,
    },

    #[error("Expected XML but received an HTML page from {url} (login or captive portal?)")]
    UnexpectedHtml { url: String },

    #[error("Retrieval incomplete for {url}: got only {actual} out of {expected} bytes")]
    Integrity {
        url: String,
        expected: u64,
        actual: u64,
    },

    #[error("Cache write error: {path} - {details}")]
    CacheWrite { path: PathBuf, details: String },

    #[error("Working offline and {url} is not cached")]
    Offline { url: String },

    #[error("{member} not found in archive {archive}")]
    MemberNotFound { archive: String, member: String },

    #[error("Format error in {container}{suffix}: {details}", suffix = member_suffix(.member))]
    Format {
        container: String,
        member: Option<String>,
        details: String,
    },

    #[error("File source is not open: {url}")]
    NotOpen { url: String },

    #[error("Remote cache store error: {0}")]
    RemoteStore(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SourceError {
    /// Build a container format error
    pub fn format(
        container: impl Into<String>,
        member: Option<&str>,
        details: impl std::fmt::Display,
    ) -> Self {
        SourceError::Format {
            container: container.into(),
            member: member.map(str::to_string),
            details: details.to_string(),
        }
    }

    /// Whether the failure came from talking to a server
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            SourceError::Http(_)
                | SourceError::HttpStatus { .. }
                | SourceError::Timeout { .. }
                | SourceError::IncompleteRead { .. }
                | SourceError::AuthenticationRequired { .. }
                | SourceError::UnexpectedHtml { .. }
        )
    }

    /// Failures that a background staleness recheck may swallow, keeping the
    /// previously cached copy. Integrity, cache-write and configuration errors
    /// are never swallowed.
    pub fn is_soft_failable(&self) -> bool {
        self.is_network()
    }

    /// Hint shown next to the error for failures the user can fix
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            SourceError::CacheWrite { .. } => Some(
                "The cache file may be locked by another process or the disk may be full; \
                 close other programs using the cache or clear it and retry",
            ),
            SourceError::Http(_) | SourceError::Timeout { .. } => {
                Some("Check network connectivity, proxy settings and the URL")
            }
            SourceError::AuthenticationRequired { .. } => {
                Some("Supply credentials for the realm or configure the proxy user and password")
            }
            SourceError::UnexpectedHtml { .. } => {
                Some("Log in through a browser first, or check for a captive portal")
            }
            SourceError::Offline { .. } => {
                Some("Disable offline mode or pre-populate the cache directory")
            }
            _ => None,
        }
    }
}

fn member_suffix(member: &Option<String>) -> String {
    member
        .as_ref()
        .map(|m| format!(" (member {})", m))
        .unwrap_or_default()
}

/// Failures of the remote cache store
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache write error: {path} - {details}")]
    WriteError { path: PathBuf, details: String },

    #[error("Cache corruption detected: {key} - {details}")]
    Corruption { key: String, details: String },
}

impl From<CacheError> for SourceError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::WriteError { path, details } => SourceError::CacheWrite { path, details },
            other => SourceError::RemoteStore(other.to_string()),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SourceError>;

//! # filing-source Library
//!
//! Archive-aware file access with an HTTP disk cache. A path may name a plain
//! file, a URL, or a member inside a ZIP, tar.gz, EIS, XFD, RSS feed or
//! taxonomy package, local or remote; remote content is fetched once and kept
//! in a cache directory that mirrors the URL layout.

pub mod archive_path;
pub mod cache_codec;
pub mod check_times;
pub mod cli;
pub mod config;
pub mod encoding;
pub mod error;
pub mod error_reporter;
pub mod file_source;
pub mod formats;
pub mod http_client;
pub mod output;
pub mod path_util;
pub mod remote_store;
pub mod web_cache;

pub use archive_path::{archive_path_separators, split_archive_path};
pub use cache_codec::{CacheCodec, DIRECTORY_INDEX};
pub use cli::{Cli, Command, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use encoding::NamedBuffer;
pub use error::{Result, SourceError};
pub use error_reporter::ErrorReporter;
pub use file_source::{
    DirectoryListing, FileContent, FileOptions, FileResolver, FileSource, Selection,
    SourceRegistry, open_file_source,
};
pub use formats::SourceKind;
pub use formats::rss::RssItem;
pub use http_client::{
    Credentials, HttpClientConfig, HttpTransport, ReqwestTransport, ResponseHeaders,
    TransportRequest, TransportResponse,
};
pub use output::Output;
pub use path_util::normalize;
pub use remote_store::{MemoryStore, RemoteStore};
pub use web_cache::{CacheDelegate, CachedResource, GetOptions, NoopDelegate, WebCache};

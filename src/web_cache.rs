//! Disk cache of web resources
//!
//! Every URL maps to a fixed path under the cache root (see
//! [`CacheCodec`](crate::cache_codec::CacheCodec)). Cached files are trusted
//! for `max_age_hours`; after that a HEAD request decides whether the server
//! copy is newer. Downloads land in `<path>.tmp` and are renamed into place,
//! so readers never see a partial file.

use crate::archive_path::split_archive_path;
use crate::cache_codec::CacheCodec;
use crate::check_times::UrlCheckTimes;
use crate::config::{Config, ProxyConfig};
use crate::error::{Result, SourceError};
use crate::http_client::{
    Credentials, HttpClientConfig, HttpTransport, ReqwestTransport, ResponseHeaders,
    TransportRequest, TransportResponse, is_retryable_error,
};
use crate::path_util::{self, is_http_url};
use crate::remote_store::{self, MemoryStore, RemoteStore};
use chrono::{DateTime, Utc};
use flate2::write::{GzDecoder, ZlibDecoder};
use futures::StreamExt;
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument, warn};

/// Bytes inspected when checking whether a body is an HTML page
const SNIFF_LEN: usize = 512;

/// Upper bound for the recheck window
const MAX_AGE_CAP_HOURS: i64 = 24 * 365 * 100;

/// URL suffixes whose content must be XML
const XML_SUFFIXES: [&str; 6] = [".xml", ".xsd", ".xbrl", ".rss", ".dtd", ".rdf"];

static CHALLENGE_REGEX: OnceLock<Regex> = OnceLock::new();

fn challenge_regex() -> &'static Regex {
    CHALLENGE_REGEX.get_or_init(|| {
        Regex::new(r#"^[ \t]*([A-Za-z][^ \t,]*)(?:[ \t]+realm="([^"]*)")?"#)
            .expect("Failed to compile authentication challenge regex")
    })
}

/// Callbacks into the embedding application
///
/// Prompts are only issued when the cache runs interactively.
pub trait CacheDelegate: Send + Sync {
    /// Credentials for `host` (a URL directory or the proxy) and `realm`
    fn credentials(&self, host: &str, realm: &str) -> Option<Credentials>;

    /// Whether to keep an HTML page served where XML was expected
    fn confirm_unexpected_html(&self, _url: &str) -> bool {
        false
    }

    /// Whether to switch to offline mode after `error`
    fn offer_work_offline(&self, _url: &str, _error: &SourceError) -> bool {
        false
    }

    fn progress(&self, _url: &str, _downloaded: u64, _total: Option<u64>) {}
}

/// Delegate that declines every prompt
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDelegate;

impl CacheDelegate for NoopDelegate {
    fn credentials(&self, _host: &str, _realm: &str) -> Option<Credentials> {
        None
    }
}

/// Per-call options for [`WebCache::get_filename`]
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Resolve the URL against this base first
    pub base: Option<String>,
    /// Download again even when a cached copy exists
    pub reload: bool,
    /// Ignore the recorded check time and ask the server
    pub check_modified_time: bool,
    /// Normalize the URL even without a base
    pub normalize: bool,
    /// Compute the cache path without touching the network
    pub filename_only: bool,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }

    pub fn check_modified_time(mut self, check: bool) -> Self {
        self.check_modified_time = check;
        self
    }

    pub fn normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn filename_only(mut self, filename_only: bool) -> Self {
        self.filename_only = filename_only;
        self
    }
}

/// Where the content for a URL ended up
#[derive(Debug, Clone, PartialEq)]
pub enum CachedResource {
    File(PathBuf),
    /// Held in memory when backed by a remote store
    Memory { url: String, content: Vec<u8> },
}

impl CachedResource {
    pub async fn read(&self) -> Result<Vec<u8>> {
        match self {
            CachedResource::File(path) => Ok(tokio::fs::read(path).await?),
            CachedResource::Memory { content, .. } => Ok(content.clone()),
        }
    }
}

/// A failed attempt, before retry policy is applied
enum AttemptError {
    Challenge {
        proxy: bool,
        scheme: String,
        realm: String,
    },
    Failed(SourceError),
}

impl From<SourceError> for AttemptError {
    fn from(error: SourceError) -> Self {
        AttemptError::Failed(error)
    }
}

#[derive(Debug, Default)]
struct AuthCache {
    /// Credentials by URL directory
    site: Vec<(String, Credentials)>,
    proxy: Option<Credentials>,
}

impl AuthCache {
    fn for_url(&self, url: &str) -> Option<Credentials> {
        self.site
            .iter()
            .filter(|(dir, _)| url.starts_with(dir.as_str()))
            .max_by_key(|(dir, _)| dir.len())
            .map(|(_, credentials)| credentials.clone())
    }
}

enum Sink {
    File(tokio::fs::File),
    Memory(Vec<u8>),
}

impl Sink {
    async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        match self {
            Sink::File(file) => file.write_all(bytes).await,
            Sink::Memory(buffer) => {
                buffer.extend_from_slice(bytes);
                Ok(())
            }
        }
    }
}

enum ContentDecoder {
    Identity,
    Gzip(GzDecoder<Vec<u8>>),
    Deflate(ZlibDecoder<Vec<u8>>),
}

impl ContentDecoder {
    fn for_encoding(encoding: Option<&str>) -> Self {
        match encoding.map(|e| e.trim().to_ascii_lowercase()).as_deref() {
            Some("gzip") | Some("x-gzip") => ContentDecoder::Gzip(GzDecoder::new(Vec::new())),
            Some("deflate") => ContentDecoder::Deflate(ZlibDecoder::new(Vec::new())),
            _ => ContentDecoder::Identity,
        }
    }

    fn push(&mut self, chunk: &[u8]) -> std::io::Result<Vec<u8>> {
        match self {
            ContentDecoder::Identity => Ok(chunk.to_vec()),
            ContentDecoder::Gzip(decoder) => {
                decoder.write_all(chunk)?;
                Ok(std::mem::take(decoder.get_mut()))
            }
            ContentDecoder::Deflate(decoder) => {
                decoder.write_all(chunk)?;
                Ok(std::mem::take(decoder.get_mut()))
            }
        }
    }

    fn finish(self) -> std::io::Result<Vec<u8>> {
        match self {
            ContentDecoder::Identity => Ok(Vec::new()),
            ContentDecoder::Gzip(decoder) => decoder.finish(),
            ContentDecoder::Deflate(decoder) => decoder.finish(),
        }
    }
}

/// Disk cache engine
pub struct WebCache {
    codec: CacheCodec,
    builtin_dir: Option<PathBuf>,
    max_age: chrono::Duration,
    network: HttpClientConfig,
    proxy: ProxyConfig,
    transport: Arc<dyn HttpTransport>,
    delegate: Arc<dyn CacheDelegate>,
    remote_store: Option<Arc<dyn RemoteStore>>,
    check_times: UrlCheckTimes,
    auth: AuthCache,
    work_offline: bool,
    interactive: bool,
}

impl WebCache {
    /// Cache talking to the network through reqwest
    pub fn new(config: &Config, delegate: Arc<dyn CacheDelegate>) -> Result<Self> {
        let network = HttpClientConfig::from(config.network.clone());
        let transport = ReqwestTransport::new(network, &config.proxy)?;
        let mut cache = Self::with_transport(config, Arc::new(transport), delegate);
        if config.runtime.managed_environment {
            cache.remote_store = Some(Arc::new(MemoryStore::default()));
        }
        Ok(cache)
    }

    /// Cache using a caller-supplied transport
    pub fn with_transport(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        delegate: Arc<dyn CacheDelegate>,
    ) -> Self {
        let hours = i64::try_from(config.cache.max_age_hours)
            .unwrap_or(MAX_AGE_CAP_HOURS)
            .min(MAX_AGE_CAP_HOURS);
        Self {
            codec: CacheCodec::new(&config.cache.directory),
            builtin_dir: config.cache.builtin_directory.clone(),
            max_age: chrono::Duration::hours(hours),
            network: HttpClientConfig::from(config.network.clone()),
            proxy: config.proxy.clone(),
            transport,
            delegate,
            remote_store: None,
            check_times: UrlCheckTimes::new(&config.cache.app_dir),
            auth: AuthCache::default(),
            work_offline: config.runtime.work_offline,
            interactive: config.runtime.interactive,
        }
    }

    /// Keep downloaded content in `store` instead of the cache directory
    pub fn with_remote_store(mut self, store: Arc<dyn RemoteStore>) -> Self {
        self.remote_store = Some(store);
        self
    }

    /// Load the persisted check times
    pub async fn init(&mut self) {
        self.check_times.load().await;
    }

    /// Persist the check times if any changed
    pub async fn shutdown(&mut self) -> Result<()> {
        self.check_times
            .save()
            .await
            .map_err(|e| SourceError::CacheWrite {
                path: self.check_times.path().to_path_buf(),
                details: e.to_string(),
            })
    }

    pub fn cache_dir(&self) -> &Path {
        self.codec.cache_dir()
    }

    pub fn codec(&self) -> &CacheCodec {
        &self.codec
    }

    pub fn work_offline(&self) -> bool {
        self.work_offline
    }

    pub fn set_work_offline(&mut self, offline: bool) {
        self.work_offline = offline;
    }

    pub fn is_managed(&self) -> bool {
        self.remote_store.is_some()
    }

    /// When `url` was last confirmed current
    pub fn last_checked(&self, url: &str) -> Option<DateTime<Utc>> {
        self.check_times.get(url)
    }

    /// Normalize `url` against `base`; cache paths map back to their URL
    pub fn normalize_url(&self, url: &str, base: Option<&str>) -> String {
        let normed = path_util::normalize(url, base);
        if !is_http_url(&normed)
            && let Some(original) = self.codec.cache_path_to_url(Path::new(&normed))
        {
            return original;
        }
        normed
    }

    /// Local path holding the content of `url`, downloading as needed.
    ///
    /// Non-HTTP input is returned as a local path. A member of a remote
    /// archive resolves to `<cached archive>/<member>`.
    pub async fn get_filename(&mut self, url: &str, options: &GetOptions) -> Result<PathBuf> {
        let url = if options.normalize || options.base.is_some() {
            self.normalize_url(url, options.base.as_deref())
        } else if is_http_url(url) {
            path_util::normalize_http_url(url)
        } else {
            url.to_string()
        };
        if !is_http_url(&url) {
            return Ok(PathBuf::from(path_util::strip_file_scheme(&url)));
        }

        if let Some((archive, member)) = split_archive_path(&url, false) {
            let archive_options = GetOptions {
                base: None,
                normalize: false,
                ..options.clone()
            };
            let archive_path = Box::pin(self.get_filename(&archive, &archive_options)).await?;
            return Ok(join_member(&archive_path, &member));
        }

        let filepath = self.codec.url_to_cache_path(&url);

        if self.work_offline
            && !filepath.exists()
            && let Some(builtin) = self.builtin_path(&url)
        {
            debug!(url = %url, path = %builtin.display(), "using built-in cache");
            return Ok(builtin);
        }
        if options.filename_only {
            return Ok(filepath);
        }
        if self.work_offline {
            if !filepath.exists() {
                debug!(url = %url, path = %filepath.display(), "offline, not cached");
            }
            return Ok(filepath);
        }

        if !options.reload && filepath.exists() {
            let now = Utc::now();
            let checked = if options.check_modified_time {
                None
            } else {
                self.check_times.get(&url)
            };
            if let Some(checked) = checked
                && now - checked <= self.max_age
            {
                debug!(url = %url, "cache hit");
                return Ok(filepath);
            }

            return match self.newer_on_server(&url, &filepath).await {
                Ok(false) => {
                    debug!(url = %url, "cached copy is current");
                    self.check_times.touch(&url, now);
                    Ok(filepath)
                }
                Ok(true) => self.retrieve(&url, &filepath, true).await,
                Err(e) if e.is_soft_failable() => {
                    warn!(url = %url, error = %e, "recheck failed, keeping cached copy");
                    self.check_times.touch(&url, now);
                    Ok(filepath)
                }
                Err(e) => Err(e),
            };
        }

        self.retrieve(&url, &filepath, false).await
    }

    /// Like [`get_filename`](Self::get_filename), but served from the remote
    /// store when one is configured
    pub async fn resolve(&mut self, url: &str, options: &GetOptions) -> Result<CachedResource> {
        if let Some(store) = self.remote_store.clone()
            && is_http_url(url)
            && split_archive_path(url, false).is_none()
        {
            if !options.reload
                && let Some(content) = remote_store::load_content(store.as_ref(), url).await?
            {
                debug!(url, "remote store hit");
                return Ok(CachedResource::Memory {
                    url: url.to_string(),
                    content,
                });
            }
            if self.work_offline {
                return Err(SourceError::Offline {
                    url: url.to_string(),
                });
            }
            let (_, content) = self.download_with_retries(url, None).await?;
            remote_store::store_content(store.as_ref(), url, &content).await?;
            return Ok(CachedResource::Memory {
                url: url.to_string(),
                content,
            });
        }
        Ok(CachedResource::File(self.get_filename(url, options).await?))
    }

    /// Headers for `url`; empty when the server cannot be reached
    pub async fn get_headers(&self, url: &str) -> ResponseHeaders {
        match self.transport.head(&self.request_for(url)).await {
            Ok(response) => response.headers,
            Err(e) => {
                debug!(url, error = %e, "header request failed");
                ResponseHeaders::new()
            }
        }
    }

    /// `url` after following redirects
    pub async fn get_url(&self, url: &str) -> Result<String> {
        let response = self.transport.head(&self.request_for(url)).await?;
        Ok(response.final_url)
    }

    /// Delete all downloaded content
    pub async fn clear(&self) -> Result<()> {
        for scheme in ["http", "https"] {
            let dir = self.cache_dir().join(scheme);
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => info!(path = %dir.display(), "cleared cache"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(cache_write(&dir, e)),
            }
        }
        Ok(())
    }

    /// Rebuild the transport for a new proxy selection
    pub fn reset_proxies(&mut self, proxy: ProxyConfig) -> Result<()> {
        let transport = ReqwestTransport::new(self.network.clone(), &proxy)?;
        self.transport = Arc::new(transport);
        self.proxy = proxy;
        self.auth.proxy = None;
        Ok(())
    }

    fn builtin_path(&self, url: &str) -> Option<PathBuf> {
        let builtin_dir = self.builtin_dir.as_ref()?;
        let path = CacheCodec::new(builtin_dir).url_to_cache_path(url);
        path.exists().then_some(path)
    }

    fn request_for(&self, url: &str) -> TransportRequest {
        TransportRequest {
            url: url.to_string(),
            credentials: self.auth.for_url(url),
            proxy_credentials: self.auth.proxy.clone(),
        }
    }

    async fn newer_on_server(&self, url: &str, filepath: &Path) -> Result<bool> {
        let response = self.transport.head(&self.request_for(url)).await?;
        if !response.is_success() {
            return Err(status_error(url, &response));
        }
        let Some(remote) = response.headers.last_modified() else {
            return Ok(false);
        };
        let local: DateTime<Utc> = tokio::fs::metadata(filepath).await?.modified()?.into();
        Ok(remote > local)
    }

    #[instrument(skip(self, filepath), fields(path = %filepath.display()))]
    async fn retrieve(&mut self, url: &str, filepath: &Path, is_recheck: bool) -> Result<PathBuf> {
        if let Some(parent) = filepath.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| cache_write(parent, e))?;
        }
        let tmp = tmp_path(filepath);

        let error = match self.download_with_retries(url, Some(&tmp)).await {
            Ok((headers, _)) => {
                self.install(url, &tmp, filepath, &headers).await?;
                return Ok(filepath.to_path_buf());
            }
            Err(e) => e,
        };

        match error {
            SourceError::Integrity { .. } | SourceError::CacheWrite { .. } => {
                error!(url, error = %error, "retrieval failed");
                Err(error)
            }
            e if is_recheck && e.is_soft_failable() && filepath.exists() => {
                warn!(url, error = %e, "update failed, keeping cached copy");
                self.check_times.touch(url, Utc::now());
                Ok(filepath.to_path_buf())
            }
            e @ (SourceError::Http(_) | SourceError::Timeout { .. })
                if self.interactive && self.delegate.offer_work_offline(url, &e) =>
            {
                warn!(url, error = %e, "switching to offline mode");
                self.work_offline = true;
                if filepath.exists() {
                    Ok(filepath.to_path_buf())
                } else {
                    Err(SourceError::Offline {
                        url: url.to_string(),
                    })
                }
            }
            e => {
                error!(url, error = %e, "retrieval failed");
                Err(e)
            }
        }
    }

    /// Download `url` to `tmp` (or memory when `None`), retrying transient
    /// failures and answering basic authentication challenges.
    async fn download_with_retries(
        &mut self,
        url: &str,
        tmp: Option<&Path>,
    ) -> Result<(ResponseHeaders, Vec<u8>)> {
        let attempts = self.network.retry_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.download_once(url, tmp).await {
                Ok(done) => return Ok(done),
                Err(AttemptError::Challenge {
                    proxy,
                    scheme,
                    realm,
                }) => {
                    remove_tmp(tmp).await;
                    if scheme.eq_ignore_ascii_case("basic") {
                        if attempt < attempts && self.ask_credentials(url, proxy, &realm) {
                            continue;
                        }
                    } else {
                        warn!(url, scheme = %scheme, "unsupported authentication scheme");
                    }
                    SourceError::AuthenticationRequired {
                        url: url.to_string(),
                        scheme,
                        realm,
                    }
                }
                Err(AttemptError::Failed(e)) => {
                    remove_tmp(tmp).await;
                    e
                }
            };

            if is_retryable_error(&error) && attempt < attempts {
                warn!(url, attempt, error = %error, "retrying download");
                tokio::time::sleep(self.network.retry_delay(attempt - 1)).await;
                continue;
            }
            return Err(error);
        }
    }

    fn ask_credentials(&mut self, url: &str, proxy: bool, realm: &str) -> bool {
        if !self.interactive {
            return false;
        }
        let host = if proxy {
            self.proxy.proxy_url().unwrap_or_default()
        } else {
            url_dir(url).to_string()
        };
        match self.delegate.credentials(&host, realm) {
            Some(credentials) if proxy => {
                self.auth.proxy = Some(credentials);
                true
            }
            Some(credentials) => {
                self.auth.site.push((host, credentials));
                true
            }
            None => false,
        }
    }

    async fn download_once(
        &self,
        url: &str,
        tmp: Option<&Path>,
    ) -> std::result::Result<(ResponseHeaders, Vec<u8>), AttemptError> {
        let response = self.transport.get(&self.request_for(url)).await?;

        if matches!(response.status, 401 | 407) {
            let proxy = response.status == 407;
            let header = response
                .headers
                .get(if proxy {
                    "proxy-authenticate"
                } else {
                    "www-authenticate"
                })
                .unwrap_or("");
            return Err(match parse_challenge(header) {
                Some((scheme, realm)) => AttemptError::Challenge {
                    proxy,
                    scheme,
                    realm,
                },
                None => AttemptError::Failed(status_error(url, &response)),
            });
        }
        if !response.is_success() {
            return Err(status_error(url, &response).into());
        }

        let TransportResponse {
            headers, mut body, ..
        } = response;
        let expected = headers.content_length();
        let mut decoder = ContentDecoder::for_encoding(headers.content_encoding());
        let mut sink = match tmp {
            Some(tmp) => Sink::File(
                tokio::fs::File::create(tmp)
                    .await
                    .map_err(|e| cache_write(tmp, e))?,
            ),
            None => Sink::Memory(Vec::new()),
        };
        let mut sniff = expects_xml(url).then(Vec::new);
        let mut received = 0u64;
        self.delegate.progress(url, 0, expected);

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            received += chunk.len() as u64;
            let decoded = decoder
                .push(&chunk)
                .map_err(|e| SourceError::format(url, None, e))?;
            self.sniff_html(url, &mut sniff, &decoded, false)?;
            sink.write(&decoded)
                .await
                .map_err(|e| sink_error(url, tmp, e))?;
            self.delegate.progress(url, received, expected);
        }
        let tail = decoder
            .finish()
            .map_err(|e| SourceError::format(url, None, e))?;
        self.sniff_html(url, &mut sniff, &tail, true)?;
        sink.write(&tail)
            .await
            .map_err(|e| sink_error(url, tmp, e))?;

        if let Some(expected) = expected
            && received < expected
        {
            return Err(SourceError::Integrity {
                url: url.to_string(),
                expected,
                actual: received,
            }
            .into());
        }

        let content = match sink {
            Sink::File(mut file) => {
                file.flush().await.map_err(|e| sink_error(url, tmp, e))?;
                Vec::new()
            }
            Sink::Memory(buffer) => buffer,
        };
        Ok((headers, content))
    }

    /// Collects the start of the body and rejects HTML served in place of XML
    fn sniff_html(
        &self,
        url: &str,
        sniff: &mut Option<Vec<u8>>,
        decoded: &[u8],
        last: bool,
    ) -> Result<()> {
        let Some(head) = sniff else {
            return Ok(());
        };
        let wanted = SNIFF_LEN.saturating_sub(head.len()).min(decoded.len());
        head.extend_from_slice(&decoded[..wanted]);
        if head.len() < SNIFF_LEN && !last {
            return Ok(());
        }
        let is_html = looks_like_html(head);
        *sniff = None;
        if is_html {
            if self.interactive && self.delegate.confirm_unexpected_html(url) {
                warn!(url, "keeping HTML response on request");
                return Ok(());
            }
            return Err(SourceError::UnexpectedHtml {
                url: url.to_string(),
            });
        }
        Ok(())
    }

    async fn install(
        &mut self,
        url: &str,
        tmp: &Path,
        filepath: &Path,
        headers: &ResponseHeaders,
    ) -> Result<()> {
        if let Ok(metadata) = tokio::fs::symlink_metadata(filepath).await {
            let removed = if metadata.is_dir() {
                tokio::fs::remove_dir_all(filepath).await
            } else {
                tokio::fs::remove_file(filepath).await
            };
            if let Err(e) = removed {
                remove_tmp(Some(tmp)).await;
                return Err(cache_write(filepath, e));
            }
        }
        tokio::fs::rename(tmp, filepath)
            .await
            .map_err(|e| cache_write(filepath, e))?;

        if let Some(last_modified) = headers.last_modified()
            && let Err(e) = set_modified(filepath, last_modified)
        {
            warn!(path = %filepath.display(), error = %e, "cannot set modification time");
        }
        self.check_times.touch(url, Utc::now());
        info!(url, path = %filepath.display(), "cached");
        Ok(())
    }
}

/// `(scheme, realm)` from a `WWW-Authenticate` or `Proxy-Authenticate` value
pub fn parse_challenge(header: &str) -> Option<(String, String)> {
    let caps = challenge_regex().captures(header)?;
    let realm = caps.get(2).map_or("", |m| m.as_str());
    Some((caps[1].to_string(), realm.to_string()))
}

/// Whether the start of a body is an HTML page
pub fn looks_like_html(head: &[u8]) -> bool {
    let head = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
    let start = head
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(head.len());
    let prefix: Vec<u8> = head[start..]
        .iter()
        .take(14)
        .map(u8::to_ascii_lowercase)
        .collect();
    prefix.starts_with(b"<!doctype html") || prefix.starts_with(b"<html")
}

fn expects_xml(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    XML_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

fn url_dir(url: &str) -> &str {
    match url.rfind('/') {
        Some(idx) => &url[..idx],
        None => url,
    }
}

fn join_member(archive_path: &Path, member: &str) -> PathBuf {
    member
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .fold(archive_path.to_path_buf(), |path, segment| path.join(segment))
}

fn tmp_path(filepath: &Path) -> PathBuf {
    let mut name = filepath.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

async fn remove_tmp(tmp: Option<&Path>) {
    if let Some(tmp) = tmp
        && let Err(e) = tokio::fs::remove_file(tmp).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %tmp.display(), error = %e, "cannot remove partial download");
    }
}

fn set_modified(path: &Path, when: DateTime<Utc>) -> std::io::Result<()> {
    let file = std::fs::File::options().write(true).open(path)?;
    file.set_modified(SystemTime::from(when))
}

fn status_error(url: &str, response: &TransportResponse) -> SourceError {
    SourceError::HttpStatus {
        url: url.to_string(),
        status: response.status,
        message: format!("HTTP {}", response.status),
    }
}

fn cache_write(path: &Path, error: std::io::Error) -> SourceError {
    SourceError::CacheWrite {
        path: path.to_path_buf(),
        details: error.to_string(),
    }
}

fn sink_error(url: &str, tmp: Option<&Path>, error: std::io::Error) -> SourceError {
    match tmp {
        Some(tmp) => cache_write(tmp, error),
        None => SourceError::IncompleteRead {
            url: url.to_string(),
            details: error.to_string(),
        },
    }
}

use crate::config::{NetworkConfig, ProxyConfig};
use crate::error::{Result, SourceError};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{ACCEPT_ENCODING, HeaderMap, PROXY_AUTHORIZATION};
use reqwest::{Client, Proxy, RequestBuilder};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::timeout;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Number of attempts per retrieval
    pub retry_attempts: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds (for exponential backoff cap)
    pub max_retry_delay_ms: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        NetworkConfig::default().into()
    }
}

impl From<NetworkConfig> for HttpClientConfig {
    fn from(network: NetworkConfig) -> Self {
        Self {
            timeout_seconds: network.timeout_seconds,
            retry_attempts: network.retry_attempts,
            retry_delay_ms: network.retry_delay_ms,
            max_retry_delay_ms: network.max_retry_delay_ms,
            user_agent: network.user_agent,
        }
    }
}

impl HttpClientConfig {
    /// Backoff before the attempt following `attempt` (0-based)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .retry_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt));
        Duration::from_millis(delay_ms.min(self.max_retry_delay_ms))
    }
}

/// User name and password for basic authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    fn basic_header(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.user, self.password));
        format!("Basic {}", token)
    }
}

/// One request as seen by a transport
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub credentials: Option<Credentials>,
    pub proxy_credentials: Option<Credentials>,
}

impl TransportRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credentials: None,
            proxy_credentials: None,
        }
    }
}

/// Response headers with lower-cased names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseHeaders(BTreeMap<String, String>);

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn content_length(&self) -> Option<u64> {
        self.get("content-length")?.trim().parse().ok()
    }

    pub fn content_encoding(&self) -> Option<&str> {
        self.get("content-encoding")
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        let value = self.get("last-modified")?;
        DateTime::parse_from_rfc2822(value.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn from_header_map(map: &HeaderMap) -> Self {
        let mut headers = Self::new();
        for (name, value) in map {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str(), value);
            }
        }
        headers
    }
}

impl FromIterator<(String, String)> for ResponseHeaders {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(&name, value);
        }
        headers
    }
}

/// Response body delivered in chunks as the server sends them
pub type BodyStream = BoxStream<'static, Result<Vec<u8>>>;

pub struct TransportResponse {
    pub status: u16,
    /// URL after following redirects
    pub final_url: String,
    pub headers: ResponseHeaders,
    pub body: BodyStream,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network access used by the cache engine
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn head(&self, request: &TransportRequest) -> Result<TransportResponse>;

    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse>;
}

/// Production transport over reqwest
///
/// Compressed bodies are requested explicitly and left compressed so the
/// byte count can be checked against `Content-Length`.
pub struct ReqwestTransport {
    client: Client,
    config: HttpClientConfig,
}

impl ReqwestTransport {
    /// Create a transport honoring the given proxy selection
    pub fn new(config: HttpClientConfig, proxy: &ProxyConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10);

        match proxy.proxy_url() {
            None => {}
            Some(url) if url.is_empty() => builder = builder.no_proxy(),
            Some(url) => {
                let mut reqwest_proxy = Proxy::all(&url)
                    .map_err(|e| SourceError::Config(format!("invalid proxy {}: {}", url, e)))?;
                if let Some(user) = &proxy.user {
                    reqwest_proxy =
                        reqwest_proxy.basic_auth(user, proxy.password.as_deref().unwrap_or(""));
                }
                builder = builder.no_proxy().proxy(reqwest_proxy);
            }
        }

        let client = builder.build().map_err(SourceError::from)?;
        Ok(Self { client, config })
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    fn prepare(&self, builder: RequestBuilder, request: &TransportRequest) -> RequestBuilder {
        let mut builder = builder.header(ACCEPT_ENCODING, "gzip, deflate");
        if let Some(credentials) = &request.credentials {
            builder = builder.basic_auth(&credentials.user, Some(&credentials.password));
        }
        if let Some(credentials) = &request.proxy_credentials {
            builder = builder.header(PROXY_AUTHORIZATION, credentials.basic_header());
        }
        builder
    }

    /// Send with the configured timeout around connection and headers
    async fn send(&self, builder: RequestBuilder, url: &str) -> Result<TransportResponse> {
        let response = timeout(Duration::from_secs(self.config.timeout_seconds), builder.send())
            .await
            .map_err(|_| SourceError::Timeout {
                url: url.to_string(),
                timeout_seconds: self.config.timeout_seconds,
            })?
            .map_err(SourceError::from)?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = ResponseHeaders::from_header_map(response.headers());
        let body_url = url.to_string();
        let timeout_seconds = self.config.timeout_seconds;
        // each read gets the full timeout; a stalled body fails instead of hanging
        let body = stream::unfold(Some(response), move |state| {
            let url = body_url.clone();
            async move {
                let mut response = state?;
                match timeout(Duration::from_secs(timeout_seconds), response.chunk()).await {
                    Err(_) => Some((
                        Err(SourceError::Timeout {
                            url,
                            timeout_seconds,
                        }),
                        None,
                    )),
                    Ok(Ok(Some(bytes))) => Some((Ok(bytes.to_vec()), Some(response))),
                    Ok(Ok(None)) => None,
                    Ok(Err(e)) => Some((Err(body_error(&url, e)), None)),
                }
            }
        })
        .boxed();

        Ok(TransportResponse {
            status,
            final_url,
            headers,
            body,
        })
    }
}

fn body_error(url: &str, e: reqwest::Error) -> SourceError {
    if e.is_body() || e.is_decode() || e.is_timeout() {
        SourceError::IncompleteRead {
            url: url.to_string(),
            details: e.to_string(),
        }
    } else {
        SourceError::from(e)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn head(&self, request: &TransportRequest) -> Result<TransportResponse> {
        let builder = self.prepare(self.client.head(&request.url), request);
        self.send(builder, &request.url).await
    }

    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse> {
        let builder = self.prepare(self.client.get(&request.url), request);
        self.send(builder, &request.url).await
    }
}

/// Check if an error is worth another attempt
pub fn is_retryable_error(error: &SourceError) -> bool {
    match error {
        SourceError::Http(reqwest_error) => {
            reqwest_error.is_timeout() || reqwest_error.is_connect() || reqwest_error.is_request()
        }
        SourceError::Timeout { .. } | SourceError::IncompleteRead { .. } => true,
        _ => false,
    }
}

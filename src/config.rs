use crate::cli::Cli;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid proxy specification: {0}")]
    Proxy(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub network: NetworkConfig,
    pub proxy: ProxyConfig,
    pub runtime: RuntimeConfig,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Root of the URL-mirroring cache tree
    pub directory: PathBuf,
    /// Directory holding `cachedUrlCheckTimes.json`
    pub app_dir: PathBuf,
    /// Read-only bundled cache tree consulted when offline
    pub builtin_directory: Option<PathBuf>,
    /// Hours a cached file is trusted before its server copy is rechecked
    pub max_age_hours: u64,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Timeout applied to every request, in seconds
    pub timeout_seconds: u64,
    /// Total download attempts per retrieval
    pub retry_attempts: u32,
    /// Base delay between attempts in milliseconds (doubles each attempt)
    pub retry_delay_ms: u64,
    /// Cap for the exponential backoff in milliseconds
    pub max_retry_delay_ms: u64,
    /// User agent string
    pub user_agent: String,
}

/// Proxy selection
///
/// `use_system_proxy` defers to the environment. Otherwise an empty `host`
/// disables proxying altogether.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    pub use_system_proxy: bool,
    pub host: String,
    pub port: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Process-level behavior switches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Never contact the network
    pub work_offline: bool,
    /// A user is present to answer credential and confirmation prompts
    pub interactive: bool,
    /// Keep downloaded content in the remote key/value store instead of on disk
    pub managed_environment: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("filing-source"),
            app_dir: dirs::config_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("filing-source"),
            builtin_directory: None,
            max_age_hours: 24 * 7,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 5,
            retry_delay_ms: 0,
            max_retry_delay_ms: 30000,
            user_agent: format!("filing-source/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::system()
    }
}

impl ProxyConfig {
    /// Use whatever proxy the environment configures
    pub fn system() -> Self {
        Self {
            use_system_proxy: true,
            host: String::new(),
            port: None,
            user: None,
            password: None,
        }
    }

    /// Connect directly, bypassing any environment proxy
    pub fn none() -> Self {
        Self {
            use_system_proxy: false,
            ..Self::system()
        }
    }

    /// Parse `system`, `none` or `[http://][user[:password]@]host[:port]`
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        match value.to_ascii_lowercase().as_str() {
            "system" | "" => return Ok(Self::system()),
            "none" | "direct" => return Ok(Self::none()),
            _ => {}
        }
        let rest = value
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(value)
            .trim_end_matches('/');
        let (credentials, host_port) = match rest.rsplit_once('@') {
            Some((credentials, host_port)) => (Some(credentials), host_port),
            None => (None, rest),
        };
        let (user, password) = match credentials {
            Some(c) => match c.split_once(':') {
                Some((u, p)) => (Some(u.to_string()), Some(p.to_string())),
                None => (Some(c.to_string()), None),
            },
            None => (None, None),
        };
        let (host, port) = match host_port.rsplit_once(':') {
            Some((h, p)) => (h.to_string(), Some(p.to_string())),
            None => (host_port.to_string(), None),
        };
        if host.is_empty() {
            return Err(ConfigError::Proxy(value.to_string()));
        }
        Ok(Self {
            use_system_proxy: false,
            host,
            port,
            user,
            password,
        })
    }

    /// `None` for the system proxy, `Some("")` to block proxies, else the proxy URL
    pub fn proxy_url(&self) -> Option<String> {
        if self.use_system_proxy {
            return None;
        }
        if self.host.is_empty() {
            return Some(String::new());
        }
        Some(match &self.port {
            Some(port) => format!("http://{}:{}", self.host, port),
            None => format!("http://{}", self.host),
        })
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            config = Self::load_from_file(config_path).await?;
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = found_config;
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli)?;

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "filing-source.toml",
            ".filing-source.toml",
            "filing-source.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("filing-source");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(cache_dir) = env.get("FILING_SOURCE_CACHE_DIR") {
            config.cache.directory = PathBuf::from(cache_dir);
        }

        if let Some(max_age) = env.get("FILING_SOURCE_MAX_AGE_HOURS") {
            config.cache.max_age_hours = parse_env("FILING_SOURCE_MAX_AGE_HOURS", &max_age)?;
        }

        if let Some(timeout) = env.get("FILING_SOURCE_TIMEOUT") {
            config.network.timeout_seconds = parse_env("FILING_SOURCE_TIMEOUT", &timeout)?;
        }

        if let Some(retry_attempts) = env.get("FILING_SOURCE_RETRY_ATTEMPTS") {
            config.network.retry_attempts =
                parse_env("FILING_SOURCE_RETRY_ATTEMPTS", &retry_attempts)?;
        }

        if let Some(proxy) = env.get("FILING_SOURCE_PROXY") {
            config.proxy = ProxyConfig::parse(&proxy).map_err(|_| {
                ConfigError::Environment(format!("Invalid FILING_SOURCE_PROXY value: {}", proxy))
            })?;
        }

        if let Some(offline) = env.get("FILING_SOURCE_OFFLINE") {
            config.runtime.work_offline = parse_env("FILING_SOURCE_OFFLINE", &offline)?;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Result<Config> {
        if let Some(cache_dir) = &cli.cache_dir {
            config.cache.directory = cache_dir.clone();
        }
        if let Some(max_age) = cli.max_age_hours {
            config.cache.max_age_hours = max_age;
        }
        if let Some(timeout) = cli.timeout {
            config.network.timeout_seconds = timeout;
        }
        if let Some(retry_attempts) = cli.retry_attempts {
            config.network.retry_attempts = retry_attempts;
        }
        if let Some(proxy) = &cli.proxy {
            config.proxy = ProxyConfig::parse(proxy)?;
        }
        if cli.offline {
            config.runtime.work_offline = true;
        }
        config.runtime.interactive = cli.is_interactive();

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.cache.max_age_hours == 0 {
            return Err(ConfigError::Validation(
                "Cache max age must be greater than 0".to_string(),
            ));
        }

        if config.network.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if config.network.retry_attempts == 0 || config.network.retry_attempts > 20 {
            return Err(ConfigError::Validation(
                "Retry attempts must be between 1 and 20".to_string(),
            ));
        }

        if let Some(port) = &config.proxy.port
            && port.parse::<u16>().is_err()
        {
            return Err(ConfigError::Validation(format!(
                "Invalid proxy port: {}",
                port
            )));
        }

        Ok(())
    }

    /// Convert configuration to Duration for network timeout
    pub fn get_timeout_duration(config: &Config) -> Duration {
        Duration::from_secs(config.network.timeout_seconds)
    }

    /// Convert configuration to Duration for the recheck window
    pub fn get_max_age_duration(config: &Config) -> Duration {
        Duration::from_secs(config.cache.max_age_hours * 3600)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
}

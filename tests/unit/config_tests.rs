use clap::Parser;
use tempfile::TempDir;

use filing_source::config::{CacheConfig, Config, ConfigManager, EnvProvider, ProxyConfig};
use filing_source::{Cli, ConfigError};

struct FixedEnv(Vec<(&'static str, &'static str)>);

impl EnvProvider for FixedEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.0
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.cache.max_age_hours, 24 * 7);
    assert!(config.cache.directory.ends_with("filing-source"));
    assert!(config.cache.builtin_directory.is_none());
    assert!(config.network.timeout_seconds > 0);
    assert!(config.proxy.use_system_proxy);
    assert!(!config.runtime.work_offline);
    assert!(ConfigManager::validate_config(&config).is_ok());
}

#[tokio::test]
async fn test_partial_toml_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("filing-source.toml");
    std::fs::write(&path, "[cache]\nmax_age_hours = 2\n\n[runtime]\nwork_offline = true\n").unwrap();

    let config = ConfigManager::load_from_file(&path).await.unwrap();
    assert_eq!(config.cache.max_age_hours, 2);
    assert!(config.runtime.work_offline);
    assert_eq!(config.network, Config::default().network);
    assert_eq!(
        config.cache,
        CacheConfig {
            max_age_hours: 2,
            ..CacheConfig::default()
        }
    );
}

#[test]
fn test_precedence_file_env_cli() {
    let mut config = Config::default();
    config.cache.max_age_hours = 5;
    config.network.retry_attempts = 2;

    let env = FixedEnv(vec![
        ("FILING_SOURCE_MAX_AGE_HOURS", "10"),
        ("FILING_SOURCE_PROXY", "none"),
    ]);
    let config = ConfigManager::apply_environment_overrides_with(&env, config).unwrap();
    assert_eq!(config.cache.max_age_hours, 10);
    assert_eq!(config.proxy, ProxyConfig::none());

    let cli = Cli::try_parse_from([
        "filing-source",
        "--max-age-hours",
        "1",
        "--proxy",
        "alice:secret@proxy.local:3128",
        "--no-prompt",
        "clear",
    ])
    .unwrap();
    let config = ConfigManager::merge_with_cli(config, &cli).unwrap();
    assert_eq!(config.cache.max_age_hours, 1);
    assert_eq!(config.network.retry_attempts, 2);
    assert_eq!(config.proxy.host, "proxy.local");
    assert_eq!(config.proxy.user.as_deref(), Some("alice"));
    assert_eq!(config.proxy.proxy_url().as_deref(), Some("http://proxy.local:3128"));
    assert!(!config.runtime.interactive);
}

#[test]
fn test_bad_environment_value() {
    let env = FixedEnv(vec![("FILING_SOURCE_TIMEOUT", "soon")]);
    let result = ConfigManager::apply_environment_overrides_with(&env, Config::default());
    assert!(matches!(result, Err(ConfigError::Environment(_))));
}

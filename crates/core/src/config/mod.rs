//! Client configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SGTN_*)
//! 2. TOML config file (if SGTN_CONFIG_FILE set)
//! 3. Built-in defaults

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Client configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SGTN_*)
/// 2. TOML config file (if SGTN_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the remote translation service.
    ///
    /// Set via SGTN_SERVER_URL environment variable.
    #[serde(default)]
    pub server_url: Option<String>,

    /// Root directory of local bundles (`<root>/<product>/<version>/<component>/messages_<locale>.json`).
    ///
    /// Set via SGTN_LOCAL_BUNDLES environment variable.
    #[serde(default)]
    pub local_bundles: Option<PathBuf>,

    /// Locale used when a requested locale has no data.
    ///
    /// Set via SGTN_DEFAULT_LOCALE environment variable.
    #[serde(default)]
    pub default_locale: Option<String>,

    /// Ordered locale fallback chain. Empty means `[default_locale]`.
    #[serde(default)]
    pub fallback_locales: Vec<String>,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SGTN_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Freshness applied when the server sends no usable `Cache-Control`.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: i64,

    /// How long the remote origin fails fast after a timeout.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// How long a caller waits on another caller's in-flight fetch. 0 waits forever.
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Extra headers sent with every remote request.
    ///
    /// Set via SGTN_HEADERS__<NAME> environment variables; `_` in `<NAME>`
    /// becomes `-`, so `SGTN_HEADERS__X_TENANT` sets `x-tenant`.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_ttl_secs() -> i64 {
    86_400
}

fn default_retry_interval_ms() -> u64 {
    2_000
}

fn default_wait_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    "sgtn-client/0.1".into()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            local_bundles: None,
            default_locale: None,
            fallback_locales: Vec::new(),
            timeout_ms: default_timeout_ms(),
            default_ttl_secs: default_ttl_secs(),
            retry_interval_ms: default_retry_interval_ms(),
            wait_timeout_ms: default_wait_timeout_ms(),
            user_agent: default_user_agent(),
            headers: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// `None` when waiting on an in-flight fetch is unbounded.
    pub fn wait_timeout(&self) -> Option<Duration> {
        (self.wait_timeout_ms > 0).then(|| Duration::from_millis(self.wait_timeout_ms))
    }

    /// Ordered locale fallback chain; always contains the default locale.
    pub fn fallback_chain(&self) -> Vec<String> {
        let default_locale = self.default_locale.as_deref().map(str::trim).unwrap_or_default();
        let mut chain: Vec<String> = self
            .fallback_locales
            .iter()
            .map(|locale| locale.trim().to_string())
            .filter(|locale| !locale.is_empty())
            .collect();

        if !default_locale.is_empty() && !chain.iter().any(|locale| locale.eq_ignore_ascii_case(default_locale)) {
            chain.push(default_locale.to_string());
        }
        chain
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SGTN_`
    /// 2. TOML file from `SGTN_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config_file = std::env::var_os("SGTN_CONFIG_FILE").map(PathBuf::from);
        Self::from_figment(&Self::figment(config_file.as_deref()))
    }

    /// Defaults, then `config_file` (if any), then `SGTN_*` environment variables.
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_file) = config_file {
            figment = figment.merge(Toml::file(config_file));
        }

        figment.merge(
            Env::prefixed("SGTN_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| env_key(key.as_str()).into())
                .split("__"),
        )
    }

    /// Extract and validate configuration from an already layered figment.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

/// Lower-cased figment key for an `SGTN_*` variable (prefix already stripped).
fn env_key(key: &str) -> String {
    let key = key.to_lowercase();
    match key.strip_prefix("headers__") {
        Some(name) => format!("headers__{}", name.replace('_', "-")),
        None => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.server_url.is_none());
        assert!(config.local_bundles.is_none());
        assert!(config.default_locale.is_none());
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.default_ttl_secs, 86_400);
        assert_eq!(config.retry_interval_ms, 2_000);
        assert_eq!(config.user_agent, "sgtn-client/0.1");
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_durations() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.retry_interval(), Duration::from_secs(2));
        assert_eq!(config.wait_timeout(), Some(Duration::from_secs(30)));

        let config = ClientConfig { wait_timeout_ms: 0, ..Default::default() };
        assert_eq!(config.wait_timeout(), None);
    }

    #[test]
    fn test_fallback_chain_defaults_to_default_locale() {
        let config = ClientConfig { default_locale: Some("en".into()), ..Default::default() };
        assert_eq!(config.fallback_chain(), vec!["en".to_string()]);
    }

    #[test]
    fn test_fallback_chain_keeps_configured_order() {
        let config = ClientConfig {
            default_locale: Some("EN".into()),
            fallback_locales: vec!["en".into(), "fr".into(), "de".into()],
            ..Default::default()
        };
        assert_eq!(config.fallback_chain(), vec!["en".to_string(), "fr".to_string(), "de".to_string()]);
    }

    #[test]
    fn test_fallback_chain_appends_missing_default() {
        let config = ClientConfig {
            default_locale: Some("en".into()),
            fallback_locales: vec!["fr".into(), " ".into()],
            ..Default::default()
        };
        assert_eq!(config.fallback_chain(), vec!["fr".to_string(), "en".to_string()]);
    }

    #[test]
    fn test_from_figment_toml() {
        let figment = Figment::from(Serialized::defaults(ClientConfig::default())).merge(Toml::string(
            r#"
            server_url = "https://l10n.example.com"
            default_locale = "en"
            fallback_locales = ["en", "fr"]
            timeout_ms = 5000

            [headers]
            X-Tenant = "acme"
            "#,
        ));

        let config = ClientConfig::from_figment(&figment).unwrap();
        assert_eq!(config.server_url.as_deref(), Some("https://l10n.example.com"));
        assert_eq!(config.timeout_ms, 5_000);
        assert_eq!(config.headers.get("X-Tenant").map(String::as_str), Some("acme"));
    }

    #[test]
    fn test_from_figment_rejects_missing_origin() {
        let figment = Figment::from(Serialized::defaults(ClientConfig::default()))
            .merge(Toml::string(r#"default_locale = "en""#));
        let result = ClientConfig::from_figment(&figment);
        assert!(matches!(result, Err(ConfigError::NoOriginConfigured)));
    }

    #[test]
    fn test_figment_reads_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sgtn.toml");
        std::fs::write(&path, "local_bundles = \"/srv/bundles\"\ndefault_locale = \"fr\"\nwait_timeout_ms = 0\n").unwrap();

        let config = ClientConfig::from_figment(&ClientConfig::figment(Some(&path))).unwrap();
        assert_eq!(config.local_bundles.as_deref(), Some(Path::new("/srv/bundles")));
        assert_eq!(config.default_locale.as_deref(), Some("fr"));
        assert_eq!(config.wait_timeout(), None);
    }

    #[test]
    fn test_env_key() {
        assert_eq!(env_key("SERVER_URL"), "server_url");
        assert_eq!(env_key("DEFAULT_TTL_SECS"), "default_ttl_secs");
        assert_eq!(env_key("HEADERS__X_TENANT"), "headers__x-tenant");
    }

    #[test]
    fn test_env_header_names_use_dashes() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SGTN_SERVER_URL", "https://l10n.example.com");
            jail.set_env("SGTN_DEFAULT_LOCALE", "en");
            jail.set_env("SGTN_WAIT_TIMEOUT_MS", "500");
            jail.set_env("SGTN_HEADERS__X_TENANT", "acme");

            let config = ClientConfig::from_figment(&ClientConfig::figment(None)).unwrap();
            assert_eq!(config.headers.get("x-tenant").map(String::as_str), Some("acme"));
            assert_eq!(config.wait_timeout_ms, 500);
            Ok(())
        });
    }
}

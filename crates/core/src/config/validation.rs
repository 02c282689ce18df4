//! Configuration validation rules.
//!
//! This module provides validation logic for `ClientConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::ClientConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("NO_ORIGIN_CONFIGURED: neither server_url nor local_bundles is set")]
    NoOriginConfigured,

    #[error("NO_DEFAULT_LOCALE: default_locale is not set")]
    NoDefaultLocale,

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl ClientConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// - `ConfigError::NoOriginConfigured` if neither a server URL nor a local bundle root is set
    /// - `ConfigError::NoDefaultLocale` if the default locale is missing or blank
    /// - `ConfigError::Invalid` if the server URL is not an absolute http(s) URL, `timeout_ms` is
    ///   outside 100ms..=5min, or `default_ttl_secs` is negative
    pub fn validate(&self) -> Result<(), ConfigError> {
        let has_server = self.server_url.as_deref().is_some_and(|url| !url.trim().is_empty());
        let has_bundles = self
            .local_bundles
            .as_deref()
            .is_some_and(|root| !root.as_os_str().is_empty());
        if !has_server && !has_bundles {
            return Err(ConfigError::NoOriginConfigured);
        }

        if self.default_locale.as_deref().is_none_or(|locale| locale.trim().is_empty()) {
            return Err(ConfigError::NoDefaultLocale);
        }

        if has_server && let Some(server_url) = self.server_url.as_deref() {
            let parsed = url::Url::parse(server_url.trim())
                .map_err(|e| ConfigError::Invalid { field: "server_url".into(), reason: e.to_string() })?;
            if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
                return Err(ConfigError::Invalid {
                    field: "server_url".into(),
                    reason: "must be an absolute http or https URL".into(),
                });
            }
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.default_ttl_secs < 0 {
            return Err(ConfigError::Invalid { field: "default_ttl_secs".into(), reason: "must not be negative".into() });
        }

        if self.wait_timeout_ms == 0 {
            tracing::warn!("wait_timeout_ms is 0; callers wait on in-flight fetches without a limit");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn valid_config() -> ClientConfig {
        ClientConfig {
            server_url: Some("https://l10n.example.com/base".into()),
            default_locale: Some("en".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_local_only() {
        let config = ClientConfig {
            local_bundles: Some(PathBuf::from("./bundles")),
            default_locale: Some("en".into()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_no_origin() {
        let config = ClientConfig { default_locale: Some("en".into()), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::NoOriginConfigured)));

        let config = ClientConfig { server_url: Some("  ".into()), ..config };
        assert!(matches!(config.validate(), Err(ConfigError::NoOriginConfigured)));
    }

    #[test]
    fn test_validate_no_default_locale() {
        let config = ClientConfig { default_locale: None, ..valid_config() };
        assert!(matches!(config.validate(), Err(ConfigError::NoDefaultLocale)));

        let config = ClientConfig { default_locale: Some(String::new()), ..valid_config() };
        assert!(matches!(config.validate(), Err(ConfigError::NoDefaultLocale)));
    }

    #[test]
    fn test_validate_bad_server_url() {
        let config = ClientConfig { server_url: Some("not a url".into()), ..valid_config() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "server_url"));

        let config = ClientConfig { server_url: Some("ftp://l10n.example.com".into()), ..valid_config() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "server_url"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = ClientConfig { timeout_ms: 50, ..valid_config() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = ClientConfig { timeout_ms: 301_000, ..valid_config() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = ClientConfig { timeout_ms: 100, ..valid_config() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_negative_ttl() {
        let config = ClientConfig { default_ttl_secs: -1, ..valid_config() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "default_ttl_secs"));
    }
}

//! Configuration management for Vatio
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files.

use crate::error::{Result, VatioError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default endpoint of the REE "datos" real-time market prices API
pub const DEFAULT_API_URL: &str =
    "https://apidatos.ree.es/es/datos/mercados/precios-mercados-tiempo-real";

fn default_true() -> bool {
    true
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream price API configuration
    pub api: ApiConfig,

    /// Terminal presentation configuration
    pub ui: UiConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Upstream API connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Endpoint URL for the hourly price query
    pub url: String,

    /// Declarative retry policy
    pub retry: RetryConfig,

    /// Declarative timeout policy
    pub timeout: TimeoutConfig,
}

/// Exponential backoff parameters between retry attempts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Backoff factor applied between attempts after the second try.
    /// Formula: factor * (2 ^ number_of_previous_retries). 0.0 disables.
    pub factor: f64,

    /// Seconds not to exceed when waiting between retries. 0.0 disables.
    pub max: f64,

    /// Upper range in seconds for random jitter added to each pause.
    /// 0.0 disables.
    pub jitter: f64,
}

/// Declarative retry policy for the price API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Backoff between attempts
    pub backoff: BackoffConfig,

    /// Maximum amount of HTTP redirections to follow. 0 fails instantly.
    pub redirect: u32,

    /// Total amount of retries to allow, regardless of their type. Takes
    /// precedence over the granular counts below. Remove from the
    /// configuration to use the granular counts instead.
    pub total: Option<u32>,

    /// Amount of connection failures to retry on. Ignored if `total` is set.
    pub connect: u32,

    /// Amount of read failures to retry on. Ignored if `total` is set.
    pub read: u32,

    /// Amount of status failures (in `status_forcelist`) to retry on.
    /// Ignored if `total` is set.
    pub status: u32,

    /// Amount of other failures to retry on. Ignored if `total` is set.
    pub other: u32,

    /// HTTP method names considered safe to retry. Remove from the
    /// configuration to retry any method.
    pub allowed_methods: Option<Vec<String>>,

    /// Force retrying when the response status is in this list. Empty list
    /// ignores the status.
    pub status_forcelist: Vec<u16>,
}

/// Declarative timeout policy for the price API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Seconds after which an initiated request is considered timed out.
    /// Takes precedence over the granular durations below. Remove from the
    /// configuration to use the granular durations instead.
    pub total: Option<f64>,

    /// Seconds to wait for a connection attempt to succeed. 0.0 disables.
    pub connect: f64,

    /// Seconds to wait for a response from a connected server. 0.0 disables.
    pub read: f64,
}

/// Terminal presentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Unit shown in the rate column header
    pub currency_unit: String,

    /// Mark the table row matching the current hour
    #[serde(default = "default_true")]
    pub highlight_current: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Directory for rotated log files; console-only when unset
    pub file: Option<String>,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,

    /// Number of rotated log files to keep
    pub backup_count: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            ui: UiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            retry: RetryConfig::default(),
            timeout: TimeoutConfig::default(),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            factor: 1.0,
            max: 0.0,
            jitter: 1.0,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            redirect: 3,
            total: Some(3),
            connect: 0,
            read: 0,
            status: 3,
            other: 0,
            allowed_methods: Some(
                ["HEAD", "GET", "PUT", "DELETE", "OPTIONS", "TRACE"]
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            ),
            status_forcelist: Vec::new(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            total: Some(3.0),
            connect: 0.0,
            read: 0.0,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            currency_unit: "€/MWh".to_string(),
            highlight_current: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: None,
            console_output: true,
            json_format: false,
            backup_count: 5,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default locations, falling back to the
    /// built-in defaults when no file is present
    pub fn load() -> Result<Self> {
        let mut candidates = vec!["vatio.yaml".to_string()];
        if let Some(home) = std::env::var_os("HOME") {
            let home = Path::new(&home);
            candidates.push(
                home.join(".config/vatio/config.yaml")
                    .to_string_lossy()
                    .into_owned(),
            );
        }
        candidates.push("/etc/vatio/config.yaml".to_string());

        for path in &candidates {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.url.is_empty() {
            return Err(VatioError::validation("api.url", "URL cannot be empty"));
        }
        if !self.api.url.starts_with("http://") && !self.api.url.starts_with("https://") {
            return Err(VatioError::validation(
                "api.url",
                "URL must start with http:// or https://",
            ));
        }

        let backoff = &self.api.retry.backoff;
        for (field, value) in [
            ("api.retry.backoff.factor", backoff.factor),
            ("api.retry.backoff.max", backoff.max),
            ("api.retry.backoff.jitter", backoff.jitter),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(VatioError::validation(
                    field,
                    "must be a non-negative number",
                ));
            }
        }

        let timeout = &self.api.timeout;
        for (field, value) in [
            ("api.timeout.total", timeout.total.unwrap_or(0.0)),
            ("api.timeout.connect", timeout.connect),
            ("api.timeout.read", timeout.read),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(VatioError::validation(
                    field,
                    "must be a non-negative number",
                ));
            }
        }

        crate::logging::parse_log_level(&self.logging.level)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.url, DEFAULT_API_URL);
        assert_eq!(config.api.retry.total, Some(3));
        assert_eq!(config.api.retry.redirect, 3);
        assert_eq!(config.api.timeout.total, Some(3.0));
        assert!(config.ui.highlight_current);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        // Test invalid URL
        config.api.url = String::new();
        assert!(config.validate().is_err());

        // Reset and test invalid backoff
        config = Config::default();
        config.api.retry.backoff.factor = -1.0;
        assert!(config.validate().is_err());

        // Reset and test invalid log level
        config = Config::default();
        config.logging.level = "LOUD".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.api.url, deserialized.api.url);
        assert_eq!(config.api.retry.total, deserialized.api.retry.total);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("api:\n  retry:\n    total: 7\n").unwrap();
        assert_eq!(config.api.retry.total, Some(7));
        assert_eq!(config.api.url, DEFAULT_API_URL);
        assert_eq!(config.api.retry.status, 3);
    }

    #[test]
    fn test_total_can_be_cleared() {
        let config: Config =
            serde_yaml::from_str("api:\n  retry:\n    total: null\n    connect: 2\n").unwrap();
        assert_eq!(config.api.retry.total, None);
        assert_eq!(config.api.retry.connect, 2);
    }
}

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use toml_edit::{DocumentMut, Item, Table};

use crate::api::{BreakerConfig, RetryPolicy};
use crate::util::paths::config_path;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Default backend base URL
pub const DEFAULT_API_URL: &str = "http://localhost:5003/api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api: ApiConfig,
    pub retry: RetryPolicy,
    pub breaker: BreakerConfig,
    pub recovery: RecoveryConfig,
    pub document: DocumentConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: String,
    /// Upper bound for a single HTTP attempt
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryConfig {
    /// Fixed wait before the single scheduled retry after a rate-limit error
    pub rate_limit_wait: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentConfig {
    /// Captures scoring below this are rejected
    pub min_quality_score: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_API_URL.to_string(),
                request_timeout: Duration::from_secs(30),
            },
            retry: RetryPolicy::default(),
            breaker: BreakerConfig::default(),
            recovery: RecoveryConfig {
                rate_limit_wait: Duration::from_secs(30),
            },
            document: DocumentConfig {
                min_quality_score: 70,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlApiConfig {
    pub base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlRetryConfig {
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlBreakerConfig {
    pub failure_threshold: Option<u32>,
    pub cooldown_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlRecoveryConfig {
    pub rate_limit_wait_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlDocumentConfig {
    pub min_quality_score: Option<u8>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub api: Option<TomlApiConfig>,
    pub retry: Option<TomlRetryConfig>,
    pub breaker: Option<TomlBreakerConfig>,
    pub recovery: Option<TomlRecoveryConfig>,
    pub document: Option<TomlDocumentConfig>,
}

impl Config {
    /// Load configuration from file, merging with defaults
    pub fn load() -> Self {
        let config_file = config_path();

        // Create example config on first run
        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        let contents = match fs::read_to_string(&config_file) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::debug!(path = %config_file.display(), error = %e, "No config file, using defaults");
                return Config::default();
            }
        };

        match Self::from_toml_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %config_file.display(), error = %e, "Ignoring invalid config file");
                Config::default()
            }
        }
    }

    /// Parse a config document and overlay it on the defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let toml_config: TomlConfig = toml::from_str(contents)?;
        let mut config = Config::default();

        if let Some(api) = toml_config.api {
            if let Some(base_url) = api.base_url {
                let trimmed = base_url.trim().trim_end_matches('/');
                if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
                    return Err(ConfigError::Invalid {
                        key: "api.base_url",
                        reason: format!("'{base_url}' is not an http(s) URL"),
                    });
                }
                config.api.base_url = trimmed.to_string();
            }
            if let Some(secs) = api.request_timeout_secs {
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        key: "api.request_timeout_secs",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                config.api.request_timeout = Duration::from_secs(secs);
            }
        }

        if let Some(retry) = toml_config.retry {
            if let Some(max_retries) = retry.max_retries {
                config.retry.max_retries = max_retries;
            }
            if let Some(ms) = retry.base_delay_ms {
                config.retry.base_delay = Duration::from_millis(ms);
            }
        }

        if let Some(breaker) = toml_config.breaker {
            if let Some(threshold) = breaker.failure_threshold {
                if threshold == 0 {
                    return Err(ConfigError::Invalid {
                        key: "breaker.failure_threshold",
                        reason: "must be at least 1".to_string(),
                    });
                }
                config.breaker.failure_threshold = threshold;
            }
            if let Some(ms) = breaker.cooldown_ms {
                config.breaker.cooldown = Duration::from_millis(ms);
            }
        }

        if let Some(recovery) = toml_config.recovery {
            if let Some(secs) = recovery.rate_limit_wait_secs {
                config.recovery.rate_limit_wait = Duration::from_secs(secs);
            }
        }

        if let Some(document) = toml_config.document {
            if let Some(score) = document.min_quality_score {
                if score > 100 {
                    return Err(ConfigError::Invalid {
                        key: "document.min_quality_score",
                        reason: format!("{score} is outside 0-100"),
                    });
                }
                config.document.min_quality_score = score;
            }
        }

        Ok(config)
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(error = %e, "Failed to create config directory");
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(error = %e, "Failed to write default config");
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Save the backend base URL to the config file
///
/// Reads the existing config.toml, sets `base_url` in the [api] section and
/// writes it back while preserving all other content and comments.
pub fn save_api_url(url: &str) -> std::io::Result<()> {
    save_api_url_to(&config_path(), url)
}

pub(crate) fn save_api_url_to(config_file: &Path, url: &str) -> std::io::Result<()> {
    let contents = if config_file.exists() {
        fs::read_to_string(config_file)?
    } else {
        String::new()
    };

    let mut doc: DocumentMut = contents
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    if !doc.contains_key("api") {
        doc["api"] = Item::Table(Table::new());
    }
    doc["api"]["base_url"] = toml_edit::value(url.trim_end_matches('/'));

    if let Some(parent) = config_file.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(config_file, doc.to_string())?;

    Ok(())
}

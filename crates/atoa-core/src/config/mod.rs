//! Configuration types for the Atoa platform.
//!
//! Configuration is a single YAML document (usually `atoa.yaml`). Every
//! section is optional and falls back to defaults, so an empty file is a
//! valid configuration.
//!
//! ```yaml
//! keys:
//!   private_key_file: keys/private.pem
//!   public_key_env: ATOA_PUBLIC_KEY
//! tokens:
//!   validity_secs: 3600
//!   leeway_secs: 5
//! tasks:
//!   subscriber_buffer: 10
//! observability:
//!   log_level: debug
//! ```

pub mod keys;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use keys::KeysConfig;

/// Complete Atoa configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AtoaConfig {
    /// Signing and verification keys.
    #[serde(default)]
    pub keys: KeysConfig,

    /// Token lifetime settings.
    #[serde(default)]
    pub tokens: TokenConfig,

    /// Task registry settings.
    #[serde(default)]
    pub tasks: TaskConfig,

    /// Logging settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Token lifetime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Validity window for newly issued tokens, in seconds.
    #[serde(default = "default_validity_secs")]
    pub validity_secs: u64,

    /// Clock skew tolerated when checking that a token is already valid.
    /// Never applied to expiry.
    #[serde(default)]
    pub leeway_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            validity_secs: default_validity_secs(),
            leeway_secs: 0,
        }
    }
}

/// Task registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Events buffered per subscriber before further events are dropped.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Largest accepted value for `tokens.validity_secs` and `tokens.leeway_secs`.
///
/// Durations are held in milliseconds internally, so anything beyond
/// `i64::MAX` milliseconds cannot be represented.
pub const MAX_TOKEN_WINDOW_SECS: u64 = i64::MAX as u64 / 1000;

fn default_validity_secs() -> u64 {
    3600
}

fn default_subscriber_buffer() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AtoaConfig {
    /// Load configuration from a YAML file.
    ///
    /// Relative key paths are resolved against the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;

        if let Some(base_dir) = path.parent() {
            config.keys.rebase(base_dir);
        }

        Ok(config)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.tokens.validity_secs == 0 {
            return Err(ConfigError::Config(
                "tokens.validity_secs must be greater than zero".to_string(),
            ));
        }
        if self.tokens.validity_secs > MAX_TOKEN_WINDOW_SECS {
            return Err(ConfigError::Config(format!(
                "tokens.validity_secs must be at most {MAX_TOKEN_WINDOW_SECS}"
            )));
        }
        if self.tokens.leeway_secs > MAX_TOKEN_WINDOW_SECS {
            return Err(ConfigError::Config(format!(
                "tokens.leeway_secs must be at most {MAX_TOKEN_WINDOW_SECS}"
            )));
        }
        if self.tasks.subscriber_buffer == 0 {
            return Err(ConfigError::Config(
                "tasks.subscriber_buffer must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

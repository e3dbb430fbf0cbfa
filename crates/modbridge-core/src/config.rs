//! Bridge configuration (modbridge.toml)
//!
//! ```toml
//! [dispatcher]
//! workers = 4
//! thread_name = "modbridge-worker"
//! queue_capacity = 0          # 0 = unbounded
//!
//! [registration]
//! duplicate_policy = "keep-first"   # or "replace", "reject"
//!
//! [codec]
//! max_depth = 64
//! ```
//!
//! Every section and key is optional.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::codec::DEFAULT_MAX_DEPTH;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Top-level bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// Async dispatcher pool
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Function registration behaviour
    #[serde(default)]
    pub registration: RegistrationConfig,

    /// Value codec limits
    #[serde(default)]
    pub codec: CodecConfig,
}

/// Worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatcherConfig {
    /// Number of worker threads (default: number of CPUs)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Thread name prefix; workers are named `<prefix>-<n>`
    #[serde(default = "default_thread_name")]
    pub thread_name: String,

    /// Maximum queued jobs; 0 means unbounded
    #[serde(default)]
    pub queue_capacity: usize,
}

fn default_workers() -> usize {
    num_cpus::get().max(1)
}

fn default_thread_name() -> String {
    "modbridge-worker".to_string()
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            thread_name: default_thread_name(),
            queue_capacity: 0,
        }
    }
}

/// What happens when a function name is registered twice
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The first registration wins; later ones are ignored
    #[default]
    KeepFirst,
    /// The latest registration wins
    ///
    /// Replaced callbacks stay in the module's callback arena until the
    /// registry is dropped, and script functions created before the
    /// replacement keep calling them. Re-registering in a loop grows memory.
    Replace,
    /// Later registrations fail with `DuplicateFunction`
    Reject,
}

/// Registration settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistrationConfig {
    /// Duplicate function policy
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

/// Codec settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodecConfig {
    /// Maximum nesting depth for converted values
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

impl BridgeConfig {
    /// Parse a config from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a config from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatcher.workers == 0 {
            return Err(ConfigError::ValidationError(
                "dispatcher.workers must be at least 1".to_string(),
            ));
        }
        if self.dispatcher.thread_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "dispatcher.thread_name cannot be empty".to_string(),
            ));
        }
        if self.codec.max_depth == 0 {
            return Err(ConfigError::ValidationError(
                "codec.max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

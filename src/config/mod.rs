//! Configuration Module
//!
//! Provides TOML-based configuration for shardlink with support for:
//! - Host connector settings (bind address, socket buffers, MTU)
//! - Cluster management channel (bind address, node id, PSK credentials)
//! - Metrics endpoint
//! - Environment variable overrides (SHARDLINK__* prefix)

use std::net::SocketAddr;
use std::path::Path;

use config::{Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;

// Re-export section config types
pub use cluster::ClusterConfig;
pub use connector::ConnectorConfig;
pub use metrics::MetricsConfig;

mod cluster;
mod connector;
mod metrics;

/// Substitute environment variables in a string.
/// Supports `${VAR}` and `${VAR:-default}` syntax.
fn substitute_env_vars(content: &str) -> String {
    let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").unwrap();
    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

#[cfg(test)]
mod tests;

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
    /// Config crate error
    Config(config::ConfigError),
    /// Validation error
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Config(e) => write!(f, "Config error: {}", e),
            ConfigError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Config(e)
    }
}

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,
    /// Host connector configuration
    pub connector: ConnectorConfig,
    /// Cluster management channel configuration
    pub cluster: ClusterConfig,
    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file with environment variable
    /// overrides.
    ///
    /// Supports two forms of environment variable usage:
    /// 1. In-file substitution: `${VAR}` or `${VAR:-default}` syntax
    /// 2. Override via env vars with a `SHARDLINK__` prefix and double
    ///    underscores for nesting:
    ///    - `SHARDLINK__CONNECTOR__BIND=0.0.0.0:5685` overrides `connector.bind`
    ///    - `SHARDLINK__CLUSTER__NODE_ID=node-3` overrides `cluster.node_id`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("log.level", "info")?
            .set_default("connector.bind", "0.0.0.0:5684")?
            .set_default("connector.mtu", 1400)?
            .set_default("cluster.management_bind", "0.0.0.0:5884")?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.bind", "0.0.0.0:9464")?;

        // Load from file with env var substitution
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let substituted = substitute_env_vars(&content);
                builder = builder.add_source(File::from_str(&substituted, FileFormat::Toml));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File doesn't exist, use defaults
            }
            Err(e) => return Err(ConfigError::Io(e)),
        }

        // Override with environment variables (SHARDLINK__CONNECTOR__BIND, etc.)
        let cfg = builder
            .add_source(
                Environment::with_prefix("SHARDLINK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides only.
    ///
    /// Useful for containerized deployments where all config comes from
    /// env vars.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Path::new(""))
    }

    /// Parse configuration from a string (for testing, no env var support)
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cluster.validate().map_err(ConfigError::Validation)?;

        if self.connector.mtu == 0 {
            return Err(ConfigError::Validation(
                "connector.mtu must be positive".to_string(),
            ));
        }

        if self.connector.bind.port() != 0
            && self.connector.bind.port() == self.cluster.management_bind.port()
            && self.connector.bind.ip() == self.cluster.management_bind.ip()
        {
            return Err(ConfigError::Validation(
                "connector.bind and cluster.management_bind must differ".to_string(),
            ));
        }

        Ok(())
    }

    /// Effective metrics bind address when metrics are enabled.
    pub fn metrics_bind(&self) -> Option<SocketAddr> {
        self.metrics.enabled.then_some(self.metrics.bind)
    }
}

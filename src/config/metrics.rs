//! Metrics configuration

use serde::Deserialize;
use std::net::SocketAddr;

/// Metrics endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether the metrics endpoint is enabled
    pub enabled: bool,
    /// HTTP bind address for the Prometheus scrape endpoint
    /// Default: 0.0.0.0:9464
    pub bind: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "0.0.0.0:9464".parse().unwrap(),
        }
    }
}

//! Connector Configuration
//!
//! Host-side settings the management channel derives its own sizing from.

use std::net::SocketAddr;

use serde::Deserialize;

/// Host secure-connector configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Bind address of the host's client-facing secure endpoint
    /// Default: 0.0.0.0:5684
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Socket receive buffer size in bytes; unset or 0 keeps the OS default
    pub receive_buffer_size: Option<usize>,

    /// Socket send buffer size in bytes; unset or 0 keeps the OS default
    pub send_buffer_size: Option<usize>,

    /// Negotiated maximum transmission unit for datagram payloads
    /// Default: 1400
    #[serde(default = "default_mtu")]
    pub mtu: usize,
}

fn default_bind() -> SocketAddr {
    "0.0.0.0:5684".parse().unwrap()
}

fn default_mtu() -> usize {
    1400
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            receive_buffer_size: None,
            send_buffer_size: None,
            mtu: default_mtu(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConnectorConfig::default();
        assert_eq!(config.bind.port(), 5684);
        assert!(config.receive_buffer_size.is_none());
        assert!(config.send_buffer_size.is_none());
        assert_eq!(config.mtu, 1400);
    }
}

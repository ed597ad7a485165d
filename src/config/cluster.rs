//! Cluster Configuration
//!
//! Configuration for the cluster management channel.

use std::net::SocketAddr;

use serde::Deserialize;

use crate::secure::SecretBytes;

/// Cluster management channel configuration.
///
/// Deliberately not `Clone`: the secret key has a single owner and is
/// moved out with [`ClusterConfig::take_secret`].
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Cluster-internal bind address for the management channel
    /// Default: 0.0.0.0:5884
    #[serde(default = "default_management_bind")]
    pub management_bind: SocketAddr,

    /// Node identifier (auto-generated from hostname if not set)
    pub node_id: Option<String>,

    /// Pre-shared-key identity. Its presence alone selects the secured
    /// management channel.
    pub secure_identity: Option<String>,

    /// Pre-shared secret key, hex encoded in the file. Required together
    /// with `secure_identity`, cleared from memory once the transport has
    /// consumed it.
    pub secret_key: Option<SecretBytes>,
}

fn default_management_bind() -> SocketAddr {
    "0.0.0.0:5884".parse().unwrap()
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            management_bind: default_management_bind(),
            node_id: None,
            secure_identity: None,
            secret_key: None,
        }
    }
}

impl ClusterConfig {
    /// Get the node ID, generating from hostname if not set
    pub fn node_id(&self) -> String {
        self.node_id.clone().unwrap_or_else(|| {
            hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| format!("node-{}", rand_id()))
        })
    }

    /// Move the secret key out of the configuration, leaving `None`.
    /// The returned value zeroizes its bytes on drop.
    pub fn take_secret(&mut self) -> Option<SecretBytes> {
        self.secret_key.take()
    }

    /// Check identity/key pairing. Half a credential is fatal: the
    /// connector must never silently degrade to the plain channel.
    pub fn validate(&self) -> Result<(), String> {
        match (&self.secure_identity, &self.secret_key) {
            (Some(identity), _) if identity.is_empty() => {
                Err("cluster.secure_identity must not be empty".to_string())
            }
            (Some(_), None) => {
                Err("cluster.secure_identity requires cluster.secret_key".to_string())
            }
            (Some(_), Some(key)) if key.is_empty() => {
                Err("cluster.secret_key must not be empty".to_string())
            }
            (None, Some(_)) => {
                Err("cluster.secret_key requires cluster.secure_identity".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Generate a random ID for node identification
fn rand_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{:x}", nanos & 0xFFFFFFFF)
}

//! Secure Datagram Transport Interface
//!
//! The management channel can run over a secure datagram transport
//! (handshake + encrypted records) authenticated with a pre-shared key.
//! The transport implementation itself lives outside this crate; this
//! module defines the seam: the transport capability, the factory that
//! builds one from a [`SecureTransportConfig`], and the key-material
//! containers. Secret bytes are zeroized on every drop path and are never
//! logged or serialized.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tokio::net::UdpSocket;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cluster::{ClusterError, Datagram};

/// Upper bound on concurrent peer sessions in the secure transport's
/// connection table, sized for expected cluster fan-in.
pub const MAX_PEER_SESSIONS: usize = 1024;

/// Secret key material, cleared from memory on drop.
///
/// Intentionally not `Clone`: there is exactly one live copy, moved from
/// the configuration into the transport.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Parse from a hex string, as written in the configuration file.
    pub fn from_hex(hex: &str) -> Result<Self, String> {
        if hex.len() % 2 != 0 {
            return Err("secret key hex must have an even number of digits".to_string());
        }
        let mut bytes = Vec::with_capacity(hex.len() / 2);
        for pair in hex.as_bytes().chunks(2) {
            let high = hex_digit(pair[0])?;
            let low = hex_digit(pair[1])?;
            bytes.push((high << 4) | low);
        }
        Ok(Self(bytes))
    }

    /// Raw key bytes. Callers must not copy these anywhere long-lived.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn hex_digit(c: u8) -> Result<u8, String> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(format!("invalid hex digit '{}'", c as char)),
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes({} bytes)", self.0.len())
    }
}

impl<'de> Deserialize<'de> for SecretBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        SecretBytes::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Single-identity pre-shared-key store handed to the secure transport.
///
/// Holds the only live copy of the key once construction completes.
pub struct SinglePskStore {
    identity: String,
    key: SecretBytes,
}

impl SinglePskStore {
    pub fn new(identity: impl Into<String>, key: SecretBytes) -> Self {
        Self {
            identity: identity.into(),
            key,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Raw key bytes, for the transport's key schedule only.
    pub fn key(&self) -> &[u8] {
        self.key.expose()
    }
}

impl fmt::Debug for SinglePskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinglePskStore")
            .field("identity", &self.identity)
            .field("key", &self.key)
            .finish()
    }
}

/// Consumer for application messages decrypted by the transport. Invoked
/// only for fully established sessions; handshake datagrams produce no
/// visible message.
pub type MessageConsumer = Arc<dyn Fn(Datagram) + Send + Sync>;

/// Configuration for building a secure management transport.
pub struct SecureTransportConfig {
    /// Cluster-management bind address.
    pub bind_addr: SocketAddr,
    /// Dedicated receiver tasks. The management channel always passes 0:
    /// datagrams are pumped in externally through the record pipeline.
    pub receiver_tasks: usize,
    /// Connection-table capacity for concurrent peer sessions.
    pub max_peer_sessions: usize,
    /// Effective receive buffer size, `None` for the OS default.
    pub recv_buffer_size: Option<usize>,
    /// Effective send buffer size, `None` for the OS default.
    pub send_buffer_size: Option<usize>,
    /// Pre-shared-key identity and key material.
    pub psk: SinglePskStore,
}

/// A secure (handshake + encrypted record) datagram transport.
///
/// Implementations own the session table and all cryptographic state.
/// Malformed or rejected datagrams are contained here and never surface
/// to the management channel.
#[async_trait]
pub trait SecureDatagramTransport: Send + Sync {
    /// Bind onto a socket the caller owns, using the caller's negotiated
    /// maximum transmission unit. Must not spawn receiver tasks.
    async fn bind(&self, socket: Arc<UdpSocket>, mtu: usize) -> Result<(), ClusterError>;

    /// Release transport resources. The bound socket stays open; it
    /// belongs to the caller.
    async fn shutdown(&self);

    /// Feed one raw datagram into the handshake/record pipeline. May block
    /// on cryptographic work; that backpressure is intentional.
    async fn process_record(&self, datagram: Datagram);

    /// Encrypt and send an application message to a peer node's
    /// management endpoint.
    async fn send(&self, message: Datagram) -> Result<(), ClusterError>;
}

/// Builds secure transports for the managed cluster connector. Implemented
/// by the embedding application; consumes the PSK store, which then holds
/// the only live copy of the key.
pub trait SecureTransportFactory: Send + Sync {
    fn build(
        &self,
        config: SecureTransportConfig,
        consumer: MessageConsumer,
    ) -> Result<Box<dyn SecureDatagramTransport>, ClusterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_from_hex() {
        let secret = SecretBytes::from_hex("00ff10Ab").unwrap();
        assert_eq!(secret.expose(), &[0x00, 0xff, 0x10, 0xab]);
        assert_eq!(secret.len(), 4);
    }

    #[test]
    fn test_secret_from_hex_rejects_garbage() {
        assert!(SecretBytes::from_hex("0g").is_err());
        assert!(SecretBytes::from_hex("abc").is_err());
    }

    #[test]
    fn test_secret_zeroizes_in_place() {
        let mut secret = SecretBytes::new(vec![1, 2, 3, 4]);
        secret.zeroize();
        assert!(secret.expose().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_debug_never_prints_key_bytes() {
        let secret = SecretBytes::new(b"super-secret".to_vec());
        let printed = format!("{:?}", secret);
        assert!(!printed.contains("super"));
        assert_eq!(printed, "SecretBytes(12 bytes)");

        let store = SinglePskStore::new("node-1", SecretBytes::new(b"topsecret".to_vec()));
        let printed = format!("{:?}", store);
        assert!(printed.contains("node-1"));
        assert!(!printed.contains("topsecret"));
    }
}

//! Cluster Module
//!
//! Management-channel subsystem for running one logical secure datagram
//! endpoint across multiple cluster nodes.
//!
//! # Architecture
//!
//! Nodes share no per-connection state. When a node receives a datagram
//! belonging to a session owned by a peer, the base routing layer forwards
//! it over a private management channel, which runs either over plain UDP
//! or over a PSK-secured datagram transport:
//!
//! - **Wire envelope**: record framing for forwarded client traffic
//! - **Channel capability**: uniform start/stop/send/receive contract
//! - **Adapters**: plain ([`UdpManagementChannel`]) and secured
//!   ([`DtlsManagementChannel`])
//! - **Connector**: lifecycle orchestration and dispatch
//!
//! # Usage
//!
//! ```toml
//! # shardlink.toml
//! [cluster]
//! management_bind = "0.0.0.0:5884"
//! node_id = "node-1"
//! secure_identity = "cluster-mgmt"
//! secret_key = "8d12f6e3a409bb17c5de02981f4a6c70"
//! ```

mod channel;
mod connector;
mod dtls;
mod error;
mod udp;

pub mod protocol;

pub use channel::{
    management_buffer_size, Channel, ClusterHealth, ManagementChannel, ManagementProtocol,
};
pub use connector::{DatagramClass, DatagramRouter, DefaultRouter, ManagedClusterConnector};
pub use dtls::DtlsManagementChannel;
pub use error::ClusterError;
pub use protocol::{Datagram, ENVELOPE_OVERHEAD};
pub use udp::UdpManagementChannel;

// Re-export cluster config
pub use crate::config::ClusterConfig;

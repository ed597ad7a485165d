//! Shardlink - cluster management channel for secure datagram connectors
//!
//! Lets one logical secure datagram endpoint be served by multiple
//! independent cluster nodes. Each node runs a private management channel
//! (plain UDP or PSK-secured datagrams) over which misaddressed traffic is
//! forwarded to the node owning the session.

pub mod cluster;
pub mod config;
pub mod metrics;
pub mod secure;
pub mod transport;

pub use cluster::{
    management_buffer_size, Channel, ClusterError, ClusterHealth, Datagram, DatagramClass,
    DatagramRouter, DefaultRouter, ManagedClusterConnector, ManagementChannel,
    ManagementProtocol,
};
pub use config::Config;
pub use metrics::{Metrics, MetricsServer};
pub use secure::{
    SecretBytes, SecureDatagramTransport, SecureTransportConfig, SecureTransportFactory,
    SinglePskStore,
};
pub use transport::UdpTransport;

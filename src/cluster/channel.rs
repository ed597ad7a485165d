//! Management Channel Capability
//!
//! The uniform contract every management-channel adapter satisfies:
//! start/stop lifecycle bound to a shared socket, a running-state query,
//! inbound datagram processing, and outbound send, each instrumented with
//! optional health counters. Adapters are selected once at construction
//! and dispatched through a tagged variant.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;

use super::dtls::DtlsManagementChannel;
use super::udp::UdpManagementChannel;
use super::{ClusterError, Datagram};

/// Protection protocol of the management channel, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagementProtocol {
    /// Unsecured datagrams between nodes.
    Udp,
    /// PSK-authenticated secure datagrams between nodes.
    Dtls,
}

impl ManagementProtocol {
    /// Wire tag peers use to agree on how to reach this node's management
    /// endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagementProtocol::Udp => "mgmt-udp",
            ManagementProtocol::Dtls => "mgmt-dtls",
        }
    }
}

impl fmt::Display for ManagementProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health counters for management traffic.
///
/// Owned externally and injected as an optional capability; counts
/// attempted transmissions in both directions. Absence is tolerated
/// silently.
pub trait ClusterHealth: Send + Sync {
    fn sending_cluster_management_message(&self);
    fn receiving_cluster_management_message(&self);
}

/// Effective socket buffer size for the management channel.
///
/// Returns `None` when the host size is unset or zero (keep the OS
/// default); otherwise adds the envelope overhead exactly once, so a
/// full-size host datagram still fits after wrapping.
pub fn management_buffer_size(
    host_size: Option<usize>,
    envelope_overhead: usize,
) -> Option<usize> {
    match host_size {
        None | Some(0) => None,
        Some(size) => Some(size + envelope_overhead),
    }
}

/// Uniform contract of a management-channel adapter.
#[async_trait]
pub trait ManagementChannel: Send + Sync {
    /// Bind onto the shared cluster socket with the host's negotiated
    /// maximum transmission unit. No-op when already running; a failed
    /// start leaves the channel stopped.
    async fn start(&self, socket: Arc<UdpSocket>, mtu: usize) -> Result<(), ClusterError>;

    /// Release channel-owned resources. The shared socket stays open; it
    /// belongs to the host connector. Idempotent, safe to call at any
    /// time, including concurrently with inbound processing.
    async fn stop(&self);

    fn is_running(&self) -> bool;

    /// Process one raw datagram already classified as management traffic
    /// by the routing layer. For the plain channel this is a direct
    /// payload hand-off; for the secured channel the datagram enters the
    /// handshake/record pipeline and only established sessions yield a
    /// visible message.
    async fn process_datagram(&self, datagram: Datagram);

    /// Hand an outbound payload to the underlying transport for framing
    /// or encryption, addressed to a peer node's management endpoint.
    async fn send(&self, message: Datagram) -> Result<(), ClusterError>;
}

/// The channel adapter selected at construction, never reassigned.
pub enum Channel {
    Udp(UdpManagementChannel),
    Dtls(DtlsManagementChannel),
}

#[async_trait]
impl ManagementChannel for Channel {
    async fn start(&self, socket: Arc<UdpSocket>, mtu: usize) -> Result<(), ClusterError> {
        match self {
            Channel::Udp(channel) => channel.start(socket, mtu).await,
            Channel::Dtls(channel) => channel.start(socket, mtu).await,
        }
    }

    async fn stop(&self) {
        match self {
            Channel::Udp(channel) => channel.stop().await,
            Channel::Dtls(channel) => channel.stop().await,
        }
    }

    fn is_running(&self) -> bool {
        match self {
            Channel::Udp(channel) => channel.is_running(),
            Channel::Dtls(channel) => channel.is_running(),
        }
    }

    async fn process_datagram(&self, datagram: Datagram) {
        match self {
            Channel::Udp(channel) => channel.process_datagram(datagram).await,
            Channel::Dtls(channel) => channel.process_datagram(datagram).await,
        }
    }

    async fn send(&self, message: Datagram) -> Result<(), ClusterError> {
        match self {
            Channel::Udp(channel) => channel.send(message).await,
            Channel::Dtls(channel) => channel.send(message).await,
        }
    }
}

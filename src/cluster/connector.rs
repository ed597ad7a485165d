//! Managed Cluster Connector
//!
//! Orchestrates the management channel inside the host connector's
//! lifecycle. At construction it selects the channel's protection protocol
//! from the cluster configuration (secured iff a PSK identity is present),
//! computes effective socket buffer sizes, and builds exactly one channel
//! adapter. On start it creates the cluster-internal socket, starts the
//! channel on it, and runs the receive loop that feeds datagrams through
//! the routing layer's classification. On stop it tears the channel down
//! before the socket.
//!
//! The routing decision itself (which node owns a session) lives in the
//! base routing layer behind [`DatagramRouter`]; this connector only
//! carries already-classified management traffic.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::config::{ClusterConfig, ConnectorConfig};
use crate::secure::{
    MessageConsumer, SecureTransportConfig, SecureTransportFactory, SinglePskStore,
    MAX_PEER_SESSIONS,
};

use super::channel::{
    management_buffer_size, Channel, ClusterHealth, ManagementChannel, ManagementProtocol,
};
use super::dtls::DtlsManagementChannel;
use super::protocol::{is_routing_record, Datagram, ENVELOPE_OVERHEAD};
use super::udp::UdpManagementChannel;
use super::ClusterError;

/// Classification of a datagram received on the cluster-internal socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatagramClass {
    /// Forwarded client traffic owned by the base routing layer.
    Routing,
    /// Management traffic for this node's channel.
    Management,
}

/// Base cluster-routing layer contract.
///
/// Implemented by the embedding application; its classification is
/// authoritative and the connector performs no validation of its own.
#[async_trait]
pub trait DatagramRouter: Send + Sync {
    /// Classify a raw datagram received on the cluster-internal socket.
    fn classify(&self, datagram: &[u8]) -> DatagramClass;

    /// Process forwarded client traffic. Peer-address tables and ownership
    /// lookups live here.
    async fn route(&self, datagram: Datagram);

    /// Consume a management application message: the plain payload, or the
    /// decrypted record of an established secure session. Called
    /// synchronously on the receiving task.
    fn deliver(&self, message: Datagram);
}

/// Router used when no base routing layer is wired in. Classifies by
/// record type, drops routing traffic, and logs deliveries.
pub struct DefaultRouter;

#[async_trait]
impl DatagramRouter for DefaultRouter {
    fn classify(&self, datagram: &[u8]) -> DatagramClass {
        match datagram.first() {
            Some(&record_type) if is_routing_record(record_type) => DatagramClass::Routing,
            _ => DatagramClass::Management,
        }
    }

    async fn route(&self, datagram: Datagram) {
        debug!(
            "no routing layer wired in, dropping {} forwarded bytes from {}",
            datagram.len(),
            datagram.peer
        );
    }

    fn deliver(&self, message: Datagram) {
        debug!(
            "management message from {}: {} bytes",
            message.peer,
            message.len()
        );
    }
}

/// Secure datagram connector extension serving one cluster node.
pub struct ManagedClusterConnector {
    node_id: String,
    management_bind: SocketAddr,
    mtu: usize,
    protocol: ManagementProtocol,
    channel: Arc<Channel>,
    router: Arc<dyn DatagramRouter>,
    running: AtomicBool,
    shutdown: broadcast::Sender<()>,
    receiver: Mutex<Option<JoinHandle<()>>>,
    socket: Mutex<Option<Arc<UdpSocket>>>,
}

impl ManagedClusterConnector {
    /// Build the connector and its single management channel.
    ///
    /// Selects the secured channel iff a secure identity is configured;
    /// a half-configured identity/key pair is fatal here, never a silent
    /// downgrade to plain. The cluster configuration's secret key is moved
    /// into the secure transport and the remaining copy zeroized before
    /// this function returns, on success and error paths alike.
    pub fn new(
        config: &ConnectorConfig,
        cluster: &mut ClusterConfig,
        router: Arc<dyn DatagramRouter>,
        secure_factory: Option<Arc<dyn SecureTransportFactory>>,
        health: Option<Arc<dyn ClusterHealth>>,
    ) -> Result<Self, ClusterError> {
        let node_id = cluster.node_id();
        let identity = match &cluster.secure_identity {
            Some(identity) if identity.is_empty() => {
                return Err(ClusterError::Config(
                    "secure identity must not be empty".to_string(),
                ));
            }
            Some(identity) => Some(identity.clone()),
            None => None,
        };

        let protocol = if identity.is_some() {
            ManagementProtocol::Dtls
        } else {
            ManagementProtocol::Udp
        };

        let recv_buffer_size =
            management_buffer_size(config.receive_buffer_size, ENVELOPE_OVERHEAD);
        let send_buffer_size =
            management_buffer_size(config.send_buffer_size, ENVELOPE_OVERHEAD);
        info!(
            "cluster node {} ({}): receive buffer {:?}, send buffer {:?}",
            node_id, protocol, recv_buffer_size, send_buffer_size
        );

        let consumer: MessageConsumer = {
            let router = router.clone();
            Arc::new(move |message| router.deliver(message))
        };

        let channel = match identity {
            Some(identity) => {
                let key = cluster.take_secret().ok_or_else(|| {
                    ClusterError::Config(
                        "secure identity configured without a secret key".to_string(),
                    )
                })?;
                if key.is_empty() {
                    return Err(ClusterError::Config(
                        "secure identity configured with an empty secret key".to_string(),
                    ));
                }
                let factory = secure_factory.ok_or_else(|| {
                    ClusterError::Config(
                        "secure identity configured but no secure transport factory provided"
                            .to_string(),
                    )
                })?;
                let transport = factory.build(
                    SecureTransportConfig {
                        bind_addr: cluster.management_bind,
                        receiver_tasks: 0,
                        max_peer_sessions: MAX_PEER_SESSIONS,
                        recv_buffer_size,
                        send_buffer_size,
                        psk: SinglePskStore::new(identity, key),
                    },
                    consumer,
                )?;
                Channel::Dtls(DtlsManagementChannel::new(transport, health))
            }
            None => {
                if cluster.secret_key.is_some() {
                    return Err(ClusterError::Config(
                        "secret key configured without a secure identity".to_string(),
                    ));
                }
                Channel::Udp(UdpManagementChannel::new(
                    recv_buffer_size,
                    send_buffer_size,
                    consumer,
                    health,
                ))
            }
        };

        let (shutdown, _) = broadcast::channel(1);

        Ok(Self {
            node_id,
            management_bind: cluster.management_bind,
            mtu: config.mtu,
            protocol,
            channel: Arc::new(channel),
            router,
            running: AtomicBool::new(false),
            shutdown,
            receiver: Mutex::new(None),
            socket: Mutex::new(None),
        })
    }

    /// Start the cluster-internal socket, the management channel, and the
    /// receive loop, in that order. No-op when already running. A failure
    /// anywhere tears down what was created and propagates: a node that
    /// cannot reach its peers must not serve sessions it does not own.
    pub async fn start(&self) -> Result<(), ClusterError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        match self.init().await {
            Ok(()) => {
                info!(
                    "cluster node {} ({}): management interface running",
                    self.node_id, self.protocol
                );
                Ok(())
            }
            Err(e) => {
                self.channel.stop().await;
                self.teardown().await;
                self.running.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    async fn init(&self) -> Result<(), ClusterError> {
        let socket = Arc::new(UdpSocket::bind(self.management_bind).await?);
        debug!(
            "cluster node {}: internal socket bound on {}",
            self.node_id,
            socket.local_addr()?
        );
        *self.socket.lock() = Some(socket.clone());

        self.channel.start(socket.clone(), self.mtu).await?;

        let handle = tokio::spawn(receive_loop(
            socket,
            self.router.clone(),
            self.channel.clone(),
            self.shutdown.subscribe(),
            self.node_id.clone(),
        ));
        *self.receiver.lock() = Some(handle);
        Ok(())
    }

    /// Stop the management channel, then the host-side resources.
    /// Idempotent and safe to call at any time after `start()`.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.channel.stop().await;
        self.teardown().await;
        info!("cluster node {}: management interface stopped", self.node_id);
    }

    async fn teardown(&self) {
        let _ = self.shutdown.send(());
        let handle = self.receiver.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        *self.socket.lock() = None;
    }

    /// Dispatch entry point for the routing layer once it has classified a
    /// datagram as management traffic. Delegates unconditionally; the
    /// caller's classification is authoritative, and malformed payloads
    /// are contained by the channel's own processing.
    pub async fn handle_management_datagram(&self, datagram: Datagram) {
        trace!(
            "cluster node {} ({}): process datagram from {}, {} bytes",
            self.node_id,
            self.protocol,
            datagram.peer,
            datagram.len()
        );
        self.channel.process_datagram(datagram).await;
    }

    /// Protocol tag of the management channel.
    pub fn management_protocol(&self) -> ManagementProtocol {
        self.protocol
    }

    /// The live channel, for the routing layer to send outbound
    /// management traffic on.
    pub fn management_channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Bound address of the cluster-internal socket while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket
            .lock()
            .as_ref()
            .and_then(|socket| socket.local_addr().ok())
    }
}

/// Reads the cluster-internal socket and hands each datagram to the
/// routing layer's classification: routing traffic goes to the base
/// layer, management traffic to the channel, both synchronously on this
/// task.
async fn receive_loop(
    socket: Arc<UdpSocket>,
    router: Arc<dyn DatagramRouter>,
    channel: Arc<Channel>,
    mut shutdown: broadcast::Receiver<()>,
    node_id: String,
) {
    let mut buf = vec![0u8; 65535];
    loop {
        tokio::select! {
            biased;

            result = shutdown.recv() => {
                match result {
                    Ok(()) => break,
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, peer)) => {
                        let datagram =
                            Datagram::new(peer, Bytes::copy_from_slice(&buf[..len]));
                        match router.classify(&datagram.payload) {
                            DatagramClass::Routing => router.route(datagram).await,
                            DatagramClass::Management => {
                                trace!(
                                    "cluster node {}: process datagram from {}, {} bytes",
                                    node_id, peer, len
                                );
                                channel.process_datagram(datagram).await;
                            }
                        }
                    }
                    Err(e) => {
                        error!("cluster node {}: receive failed: {}", node_id, e);
                    }
                }
            }
        }
    }
    debug!("cluster node {}: receive loop exited", node_id);
}

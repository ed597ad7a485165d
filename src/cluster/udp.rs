//! Plain Management Channel
//!
//! Management channel over unsecured datagrams: inbound processing is a
//! direct payload hand-off to the message consumer, outbound sends go
//! through the plain transport's sender pool. Used when no secure
//! identity is configured.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;

use crate::secure::MessageConsumer;
use crate::transport::UdpTransport;

use super::channel::{ClusterHealth, ManagementChannel};
use super::{ClusterError, Datagram};

/// Management channel adapter over plain UDP.
pub struct UdpManagementChannel {
    transport: UdpTransport,
    consumer: MessageConsumer,
    health: Option<Arc<dyn ClusterHealth>>,
}

impl UdpManagementChannel {
    pub fn new(
        recv_buffer_size: Option<usize>,
        send_buffer_size: Option<usize>,
        consumer: MessageConsumer,
        health: Option<Arc<dyn ClusterHealth>>,
    ) -> Self {
        Self {
            transport: UdpTransport::new(recv_buffer_size, send_buffer_size),
            consumer,
            health,
        }
    }
}

#[async_trait]
impl ManagementChannel for UdpManagementChannel {
    async fn start(&self, socket: Arc<UdpSocket>, _mtu: usize) -> Result<(), ClusterError> {
        self.transport.start(socket).map_err(ClusterError::Io)
    }

    async fn stop(&self) {
        self.transport.stop().await;
    }

    fn is_running(&self) -> bool {
        self.transport.is_running()
    }

    async fn process_datagram(&self, datagram: Datagram) {
        // a stop() racing with inbound dispatch must find a closed gate
        if !self.transport.is_running() {
            return;
        }
        (self.consumer)(datagram);
        if let Some(health) = &self.health {
            health.receiving_cluster_management_message();
        }
    }

    async fn send(&self, message: Datagram) -> Result<(), ClusterError> {
        self.transport.send(message)?;
        if let Some(health) = &self.health {
            health.sending_cluster_management_message();
        }
        Ok(())
    }
}

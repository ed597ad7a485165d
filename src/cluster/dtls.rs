//! Secured Management Channel
//!
//! Management channel over a PSK-authenticated secure datagram transport.
//! Inbound datagrams enter the transport's handshake/record pipeline;
//! only fully established sessions yield an application message to the
//! consumer. The channel never sees key material after construction: the
//! PSK store is consumed by the transport factory and the configuration's
//! copy is zeroized.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;

use crate::secure::SecureDatagramTransport;

use super::channel::{ClusterHealth, ManagementChannel};
use super::{ClusterError, Datagram};

/// Management channel adapter over a secure datagram transport.
pub struct DtlsManagementChannel {
    transport: Box<dyn SecureDatagramTransport>,
    running: AtomicBool,
    health: Option<Arc<dyn ClusterHealth>>,
}

impl DtlsManagementChannel {
    pub fn new(
        transport: Box<dyn SecureDatagramTransport>,
        health: Option<Arc<dyn ClusterHealth>>,
    ) -> Self {
        Self {
            transport,
            running: AtomicBool::new(false),
            health,
        }
    }
}

#[async_trait]
impl ManagementChannel for DtlsManagementChannel {
    async fn start(&self, socket: Arc<UdpSocket>, mtu: usize) -> Result<(), ClusterError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }
        match self.transport.bind(socket, mtu).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    async fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.transport.shutdown().await;
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    async fn process_datagram(&self, datagram: Datagram) {
        if !self.is_running() {
            return;
        }
        self.transport.process_record(datagram).await;
        if let Some(health) = &self.health {
            health.receiving_cluster_management_message();
        }
    }

    async fn send(&self, message: Datagram) -> Result<(), ClusterError> {
        if !self.is_running() {
            return Err(ClusterError::NotRunning);
        }
        self.transport.send(message).await?;
        if let Some(health) = &self.health {
            health.sending_cluster_management_message();
        }
        Ok(())
    }
}

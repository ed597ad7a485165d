//! Plain Datagram Transport
//!
//! Minimal UDP transport backing the plain management channel. It adopts
//! a socket the connector already owns (never closing it), applies the
//! computed socket buffer sizes when present, and decouples outbound send
//! latency from callers with a small fixed pool of sender tasks. Receiving
//! is driven externally: the connector's receive loop pumps datagrams in.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use socket2::SockRef;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cluster::{ClusterError, Datagram};

/// Sender tasks per transport.
pub const SENDER_TASKS: usize = 2;

/// Per-sender bounded queue capacity.
const SEND_QUEUE_CAPACITY: usize = 1024;

struct SenderPool {
    queues: Vec<mpsc::Sender<Datagram>>,
    tasks: Vec<JoinHandle<()>>,
}

/// Unsecured datagram transport bound onto a shared socket.
pub struct UdpTransport {
    recv_buffer_size: Option<usize>,
    send_buffer_size: Option<usize>,
    running: AtomicBool,
    pool: Mutex<Option<SenderPool>>,
    next_queue: AtomicUsize,
}

impl UdpTransport {
    pub fn new(recv_buffer_size: Option<usize>, send_buffer_size: Option<usize>) -> Self {
        Self {
            recv_buffer_size,
            send_buffer_size,
            running: AtomicBool::new(false),
            pool: Mutex::new(None),
            next_queue: AtomicUsize::new(0),
        }
    }

    /// Adopt the shared socket and spawn the sender pool. No-op when
    /// already running; a failed start leaves the transport stopped.
    pub fn start(&self, socket: Arc<UdpSocket>) -> io::Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        if let Err(e) =
            apply_buffer_sizes(&socket, self.recv_buffer_size, self.send_buffer_size)
        {
            self.running.store(false, Ordering::Release);
            return Err(e);
        }

        let mut queues = Vec::with_capacity(SENDER_TASKS);
        let mut tasks = Vec::with_capacity(SENDER_TASKS);
        for id in 0..SENDER_TASKS {
            let (tx, rx) = mpsc::channel(SEND_QUEUE_CAPACITY);
            queues.push(tx);
            tasks.push(tokio::spawn(sender_loop(id, socket.clone(), rx)));
        }
        *self.pool.lock() = Some(SenderPool { queues, tasks });

        Ok(())
    }

    /// Stop the sender pool, draining queued datagrams. The shared socket
    /// stays open; it belongs to the connector. Idempotent.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let pool = self.pool.lock().take();
        if let Some(pool) = pool {
            // closing the queues lets each sender finish its backlog and exit
            drop(pool.queues);
            for task in pool.tasks {
                let _ = task.await;
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Enqueue an outbound datagram on the next sender queue. Never blocks
    /// the caller beyond enqueue.
    pub fn send(&self, datagram: Datagram) -> Result<(), ClusterError> {
        let pool = self.pool.lock();
        let pool = pool.as_ref().ok_or(ClusterError::NotRunning)?;
        let index = self.next_queue.fetch_add(1, Ordering::Relaxed) % pool.queues.len();
        pool.queues[index].try_send(datagram).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ClusterError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ClusterError::NotRunning,
        })
    }
}

async fn sender_loop(id: usize, socket: Arc<UdpSocket>, mut rx: mpsc::Receiver<Datagram>) {
    while let Some(datagram) = rx.recv().await {
        if let Err(e) = socket.send_to(&datagram.payload, datagram.peer).await {
            warn!(
                "management send to {} failed ({} bytes): {}",
                datagram.peer,
                datagram.payload.len(),
                e
            );
        }
    }
    debug!("management sender {} drained", id);
}

/// Apply receive/send buffer sizes to a socket, skipping unset sizes.
pub fn apply_buffer_sizes(
    socket: &UdpSocket,
    recv_buffer_size: Option<usize>,
    send_buffer_size: Option<usize>,
) -> io::Result<()> {
    let sock_ref = SockRef::from(socket);
    if let Some(size) = recv_buffer_size {
        sock_ref.set_recv_buffer_size(size)?;
    }
    if let Some(size) = send_buffer_size {
        sock_ref.set_send_buffer_size(size)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    async fn bound_socket() -> Arc<UdpSocket> {
        Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap())
    }

    #[tokio::test]
    async fn test_send_before_start_fails() {
        let transport = UdpTransport::new(None, None);
        let peer = "127.0.0.1:9".parse().unwrap();
        let result = transport.send(Datagram::new(peer, Bytes::from_static(b"x")));
        assert!(matches!(result, Err(ClusterError::NotRunning)));
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let transport = UdpTransport::new(None, None);
        let socket = bound_socket().await;
        transport.start(socket.clone()).unwrap();
        transport.start(socket).unwrap();
        assert!(transport.is_running());
        transport.stop().await;
        assert!(!transport.is_running());
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let transport = UdpTransport::new(None, None);
        transport.stop().await;
        assert!(!transport.is_running());
    }

    #[tokio::test]
    async fn test_send_reaches_peer() {
        let transport = UdpTransport::new(Some(65535), Some(65535));
        let socket = bound_socket().await;
        transport.start(socket).unwrap();

        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer = receiver.local_addr().unwrap();

        transport
            .send(Datagram::new(peer, Bytes::from_static(b"over the wire")))
            .unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"over the wire");

        transport.stop().await;
    }

    #[tokio::test]
    async fn test_stop_drains_backlog() {
        let transport = UdpTransport::new(None, None);
        let socket = bound_socket().await;
        transport.start(socket).unwrap();

        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer = receiver.local_addr().unwrap();

        for i in 0..10u8 {
            transport
                .send(Datagram::new(peer, Bytes::copy_from_slice(&[i])))
                .unwrap();
        }
        transport.stop().await;

        let mut buf = [0u8; 8];
        let mut seen = 0;
        while seen < 10 {
            let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
            assert_eq!(len, 1);
            seen += 1;
        }
    }
}

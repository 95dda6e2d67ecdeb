//! # Connection Management
//!
//! This module handles individual TCP connections accepted by an endpoint.
//!
//! # Architecture
//!
//! Each connection runs as two Tokio tasks:
//! - **Reader** - cuts the byte stream into frames with [`FrameCodec`] and hands
//!   each one to the endpoint handler, one at a time
//! - **Writer** - drains a bounded channel of encoded frames into the socket,
//!   so sends are fire-and-forget and leave in the order they were queued
//!
//! A peer that stops reading fills the channel; further sends fail with a
//! `Network` error and the frame is dropped until the writer catches up.
//!
//! # Lifecycle
//!
//! ```text
//! Connected → (receive/dispatch)* → Disconnected
//! ```
//!
//! No protocol phases are enforced: any opcode may arrive at any time.

use crate::handlers::EndpointHandler;
use crate::session::Session;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use necromancy_core::{ConnectionId, Endpoint, NecroError, Result};
use necromancy_protocol::FrameCodec;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_util::codec::{FramedRead, FramedWrite};

/// Time allowed for queued frames to drain once a connection closes
const WRITER_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// State of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket accepted, frames are being processed
    Connected,

    /// Connection closed
    Disconnected,
}

/// Individual client connection
///
/// # Thread Safety
/// Shared as `Arc<Connection>` between the reader task, the writer task and
/// the listener's connection map.
pub struct Connection {
    /// Identifier within the owning listener
    pub id: ConnectionId,

    /// Endpoint that accepted the connection
    pub endpoint: Endpoint,

    /// Peer address (IP:port)
    pub peer_addr: SocketAddr,

    state: Mutex<ConnectionState>,

    /// Outbound frame queue, taken on close
    outbound: Mutex<Option<mpsc::Sender<Bytes>>>,

    connected_at: Instant,
    bytes_received: AtomicU64,
    bytes_sent: AtomicU64,
    frames_received: AtomicU64,
    frames_sent: AtomicU64,
}

impl Connection {
    /// Create a new connection and the receiving end of its outbound queue
    pub fn new(
        id: ConnectionId,
        endpoint: Endpoint,
        peer_addr: SocketAddr,
        outbound_queue_size: usize,
    ) -> (Self, mpsc::Receiver<Bytes>) {
        tracing::debug!("New {} connection {}: {}", endpoint, id, peer_addr);

        let (tx, rx) = mpsc::channel(outbound_queue_size.max(1));
        let conn = Self {
            id,
            endpoint,
            peer_addr,
            state: Mutex::new(ConnectionState::Connected),
            outbound: Mutex::new(Some(tx)),
            connected_at: Instant::now(),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
        };
        (conn, rx)
    }

    /// Run the connection until the peer leaves, the socket fails or the
    /// listener shuts down
    ///
    /// # Lifecycle
    /// ```text
    /// 1. Spawn writer task
    /// 2. on_connected
    /// 3. Read frame → on_received_data, repeat
    /// 4. Close outbound queue, let the writer drain
    /// 5. on_disconnected
    /// ```
    pub async fn serve(
        self: Arc<Self>,
        stream: TcpStream,
        outbound: mpsc::Receiver<Bytes>,
        handler: Arc<dyn EndpointHandler>,
        read_buffer_size: usize,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let (read_half, write_half) = stream.into_split();
        let writer = tokio::spawn(Self::write_loop(self.clone(), write_half, outbound));
        let mut frames = FramedRead::with_capacity(read_half, FrameCodec::new(), read_buffer_size);

        handler.on_connected(&*self);

        let result = loop {
            tokio::select! {
                next = frames.next() => match next {
                    Some(Ok(frame)) => {
                        self.bytes_received.fetch_add(frame.len() as u64, Ordering::Relaxed);
                        self.frames_received.fetch_add(1, Ordering::Relaxed);
                        handler.on_received_data(&*self, &frame);
                    }
                    Some(Err(e)) => break Err(e),
                    None => {
                        tracing::debug!("Connection {} closed by client", self.id);
                        break Ok(());
                    }
                },
                _ = shutdown.changed() => {
                    tracing::debug!("Connection {} closing for shutdown", self.id);
                    break Ok(());
                }
            }
        };

        self.close();
        match tokio::time::timeout(WRITER_DRAIN_GRACE, writer).await {
            Ok(Ok(Err(e))) => tracing::debug!("Connection {} writer error: {}", self.id, e),
            Ok(Err(e)) => tracing::error!("Connection {} writer task failed: {}", self.id, e),
            Err(_) => tracing::warn!("Connection {} writer did not drain in time", self.id),
            Ok(Ok(Ok(()))) => {}
        }

        handler.on_disconnected(&*self);
        self.log_stats();
        result
    }

    async fn write_loop(
        conn: Arc<Self>,
        write_half: OwnedWriteHalf,
        mut outbound: mpsc::Receiver<Bytes>,
    ) -> Result<()> {
        let mut sink = FramedWrite::new(write_half, FrameCodec::new());
        while let Some(frame) = outbound.recv().await {
            let len = frame.len();
            sink.send(frame).await?;
            conn.bytes_sent.fetch_add(len as u64, Ordering::Relaxed);
            conn.frames_sent.fetch_add(1, Ordering::Relaxed);
        }
        // Flushes and shuts down the write half
        sink.close().await
    }

    /// Stop accepting sends; frames already queued are still written
    pub fn close(&self) {
        *self.state.lock() = ConnectionState::Disconnected;
        self.outbound.lock().take();
    }

    fn log_stats(&self) {
        tracing::info!(
            "Connection {} stats - Duration: {:?}, RX: {} bytes / {} frames, TX: {} bytes / {} frames",
            self.id,
            self.connected_at.elapsed(),
            self.bytes_received(),
            self.frames_received(),
            self.bytes_sent(),
            self.frames_sent()
        );
    }

    // === Getters for connection statistics ===

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Get total bytes received
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    /// Get total bytes written to the socket
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Get total frames received
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Get total frames written to the socket
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

}

impl Session for Connection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer_addr)
    }

    fn send_frame(&self, frame: Bytes) -> Result<()> {
        let outbound = self.outbound.lock();
        let tx = outbound
            .as_ref()
            .ok_or_else(|| NecroError::Network(format!("connection {} closed", self.id)))?;
        tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                NecroError::Network(format!("connection {} outbound queue full", self.id))
            }
            mpsc::error::TrySendError::Closed(_) => {
                NecroError::Network(format!("connection {} writer stopped", self.id))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_connection() -> (Connection, mpsc::Receiver<Bytes>) {
        Connection::new(
            ConnectionId::new(1),
            Endpoint::Login,
            "127.0.0.1:50000".parse().unwrap(),
            16,
        )
    }

    #[test]
    fn test_send_queues_in_order() {
        let (conn, mut rx) = test_connection();
        conn.send_frame(Bytes::from_static(b"first")).unwrap();
        conn.send_frame(Bytes::from_static(b"second")).unwrap();

        assert_eq!(&rx.try_recv().unwrap()[..], b"first");
        assert_eq!(&rx.try_recv().unwrap()[..], b"second");
        assert_eq!(conn.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_send_after_close_fails() {
        let (conn, mut rx) = test_connection();
        conn.send_frame(Bytes::from_static(b"queued")).unwrap();
        conn.close();

        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(conn.send_frame(Bytes::from_static(b"late")).is_err());

        // Frames queued before close are still delivered, then the queue ends
        assert_eq!(&rx.try_recv().unwrap()[..], b"queued");
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_full_queue_rejects_send() {
        let (conn, mut rx) = Connection::new(
            ConnectionId::new(2),
            Endpoint::World,
            "127.0.0.1:50001".parse().unwrap(),
            2,
        );
        conn.send_frame(Bytes::from_static(b"one")).unwrap();
        conn.send_frame(Bytes::from_static(b"two")).unwrap();

        let err = conn.send_frame(Bytes::from_static(b"three")).unwrap_err();
        assert!(matches!(err, NecroError::Network(ref msg) if msg.contains("queue full")));

        // Draining makes room again
        assert_eq!(&rx.try_recv().unwrap()[..], b"one");
        conn.send_frame(Bytes::from_static(b"four")).unwrap();
        assert_eq!(&rx.try_recv().unwrap()[..], b"two");
        assert_eq!(&rx.try_recv().unwrap()[..], b"four");
    }

    #[test]
    fn test_session_identity() {
        let (conn, _rx) = test_connection();
        assert_eq!(Session::id(&conn).get(), 1);
        assert_eq!(conn.peer_addr().unwrap().port(), 50000);
        assert_eq!(conn.frames_sent(), 0);
    }
}

//! # Endpoint Listener
//!
//! One listener per endpoint: it binds a TCP port, accepts connections and
//! runs each one on its own task with the endpoint's handler.
//!
//! # Architecture
//!
//! 1. **TCP Listener** - Accepts incoming connections
//! 2. **Connection Map** - Tracks live connections (DashMap for concurrent access)
//! 3. **Endpoint Handler** - Shared by every connection of this endpoint
//! 4. **ID Generator** - Assigns connection IDs
//!
//! # Shutdown
//!
//! [`EndpointListener::shutdown`] flips a `watch` channel: the accept loop stops,
//! every connection closes its socket and reports `on_disconnected`, and
//! [`EndpointListener::run`] returns once all connection tasks are done.
//!
//! # Example
//!
//! ```rust,no_run
//! use necromancy_network::{EndpointHandler, EndpointListener, ListenerConfig};
//! use std::sync::Arc;
//!
//! async fn serve(handler: Arc<dyn EndpointHandler>) -> necromancy_core::Result<()> {
//!     let config = ListenerConfig::for_endpoint(handler.endpoint());
//!     let listener = EndpointListener::bind(config, handler)?;
//!     listener.run().await
//! }
//! ```

use crate::{config::ListenerConfig, connection::Connection, handlers::EndpointHandler};
use dashmap::DashMap;
use necromancy_core::{ConnectionId, Endpoint, IdGenerator, NecroError, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Pending connection queue length
const LISTEN_BACKLOG: i32 = 1024;

/// TCP listener for one endpoint
pub struct EndpointListener {
    /// Listener configuration
    config: ListenerConfig,

    /// Bound TCP listener
    listener: TcpListener,

    /// Handler shared by all connections
    handler: Arc<dyn EndpointHandler>,

    /// All active connections
    connections: Arc<DashMap<ConnectionId, Arc<Connection>>>,

    /// ID generator for connections
    id_generator: IdGenerator,

    /// Shutdown signal
    shutdown_tx: watch::Sender<bool>,
}

impl EndpointListener {
    /// Validate the configuration and bind the listening socket
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// - `Config` if the configuration is invalid
    /// - `Io` if the address cannot be bound
    pub fn bind(config: ListenerConfig, handler: Arc<dyn EndpointHandler>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| NecroError::Config(format!("Invalid configuration: {}", e)))?;

        let listener = bind_listener(config.bind_address).map_err(|e| {
            NecroError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", config.bind_address, e),
            ))
        })?;

        tracing::info!("{} endpoint listening on {}", handler.endpoint(), config.bind_address);

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            listener,
            handler,
            connections: Arc::new(DashMap::new()),
            id_generator: IdGenerator::new(),
            shutdown_tx,
        })
    }

    /// Endpoint served by this listener
    pub fn endpoint(&self) -> Endpoint {
        self.handler.endpoint()
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until [`shutdown`](Self::shutdown) is called
    ///
    /// # Lifecycle
    /// ```text
    /// 1. Accept incoming connection
    /// 2. Check connection limit
    /// 3. Assign connection ID
    /// 4. Spawn connection task
    /// 5. Repeat until shutdown, then wait for connection tasks
    /// ```
    pub async fn run(&self) -> Result<()> {
        let endpoint = self.endpoint();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow_and_update() {
            tracing::info!("{} endpoint shut down before accepting", endpoint);
            return Ok(());
        }

        tracing::info!("{} endpoint starting accept loop", endpoint);
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    // Reap finished connection tasks
                    while tasks.try_join_next().is_some() {}

                    match result {
                        Ok((stream, addr)) => {
                            if self.connections.len() >= self.config.max_connections {
                                tracing::warn!("{} connection from {} rejected: server full ({} connections)",
                                    endpoint, addr, self.connections.len());
                                drop(stream);
                                continue;
                            }

                            if let Err(e) = stream.set_nodelay(self.config.nodelay) {
                                tracing::warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                            }

                            let id = self.id_generator.next_id();
                            let (conn, outbound) =
                                Connection::new(id, endpoint, addr, self.config.outbound_queue_size);
                            let conn = Arc::new(conn);
                            self.connections.insert(id, conn.clone());

                            let connections = self.connections.clone();
                            let handler = self.handler.clone();
                            let shutdown = shutdown_rx.clone();
                            let read_buffer_size = self.config.read_buffer_size;

                            tasks.spawn(async move {
                                let result = conn
                                    .serve(stream, outbound, handler, read_buffer_size, shutdown)
                                    .await;
                                connections.remove(&id);

                                match result {
                                    Ok(()) => tracing::debug!("{} connection {} task completed", endpoint, id),
                                    Err(e) => tracing::error!("{} connection {} task failed: {}", endpoint, id, e),
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("{} endpoint error accepting connection: {:?}", endpoint, e);
                        }
                    }
                }

                _ = shutdown_rx.changed() => {
                    tracing::info!("{} endpoint shutting down", endpoint);
                    break;
                }
            }
        }

        tracing::info!("{} endpoint waiting for {} connection tasks", endpoint, tasks.len());
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("{} connection task panicked: {}", endpoint, e);
            }
        }

        tracing::info!("{} endpoint stopped", endpoint);
        Ok(())
    }

    /// Stop accepting and close every connection
    ///
    /// The flag is stored even while nothing is subscribed, so a shutdown
    /// requested before [`run`](Self::run) starts still takes effect.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Get the number of active connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get a connection by ID
    pub fn get_connection(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(&id).map(|entry| entry.clone())
    }

    /// Get listener statistics
    pub fn stats(&self) -> ListenerStats {
        let mut stats = ListenerStats {
            connections: self.connections.len(),
            ..Default::default()
        };

        for entry in self.connections.iter() {
            let conn = entry.value();
            stats.total_bytes_received += conn.bytes_received();
            stats.total_bytes_sent += conn.bytes_sent();
            stats.total_frames_received += conn.frames_received();
            stats.total_frames_sent += conn.frames_sent();
        }

        stats
    }
}

/// Create the listening socket with `SO_REUSEADDR` so a restarted server can
/// rebind while old connections sit in TIME_WAIT
fn bind_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    TcpListener::from_std(socket.into())
}

/// Listener statistics snapshot over live connections
#[derive(Debug, Clone, Default)]
pub struct ListenerStats {
    /// Current number of active connections
    pub connections: usize,

    /// Total bytes received from live connections
    pub total_bytes_received: u64,

    /// Total bytes sent to live connections
    pub total_bytes_sent: u64,

    /// Total frames received from live connections
    pub total_frames_received: u64,

    /// Total frames sent to live connections
    pub total_frames_sent: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{Dispatch, OpcodeTable, PacketRouter};
    use crate::session::Session;
    use necromancy_core::MemorySink;
    use necromancy_protocol::{encode_frame, PacketWriter};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    struct EchoServer {
        router: PacketRouter,
    }

    impl EchoServer {
        fn new(sink: Arc<MemorySink>) -> Self {
            let mut table = OpcodeTable::new();
            table.register_function(0x0001, |ctx, reader| {
                let mut reply = PacketWriter::new();
                reply.write_bytes(reader.rest());
                ctx.send(0x0002, &reply)
            });
            Self {
                router: PacketRouter::new(Endpoint::World, table, sink),
            }
        }
    }

    impl EndpointHandler for EchoServer {
        fn endpoint(&self) -> Endpoint {
            Endpoint::World
        }

        fn on_connected(&self, session: &dyn Session) {
            self.router.connected(session);
        }

        fn on_disconnected(&self, session: &dyn Session) {
            self.router.disconnected(session);
        }

        fn on_received_data(&self, session: &dyn Session, data: &[u8]) -> Dispatch {
            self.router.route(session, data)
        }
    }

    fn local_config() -> ListenerConfig {
        ListenerConfig {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            ..ListenerConfig::for_endpoint(Endpoint::World)
        }
    }

    async fn start(
        config: ListenerConfig,
        sink: Arc<MemorySink>,
    ) -> (Arc<EndpointListener>, SocketAddr, tokio::task::JoinHandle<Result<()>>) {
        let listener = Arc::new(EndpointListener::bind(config, Arc::new(EchoServer::new(sink))).unwrap());
        let addr = listener.local_addr().unwrap();
        let runner = listener.clone();
        let task = tokio::spawn(async move { runner.run().await });
        (listener, addr, task)
    }

    async fn read_frame(stream: &mut TcpStream) -> Vec<u8> {
        let mut header = [0u8; 2];
        stream.read_exact(&mut header).await.unwrap();
        let size = u16::from_be_bytes(header) as usize;
        let mut rest = vec![0u8; size];
        stream.read_exact(&mut rest).await.unwrap();
        [header.to_vec(), rest].concat()
    }

    #[tokio::test]
    async fn test_echo_over_tcp_with_split_writes() {
        let sink = Arc::new(MemorySink::new());
        let (listener, addr, task) = start(local_config(), sink.clone()).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        let frame = encode_frame(0x0001, b"hello").unwrap();
        client.write_all(&frame[..3]).await.unwrap();
        client.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.write_all(&frame[3..]).await.unwrap();

        let reply = read_frame(&mut client).await;
        assert_eq!(reply, encode_frame(0x0002, b"hello").unwrap().to_vec());

        listener.shutdown();
        task.await.unwrap().unwrap();
        assert!(sink
            .with_tag("World")
            .iter()
            .any(|r| r.message.starts_with("Client Connected")));
    }

    #[tokio::test]
    async fn test_bad_frames_keep_connection_open() {
        let sink = Arc::new(MemorySink::new());
        let (listener, addr, task) = start(local_config(), sink.clone()).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        // Unrecognized opcode, then a frame whose size does not cover the opcode
        client.write_all(&encode_frame(0xFFFF, b"??").unwrap()).await.unwrap();
        client.write_all(&[0x00, 0x01, 0x42]).await.unwrap();
        client.write_all(&encode_frame(0x0001, b"still here").unwrap()).await.unwrap();

        // The first frame back answers the last request: nothing was sent for the others
        let reply = read_frame(&mut client).await;
        assert_eq!(reply, encode_frame(0x0002, b"still here").unwrap().to_vec());

        let errors: Vec<_> = sink
            .with_tag("World")
            .into_iter()
            .filter(|r| r.level == necromancy_core::LogLevel::Error)
            .collect();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "OPCode: 0xFFFF not handled");

        listener.shutdown();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_connections() {
        let sink = Arc::new(MemorySink::new());
        let (listener, addr, task) = start(local_config(), sink.clone()).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(&encode_frame(0x0001, b"x").unwrap()).await.unwrap();
        read_frame(&mut client).await;
        assert_eq!(listener.connection_count(), 1);
        assert_eq!(listener.stats().total_frames_received, 1);

        // Ids start at 1 per listener
        let conn = listener.get_connection(ConnectionId::new(1)).unwrap();
        assert_eq!(conn.frames_received(), 1);
        assert!(listener.get_connection(ConnectionId::new(2)).is_none());

        listener.shutdown();
        task.await.unwrap().unwrap();

        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
        assert_eq!(listener.connection_count(), 0);
        assert!(sink
            .with_tag("World")
            .iter()
            .any(|r| r.message.starts_with("Client Disconnected")));
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let sink = Arc::new(MemorySink::new());
        let config = ListenerConfig {
            max_connections: 1,
            ..local_config()
        };
        let (listener, addr, task) = start(config, sink).await;

        let mut first = TcpStream::connect(addr).await.unwrap();
        first.write_all(&encode_frame(0x0001, b"a").unwrap()).await.unwrap();
        read_frame(&mut first).await;

        let mut second = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 1];
        let read = tokio::time::timeout(Duration::from_secs(5), second.read(&mut buf))
            .await
            .unwrap();
        assert!(matches!(read, Ok(0) | Err(_)));

        listener.shutdown();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let sink = Arc::new(MemorySink::new());
        let config = ListenerConfig {
            max_connections: 0,
            ..local_config()
        };
        let result = EndpointListener::bind(config, Arc::new(EchoServer::new(sink)));
        assert!(matches!(result, Err(NecroError::Config(_))));
    }

    #[tokio::test]
    async fn test_shutdown_before_run() {
        let sink = Arc::new(MemorySink::new());
        let listener = EndpointListener::bind(local_config(), Arc::new(EchoServer::new(sink))).unwrap();
        listener.shutdown();

        tokio::time::timeout(Duration::from_secs(3), listener.run())
            .await
            .expect("run must return when shutdown came first")
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_while_run_starting() {
        let sink = Arc::new(MemorySink::new());
        let (listener, _addr, task) = start(local_config(), sink).await;
        // May land before or after the spawned run() subscribes
        listener.shutdown();

        tokio::time::timeout(Duration::from_secs(3), task)
            .await
            .expect("run must observe the shutdown")
            .unwrap()
            .unwrap();
    }
}

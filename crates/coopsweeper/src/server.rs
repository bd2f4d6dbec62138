//! `CoopsweeperServer` builder and server loop.
//!
//! This is the entry point for running a Coopsweeper server. It ties
//! together all the layers: transport → protocol → room registry.

use std::future::Future;
use std::sync::Arc;

use coopsweeper_protocol::{Codec, JsonCodec};
use coopsweeper_room::RoomRegistry;
use coopsweeper_transport::{Transport, TransportError, WebSocketTransport};
use tokio::sync::{Mutex, mpsc};

use crate::handler::handle_connection;
use crate::sink::{LogSink, ResultSink, drain_results};
use crate::{CoopsweeperError, ServerConfig};

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The registry
/// lock is held only for room creation, lookup and teardown; board traffic
/// goes straight to the room actors.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: Mutex<RoomRegistry>,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Coopsweeper server.
///
/// # Example
///
/// ```rust,no_run
/// use coopsweeper::prelude::*;
///
/// # async fn run() -> Result<(), CoopsweeperError> {
/// let server = CoopsweeperServer::builder()
///     .config(ServerConfig::from_env()?)
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct CoopsweeperServerBuilder<S: ResultSink = LogSink> {
    config: ServerConfig,
    sink: S,
}

impl CoopsweeperServerBuilder {
    /// Creates a new builder with default settings and a [`LogSink`].
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            sink: LogSink,
        }
    }
}

impl Default for CoopsweeperServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ResultSink> CoopsweeperServerBuilder<S> {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets where solved boards are reported.
    pub fn result_sink<T: ResultSink>(self, sink: T) -> CoopsweeperServerBuilder<T> {
        CoopsweeperServerBuilder {
            config: self.config,
            sink,
        }
    }

    /// Binds the listener and starts the result sink task.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<CoopsweeperServer<JsonCodec>, CoopsweeperError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let (results_tx, results_rx) = mpsc::unbounded_channel();
        tokio::spawn(drain_results(results_rx, self.sink));

        let rooms = RoomRegistry::with_config(self.config.room_config()).with_results(results_tx);
        let state = Arc::new(ServerState {
            rooms: Mutex::new(rooms),
            codec: JsonCodec,
            config: self.config,
        });

        Ok(CoopsweeperServer { transport, state })
    }
}

/// A running Coopsweeper server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CoopsweeperServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl CoopsweeperServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> CoopsweeperServerBuilder {
        CoopsweeperServerBuilder::new()
    }
}

impl<C> CoopsweeperServer<C>
where
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Returns once the transport is shut down.
    pub async fn run(mut self) -> Result<(), CoopsweeperError> {
        match self.local_addr() {
            Ok(addr) => tracing::info!(%addr, "coopsweeper server running"),
            Err(_) => tracing::info!("coopsweeper server running"),
        }

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(TransportError::Shutdown) => break,
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }

        tracing::info!("coopsweeper server stopped");
        Ok(())
    }

    /// Runs until `signal` resolves, then stops accepting connections.
    /// Connections already open keep running until the runtime ends.
    pub async fn run_until(self, signal: impl Future<Output = ()>) -> Result<(), CoopsweeperError> {
        tokio::select! {
            result = self.run() => result,
            () = signal => {
                tracing::info!("shutdown signal received");
                Ok(())
            }
        }
    }
}

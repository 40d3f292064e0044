//! `NimArenaServer` builder and server loop.
//!
//! This is the entry point for running a Nim Arena server. It ties together
//! all the layers: transport → protocol → gateway → rooms.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use nim_arena_protocol::{Codec, JsonCodec};
use nim_arena_room::{GameConfig, JsonFileMirror, MirrorHandle, RoomRegistry, spawn_mirror};
use nim_arena_transport::{HANDSHAKE_TIMEOUT, Transport, WebSocketTransport};
use tokio::net::TcpListener;

use crate::handler::handle_connection;
use crate::{NimArenaError, ServerConfig, health};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The registry
/// does its own locking.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: RoomRegistry,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a Nim Arena server.
///
/// # Example
///
/// ```rust,no_run
/// use nim_arena::NimArenaServer;
///
/// # async fn start() -> Result<(), nim_arena::NimArenaError> {
/// let server = NimArenaServer::builder()
///     .bind("0.0.0.0:4000")
///     .health_bind("0.0.0.0:4001")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct NimArenaServerBuilder {
    bind_addr: String,
    health_addr: Option<String>,
    idle_timeout: Option<Duration>,
    handshake_timeout: Duration,
    game: GameConfig,
    mirror: Option<MirrorHandle>,
    mirror_dir: Option<PathBuf>,
}

impl NimArenaServerBuilder {
    /// Creates a new builder with default settings: loopback on port 4000,
    /// no health endpoint, no idle timeout, no mirror.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:4000".to_string(),
            health_addr: None,
            idle_timeout: None,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            game: GameConfig::default(),
            mirror: None,
            mirror_dir: None,
        }
    }

    /// Starts from a [`ServerConfig`], typically read from the environment.
    pub fn from_config(config: ServerConfig) -> Self {
        Self {
            bind_addr: config.bind_addr,
            health_addr: config.health_addr,
            idle_timeout: config.idle_timeout,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            game: config.game,
            mirror: None,
            mirror_dir: config.mirror_dir,
        }
    }

    /// Sets the address to bind the WebSocket listener to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Serves `GET /health` on a separate listener at `addr`.
    pub fn health_bind(mut self, addr: &str) -> Self {
        self.health_addr = Some(addr.to_string());
        self
    }

    /// Closes connections that send nothing for `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Drops clients that have not finished the WebSocket handshake
    /// within `timeout`. Defaults to five seconds.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets how piles are generated.
    pub fn game_config(mut self, config: GameConfig) -> Self {
        self.game = config;
        self
    }

    /// Mirrors room snapshots through an already running mirror worker.
    /// Takes precedence over [`mirror_dir`](Self::mirror_dir).
    pub fn mirror(mut self, mirror: MirrorHandle) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Mirrors room snapshots as JSON files in `dir`.
    pub fn mirror_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mirror_dir = Some(dir.into());
        self
    }

    /// Binds the listeners and assembles the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<NimArenaServer<JsonCodec>, NimArenaError> {
        let mut registry = RoomRegistry::new(self.game)?;

        let mirror = match (self.mirror, self.mirror_dir) {
            (Some(mirror), _) => Some(mirror),
            (None, Some(dir)) => {
                tracing::info!(dir = %dir.display(), "mirroring room snapshots to disk");
                Some(spawn_mirror(JsonFileMirror::new(dir)))
            }
            (None, None) => None,
        };
        if let Some(mirror) = mirror {
            registry = registry.with_mirror(mirror);
        }

        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let health = match &self.health_addr {
            Some(addr) => Some(TcpListener::bind(addr).await?),
            None => None,
        };

        let state = Arc::new(ServerState {
            registry,
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(NimArenaServer {
            transport,
            health,
            handshake_timeout: self.handshake_timeout,
            state,
        })
    }
}

impl Default for NimArenaServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Nim Arena server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct NimArenaServer<C: Codec> {
    transport: WebSocketTransport,
    health: Option<TcpListener>,
    handshake_timeout: Duration,
    state: Arc<ServerState<C>>,
}

impl NimArenaServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> NimArenaServerBuilder {
        NimArenaServerBuilder::new()
    }
}

impl<C: Codec> NimArenaServer<C> {
    /// Returns the address the WebSocket listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, NimArenaError> {
        Ok(self.transport.local_addr()?)
    }

    /// Returns the address of the health endpoint, if enabled.
    pub fn health_addr(&self) -> Option<SocketAddr> {
        self.health.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Runs the server accept loop.
    ///
    /// Starts the health endpoint, then accepts incoming connections and
    /// spawns a handler task for each. The WebSocket handshake runs inside
    /// that task, so a client that stalls mid-handshake only holds up its
    /// own connection. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), NimArenaError> {
        if let Some(listener) = self.health.take() {
            tokio::spawn(async move {
                if let Err(e) = health::serve(listener).await {
                    tracing::error!(error = %e, "health endpoint stopped");
                }
            });
        }

        let addr = self.local_addr()?;
        tracing::info!(%addr, "Nim Arena server running");

        loop {
            match self.transport.accept_pending().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    let limit = self.handshake_timeout;
                    tokio::spawn(async move {
                        let peer = pending.peer_addr();
                        let conn = match pending.upgrade(limit).await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::debug!(%peer, error = %e, "handshake failed");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

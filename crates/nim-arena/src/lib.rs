//! # Nim Arena
//!
//! Real-time multiplayer Nim over WebSockets.
//!
//! Players join a room by id; the second player to arrive starts the game.
//! The server owns the piles and the turn order, validates every move and
//! broadcasts the full room state to all members after each change.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nim_arena::{NimArenaServerBuilder, ServerConfig};
//!
//! # async fn start() -> Result<(), nim_arena::NimArenaError> {
//! let config = ServerConfig::from_env()?;
//! let server = NimArenaServerBuilder::from_config(config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
pub mod health;
mod server;
pub mod telemetry;

pub use config::{ConfigError, DEFAULT_HEALTH_ADDR, DEFAULT_PORT, ServerConfig};
pub use error::NimArenaError;
pub use server::{NimArenaServer, NimArenaServerBuilder};

/// Re-exports for embedding the server or writing clients against it.
pub mod prelude {
    pub use nim_arena_protocol::{
        ClientMessage, Codec, JoinRequest, JsonCodec, MoveRequest, Player, PlayerId,
        RestartRequest, RoomId, RoomSnapshot, RoomStatus, RoomUpdate, ServerMessage,
    };
    pub use nim_arena_room::{GameConfig, MirrorHandle, SnapshotMirror, spawn_mirror};

    pub use crate::{NimArenaError, NimArenaServer, NimArenaServerBuilder, ServerConfig};
}

//! Unified error type for the Nim Arena server.

use nim_arena_protocol::ProtocolError;
use nim_arena_room::RoomError;
use nim_arena_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum NimArenaError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (closed, not found, bad game config).
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The health listener failed.
    #[error("health endpoint: {0}")]
    Io(#[from] std::io::Error),
}

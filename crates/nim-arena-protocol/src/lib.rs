//! Wire protocol for Nim Arena.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`RoomSnapshot`], …):
//!   the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! The protocol layer sits between transport (raw frames) and the room
//! layer (authoritative game state). It knows nothing about connections
//! or room lifecycles.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Room actor
//! Room actor → Protocol (ServerMessage) → Transport (bytes)
//! ```

mod codec;
mod error;
mod snapshot;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use snapshot::{Player, RoomSnapshot, RoomStatus};
pub use types::{
    ClientMessage, JoinRequest, MoveRequest, PlayerId, RestartRequest,
    RoomId, RoomUpdate, ServerMessage, DEFAULT_PLAYER_NAME, INVALID_MOVE_ARG,
};

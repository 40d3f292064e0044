//! Authoritative Nim rooms for Nim Arena.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! piles, members and turn order. Everything a player does to a room goes
//! through the room's command channel, so moves in one room are totally
//! ordered and rooms never contend with each other.
//!
//! # Key types
//!
//! - [`Room`]: the synchronous game state machine
//! - [`RoomRegistry`]: creates rooms on demand and drops them once empty
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`GameConfig`]: pile generation settings
//! - [`MirrorHandle`] / [`SnapshotMirror`]: write-behind snapshot storage

mod actor;
mod config;
mod error;
mod mirror;
pub mod piles;
mod registry;
mod room;
pub mod rules;

pub use actor::{MoveReply, PlayerSender, RoomHandle};
pub use config::GameConfig;
pub use error::{MoveRejection, RoomError};
pub use mirror::{JsonFileMirror, MirrorError, MirrorHandle, RoomRecord, SnapshotMirror, spawn_mirror};
pub use registry::RoomRegistry;
pub use room::{LeaveOutcome, MoveOutcome, Room};

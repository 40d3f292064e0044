//! The full serialized state of a room, as clients see it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// A member of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

/// Where a room is in its game lifecycle.
///
/// ```text
/// Waiting ──(2nd join)──→ Playing ──(last item taken)──→ Finished
///                            ↑                              │
///                            └────────(restart)─────────────┘
/// ```
///
/// `restart` also moves a `Waiting` room straight to `Playing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    /// Returns `true` if moves are currently accepted.
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting"),
            Self::Playing => f.write_str("playing"),
            Self::Finished => f.write_str("finished"),
        }
    }
}

/// Everything a client needs to render a room. Sent whole on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub players: BTreeMap<PlayerId, Player>,
    pub piles: Vec<u32>,
    pub turn_order: Vec<PlayerId>,
    pub status: RoomStatus,
    /// Index into `turn_order`, to be taken modulo its length.
    pub current_turn: usize,
    pub winner: Option<PlayerId>,
}

impl RoomSnapshot {
    /// The player whose turn it is, resolved the same way the server does.
    pub fn current_player(&self) -> Option<PlayerId> {
        if self.turn_order.is_empty() {
            return None;
        }
        self.turn_order
            .get(self.current_turn % self.turn_order.len())
            .copied()
    }

    /// Total number of items left across every pile.
    pub fn items_left(&self) -> u64 {
        self.piles.iter().map(|&p| u64::from(p)).sum()
    }
}

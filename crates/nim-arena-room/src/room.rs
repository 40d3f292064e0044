//! The Nim room state machine.
//!
//! [`Room`] is plain data with synchronous transitions. It doesn't know
//! about channels, tasks or the network; the room actor wraps it and does
//! the broadcasting. That keeps every rule testable without a runtime.

use std::collections::BTreeMap;

use nim_arena_protocol::{Player, PlayerId, RoomId, RoomSnapshot, RoomStatus};

use crate::MoveRejection;
use crate::rules::validate_move;

/// What an accepted move did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Items remain; the turn passed on.
    Continued,
    /// The move took the last item.
    Won(PlayerId),
}

/// What a leave did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The player wasn't a member. Nothing changed.
    NotMember,
    /// The player left and others remain.
    Left,
    /// The player was the last member. The room must be torn down.
    Emptied,
}

/// One game room: its members, piles and whose turn it is.
///
/// # Turn resolution
///
/// `current_turn` is an index into `turn_order` that is reduced modulo the
/// order's length every time it is read. It is never re-based when a
/// player leaves. If the player due to move leaves, the turn silently falls
/// to whoever now occupies that slot. This is intended: it keeps membership
/// changes mid-game from needing any extra bookkeeping.
#[derive(Debug, Clone)]
pub struct Room {
    room_id: RoomId,
    players: BTreeMap<PlayerId, Player>,
    turn_order: Vec<PlayerId>,
    piles: Vec<u32>,
    status: RoomStatus,
    current_turn: usize,
    winner: Option<PlayerId>,
}

impl Room {
    /// Creates an empty, waiting room with the given starting piles.
    pub fn new(room_id: RoomId, piles: Vec<u32>) -> Self {
        Self {
            room_id,
            players: BTreeMap::new(),
            turn_order: Vec::new(),
            piles,
            status: RoomStatus::Waiting,
            current_turn: 0,
            winner: None,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn piles(&self) -> &[u32] {
        &self.piles
    }

    pub fn turn_order(&self) -> &[PlayerId] {
        &self.turn_order
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// The raw turn index, before the modulo.
    pub fn current_turn(&self) -> usize {
        self.current_turn
    }

    /// The player due to move, or `None` if nobody is in the turn order.
    pub fn current_player(&self) -> Option<PlayerId> {
        if self.turn_order.is_empty() {
            return None;
        }
        let slot = self.current_turn % self.turn_order.len();
        self.turn_order.get(slot).copied()
    }

    /// Adds a player, or renames one who is already here.
    ///
    /// A player is appended to the turn order only on their first join. The
    /// second distinct player to arrive in a waiting room starts the game.
    /// Returns `true` if this join started it.
    pub fn join(&mut self, player_id: PlayerId, name: String) -> bool {
        self.players.insert(player_id, Player { id: player_id, name });
        if !self.turn_order.contains(&player_id) {
            self.turn_order.push(player_id);
        }

        if self.players.len() >= 2 && self.status == RoomStatus::Waiting {
            self.status = RoomStatus::Playing;
            self.current_turn = 0;
            return true;
        }
        false
    }

    /// Validates and applies a move.
    ///
    /// On rejection the room is untouched. Check
    /// [`MoveRejection::is_reported`] to decide whether the player hears
    /// about it.
    pub fn apply_move(
        &mut self,
        player_id: PlayerId,
        pile_index: i64,
        take: i64,
    ) -> Result<MoveOutcome, MoveRejection> {
        let valid = validate_move(self, player_id, pile_index, take)?;
        self.piles[valid.pile] -= valid.take;

        if self.piles.iter().all(|&p| p == 0) {
            self.status = RoomStatus::Finished;
            self.winner = Some(player_id);
            return Ok(MoveOutcome::Won(player_id));
        }

        // turn_order is non-empty here: validation found the mover in it.
        self.current_turn = (self.current_turn + 1) % self.turn_order.len();
        Ok(MoveOutcome::Continued)
    }

    /// Starts a new game with `piles`, keeping every member.
    ///
    /// The room goes to `Playing` whatever its member count, so a lone
    /// player left behind can restart and play against themselves.
    pub fn restart(&mut self, piles: Vec<u32>) {
        self.piles = piles;
        self.status = RoomStatus::Playing;
        self.winner = None;
        self.current_turn = 0;
    }

    /// Removes a player from the room and the turn order.
    ///
    /// `current_turn` is left alone (see the type-level docs). A recorded
    /// `winner` is left alone too, even if it was the leaving player.
    pub fn leave(&mut self, player_id: PlayerId) -> LeaveOutcome {
        if self.players.remove(&player_id).is_none() {
            return LeaveOutcome::NotMember;
        }
        self.turn_order.retain(|id| *id != player_id);

        if self.players.is_empty() {
            LeaveOutcome::Emptied
        } else {
            LeaveOutcome::Left
        }
    }

    /// The full state as clients see it.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            players: self.players.clone(),
            piles: self.piles.clone(),
            turn_order: self.turn_order.clone(),
            status: self.status,
            current_turn: self.current_turn,
            winner: self.winner,
        }
    }
}

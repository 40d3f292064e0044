//! Room registry: resolves room ids to live room actors.

use std::collections::HashMap;

use nim_arena_protocol::{PlayerId, RoomId};
use tokio::sync::Mutex;

use crate::actor::spawn_room;
use crate::{GameConfig, LeaveOutcome, MirrorHandle, PlayerSender, RoomError, RoomHandle};

/// How many times a join is retried when the room it found closes first.
const JOIN_ATTEMPTS: usize = 3;

/// Process-wide map from room id to room actor.
///
/// Rooms are created lazily on first join and removed as soon as they
/// empty. The map lock is only held while looking up or swapping handles,
/// never while a room is working, so operations on different rooms don't
/// wait on each other.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomId, RoomHandle>>,
    config: GameConfig,
    mirror: Option<MirrorHandle>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    ///
    /// # Errors
    /// Returns [`RoomError::InvalidConfig`] if `config` can't produce piles.
    pub fn new(config: GameConfig) -> Result<Self, RoomError> {
        config.validate()?;
        Ok(Self {
            rooms: Mutex::new(HashMap::new()),
            config,
            mirror: None,
        })
    }

    /// Mirrors every broadcast snapshot of every room created from now on.
    pub fn with_mirror(mut self, mirror: MirrorHandle) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Returns the live room for `room_id`, creating it if there is none.
    ///
    /// A handle that has already closed counts as no room at all and is
    /// replaced, so a room id is reusable the instant its room empties.
    pub async fn get_or_create(&self, room_id: &RoomId) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.get(room_id) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }

        let handle = spawn_room(room_id.clone(), &self.config, self.mirror.clone());
        rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, "room created");
        handle
    }

    /// Returns the live room for `room_id`, if any.
    pub async fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms
            .lock()
            .await
            .get(room_id)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Drops the registry entry for `room_id` if its room has emptied.
    ///
    /// Returns `true` if an entry was removed. A replacement room created
    /// under the same id in the meantime is left alone.
    pub async fn remove_if_empty(&self, room_id: &RoomId) -> bool {
        let mut rooms = self.rooms.lock().await;
        match rooms.get(room_id) {
            Some(handle) if handle.is_closed() => {
                rooms.remove(room_id);
                tracing::info!(%room_id, "room removed");
                true
            }
            _ => false,
        }
    }

    /// Resolves or creates `room_id` and joins `player_id` to it.
    ///
    /// If the room closes between lookup and join, the join is retried
    /// against a fresh room.
    pub async fn join(
        &self,
        room_id: &RoomId,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let mut attempt = 1;
        loop {
            let handle = self.get_or_create(room_id).await;
            match handle.join(player_id, name.clone(), sender.clone()).await {
                Err(e) if e.is_gone() && attempt < JOIN_ATTEMPTS => {
                    tracing::debug!(%room_id, %player_id, attempt, "room closed during join, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Removes `player_id` from `room_id`, dropping the room if it emptied.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if there is no live room with that id.
    pub async fn leave(
        &self,
        room_id: &RoomId,
        player_id: PlayerId,
    ) -> Result<LeaveOutcome, RoomError> {
        let handle = self
            .get(room_id)
            .await
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        let outcome = handle.leave(player_id).await?;
        if outcome == LeaveOutcome::Emptied {
            self.remove_if_empty(room_id).await;
        }
        Ok(outcome)
    }

    /// Returns the number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms
            .lock()
            .await
            .values()
            .filter(|handle| !handle.is_closed())
            .count()
    }

    /// Lists the ids of all live rooms.
    pub async fn room_ids(&self) -> Vec<RoomId> {
        self.rooms
            .lock()
            .await
            .iter()
            .filter(|(_, handle)| !handle.is_closed())
            .map(|(id, _)| id.clone())
            .collect()
    }
}

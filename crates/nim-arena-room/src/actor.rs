//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Every operation on a room is a command on the actor's channel, and the
//! actor handles one command at a time to completion. That gives each room
//! its own critical section without a lock, and rooms never wait on each
//! other.

use std::collections::HashMap;

use nim_arena_protocol::{PlayerId, RoomId, RoomSnapshot, RoomUpdate, ServerMessage};
use tokio::sync::{mpsc, oneshot};

use crate::piles;
use crate::{
    GameConfig, LeaveOutcome, MirrorHandle, MoveOutcome, MoveRejection, Room, RoomError,
};

/// Channel sender for delivering outbound messages to one connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

/// What a move request came back with. The outer layer is the room's own
/// answer; a dead room shows up as a [`RoomError`] instead.
pub type MoveReply = Result<MoveOutcome, MoveRejection>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    Move {
        player_id: PlayerId,
        pile_index: i64,
        take: i64,
        reply: oneshot::Sender<MoveReply>,
    },

    Restart {
        reply: oneshot::Sender<()>,
    },

    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<LeaveOutcome>,
    },

    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone, but callers should not keep one beyond a single
/// operation: go back through the registry by room id each time so a torn
/// down room is never used.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Returns `true` once the room has emptied and stopped taking commands.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Adds (or renames) a player. `sender` receives every broadcast from
    /// now until the player leaves.
    ///
    /// # Errors
    /// [`RoomError::Closed`] if the room emptied before this join reached it.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Join { player_id, name, sender, reply })
            .await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Attempts a move.
    pub async fn make_move(
        &self,
        player_id: PlayerId,
        pile_index: i64,
        take: i64,
    ) -> Result<MoveReply, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Move { player_id, pile_index, take, reply })
            .await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Deals fresh piles and starts a new game.
    pub async fn restart(&self) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Restart { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Removes a player.
    pub async fn leave(&self, player_id: PlayerId) -> Result<LeaveOutcome, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Leave { player_id, reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Fetches the current snapshot without changing anything.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Closed(self.room_id.clone()))
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room: Room,
    config: GameConfig,
    /// Outbound channel per member; keys always match the room's players.
    members: HashMap<PlayerId, PlayerSender>,
    mirror: Option<MirrorHandle>,
    receiver: mpsc::Receiver<RoomCommand>,
    /// Set once the last member leaves. The channel is closed at the same
    /// moment; whatever was already queued is drained and turned away.
    closed: bool,
}

impl RoomActor {
    async fn run(mut self) {
        let room_id = self.room.room_id().clone();
        tracing::info!(%room_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            if self.closed {
                self.turn_away(cmd);
                continue;
            }
            match cmd {
                RoomCommand::Join { player_id, name, sender, reply } => {
                    self.handle_join(player_id, name, sender);
                    let _ = reply.send(Ok(()));
                }
                RoomCommand::Move { player_id, pile_index, take, reply } => {
                    let result = self.handle_move(player_id, pile_index, take);
                    let _ = reply.send(result);
                }
                RoomCommand::Restart { reply } => {
                    self.handle_restart();
                    let _ = reply.send(());
                }
                RoomCommand::Leave { player_id, reply } => {
                    let outcome = self.handle_leave(player_id);
                    let _ = reply.send(outcome);
                }
                RoomCommand::Snapshot { reply } => {
                    let _ = reply.send(self.room.snapshot());
                }
            }
        }

        tracing::info!(%room_id, "room actor stopped");
    }

    fn handle_join(&mut self, player_id: PlayerId, name: String, sender: PlayerSender) {
        let started = self.room.join(player_id, name);
        self.members.insert(player_id, sender);
        tracing::info!(
            room_id = %self.room.room_id(),
            %player_id,
            players = self.room.player_count(),
            "player joined"
        );
        if started {
            tracing::info!(room_id = %self.room.room_id(), "game started");
        }
        self.broadcast();
    }

    fn handle_move(&mut self, player_id: PlayerId, pile_index: i64, take: i64) -> MoveReply {
        match self.room.apply_move(player_id, pile_index, take) {
            Ok(outcome) => {
                if let MoveOutcome::Won(winner) = outcome {
                    tracing::info!(room_id = %self.room.room_id(), %winner, "game finished");
                }
                self.broadcast();
                Ok(outcome)
            }
            Err(rejection) => {
                tracing::debug!(
                    room_id = %self.room.room_id(),
                    %player_id,
                    pile_index,
                    take,
                    %rejection,
                    "move rejected"
                );
                Err(rejection)
            }
        }
    }

    fn handle_restart(&mut self) {
        let piles = piles::generate_for(&mut rand::rng(), &self.config);
        self.room.restart(piles);
        tracing::info!(room_id = %self.room.room_id(), "game restarted");
        self.broadcast();
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> LeaveOutcome {
        let outcome = self.room.leave(player_id);
        self.members.remove(&player_id);

        match outcome {
            LeaveOutcome::Left => {
                tracing::info!(
                    room_id = %self.room.room_id(),
                    %player_id,
                    players = self.room.player_count(),
                    "player left"
                );
                self.broadcast();
            }
            LeaveOutcome::Emptied => {
                // Close before replying, so by the time anyone hears the
                // room is empty its handle already reports closed.
                self.closed = true;
                self.receiver.close();
                tracing::info!(room_id = %self.room.room_id(), "room emptied");
            }
            LeaveOutcome::NotMember => {}
        }
        outcome
    }

    /// Answers a command that arrived after the room emptied.
    fn turn_away(&self, cmd: RoomCommand) {
        if let RoomCommand::Join { reply, .. } = cmd {
            let _ = reply.send(Err(RoomError::Closed(self.room.room_id().clone())));
        }
        // Other replies are dropped; callers see `Unavailable`.
    }

    /// Sends the full snapshot to every member and queues it for mirroring.
    fn broadcast(&self) {
        let snapshot = self.room.snapshot();
        let msg = ServerMessage::RoomUpdate(RoomUpdate {
            room_id: self.room.room_id().clone(),
            room: snapshot.clone(),
        });
        for sender in self.members.values() {
            // A closed receiver means that connection is already going away.
            let _ = sender.send(msg.clone());
        }
        if let Some(mirror) = &self.mirror {
            mirror.record(self.room.room_id(), snapshot);
        }
    }
}

/// Spawns a new room actor with freshly generated piles.
pub(crate) fn spawn_room(
    room_id: RoomId,
    config: &GameConfig,
    mirror: Option<MirrorHandle>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_queue);
    let piles = piles::generate_for(&mut rand::rng(), config);

    let actor = RoomActor {
        room: Room::new(room_id.clone(), piles),
        config: config.clone(),
        members: HashMap::new(),
        mirror,
        receiver: rx,
        closed: false,
    };

    tokio::spawn(actor.run());

    RoomHandle { room_id, sender: tx }
}

//! Per-connection gateway: decodes client messages and routes them to rooms.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's outbound queue. The
//! connection's id doubles as the player's id. The flow is:
//!   1. Loop: receive frames → decode → join / move / restart
//!   2. On close (or idle timeout): leave every joined room

use std::collections::HashSet;
use std::sync::Arc;

use nim_arena_protocol::{
    ClientMessage, Codec, JoinRequest, MoveRequest, PlayerId, RestartRequest, RoomId,
    ServerMessage,
};
use nim_arena_room::PlayerSender;
use nim_arena_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::NimArenaError;
use crate::server::ServerState;

/// Drop guard that removes the player from every room it joined when the
/// handler exits, however it exits.
///
/// `Drop` is synchronous, so the leaves run in a fire-and-forget task.
struct MembershipGuard<C: Codec> {
    player_id: PlayerId,
    joined: HashSet<RoomId>,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for MembershipGuard<C> {
    fn drop(&mut self) {
        let rooms = std::mem::take(&mut self.joined);
        if rooms.is_empty() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        runtime.spawn(async move {
            for room_id in rooms {
                match state.registry.leave(&room_id, player_id).await {
                    Ok(outcome) => {
                        tracing::debug!(%room_id, %player_id, ?outcome, "left on disconnect");
                    }
                    Err(e) => {
                        tracing::debug!(%room_id, %player_id, error = %e, "leave on disconnect failed");
                    }
                }
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), NimArenaError> {
    let conn_id = conn.id();
    let player_id = PlayerId(conn_id.into_inner());
    tracing::debug!(%conn_id, %player_id, "handling new connection");

    let conn = Arc::new(conn);
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), rx, Arc::clone(&state)));

    let mut guard = MembershipGuard {
        player_id,
        joined: HashSet::new(),
        state: Arc::clone(&state),
    };

    loop {
        let received = match state.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, conn.recv()).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::info!(%player_id, "connection timed out");
                    break;
                }
            },
            None => conn.recv().await,
        };

        let data = match received {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "dropping malformed frame");
                continue;
            }
        };

        match msg {
            ClientMessage::Join(req) => {
                handle_join(&state, &mut guard, player_id, req, &tx).await;
            }
            ClientMessage::MakeMove(req) => {
                handle_move(&state, player_id, req, &tx).await;
            }
            ClientMessage::Restart(req) => {
                handle_restart(&state, player_id, req).await;
            }
        }
    }

    // Leaves fire here; the rooms drop their copies of `tx` as they go.
    drop(guard);
    writer.abort();
    let _ = conn.close().await;
    Ok(())
}

async fn handle_join<C: Codec>(
    state: &ServerState<C>,
    guard: &mut MembershipGuard<C>,
    player_id: PlayerId,
    req: JoinRequest,
    tx: &PlayerSender,
) {
    let room_id = req.target_room(player_id);
    let name = req.display_name();

    match state
        .registry
        .join(&room_id, player_id, name, tx.clone())
        .await
    {
        Ok(()) => {
            guard.joined.insert(room_id);
        }
        Err(e) => {
            tracing::warn!(%room_id, %player_id, error = %e, "join failed");
        }
    }
}

async fn handle_move<C: Codec>(
    state: &ServerState<C>,
    player_id: PlayerId,
    req: MoveRequest,
    tx: &PlayerSender,
) {
    let room_id = req.room_id;
    let Some(room) = state.registry.get(&room_id).await else {
        tracing::debug!(%room_id, %player_id, "move for unknown room");
        return;
    };

    match room.make_move(player_id, req.pile_index, req.take).await {
        Ok(Ok(_)) => {}
        Ok(Err(rejection)) if rejection.is_reported() => {
            // Through the outbound queue, so it can't overtake a broadcast
            // this connection is already due.
            let _ = tx.send(ServerMessage::ErrorMsg(rejection.to_string()));
        }
        Ok(Err(rejection)) => {
            tracing::debug!(%room_id, %player_id, %rejection, "ignoring move");
        }
        Err(e) => {
            tracing::debug!(%room_id, %player_id, error = %e, "move not delivered");
        }
    }
}

async fn handle_restart<C: Codec>(state: &ServerState<C>, player_id: PlayerId, req: RestartRequest) {
    let room_id = req.room_id;
    let Some(room) = state.registry.get(&room_id).await else {
        tracing::debug!(%room_id, %player_id, "restart for unknown room");
        return;
    };

    if let Err(e) = room.restart().await {
        tracing::debug!(%room_id, %player_id, error = %e, "restart not delivered");
    }
}

/// Drains the connection's outbound queue onto the socket, in order.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
    state: Arc<ServerState<C>>,
) {
    let conn_id = conn.id();
    while let Some(msg) = rx.recv().await {
        let bytes = match state.codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode outbound message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

//! Identity types and the messages that travel on the wire.
//!
//! Every frame is an adjacently tagged JSON object:
//!
//! ```text
//! { "type": "make_move", "data": { "roomId": "lobby", "pileIndex": 1, "take": 2 } }
//! { "type": "error_msg", "data": "Not your turn" }
//! ```
//!
//! Field names are camelCase because the browser client is JavaScript.

use std::fmt;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::RoomSnapshot;

/// Name given to players who join without one.
pub const DEFAULT_PLAYER_NAME: &str = "Player";

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's identity. One per live connection.
///
/// Serialized as a plain number (`#[serde(transparent)]`), which also makes
/// it usable as a JSON object key in [`RoomSnapshot::players`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A room identifier, chosen by whoever creates the room.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps an arbitrary room name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The room a player lands in when they join without naming one.
    ///
    /// Player ids are never reused within a process, so neither is this.
    pub fn for_player(player_id: PlayerId) -> Self {
        Self(player_id.to_string())
    }

    /// Returns the room id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Payload of a `join` message. Both fields may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub name: Option<String>,
}

impl JoinRequest {
    /// The room to join: the requested one, or the joiner's own room when
    /// the request names none (or an empty string).
    pub fn target_room(&self, joiner: PlayerId) -> RoomId {
        match &self.room_id {
            Some(id) if !id.as_str().is_empty() => id.clone(),
            _ => RoomId::for_player(joiner),
        }
    }

    /// The display name, falling back to [`DEFAULT_PLAYER_NAME`].
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => DEFAULT_PLAYER_NAME.to_string(),
        }
    }
}

/// Payload of a `make_move` message.
///
/// `pile_index` and `take` are signed so that nonsense like a negative take
/// reaches the move validator (and is ignored there) instead of failing
/// to decode. Values that are not integers at all decode as
/// [`INVALID_MOVE_ARG`], so an out-of-turn sender still hears
/// "Not your turn" whatever it put in them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub room_id: RoomId,
    #[serde(deserialize_with = "lenient_int")]
    pub pile_index: i64,
    #[serde(deserialize_with = "lenient_int")]
    pub take: i64,
}

/// Stand-in for a move argument that was not an integer. No pile index or
/// take is ever this small.
pub const INVALID_MOVE_ARG: i64 = i64::MIN;

fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Arg {
        Int(i64),
        Float(f64),
        Other(IgnoredAny),
    }

    Ok(match Arg::deserialize(deserializer)? {
        Arg::Int(n) => n,
        // 2.0 is a whole number; 1.5 and anything past i64 are not.
        Arg::Float(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            f as i64
        }
        Arg::Float(_) | Arg::Other(_) => INVALID_MOVE_ARG,
    })
}

impl MoveRequest {
    /// Builds the move a client sends when the user clicks the bomb at
    /// `clicked_from_top` (0-based) in a pile: everything from the top down
    /// to and including the clicked one is removed.
    pub fn from_click(room_id: RoomId, pile_index: usize, clicked_from_top: usize) -> Self {
        Self {
            room_id,
            pile_index: pile_index as i64,
            take: clicked_from_top as i64 + 1,
        }
    }
}

/// Payload of a `restart` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartRequest {
    pub room_id: RoomId,
}

/// Everything a client can ask the server to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    Join(JoinRequest),
    MakeMove(MoveRequest),
    Restart(RestartRequest),
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Full authoritative state of one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdate {
    pub room_id: RoomId,
    pub room: RoomSnapshot,
}

/// Everything the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Broadcast to every member after any state change. Clients replace
    /// their whole view with `room`; there are no deltas.
    RoomUpdate(RoomUpdate),

    /// Sent only to the connection whose move was rejected.
    ErrorMsg(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoomStatus;
    use std::collections::BTreeMap;

    fn snapshot() -> RoomSnapshot {
        let mut players = BTreeMap::new();
        players.insert(
            PlayerId(1),
            crate::Player { id: PlayerId(1), name: "ann".into() },
        );
        RoomSnapshot {
            players,
            piles: vec![3, 4, 5],
            turn_order: vec![PlayerId(1)],
            status: RoomStatus::Waiting,
            current_turn: 0,
            winner: None,
        }
    }

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&PlayerId(42)).unwrap(), "42");
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_room_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomId::from("lobby")).unwrap();
        assert_eq!(json, "\"lobby\"");
    }

    #[test]
    fn test_room_id_for_player_uses_player_display() {
        assert_eq!(RoomId::for_player(PlayerId(9)).as_str(), "P-9");
    }

    #[test]
    fn test_join_decodes_with_all_fields() {
        let json = r#"{"type":"join","data":{"roomId":"lobby","name":"ann"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Join(JoinRequest {
                room_id: Some("lobby".into()),
                name: Some("ann".into()),
            })
        );
    }

    #[test]
    fn test_join_decodes_with_no_fields() {
        let json = r#"{"type":"join","data":{}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg, ClientMessage::Join(JoinRequest::default()));
    }

    #[test]
    fn test_join_target_room_defaults_to_joiner() {
        let req = JoinRequest::default();
        assert_eq!(req.target_room(PlayerId(3)), RoomId::from("P-3"));

        let empty = JoinRequest { room_id: Some("".into()), name: None };
        assert_eq!(empty.target_room(PlayerId(3)), RoomId::from("P-3"));

        let named = JoinRequest { room_id: Some("x".into()), name: None };
        assert_eq!(named.target_room(PlayerId(3)), RoomId::from("x"));
    }

    #[test]
    fn test_join_display_name_defaults_to_player() {
        assert_eq!(JoinRequest::default().display_name(), DEFAULT_PLAYER_NAME);
        let blank = JoinRequest { room_id: None, name: Some("  ".into()) };
        assert_eq!(blank.display_name(), DEFAULT_PLAYER_NAME);
        let named = JoinRequest { room_id: None, name: Some("bo".into()) };
        assert_eq!(named.display_name(), "bo");
    }

    #[test]
    fn test_make_move_decodes_negative_values() {
        let json = r#"{"type":"make_move","data":{"roomId":"r","pileIndex":-1,"take":-3}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::MakeMove(req) => {
                assert_eq!(req.pile_index, -1);
                assert_eq!(req.take, -3);
            }
            other => panic!("expected MakeMove, got {other:?}"),
        }
    }

    fn decode_move(data: &str) -> MoveRequest {
        let json = format!(r#"{{"type":"make_move","data":{data}}}"#);
        match serde_json::from_str::<ClientMessage>(&json).unwrap() {
            ClientMessage::MakeMove(req) => req,
            other => panic!("expected MakeMove, got {other:?}"),
        }
    }

    #[test]
    fn test_make_move_non_integer_args_still_decode() {
        let req = decode_move(r#"{"roomId":"r","pileIndex":"0","take":"x"}"#);
        assert_eq!(req.pile_index, INVALID_MOVE_ARG);
        assert_eq!(req.take, INVALID_MOVE_ARG);

        let req = decode_move(r#"{"roomId":"r","pileIndex":null,"take":[1]}"#);
        assert_eq!(req.pile_index, INVALID_MOVE_ARG);
        assert_eq!(req.take, INVALID_MOVE_ARG);

        let req = decode_move(r#"{"roomId":"r","pileIndex":true,"take":{"n":1}}"#);
        assert_eq!(req.pile_index, INVALID_MOVE_ARG);
        assert_eq!(req.take, INVALID_MOVE_ARG);
    }

    #[test]
    fn test_make_move_whole_floats_are_integers() {
        let req = decode_move(r#"{"roomId":"r","pileIndex":1.0,"take":2.5}"#);
        assert_eq!(req.pile_index, 1);
        assert_eq!(req.take, INVALID_MOVE_ARG);

        let req = decode_move(r#"{"roomId":"r","pileIndex":0,"take":18446744073709551615}"#);
        assert_eq!(req.take, INVALID_MOVE_ARG);
    }

    #[test]
    fn test_make_move_missing_take_fails() {
        let json = r#"{"type":"make_move","data":{"roomId":"r","pileIndex":0}}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_unknown_message_type_fails() {
        let json = r#"{"type":"fly_to_moon","data":{}}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_move_from_click_takes_clicked_index_plus_one() {
        let req = MoveRequest::from_click("r".into(), 2, 0);
        assert_eq!(req.pile_index, 2);
        assert_eq!(req.take, 1);
        let req = MoveRequest::from_click("r".into(), 0, 4);
        assert_eq!(req.take, 5);
    }

    #[test]
    fn test_room_update_json_shape() {
        let msg = ServerMessage::RoomUpdate(RoomUpdate {
            room_id: "lobby".into(),
            room: snapshot(),
        });
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "room_update");
        assert_eq!(json["data"]["roomId"], "lobby");
        let room = &json["data"]["room"];
        assert_eq!(room["piles"], serde_json::json!([3, 4, 5]));
        assert_eq!(room["turnOrder"], serde_json::json!([1]));
        assert_eq!(room["status"], "waiting");
        assert_eq!(room["currentTurn"], 0);
        assert!(room["winner"].is_null());
        assert_eq!(room["players"]["1"]["name"], "ann");
        assert_eq!(room["players"]["1"]["id"], 1);
    }

    #[test]
    fn test_room_update_decodes_back() {
        let msg = ServerMessage::RoomUpdate(RoomUpdate {
            room_id: "lobby".into(),
            room: snapshot(),
        });
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: ServerMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }
}

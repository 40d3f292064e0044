//! Error types for the room layer.

use nim_arena_protocol::RoomId;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room emptied out and is being torn down. A caller that wanted to
    /// join should ask the registry again; it will get a fresh room.
    #[error("room {0} has closed")]
    Closed(RoomId),

    /// The room actor stopped without answering.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    /// The game configuration can't produce valid piles.
    #[error("invalid game config: {0}")]
    InvalidConfig(String),
}

impl RoomError {
    /// Returns `true` if the room is gone and a join should be retried
    /// against a freshly created one.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Closed(_) | Self::Unavailable(_))
    }
}

/// Why a move was not applied.
///
/// Variants are listed in the order the validator checks them. Only
/// [`MoveRejection::NotYourTurn`] is ever shown to the player; the others
/// come from stale or malformed clients and are dropped without a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveRejection {
    #[error("game is not in progress")]
    NotPlaying,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("pile {0} does not exist")]
    NoSuchPile(i64),

    #[error("cannot take {take} from pile {pile_index}")]
    BadTake { pile_index: usize, take: i64 },
}

impl MoveRejection {
    /// Returns `true` if the acting connection should be told about it.
    pub fn is_reported(&self) -> bool {
        matches!(self, Self::NotYourTurn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_not_your_turn_is_reported() {
        assert!(MoveRejection::NotYourTurn.is_reported());
        assert!(!MoveRejection::NotPlaying.is_reported());
        assert!(!MoveRejection::NoSuchPile(9).is_reported());
        assert!(!MoveRejection::BadTake { pile_index: 0, take: 0 }.is_reported());
    }

    #[test]
    fn test_not_your_turn_text_matches_client_expectation() {
        assert_eq!(MoveRejection::NotYourTurn.to_string(), "Not your turn");
    }

    #[test]
    fn test_is_gone() {
        assert!(RoomError::Closed("r".into()).is_gone());
        assert!(RoomError::Unavailable("r".into()).is_gone());
        assert!(!RoomError::NotFound("r".into()).is_gone());
    }
}

//! Move legality.

use nim_arena_protocol::PlayerId;

use crate::{MoveRejection, Room};

/// A move that passed validation, with its indices already range-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidMove {
    pub pile: usize,
    pub take: u32,
}

/// Decides whether `actor` may take `take` items from pile `pile_index`.
///
/// Checks run in a fixed order and the first failure wins: status, then
/// turn, then pile index, then amount. The order matters to the client: a
/// player who clicks twice quickly must hear "Not your turn" even if the
/// second click also names a pile that is now empty.
pub fn validate_move(
    room: &Room,
    actor: PlayerId,
    pile_index: i64,
    take: i64,
) -> Result<ValidMove, MoveRejection> {
    if !room.status().is_playing() {
        return Err(MoveRejection::NotPlaying);
    }

    if room.current_player() != Some(actor) {
        return Err(MoveRejection::NotYourTurn);
    }

    let pile = usize::try_from(pile_index)
        .ok()
        .filter(|&i| i < room.piles().len())
        .ok_or(MoveRejection::NoSuchPile(pile_index))?;

    let available = room.piles()[pile];
    if take <= 0 || take > i64::from(available) {
        return Err(MoveRejection::BadTake { pile_index: pile, take });
    }

    Ok(ValidMove { pile, take: take as u32 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    /// Two players, A (1) to move, piles [3, 0, 5].
    fn playing_room() -> Room {
        let mut room = Room::new("r".into(), vec![3, 0, 5]);
        room.join(pid(1), "a".into());
        room.join(pid(2), "b".into());
        room
    }

    #[test]
    fn test_valid_move_is_accepted() {
        let room = playing_room();
        assert_eq!(
            validate_move(&room, pid(1), 2, 5),
            Ok(ValidMove { pile: 2, take: 5 })
        );
    }

    #[test]
    fn test_waiting_room_rejects_silently() {
        let mut room = Room::new("r".into(), vec![3]);
        room.join(pid(1), "a".into());
        let err = validate_move(&room, pid(1), 0, 1).unwrap_err();
        assert_eq!(err, MoveRejection::NotPlaying);
        assert!(!err.is_reported());
    }

    #[test]
    fn test_wrong_player_is_reported() {
        let room = playing_room();
        let err = validate_move(&room, pid(2), 0, 1).unwrap_err();
        assert_eq!(err, MoveRejection::NotYourTurn);
        assert!(err.is_reported());
    }

    #[test]
    fn test_non_member_is_not_your_turn() {
        let room = playing_room();
        assert_eq!(
            validate_move(&room, pid(99), 0, 1),
            Err(MoveRejection::NotYourTurn)
        );
    }

    #[test]
    fn test_turn_check_comes_before_pile_check() {
        let room = playing_room();
        assert_eq!(
            validate_move(&room, pid(2), 42, -1),
            Err(MoveRejection::NotYourTurn)
        );
    }

    #[test]
    fn test_status_check_comes_before_turn_check() {
        let mut room = Room::new("r".into(), vec![1]);
        room.join(pid(1), "a".into());
        assert_eq!(
            validate_move(&room, pid(2), 0, 1),
            Err(MoveRejection::NotPlaying)
        );
    }

    #[test]
    fn test_undecodable_args_are_rejected_silently() {
        use nim_arena_protocol::INVALID_MOVE_ARG;

        let room = playing_room();
        let err = validate_move(&room, pid(1), INVALID_MOVE_ARG, 1).unwrap_err();
        assert!(!err.is_reported());
        let err = validate_move(&room, pid(1), 0, INVALID_MOVE_ARG).unwrap_err();
        assert!(!err.is_reported());
        assert_eq!(
            validate_move(&room, pid(2), INVALID_MOVE_ARG, INVALID_MOVE_ARG),
            Err(MoveRejection::NotYourTurn)
        );
    }

    #[test]
    fn test_pile_index_out_of_range() {
        let room = playing_room();
        assert_eq!(validate_move(&room, pid(1), 3, 1), Err(MoveRejection::NoSuchPile(3)));
        assert_eq!(validate_move(&room, pid(1), -1, 1), Err(MoveRejection::NoSuchPile(-1)));
    }

    #[test]
    fn test_bad_take_amounts() {
        let room = playing_room();
        for take in [0, -2, 4] {
            let err = validate_move(&room, pid(1), 0, take).unwrap_err();
            assert_eq!(err, MoveRejection::BadTake { pile_index: 0, take });
            assert!(!err.is_reported());
        }
    }

    #[test]
    fn test_empty_pile_rejects_any_take() {
        let room = playing_room();
        assert!(matches!(
            validate_move(&room, pid(1), 1, 1),
            Err(MoveRejection::BadTake { .. })
        ));
    }

    #[test]
    fn test_taking_whole_pile_is_allowed() {
        let room = playing_room();
        assert!(validate_move(&room, pid(1), 0, 3).is_ok());
    }
}

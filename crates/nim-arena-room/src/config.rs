//! Game configuration shared by every room.

use serde::{Deserialize, Serialize};

use crate::RoomError;

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// How fresh piles are generated, on room creation and on every restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Number of piles on the board.
    pub pile_count: usize,

    /// Smallest possible starting pile.
    pub min_pile: u32,

    /// Largest possible starting pile.
    pub max_pile: u32,

    /// Capacity of each room actor's command queue. Senders wait when it
    /// is full, so one flooded room can't grow without bound.
    pub command_queue: usize,
}

impl Default for GameConfig {
    /// Three piles of 3 to 7 bombs.
    fn default() -> Self {
        Self {
            pile_count: 3,
            min_pile: 3,
            max_pile: 7,
            command_queue: 64,
        }
    }
}

impl GameConfig {
    /// Checks the configuration before any room is created with it.
    ///
    /// # Errors
    /// Returns [`RoomError::InvalidConfig`] when there are no piles, when
    /// the pile range is inverted, or when the command queue has no room.
    pub fn validate(&self) -> Result<(), RoomError> {
        if self.pile_count == 0 {
            return Err(RoomError::InvalidConfig(
                "pile_count must be at least 1".into(),
            ));
        }
        if self.min_pile > self.max_pile {
            return Err(RoomError::InvalidConfig(format!(
                "min_pile ({}) is greater than max_pile ({})",
                self.min_pile, self.max_pile
            )));
        }
        if self.command_queue == 0 {
            return Err(RoomError::InvalidConfig(
                "command_queue must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_config_default() {
        let config = GameConfig::default();
        assert_eq!(config.pile_count, 3);
        assert_eq!(config.min_pile, 3);
        assert_eq!(config.max_pile, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_piles() {
        let config = GameConfig { pile_count: 0, ..GameConfig::default() };
        assert!(matches!(config.validate(), Err(RoomError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let config = GameConfig {
            min_pile: 9,
            max_pile: 4,
            ..GameConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_pile (9)"));
    }

    #[test]
    fn test_validate_accepts_single_value_range() {
        let config = GameConfig {
            min_pile: 5,
            max_pile: 5,
            ..GameConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_queue() {
        let config = GameConfig { command_queue: 0, ..GameConfig::default() };
        assert!(config.validate().is_err());
    }
}

//! Game records.

use crate::battle::BattleId;
use crate::ledger::RosterId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Game identifier.
pub type GameId = u64;

/// A grid game between rosters taking turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Unique identifier.
    pub id: GameId,
    /// Display name.
    pub name: String,
    /// Thumbnail reference.
    pub thumbnail: String,
    /// Row count.
    pub rows: u16,
    /// Column count.
    pub columns: u16,
    /// Participants in turn order.
    pub participants: Vec<RosterId>,
    /// Index into `participants` of the roster whose turn it is.
    pub current_turn_index: usize,
    /// When the current turn window opened.
    pub turn_start_time: Option<DateTime<Utc>>,
    /// Turn window length in seconds.
    pub turn_duration_secs: u32,
    /// Battle pausing this game, if any.
    pub battle_id: Option<BattleId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Game {
    /// Roster whose turn it is.
    #[must_use]
    pub fn current_roster(&self) -> Option<RosterId> {
        self.participants.get(self.current_turn_index).copied()
    }

    /// Turn position of `roster`.
    #[must_use]
    pub fn position_of(&self, roster: RosterId) -> Option<usize> {
        self.participants.iter().position(|&r| r == roster)
    }

    /// Whether a battle is holding the game.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.battle_id.is_some()
    }
}

/// Parameters for creating a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSetup {
    /// Display name.
    pub name: String,
    /// Thumbnail reference.
    #[serde(default)]
    pub thumbnail: String,
    /// Row count.
    pub rows: u16,
    /// Column count.
    pub columns: u16,
    /// Participants in turn order.
    #[serde(default)]
    pub participants: Vec<RosterId>,
}

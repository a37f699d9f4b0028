//! Battle records and the status machine.

use crate::error::{EngineError, EngineResult};
use crate::grid::GameId;
use crate::ledger::{RosterId, UnitId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Battle identifier.
pub type BattleId = u64;

/// Battle question identifier.
pub type QuestionId = u64;

/// Battle lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    /// Created, questions may be prepared.
    Pending,
    /// Participants may answer.
    InProgress,
    /// Finished. Immutable from here on.
    Completed,
}

impl BattleStatus {
    /// Whether moving to `next` is allowed.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress | Self::Completed) | (Self::InProgress, Self::Completed)
        )
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

/// Which end of a battle a participant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Initiated the battle.
    Attacker,
    /// Was attacked.
    Defender,
}

/// A unit fighting for a roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    /// Fighting unit.
    pub unit: UnitId,
    /// Roster that owns it.
    pub roster: RosterId,
}

/// A two-party question battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battle {
    /// Unique identifier.
    pub id: BattleId,
    /// Display name.
    pub name: String,
    /// Reward description.
    pub reward: String,
    /// Lifecycle status.
    pub status: BattleStatus,
    /// Initiating side.
    pub attacker: Combatant,
    /// Attacked side.
    pub defender: Combatant,
    /// Game paused by this battle.
    pub game: Option<GameId>,
    /// Roster that knocked the other out, if resolution did.
    pub winner: Option<RosterId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Battle {
    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` for a backwards or repeated transition.
    pub fn advance(&mut self, next: BattleStatus) -> EngineResult<()> {
        if !self.status.can_advance_to(next) {
            return Err(EngineError::rejected(format!(
                "battle {} is {} and cannot become {}",
                self.id,
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Side `roster` fights on, if it is a participant.
    #[must_use]
    pub fn side_of(&self, roster: RosterId) -> Option<Side> {
        if self.attacker.roster == roster {
            Some(Side::Attacker)
        } else if self.defender.roster == roster {
            Some(Side::Defender)
        } else {
            None
        }
    }

    /// The combatant on `side`.
    #[must_use]
    pub const fn combatant(&self, side: Side) -> Combatant {
        match side {
            Side::Attacker => self.attacker,
            Side::Defender => self.defender,
        }
    }

    /// Whether the battle has finished.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == BattleStatus::Completed
    }

    /// Fail unless the battle can still change.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` for a completed battle.
    pub fn ensure_open(&self) -> EngineResult<()> {
        if self.is_completed() {
            return Err(EngineError::rejected(format!(
                "battle {} is already completed",
                self.id
            )));
        }
        Ok(())
    }
}

/// A question put to one battle participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleQuestion {
    /// Unique identifier.
    pub id: QuestionId,
    /// Owning battle.
    pub battle: BattleId,
    /// Question text.
    pub prompt: String,
    /// Correct answer.
    pub answer: String,
    /// Participant expected to answer.
    pub assigned_to: Option<RosterId>,
    /// Maximum grade.
    pub possible_points: u32,
    /// Grade awarded.
    pub received_score: u32,
    /// Time allotment in seconds.
    pub time_secs: u32,
    /// Answer given.
    pub submitted_answer: Option<String>,
    /// When the answer was given.
    pub submitted_at: Option<DateTime<Utc>>,
}

impl BattleQuestion {
    /// Whether an answer has been recorded.
    #[must_use]
    pub const fn is_answered(&self) -> bool {
        self.submitted_answer.is_some()
    }

    /// Case-insensitive exact match of the submitted answer.
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.submitted_answer
            .as_deref()
            .is_some_and(|given| given.to_lowercase() == self.answer.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battle() -> Battle {
        Battle {
            id: 1,
            name: "Skirmish".into(),
            reward: String::new(),
            status: BattleStatus::Pending,
            attacker: Combatant { unit: 1, roster: 1 },
            defender: Combatant { unit: 2, roster: 2 },
            game: None,
            winner: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_only_moves_forward() {
        let mut b = battle();
        b.advance(BattleStatus::InProgress).unwrap();
        assert!(b.advance(BattleStatus::Pending).is_err());
        assert!(b.advance(BattleStatus::InProgress).is_err());
        b.advance(BattleStatus::Completed).unwrap();
        assert!(b.advance(BattleStatus::Completed).is_err());
        assert!(b.ensure_open().is_err());
    }

    #[test]
    fn test_pending_may_complete_directly() {
        let mut b = battle();
        assert!(b.advance(BattleStatus::Completed).is_ok());
    }

    #[test]
    fn test_side_of() {
        let b = battle();
        assert_eq!(b.side_of(1), Some(Side::Attacker));
        assert_eq!(b.side_of(2), Some(Side::Defender));
        assert_eq!(b.side_of(3), None);
        assert_eq!(b.combatant(Side::Defender).unit, 2);
    }

    #[test]
    fn test_answer_matching_ignores_case_only() {
        let mut q = BattleQuestion {
            id: 1,
            battle: 1,
            prompt: "Capital of France?".into(),
            answer: "Paris".into(),
            assigned_to: Some(1),
            possible_points: 10,
            received_score: 0,
            time_secs: 30,
            submitted_answer: None,
            submitted_at: None,
        };
        assert!(!q.is_correct());

        q.submitted_answer = Some("PARIS".into());
        assert!(q.is_correct());

        q.submitted_answer = Some("Paris ".into());
        assert!(!q.is_correct());
    }
}

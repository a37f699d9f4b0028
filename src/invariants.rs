//! Store invariants: sanity checks that detect bugs.
//!
//! Every engine operation preserves these. A violation means a code path
//! committed an inconsistent state, not that a player did something odd.

use crate::battle::BattleStatus;
use crate::config::ArenaConfig;
use crate::ledger::{RequestStatus, UnitStatus};
use crate::store::Tables;
use std::collections::HashMap;
use thiserror::Error;

/// A committed state that no engine operation should produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("inconsistent store: {message}")]
pub struct InvariantViolation {
    /// What is inconsistent.
    pub message: String,
}

/// Check all store invariants.
///
/// Returns a list of violations found, or empty if all invariants hold.
#[must_use]
pub fn check_invariants(tables: &Tables, config: &ArenaConfig) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let mut report = |message: String| violations.push(InvariantViolation { message });

    for unit in tables.units.values() {
        // Ownership and the store pool are exclusive
        if unit.owner.is_some() && unit.status == UnitStatus::Store {
            report(format!("Unit {} is owned by {:?} but in the store", unit.id, unit.owner));
        }
        if unit.owner.is_none() && unit.status != UnitStatus::Store {
            report(format!("Unit {} has no owner but status {}", unit.id, unit.status.as_str()));
        }
        if unit.owner.is_some() && (unit.locked_by.is_some() || unit.unlocked_for.is_some()) {
            report(format!("Owned unit {} still carries a reservation", unit.id));
        }

        // Current stats follow from base and level
        let expected = unit.base.leveled(unit.level, config);
        if unit.stats != expected {
            report(format!(
                "Unit {} stats {:?} differ from leveled base {:?} at level {}",
                unit.id, unit.stats, expected, unit.level
            ));
        }
        if unit.level == 0 || unit.level > config.max_level {
            report(format!("Unit {} has level {}", unit.id, unit.level));
        }

        // A release names the latest requester, and that request was approved
        if let Some(released) = unit.unlocked_for {
            let latest = tables
                .access_requests
                .values()
                .filter(|r| r.asset == unit.id)
                .max_by_key(|r| r.id);
            match latest {
                Some(r) if r.requester == released && r.status == RequestStatus::Approved => {}
                Some(r) => report(format!(
                    "Unit {} released to {released} but latest request is {:?} from {}",
                    unit.id, r.status, r.requester
                )),
                None => report(format!(
                    "Unit {} released to {released} without any request",
                    unit.id
                )),
            }
        }
    }

    // Each unit stands on at most one cell, and only standing units do
    let mut positions: HashMap<u64, u64> = HashMap::new();
    for cell in tables.cells.values() {
        if !tables.games.contains_key(&cell.game) {
            report(format!("Cell {} belongs to missing game {}", cell.id, cell.game));
        }
        let Some(unit_id) = cell.occupied_by else {
            continue;
        };
        if let Some(other) = positions.insert(unit_id, cell.id) {
            report(format!("Unit {unit_id} occupies cells {other} and {}", cell.id));
        }
        match tables.units.get(&unit_id) {
            None => report(format!("Cell {} holds missing unit {unit_id}", cell.id)),
            Some(unit) if unit.is_fallen() => {
                report(format!("Cell {} holds fallen unit {unit_id}", cell.id));
            }
            Some(_) => {}
        }
    }

    for game in tables.games.values() {
        if !game.participants.is_empty() && game.current_turn_index >= game.participants.len() {
            report(format!(
                "Game {} turn index {} out of {} participants",
                game.id,
                game.current_turn_index,
                game.participants.len()
            ));
        }
        if let Some(battle_id) = game.battle_id {
            match tables.battles.get(&battle_id) {
                None => report(format!("Game {} paused by missing battle {battle_id}", game.id)),
                Some(b) if b.status == BattleStatus::Completed => {
                    report(format!("Game {} paused by completed battle {battle_id}", game.id));
                }
                Some(_) => {}
            }
        }
    }

    // One question per participant per battle
    let mut assigned: HashMap<(u64, u64), u64> = HashMap::new();
    for question in tables.questions.values() {
        if !tables.battles.contains_key(&question.battle) {
            report(format!("Question {} belongs to missing battle {}", question.id, question.battle));
        }
        if question.submitted_at.is_some() != question.submitted_answer.is_some() {
            report(format!("Question {} has a partial submission", question.id));
        }
        let Some(roster) = question.assigned_to else {
            continue;
        };
        if let Some(other) = assigned.insert((question.battle, roster), question.id) {
            report(format!(
                "Roster {roster} holds questions {other} and {} in battle {}",
                question.id, question.battle
            ));
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GameSetup, cells_of, create_game, place_unit};
    use crate::ledger::{AccessDecision, UnitTemplate, decide_access, enroll, request_access, restock};
    use chrono::Utc;

    fn populated() -> Tables {
        let config = ArenaConfig::default();
        let mut tables = Tables::default();
        tables.add_roster("North", Some(10), 100);
        tables.add_roster("South", Some(20), 100);
        let template = UnitTemplate {
            name: "Wolf".into(),
            ..UnitTemplate::default()
        };
        let wolf = enroll(&mut tables, 1, &template, UnitStatus::Warrior, &config).unwrap();
        restock(&mut tables, &template, 2, Some(2), &config).unwrap();
        let game = create_game(
            &mut tables,
            GameSetup {
                name: "Castle".into(),
                thumbnail: String::new(),
                rows: 2,
                columns: 2,
                participants: vec![1, 2],
            },
            &config,
            Utc::now(),
        )
        .unwrap();
        let cell = cells_of(&tables, game)[0].id;
        place_unit(&mut tables, 1, cell, wolf).unwrap();
        tables
    }

    #[test]
    fn test_consistent_state_passes() {
        let tables = populated();
        assert!(check_invariants(&tables, &ArenaConfig::default()).is_empty());
    }

    #[test]
    fn test_detects_double_occupancy() {
        let mut tables = populated();
        let ids: Vec<u64> = tables.cells.keys().copied().collect();
        tables.cells.get_mut(&ids[1]).unwrap().occupied_by = Some(1);

        let violations = check_invariants(&tables, &ArenaConfig::default());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("occupies cells"));
    }

    #[test]
    fn test_detects_stat_drift_and_fallen_occupant() {
        let mut tables = populated();
        let unit = tables.unit_mut(1).unwrap();
        unit.stats.attack += 1;
        unit.status = UnitStatus::Rip;

        let violations = check_invariants(&tables, &ArenaConfig::default());
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_detects_unrequested_release() {
        let mut tables = populated();
        tables.unit_mut(2).unwrap().unlocked_for = Some(1);
        let violations = check_invariants(&tables, &ArenaConfig::default());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].to_string().starts_with("inconsistent store: Unit 2"));
    }

    #[test]
    fn test_detects_release_behind_newer_request() {
        let mut tables = populated();
        tables.add_roster("East", Some(30), 100);
        let now = Utc::now();
        request_access(&mut tables, 1, 2, now).unwrap();
        decide_access(&mut tables, 2, 2, 1, AccessDecision::Approve, now).unwrap();
        assert!(check_invariants(&tables, &ArenaConfig::default()).is_empty());

        // Simulate a later request slipping past the release guard.
        tables.unit_mut(2).unwrap().unlocked_for = None;
        request_access(&mut tables, 3, 2, now).unwrap();
        tables.unit_mut(2).unwrap().unlocked_for = Some(1);

        let violations = check_invariants(&tables, &ArenaConfig::default());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("latest request"));
    }
}

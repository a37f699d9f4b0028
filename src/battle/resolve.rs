//! Damage resolution.
//!
//! Damage is the attacker's attack relative to the defender's defense:
//!
//! damage = attack / defense × 100
//!
//! The outcome depends on who answered correctly:
//!
//! | attacker | defender | effect                                         |
//! |----------|----------|------------------------------------------------|
//! | right    | right    | defender loses damage / 2 health               |
//! | right    | wrong    | defender loses damage health                   |
//! | wrong    | right    | attacker loses the miss penalty in stamina     |
//! | wrong    | wrong    | both lose the miss penalty (health / stamina)  |
//!
//! Health and stamina clamp at zero. A unit left with no health falls and is
//! removed from the board in the same transaction.

use crate::battle::{BattleId, BattleStatus, Side, participant_question, release_game};
use crate::config::ArenaConfig;
use crate::error::EngineResult;
use crate::grid::{CellId, GameId, evict};
use crate::ledger::{RosterId, UnitId, UnitStatus};
use crate::store::Tables;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Which participants answered correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Both answered correctly.
    BothCorrect,
    /// Only the attacker answered correctly.
    AttackerOnly,
    /// Only the defender answered correctly.
    DefenderOnly,
    /// Neither answered correctly.
    NeitherCorrect,
}

impl Verdict {
    /// Classify a pair of answers.
    #[must_use]
    pub const fn from_answers(attacker_correct: bool, defender_correct: bool) -> Self {
        match (attacker_correct, defender_correct) {
            (true, true) => Self::BothCorrect,
            (true, false) => Self::AttackerOnly,
            (false, true) => Self::DefenderOnly,
            (false, false) => Self::NeitherCorrect,
        }
    }
}

/// Health and stamina lost in one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Impact {
    /// Health the defender loses.
    pub defender_health: u32,
    /// Stamina the attacker loses.
    pub attacker_stamina: u32,
}

/// Raw damage of `attack` against `defense`. Zero defense counts as one.
#[must_use]
pub fn damage_points(attack: u32, defense: u32) -> f64 {
    f64::from(attack) / f64::from(defense.max(1)) * 100.0
}

/// Losses for a verdict, truncating fractional damage toward zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn impact(verdict: Verdict, damage: f64, miss_penalty: u32) -> Impact {
    match verdict {
        Verdict::BothCorrect => Impact {
            defender_health: (damage / 2.0) as u32,
            attacker_stamina: 0,
        },
        Verdict::AttackerOnly => Impact {
            defender_health: damage as u32,
            attacker_stamina: 0,
        },
        Verdict::DefenderOnly => Impact {
            defender_health: 0,
            attacker_stamina: miss_penalty,
        },
        Verdict::NeitherCorrect => Impact {
            defender_health: miss_penalty,
            attacker_stamina: miss_penalty,
        },
    }
}

/// Everything a resolution changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    /// Resolved battle.
    pub battle: BattleId,
    /// Answer classification.
    pub verdict: Verdict,
    /// Raw damage before halving or truncation.
    pub damage: f64,
    /// Losses applied.
    pub impact: Impact,
    /// Attacker's remaining stamina.
    pub attacker_stamina: u32,
    /// Defender's remaining health.
    pub defender_health: u32,
    /// Units knocked out.
    pub fallen: Vec<UnitId>,
    /// Cells cleared of fallen units.
    pub evicted: Vec<CellId>,
    /// Game released from its pause.
    pub released_game: Option<GameId>,
    /// Roster that knocked the other out.
    pub winner: Option<RosterId>,
}

/// Resolve a battle: apply damage, knock out fallen units, complete the
/// battle and release its game.
///
/// # Errors
///
/// Returns `NotFound` for an unknown battle or unit and `PreconditionFailed`
/// if the battle is already completed.
pub fn resolve_battle(
    tables: &mut Tables,
    battle_id: BattleId,
    config: &ArenaConfig,
    now: DateTime<Utc>,
) -> EngineResult<Resolution> {
    let battle = tables.battle(battle_id)?.clone();
    battle.ensure_open()?;

    let correct = |side: Side| {
        participant_question(tables, battle_id, battle.combatant(side).roster)
            .is_some_and(|q| q.is_correct())
    };
    let verdict = Verdict::from_answers(correct(Side::Attacker), correct(Side::Defender));

    let attack = tables.unit(battle.attacker.unit)?.stats.attack;
    let defense = tables.unit(battle.defender.unit)?.stats.defense;
    let damage = damage_points(attack, defense);
    let impact = impact(verdict, damage, config.miss_penalty);

    let defender_health = tables
        .unit_mut(battle.defender.unit)?
        .take_damage(impact.defender_health);
    let attacker = tables.unit_mut(battle.attacker.unit)?;
    let attacker_stamina = attacker.drain_stamina(impact.attacker_stamina);
    let attacker_health = attacker.health;

    let mut fallen = Vec::new();
    let mut evicted = Vec::new();
    for (unit, health) in [
        (battle.defender.unit, defender_health),
        (battle.attacker.unit, attacker_health),
    ] {
        if health == 0 {
            tables.unit_mut(unit)?.status = UnitStatus::Rip;
            evicted.extend(evict(tables, unit));
            fallen.push(unit);
            info!(battle = battle_id, unit, "unit fell");
        }
    }

    let winner = match (defender_health == 0, attacker_health == 0) {
        (true, false) => Some(battle.attacker.roster),
        (false, true) => Some(battle.defender.roster),
        _ => None,
    };

    let record = tables.battle_mut(battle_id)?;
    record.advance(BattleStatus::Completed)?;
    record.winner = winner;
    let released_game = release_game(tables, battle_id, now);

    info!(
        battle = battle_id,
        ?verdict,
        damage,
        defender_health,
        attacker_stamina,
        "battle resolved"
    );
    Ok(Resolution {
        battle: battle_id,
        verdict,
        damage,
        impact,
        attacker_stamina,
        defender_health,
        fallen,
        evicted,
        released_game,
        winner,
    })
}

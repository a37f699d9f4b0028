//! Experience and leveling.
//!
//! # Leveling Model
//!
//! Each of attack, defense and healing grows linearly from the level-1 base:
//!
//! stat = base + min(cap, points_per_level × (level − 1))
//!
//! With the default 30 points per level and a 3000 cap, the cap would be hit
//! at level 101, one past the level ceiling. Cost scales with level:
//! cost = base_cost × level.
//!
//! A grant performs at most one level-up. Experience past the requirement
//! carries over instead of being reset.

use crate::config::ArenaConfig;
use crate::error::{EngineError, EngineResult};
use crate::ledger::{Stats, Unit, UnitId};
use crate::store::Tables;
use serde::Serialize;
use tracing::info;

/// A single level transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelUp {
    /// Level before the grant.
    pub from_level: u32,
    /// Level after the grant.
    pub to_level: u32,
    /// Stats before the grant.
    pub before: Stats,
    /// Stats after the grant.
    pub after: Stats,
    /// New price.
    pub cost: u32,
}

/// Result of granting experience to a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExperienceReport {
    /// Unit that received the experience.
    pub unit: UnitId,
    /// Unit name.
    pub name: String,
    /// Experience granted.
    pub xp_gained: u32,
    /// Experience after the grant (overage when a level was gained).
    pub xp: u32,
    /// Requirement for the next level.
    pub xp_required: u32,
    /// Level after the grant.
    pub level: u32,
    /// Present when the grant crossed a level boundary.
    pub level_up: Option<LevelUp>,
}

/// Add experience to a unit, leveling it up once if the requirement is met.
///
/// At the level ceiling experience still accumulates but no level is gained.
pub fn apply_experience(unit: &mut Unit, xp_delta: u32, config: &ArenaConfig) -> Option<LevelUp> {
    let total = unit.xp.saturating_add(xp_delta);

    if unit.level >= config.max_level || total < unit.xp_required {
        unit.xp = total;
        return None;
    }

    let from_level = unit.level;
    let before = unit.stats;
    let to_level = from_level + 1;

    unit.level = to_level;
    unit.xp = total - unit.xp_required;
    unit.stats = unit.base.leveled(to_level, config);
    unit.cost = unit.base_cost.saturating_mul(to_level);

    Some(LevelUp {
        from_level,
        to_level,
        before,
        after: unit.stats,
        cost: unit.cost,
    })
}

/// Grant experience to an owned, standing unit.
///
/// # Errors
///
/// Returns `NotFound` for an unknown unit, and `PreconditionFailed` if the
/// unit sits in the store or has fallen.
pub fn grant_experience(
    tables: &mut Tables,
    unit_id: UnitId,
    xp_delta: u32,
    config: &ArenaConfig,
) -> EngineResult<ExperienceReport> {
    let unit = tables.unit_mut(unit_id)?;
    if unit.owner.is_none() {
        return Err(EngineError::rejected(format!(
            "{} has no owner and cannot gain experience",
            unit.name
        )));
    }
    if unit.is_fallen() {
        return Err(EngineError::rejected(format!("{} has fallen", unit.name)));
    }

    let level_up = apply_experience(unit, xp_delta, config);
    if let Some(up) = &level_up {
        info!(
            unit = unit_id,
            from = up.from_level,
            to = up.to_level,
            attack = up.after.attack,
            "unit leveled up"
        );
    }

    Ok(ExperienceReport {
        unit: unit_id,
        name: unit.name.clone(),
        xp_gained: xp_delta,
        xp: unit.xp,
        xp_required: unit.xp_required,
        level: unit.level,
        level_up,
    })
}

/// Stats and cost for each level from 1 through `max_level`.
pub fn progression_table(
    base: Stats,
    base_cost: u32,
    config: &ArenaConfig,
) -> impl Iterator<Item = (u32, Stats, u32)> + '_ {
    (1..=config.max_level).map(move |level| {
        (
            level,
            base.leveled(level, config),
            base_cost.saturating_mul(level),
        )
    })
}

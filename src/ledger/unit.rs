//! Units: combat-capable assets owned by a roster or waiting in the store.

use crate::config::ArenaConfig;
use crate::error::{EngineError, EngineResult};
use crate::ledger::RosterId;
use serde::{Deserialize, Serialize};

/// Unit (asset) identifier.
pub type UnitId = u64;

/// Lifecycle status of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// Unowned, available for purchase.
    Store,
    /// Owned and able to fight and occupy cells.
    Warrior,
    /// Owned, decorative.
    Mascot,
    /// Knocked out. Units are never destroyed.
    Rip,
}

impl UnitStatus {
    /// Lowercase name, as shown to players.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Warrior => "warrior",
            Self::Mascot => "mascot",
            Self::Rip => "rip",
        }
    }
}

/// The three leveled combat stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Attack rating.
    pub attack: u32,
    /// Defense rating.
    pub defense: u32,
    /// Healing rating.
    pub healing: u32,
}

impl Stats {
    /// Create a stat triple.
    #[must_use]
    pub const fn new(attack: u32, defense: u32, healing: u32) -> Self {
        Self {
            attack,
            defense,
            healing,
        }
    }

    /// Stats for a unit with these base stats at `level`.
    #[must_use]
    pub fn leveled(self, level: u32, config: &ArenaConfig) -> Self {
        let bonus = config.stat_bonus(level);
        Self {
            attack: self.attack.saturating_add(bonus),
            defense: self.defense.saturating_add(bonus),
            healing: self.healing.saturating_add(bonus),
        }
    }
}

/// Blueprint for creating units at restock or roster setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitTemplate {
    /// Asset name; purchases match on it.
    pub name: String,
    /// Unit kind (e.g. "knight").
    pub kind: String,
    /// Special ability text.
    pub ability: String,
    /// Flavor text.
    pub description: String,
    /// Level-1 stats.
    #[serde(flatten)]
    pub base: Stats,
    /// Endurance rating (not leveled).
    pub endurance: u32,
    /// Starting level.
    pub level: u32,
    /// Level-1 price.
    pub base_cost: u32,
    /// Starting health.
    pub health: u32,
    /// Starting stamina.
    pub stamina: u32,
    /// Per-level experience requirement; the config value when absent.
    pub xp_required: Option<u32>,
}

impl Default for UnitTemplate {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: String::new(),
            ability: String::new(),
            description: String::new(),
            base: Stats::new(10, 10, 10),
            endurance: 10,
            level: 1,
            base_cost: 10,
            health: 100,
            stamina: 100,
            xp_required: None,
        }
    }
}

/// A combat-capable asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier.
    pub id: UnitId,
    /// Owning roster; `None` while in the store.
    pub owner: Option<RosterId>,
    /// Asset name.
    pub name: String,
    /// Unit kind.
    pub kind: String,
    /// Special ability text.
    pub ability: String,
    /// Flavor text.
    pub description: String,
    /// Lifecycle status.
    pub status: UnitStatus,
    /// Current level, starting at 1.
    pub level: u32,
    /// Current stats, always `base.leveled(level)`.
    pub stats: Stats,
    /// Level-1 stats.
    pub base: Stats,
    /// Endurance rating.
    pub endurance: u32,
    /// Remaining health.
    pub health: u32,
    /// Remaining stamina.
    pub stamina: u32,
    /// Experience toward the next level.
    pub xp: u32,
    /// Experience needed for the next level.
    pub xp_required: u32,
    /// Current price, `base_cost × level`.
    pub cost: u32,
    /// Level-1 price.
    pub base_cost: u32,
    /// Roster holding first purchase right, if any.
    pub locked_by: Option<RosterId>,
    /// Roster the lock holder released this unit to, if any.
    pub unlocked_for: Option<RosterId>,
}

impl Unit {
    /// Build a unit from a template.
    #[must_use]
    pub fn from_template(
        id: UnitId,
        template: &UnitTemplate,
        owner: Option<RosterId>,
        status: UnitStatus,
        config: &ArenaConfig,
    ) -> Self {
        let level = template.level.clamp(1, config.max_level);
        Self {
            id,
            owner,
            name: template.name.clone(),
            kind: template.kind.clone(),
            ability: template.ability.clone(),
            description: template.description.clone(),
            status,
            level,
            stats: template.base.leveled(level, config),
            base: template.base,
            endurance: template.endurance,
            health: template.health,
            stamina: template.stamina,
            xp: 0,
            xp_required: template.xp_required.unwrap_or(config.xp_required),
            cost: template.base_cost.saturating_mul(level),
            base_cost: template.base_cost,
            locked_by: None,
            unlocked_for: None,
        }
    }

    /// Import a record that may predate mandatory base stats.
    ///
    /// Missing base stats are back-derived by subtracting the level bonus from
    /// the current stats. Current stats are then recomputed from the base so
    /// the leveling formula holds from here on.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if a stat without a recorded base is below the
    /// level bonus, or if the record requires zero experience per level.
    pub fn from_legacy(record: LegacyUnitRecord, config: &ArenaConfig) -> EngineResult<Self> {
        let level = record.level.clamp(1, config.max_level);
        let bonus = config.stat_bonus(level);
        let derive = |stat: &str, current: u32, recorded: Option<u32>| match recorded {
            Some(base) => Ok(base),
            None => current.checked_sub(bonus).ok_or_else(|| {
                EngineError::BadRequest(format!(
                    "unit {}: {stat} {current} is below the level {level} bonus of {bonus}",
                    record.id
                ))
            }),
        };
        let base = Stats {
            attack: derive("attack", record.attack, record.base_attack)?,
            defense: derive("defense", record.defense, record.base_defense)?,
            healing: derive("healing", record.healing, record.base_healing)?,
        };
        if record.xp_required == Some(0) {
            return Err(EngineError::BadRequest(format!(
                "unit {}: xp_required must be positive",
                record.id
            )));
        }
        let base_cost = record.base_cost.unwrap_or(record.cost / level);

        Ok(Self {
            id: record.id,
            owner: record.owner,
            name: record.name,
            kind: record.kind,
            ability: record.ability,
            description: record.description,
            status: record.status,
            level,
            stats: base.leveled(level, config),
            base,
            endurance: record.endurance,
            health: record.health,
            stamina: record.stamina,
            xp: record.xp,
            xp_required: record.xp_required.unwrap_or(config.xp_required),
            cost: record.cost,
            base_cost,
            locked_by: record.locked_by,
            unlocked_for: record.unlocked_for,
        })
    }

    /// Whether the unit sits unowned in the store pool.
    #[must_use]
    pub fn is_in_store(&self) -> bool {
        self.owner.is_none() && self.status == UnitStatus::Store
    }

    /// Whether the unit has been knocked out.
    #[must_use]
    pub fn is_fallen(&self) -> bool {
        self.status == UnitStatus::Rip
    }

    /// Whether `roster` may buy this unit ahead of the general public.
    #[must_use]
    pub fn is_reserved_for(&self, roster: RosterId) -> bool {
        self.unlocked_for == Some(roster) || self.locked_by == Some(roster)
    }

    /// Hand the unit to `roster` as a warrior and drop any reservation.
    pub fn transfer_to(&mut self, roster: RosterId) {
        self.owner = Some(roster);
        self.status = UnitStatus::Warrior;
        self.locked_by = None;
        self.unlocked_for = None;
    }

    /// Subtract health, clamping at zero. Returns the remaining health.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        self.health = self.health.saturating_sub(amount);
        self.health
    }

    /// Subtract stamina, clamping at zero. Returns the remaining stamina.
    pub fn drain_stamina(&mut self, amount: u32) -> u32 {
        self.stamina = self.stamina.saturating_sub(amount);
        self.stamina
    }
}

/// A unit record from before base stats were mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyUnitRecord {
    /// Unique identifier.
    pub id: UnitId,
    /// Owning roster.
    #[serde(default)]
    pub owner: Option<RosterId>,
    /// Asset name.
    pub name: String,
    /// Unit kind.
    #[serde(default)]
    pub kind: String,
    /// Special ability text.
    #[serde(default)]
    pub ability: String,
    /// Flavor text.
    #[serde(default)]
    pub description: String,
    /// Lifecycle status.
    pub status: UnitStatus,
    /// Level.
    pub level: u32,
    /// Current attack.
    pub attack: u32,
    /// Current defense.
    pub defense: u32,
    /// Current healing.
    pub healing: u32,
    /// Endurance.
    #[serde(default)]
    pub endurance: u32,
    /// Health.
    pub health: u32,
    /// Stamina.
    pub stamina: u32,
    /// Experience.
    #[serde(default)]
    pub xp: u32,
    /// Experience requirement.
    #[serde(default)]
    pub xp_required: Option<u32>,
    /// Current price.
    pub cost: u32,
    /// Level-1 price, if recorded.
    #[serde(default)]
    pub base_cost: Option<u32>,
    /// Base attack, if recorded.
    #[serde(default)]
    pub base_attack: Option<u32>,
    /// Base defense, if recorded.
    #[serde(default)]
    pub base_defense: Option<u32>,
    /// Base healing, if recorded.
    #[serde(default)]
    pub base_healing: Option<u32>,
    /// Lock holder.
    #[serde(default)]
    pub locked_by: Option<RosterId>,
    /// Released-to roster.
    #[serde(default)]
    pub unlocked_for: Option<RosterId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(name: &str) -> UnitTemplate {
        UnitTemplate {
            name: name.to_string(),
            base: Stats::new(50, 40, 30),
            base_cost: 20,
            ..UnitTemplate::default()
        }
    }

    #[test]
    fn test_from_template_applies_level() {
        let config = ArenaConfig::default();
        let mut t = template("Wolf");
        t.level = 3;
        let unit = Unit::from_template(1, &t, None, UnitStatus::Store, &config);

        assert_eq!(unit.stats, Stats::new(110, 100, 90));
        assert_eq!(unit.base, Stats::new(50, 40, 30));
        assert_eq!(unit.cost, 60);
        assert_eq!(unit.xp_required, 100);
        assert!(unit.is_in_store());
    }

    fn legacy_bear() -> LegacyUnitRecord {
        LegacyUnitRecord {
            id: 9,
            owner: Some(2),
            name: "Old Bear".into(),
            kind: String::new(),
            ability: String::new(),
            description: String::new(),
            status: UnitStatus::Warrior,
            level: 4,
            attack: 190,
            defense: 95,
            healing: 120,
            endurance: 5,
            health: 80,
            stamina: 70,
            xp: 12,
            xp_required: None,
            cost: 120,
            base_cost: None,
            base_attack: None,
            base_defense: Some(5),
            base_healing: None,
            locked_by: None,
            unlocked_for: None,
        }
    }

    #[test]
    fn test_from_legacy_back_derives_base() {
        let config = ArenaConfig::default();
        let unit = Unit::from_legacy(legacy_bear(), &config).unwrap();
        assert_eq!(unit.base, Stats::new(100, 5, 30));
        assert_eq!(unit.stats, Stats::new(190, 95, 120));
        assert_eq!(unit.base_cost, 30);
        assert_eq!(unit.xp, 12);
    }

    #[test]
    fn test_from_legacy_rejects_stat_below_bonus() {
        let config = ArenaConfig::default();
        let mut record = legacy_bear();
        record.healing = 60;

        let err = Unit::from_legacy(record.clone(), &config).unwrap_err();
        assert!(matches!(err, EngineError::BadRequest(ref m) if m.contains("healing 60")));

        // A recorded base is taken as is.
        record.base_healing = Some(10);
        let unit = Unit::from_legacy(record, &config).unwrap();
        assert_eq!(unit.stats.healing, 100);
    }

    #[test]
    fn test_from_legacy_rejects_zero_requirement() {
        let mut record = legacy_bear();
        record.xp_required = Some(0);
        assert!(matches!(
            Unit::from_legacy(record, &ArenaConfig::default()),
            Err(EngineError::BadRequest(_))
        ));
    }

    #[test]
    fn test_transfer_clears_locks() {
        let config = ArenaConfig::default();
        let mut unit = Unit::from_template(1, &template("Wolf"), None, UnitStatus::Store, &config);
        unit.locked_by = Some(3);
        unit.unlocked_for = Some(4);
        assert!(unit.is_reserved_for(3));
        assert!(unit.is_reserved_for(4));
        assert!(!unit.is_reserved_for(5));

        unit.transfer_to(4);
        assert_eq!(unit.owner, Some(4));
        assert_eq!(unit.status, UnitStatus::Warrior);
        assert_eq!(unit.locked_by, None);
        assert_eq!(unit.unlocked_for, None);
        assert!(!unit.is_in_store());
    }

    #[test]
    fn test_damage_clamps() {
        let config = ArenaConfig::default();
        let mut unit = Unit::from_template(1, &template("Wolf"), Some(1), UnitStatus::Warrior, &config);
        assert_eq!(unit.take_damage(30), 70);
        assert_eq!(unit.take_damage(500), 0);
        assert_eq!(unit.drain_stamina(25), 75);
        assert_eq!(unit.drain_stamina(1000), 0);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&UnitStatus::Rip).unwrap(), "\"rip\"");
        assert_eq!(UnitStatus::Warrior.as_str(), "warrior");
    }
}

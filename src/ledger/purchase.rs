//! The store: restocking, enrollment and purchases.

use crate::config::ArenaConfig;
use crate::error::{EngineError, EngineResult};
use crate::ledger::{RosterId, Stats, Unit, UnitId, UnitStatus, UnitTemplate};
use crate::store::Tables;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// A completed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Purchase {
    /// Unit that changed hands.
    pub unit: UnitId,
    /// Asset name.
    pub name: String,
    /// Coins paid.
    pub cost: u32,
    /// Buyer's balance afterwards.
    pub coins: u32,
}

/// Buy one store unit named `asset_name` for `buyer`.
///
/// Candidates in priority order: a unit reserved for the buyer (released to
/// them, or locked by them), then any unit with no lock.
///
/// # Errors
///
/// Returns `NotFound` if the buyer is unknown or no store unit has that name,
/// `LockedByOther` if every match is reserved for someone else, and
/// `InsufficientFunds` if the buyer cannot pay.
pub fn purchase(tables: &mut Tables, buyer: RosterId, asset_name: &str) -> EngineResult<Purchase> {
    tables.roster(buyer)?;

    let matching: Vec<&Unit> = tables
        .units
        .values()
        .filter(|u| u.is_in_store() && u.name == asset_name)
        .collect();
    if matching.is_empty() {
        return Err(EngineError::NotFound("Asset not found or out of stock".into()));
    }

    let chosen = matching
        .iter()
        .find(|u| u.is_reserved_for(buyer))
        .or_else(|| matching.iter().find(|u| u.locked_by.is_none()))
        .map(|u| (u.id, u.cost));
    let Some((unit_id, cost)) = chosen else {
        return Err(EngineError::LockedByOther {
            asset: asset_name.to_string(),
        });
    };

    let coins = tables.roster_mut(buyer)?.debit(cost)?;
    tables.unit_mut(unit_id)?.transfer_to(buyer);

    info!(buyer, unit = unit_id, cost, coins, "asset purchased");
    Ok(Purchase {
        unit: unit_id,
        name: asset_name.to_string(),
        cost,
        coins,
    })
}

/// Add `count` store units built from `template`.
///
/// # Errors
///
/// Returns `BadRequest` for a zero count or empty name, and `NotFound` if
/// `locked_by` names an unknown roster.
pub fn restock(
    tables: &mut Tables,
    template: &UnitTemplate,
    count: u32,
    locked_by: Option<RosterId>,
    config: &ArenaConfig,
) -> EngineResult<Vec<UnitId>> {
    if count == 0 {
        return Err(EngineError::BadRequest("restock count must be positive".into()));
    }
    validate_template(template)?;
    if let Some(roster) = locked_by {
        tables.roster(roster)?;
    }

    let ids = (0..count)
        .map(|_| {
            let id = tables.seq.units.next_id();
            let mut unit = Unit::from_template(id, template, None, UnitStatus::Store, config);
            unit.locked_by = locked_by;
            tables.units.insert(id, unit);
            id
        })
        .collect();
    Ok(ids)
}

/// Create a unit directly in a roster.
///
/// # Errors
///
/// Returns `NotFound` for an unknown roster and `BadRequest` unless `status`
/// is `Warrior` or `Mascot`.
pub fn enroll(
    tables: &mut Tables,
    roster: RosterId,
    template: &UnitTemplate,
    status: UnitStatus,
    config: &ArenaConfig,
) -> EngineResult<UnitId> {
    tables.roster(roster)?;
    validate_template(template)?;
    if !matches!(status, UnitStatus::Warrior | UnitStatus::Mascot) {
        return Err(EngineError::BadRequest(format!(
            "enrolled units must be warrior or mascot, got {}",
            status.as_str()
        )));
    }

    let id = tables.seq.units.next_id();
    tables
        .units
        .insert(id, Unit::from_template(id, template, Some(roster), status, config));
    Ok(id)
}

fn validate_template(template: &UnitTemplate) -> EngineResult<()> {
    if template.name.trim().is_empty() {
        return Err(EngineError::BadRequest("asset name must not be empty".into()));
    }
    if template.xp_required == Some(0) {
        return Err(EngineError::BadRequest("xp_required must be positive".into()));
    }
    Ok(())
}

/// One asset name on sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreListing {
    /// Asset name.
    pub name: String,
    /// Kind of the representative unit.
    pub kind: String,
    /// Stats of the representative unit.
    pub stats: Stats,
    /// Level of the representative unit.
    pub level: u32,
    /// Price of the representative unit.
    pub cost: u32,
    /// Units with this name in the store.
    pub available: u32,
    /// Units with this name reserved by some roster.
    pub locked: u32,
}

/// The store pool grouped by asset name.
#[must_use]
pub fn store_listing(tables: &Tables) -> Vec<StoreListing> {
    let mut by_name: BTreeMap<&str, StoreListing> = BTreeMap::new();
    for unit in tables.units.values().filter(|u| u.is_in_store()) {
        let entry = by_name.entry(unit.name.as_str()).or_insert_with(|| StoreListing {
            name: unit.name.clone(),
            kind: unit.kind.clone(),
            stats: unit.stats,
            level: unit.level,
            cost: unit.cost,
            available: 0,
            locked: 0,
        });
        entry.available += 1;
        if unit.locked_by.is_some() {
            entry.locked += 1;
        }
    }
    by_name.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wolf() -> UnitTemplate {
        UnitTemplate {
            name: "Wolf".into(),
            base_cost: 30,
            ..UnitTemplate::default()
        }
    }

    fn setup(coins: u32) -> (Tables, ArenaConfig) {
        let mut tables = Tables::default();
        tables.add_roster("North", Some(10), coins);
        tables.add_roster("South", Some(20), coins);
        (tables, ArenaConfig::default())
    }

    #[test]
    fn test_purchase_transfers_and_debits() {
        let (mut tables, config) = setup(100);
        let ids = restock(&mut tables, &wolf(), 1, None, &config).unwrap();

        let bought = purchase(&mut tables, 1, "Wolf").unwrap();
        assert_eq!(bought.unit, ids[0]);
        assert_eq!(bought.coins, 70);
        let unit = tables.unit(ids[0]).unwrap();
        assert_eq!(unit.owner, Some(1));
        assert_eq!(unit.status, UnitStatus::Warrior);
    }

    #[test]
    fn test_purchase_out_of_stock() {
        let (mut tables, _) = setup(100);
        assert!(matches!(
            purchase(&mut tables, 1, "Wolf"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_purchase_insufficient_funds_changes_nothing() {
        let (mut tables, config) = setup(10);
        let ids = restock(&mut tables, &wolf(), 1, None, &config).unwrap();

        let err = purchase(&mut tables, 1, "Wolf").unwrap_err();
        assert_eq!(err, EngineError::InsufficientFunds { cost: 30, balance: 10 });
        assert_eq!(tables.roster(1).unwrap().coins, 10);
        assert!(tables.unit(ids[0]).unwrap().is_in_store());
    }

    #[test]
    fn test_purchase_locked_by_other() {
        let (mut tables, config) = setup(100);
        restock(&mut tables, &wolf(), 2, Some(1), &config).unwrap();

        let err = purchase(&mut tables, 2, "Wolf").unwrap_err();
        assert!(matches!(err, EngineError::LockedByOther { .. }));
        assert_eq!(tables.roster(2).unwrap().coins, 100);
    }

    #[test]
    fn test_lock_holder_and_released_roster_may_buy() {
        let (mut tables, config) = setup(100);
        let ids = restock(&mut tables, &wolf(), 2, Some(1), &config).unwrap();
        tables.unit_mut(ids[1]).unwrap().unlocked_for = Some(2);

        let first = purchase(&mut tables, 2, "Wolf").unwrap();
        assert_eq!(first.unit, ids[1]);
        let second = purchase(&mut tables, 1, "Wolf").unwrap();
        assert_eq!(second.unit, ids[0]);
    }

    #[test]
    fn test_reserved_unit_preferred_over_free() {
        let (mut tables, config) = setup(100);
        let free = restock(&mut tables, &wolf(), 1, None, &config).unwrap();
        let locked = restock(&mut tables, &wolf(), 1, Some(2), &config).unwrap();

        let bought = purchase(&mut tables, 2, "Wolf").unwrap();
        assert_eq!(bought.unit, locked[0]);
        assert!(tables.unit(free[0]).unwrap().is_in_store());
    }

    #[test]
    fn test_restock_validation() {
        let (mut tables, config) = setup(100);
        assert!(matches!(
            restock(&mut tables, &wolf(), 0, None, &config),
            Err(EngineError::BadRequest(_))
        ));
        assert!(matches!(
            restock(&mut tables, &wolf(), 1, Some(99), &config),
            Err(EngineError::NotFound(_))
        ));
        let free_levels = UnitTemplate {
            xp_required: Some(0),
            ..wolf()
        };
        assert!(matches!(
            restock(&mut tables, &free_levels, 1, None, &config),
            Err(EngineError::BadRequest(_))
        ));
        assert!(tables.units.is_empty());
    }

    #[test]
    fn test_enroll_status() {
        let (mut tables, config) = setup(100);
        let id = enroll(&mut tables, 1, &wolf(), UnitStatus::Mascot, &config).unwrap();
        assert_eq!(tables.unit(id).unwrap().owner, Some(1));
        assert!(enroll(&mut tables, 1, &wolf(), UnitStatus::Store, &config).is_err());
    }

    #[test]
    fn test_store_listing_groups_by_name() {
        let (mut tables, config) = setup(100);
        restock(&mut tables, &wolf(), 2, Some(1), &config).unwrap();
        restock(&mut tables, &wolf(), 1, None, &config).unwrap();
        let bear = UnitTemplate {
            name: "Bear".into(),
            ..UnitTemplate::default()
        };
        restock(&mut tables, &bear, 1, None, &config).unwrap();

        let listing = store_listing(&tables);
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].name, "Bear");
        assert_eq!(listing[1].available, 3);
        assert_eq!(listing[1].locked, 2);
    }
}

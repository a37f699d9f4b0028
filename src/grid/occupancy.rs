//! Placing and moving units on the board.

use crate::error::{EngineError, EngineResult};
use crate::grid::{CellId, GameId};
use crate::ledger::{RosterId, UnitId, UnitStatus};
use crate::store::Tables;

/// Cell currently holding `unit`, if any.
#[must_use]
pub fn cell_of(tables: &Tables, unit: UnitId) -> Option<CellId> {
    tables
        .cells
        .values()
        .find(|c| c.occupied_by == Some(unit))
        .map(|c| c.id)
}

/// Remove `unit` from every cell it occupies. Returns the cleared cells.
pub fn evict(tables: &mut Tables, unit: UnitId) -> Vec<CellId> {
    let held: Vec<CellId> = tables
        .cells
        .values()
        .filter(|c| c.occupied_by == Some(unit))
        .map(|c| c.id)
        .collect();
    for id in &held {
        if let Some(cell) = tables.cells.get_mut(id) {
            cell.vacate();
        }
    }
    held
}

/// Check that `roster` owns `unit_id`.
fn owned_unit(tables: &Tables, roster: RosterId, unit_id: UnitId) -> EngineResult<()> {
    let unit = tables.unit(unit_id)?;
    if unit.owner != Some(roster) {
        return Err(EngineError::Forbidden("You do not own this warrior".into()));
    }
    Ok(())
}

/// Put one of `roster`'s warriors on an empty cell.
///
/// Returns the game whose board changed.
///
/// # Errors
///
/// Returns `NotFound` for an unknown unit or cell, `Forbidden` if the roster
/// does not own the unit, and `PreconditionFailed` if the unit is not a
/// warrior or already on the board, or the cell is inactive or occupied.
pub fn place_unit(
    tables: &mut Tables,
    roster: RosterId,
    cell_id: CellId,
    unit_id: UnitId,
) -> EngineResult<GameId> {
    owned_unit(tables, roster, unit_id)?;
    let unit = tables.unit(unit_id)?;
    if unit.status != UnitStatus::Warrior {
        return Err(EngineError::rejected("Asset must be a warrior to be placed"));
    }
    if cell_of(tables, unit_id).is_some() {
        return Err(EngineError::rejected(format!("{} is already on the board", unit.name)));
    }

    let cell = tables.cell_mut(cell_id)?;
    if !cell.active {
        return Err(EngineError::rejected("Cell is not active"));
    }
    if cell.occupied_by.is_some() {
        return Err(EngineError::rejected("Cell is already occupied"));
    }
    cell.occupy(unit_id);
    Ok(cell.game)
}

/// Move one of `roster`'s units between two cells of the same game.
///
/// Returns the game whose board changed.
///
/// # Errors
///
/// Returns `NotFound` for an unknown unit or cell, `Forbidden` if the roster
/// does not own the unit, and `PreconditionFailed` if the unit is not in the
/// source cell, the cells belong to different games, or the destination is
/// inactive or occupied.
pub fn move_unit(
    tables: &mut Tables,
    roster: RosterId,
    from: CellId,
    to: CellId,
    unit_id: UnitId,
) -> EngineResult<GameId> {
    owned_unit(tables, roster, unit_id)?;

    let source = tables.cell(from)?;
    if source.occupied_by != Some(unit_id) {
        return Err(EngineError::rejected("Warrior is not in the from cell"));
    }
    let game = source.game;

    let destination = tables.cell(to)?;
    if destination.game != game {
        return Err(EngineError::rejected("Cells belong to different games"));
    }
    if !destination.active {
        return Err(EngineError::rejected("Destination cell is not active"));
    }
    if destination.occupied_by.is_some() {
        return Err(EngineError::rejected("Destination cell is already occupied"));
    }

    tables.cell_mut(from)?.vacate();
    tables.cell_mut(to)?.occupy(unit_id);
    Ok(game)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArenaConfig;
    use crate::grid::{GameSetup, cells_of, create_game};
    use crate::ledger::{UnitStatus, UnitTemplate, enroll};
    use chrono::Utc;

    struct Fixture {
        tables: Tables,
        cells: Vec<CellId>,
        warrior: UnitId,
    }

    fn fixture() -> Fixture {
        let config = ArenaConfig::default();
        let mut tables = Tables::default();
        tables.add_roster("North", Some(10), 0);
        tables.add_roster("South", Some(20), 0);
        let template = UnitTemplate {
            name: "Wolf".into(),
            ..UnitTemplate::default()
        };
        let warrior = enroll(&mut tables, 1, &template, UnitStatus::Warrior, &config).unwrap();
        let setup = GameSetup {
            name: "Castle".into(),
            thumbnail: String::new(),
            rows: 2,
            columns: 2,
            participants: vec![1, 2],
        };
        let game = create_game(&mut tables, setup, &config, Utc::now()).unwrap();
        let cells = cells_of(&tables, game).iter().map(|c| c.id).collect();
        Fixture {
            tables,
            cells,
            warrior,
        }
    }

    #[test]
    fn test_place_unit() {
        let mut f = fixture();
        place_unit(&mut f.tables, 1, f.cells[0], f.warrior).unwrap();
        let cell = f.tables.cell(f.cells[0]).unwrap();
        assert_eq!(cell.occupied_by, Some(f.warrior));
        assert_eq!(cell.status, "warrior");
    }

    #[test]
    fn test_place_requires_ownership() {
        let mut f = fixture();
        let err = place_unit(&mut f.tables, 2, f.cells[0], f.warrior).unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[test]
    fn test_place_rejects_twice_and_occupied() {
        let mut f = fixture();
        place_unit(&mut f.tables, 1, f.cells[0], f.warrior).unwrap();
        assert!(place_unit(&mut f.tables, 1, f.cells[1], f.warrior).is_err());

        let config = ArenaConfig::default();
        let other = enroll(
            &mut f.tables,
            1,
            &UnitTemplate {
                name: "Bear".into(),
                ..UnitTemplate::default()
            },
            UnitStatus::Warrior,
            &config,
        )
        .unwrap();
        assert!(place_unit(&mut f.tables, 1, f.cells[0], other).is_err());
    }

    #[test]
    fn test_place_rejects_inactive_and_mascot() {
        let mut f = fixture();
        f.tables.cell_mut(f.cells[0]).unwrap().active = false;
        assert!(place_unit(&mut f.tables, 1, f.cells[0], f.warrior).is_err());

        f.tables.unit_mut(f.warrior).unwrap().status = UnitStatus::Mascot;
        assert!(place_unit(&mut f.tables, 1, f.cells[1], f.warrior).is_err());
    }

    #[test]
    fn test_move_round_trip() {
        let mut f = fixture();
        place_unit(&mut f.tables, 1, f.cells[0], f.warrior).unwrap();
        let before: Vec<_> = f.cells.iter().map(|&c| f.tables.cell(c).unwrap().clone()).collect();

        move_unit(&mut f.tables, 1, f.cells[0], f.cells[3], f.warrior).unwrap();
        assert_eq!(f.tables.cell(f.cells[0]).unwrap().occupied_by, None);
        assert_eq!(f.tables.cell(f.cells[3]).unwrap().occupied_by, Some(f.warrior));

        move_unit(&mut f.tables, 1, f.cells[3], f.cells[0], f.warrior).unwrap();
        let after: Vec<_> = f.cells.iter().map(|&c| f.tables.cell(c).unwrap().clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_move_requires_unit_in_source() {
        let mut f = fixture();
        let err = move_unit(&mut f.tables, 1, f.cells[0], f.cells[1], f.warrior).unwrap_err();
        assert_eq!(err, EngineError::rejected("Warrior is not in the from cell"));
    }

    #[test]
    fn test_move_rejects_other_game() {
        let mut f = fixture();
        place_unit(&mut f.tables, 1, f.cells[0], f.warrior).unwrap();
        let setup = GameSetup {
            name: "Keep".into(),
            thumbnail: String::new(),
            rows: 1,
            columns: 1,
            participants: vec![1],
        };
        let keep = create_game(&mut f.tables, setup, &ArenaConfig::default(), Utc::now()).unwrap();
        let far = cells_of(&f.tables, keep)[0].id;
        let before = f.tables.cells.clone();

        let err = move_unit(&mut f.tables, 1, f.cells[0], far, f.warrior).unwrap_err();
        assert_eq!(err, EngineError::rejected("Cells belong to different games"));
        assert_eq!(f.tables.cells, before);
    }

    #[test]
    fn test_move_rejects_inactive_destination() {
        let mut f = fixture();
        place_unit(&mut f.tables, 1, f.cells[0], f.warrior).unwrap();
        f.tables.cell_mut(f.cells[1]).unwrap().active = false;
        let before = f.tables.cells.clone();

        let err = move_unit(&mut f.tables, 1, f.cells[0], f.cells[1], f.warrior).unwrap_err();
        assert_eq!(err, EngineError::rejected("Destination cell is not active"));
        assert_eq!(f.tables.cells, before);
        assert_eq!(cell_of(&f.tables, f.warrior), Some(f.cells[0]));
    }

    #[test]
    fn test_evict_clears_cells() {
        let mut f = fixture();
        place_unit(&mut f.tables, 1, f.cells[2], f.warrior).unwrap();
        assert_eq!(evict(&mut f.tables, f.warrior), vec![f.cells[2]]);
        assert_eq!(cell_of(&f.tables, f.warrior), None);
    }
}

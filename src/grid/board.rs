//! Game lifecycle: creating, editing and deleting boards.

use crate::config::ArenaConfig;
use crate::error::{EngineError, EngineResult};
use crate::grid::{
    Cell, CellCoord, CellId, CellUpdate, Game, GameId, GameSetup, MAX_LABELED_ROWS, MAX_STATUS_LEN,
};
use crate::store::Tables;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Create a game and all of its cells.
///
/// # Errors
///
/// Returns `BadRequest` for out-of-range dimensions or duplicate
/// participants, and `NotFound` for an unknown participant.
pub fn create_game(
    tables: &mut Tables,
    setup: GameSetup,
    config: &ArenaConfig,
    now: DateTime<Utc>,
) -> EngineResult<GameId> {
    let max = config.max_board_dimension.min(MAX_LABELED_ROWS);
    if !(1..=max).contains(&setup.rows) || !(1..=max).contains(&setup.columns) {
        return Err(EngineError::BadRequest(format!(
            "Rows and columns must be between 1 and {max}"
        )));
    }
    let mut seen = HashSet::new();
    for &roster in &setup.participants {
        tables.roster(roster)?;
        if !seen.insert(roster) {
            return Err(EngineError::BadRequest(format!(
                "roster {roster} listed twice"
            )));
        }
    }

    let id = tables.seq.games.next_id();
    for row in 0..setup.rows {
        for column in 0..setup.columns {
            let cell_id = tables.seq.cells.next_id();
            tables
                .cells
                .insert(cell_id, Cell::new(cell_id, id, CellCoord::new(row, column)));
        }
    }
    tables.games.insert(
        id,
        Game {
            id,
            name: setup.name,
            thumbnail: setup.thumbnail,
            rows: setup.rows,
            columns: setup.columns,
            participants: setup.participants,
            current_turn_index: 0,
            turn_start_time: Some(now),
            turn_duration_secs: config.turn_duration_secs,
            battle_id: None,
            created_at: now,
        },
    );
    Ok(id)
}

/// Cells of `game`, ordered row by row.
#[must_use]
pub fn cells_of(tables: &Tables, game: GameId) -> Vec<Cell> {
    let mut cells: Vec<Cell> = tables
        .cells
        .values()
        .filter(|c| c.game == game)
        .cloned()
        .collect();
    cells.sort_by_key(|c| c.coord);
    cells
}

/// Rename a game or change its thumbnail.
///
/// # Errors
///
/// Returns `NotFound` for an unknown game.
pub fn update_game(
    tables: &mut Tables,
    game: GameId,
    name: Option<String>,
    thumbnail: Option<String>,
) -> EngineResult<()> {
    let record = tables.game_mut(game)?;
    if let Some(name) = name {
        record.name = name;
    }
    if let Some(thumbnail) = thumbnail {
        record.thumbnail = thumbnail;
    }
    Ok(())
}

/// Delete a game and its cells. Battles spawned by it lose their link.
///
/// # Errors
///
/// Returns `NotFound` for an unknown game.
pub fn delete_game(tables: &mut Tables, game: GameId) -> EngineResult<()> {
    tables.game(game)?;
    tables.games.remove(&game);
    let cells: Vec<CellId> = tables
        .cells
        .values()
        .filter(|c| c.game == game)
        .map(|c| c.id)
        .collect();
    for cell in cells {
        tables.cells.remove(&cell);
    }
    let linked: Vec<_> = tables
        .battles
        .values()
        .filter(|b| b.game == Some(game))
        .map(|b| b.id)
        .collect();
    for battle in linked {
        tables.battle_mut(battle)?.game = None;
    }
    Ok(())
}

/// Replace a cell's editable fields.
///
/// Returns the owning game so the caller can announce the change.
///
/// # Errors
///
/// Returns `NotFound` for an unknown cell or occupant, `BadRequest` for an
/// over-long status, and `PreconditionFailed` if the occupant has fallen or
/// already stands elsewhere.
pub fn update_cell(tables: &mut Tables, cell_id: CellId, update: CellUpdate) -> EngineResult<GameId> {
    if update.status.chars().count() > MAX_STATUS_LEN {
        return Err(EngineError::BadRequest(format!(
            "status must be at most {MAX_STATUS_LEN} characters"
        )));
    }
    let game = tables.cell(cell_id)?.game;

    if let Some(unit_id) = update.occupied_by {
        let unit = tables.unit(unit_id)?;
        if unit.is_fallen() {
            return Err(EngineError::rejected(format!("{} has fallen", unit.name)));
        }
        let elsewhere = tables
            .cells
            .values()
            .any(|c| c.id != cell_id && c.occupied_by == Some(unit_id));
        if elsewhere {
            return Err(EngineError::rejected(format!(
                "{} already occupies another cell",
                unit.name
            )));
        }
    }

    let cell = tables.cell_mut(cell_id)?;
    cell.name = update.name;
    cell.description = update.description;
    cell.background = update.background;
    cell.active = update.active;
    cell.element = update.element;
    cell.occupied_by = update.occupied_by;
    cell.status = update.status;
    Ok(game)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(rows: u16, columns: u16) -> GameSetup {
        GameSetup {
            name: "Castle".into(),
            thumbnail: String::new(),
            rows,
            columns,
            participants: vec![1, 2],
        }
    }

    fn tables() -> Tables {
        let mut tables = Tables::default();
        tables.add_roster("North", Some(10), 0);
        tables.add_roster("South", Some(20), 0);
        tables
    }

    #[test]
    fn test_create_game_builds_cells() {
        let mut tables = tables();
        let config = ArenaConfig::default();
        let game = create_game(&mut tables, setup(3, 4), &config, Utc::now()).unwrap();

        let cells = cells_of(&tables, game);
        assert_eq!(cells.len(), 12);
        assert_eq!(cells[0].label, "A1");
        assert_eq!(cells[11].label, "C4");
        assert!(cells.iter().all(Cell::is_open));

        let record = tables.game(game).unwrap();
        assert_eq!(record.turn_duration_secs, 20);
        assert_eq!(record.current_turn_index, 0);
    }

    #[test]
    fn test_create_game_dimension_limits() {
        let mut tables = tables();
        let config = ArenaConfig::default();
        assert!(create_game(&mut tables, setup(0, 4), &config, Utc::now()).is_err());
        assert!(create_game(&mut tables, setup(4, 101), &config, Utc::now()).is_err());
        assert!(create_game(&mut tables, setup(100, 1), &config, Utc::now()).is_ok());

        // Rows past ZZ would repeat labels even if the config allows them.
        let wide = ArenaConfig {
            max_board_dimension: 1000,
            ..ArenaConfig::default()
        };
        assert!(create_game(&mut tables, setup(703, 1), &wide, Utc::now()).is_err());
        assert!(create_game(&mut tables, setup(702, 1), &wide, Utc::now()).is_ok());
    }

    #[test]
    fn test_create_game_checks_participants() {
        let mut tables = tables();
        let config = ArenaConfig::default();
        let mut bad = setup(2, 2);
        bad.participants = vec![1, 1];
        assert!(matches!(
            create_game(&mut tables, bad, &config, Utc::now()),
            Err(EngineError::BadRequest(_))
        ));
        let mut unknown = setup(2, 2);
        unknown.participants = vec![1, 9];
        assert!(matches!(
            create_game(&mut tables, unknown, &config, Utc::now()),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_game_cascades() {
        let mut tables = tables();
        let config = ArenaConfig::default();
        let keep = create_game(&mut tables, setup(1, 1), &config, Utc::now()).unwrap();
        let doomed = create_game(&mut tables, setup(2, 2), &config, Utc::now()).unwrap();

        delete_game(&mut tables, doomed).unwrap();
        assert!(tables.game(doomed).is_err());
        assert_eq!(tables.cells.len(), 1);
        assert!(tables.game(keep).is_ok());
    }

    #[test]
    fn test_update_cell_limits_status() {
        let mut tables = tables();
        let config = ArenaConfig::default();
        let game = create_game(&mut tables, setup(1, 1), &config, Utc::now()).unwrap();
        let cell = cells_of(&tables, game)[0].id;

        let update = CellUpdate {
            name: "Gate".into(),
            description: String::new(),
            background: "#000".into(),
            active: false,
            element: "fire".into(),
            occupied_by: None,
            status: "x".repeat(21),
        };
        assert!(update_cell(&mut tables, cell, update.clone()).is_err());

        let ok = CellUpdate {
            status: "closed".into(),
            ..update
        };
        assert_eq!(update_cell(&mut tables, cell, ok).unwrap(), game);
        let stored = tables.cell(cell).unwrap();
        assert_eq!(stored.name, "Gate");
        assert!(!stored.active);
    }
}

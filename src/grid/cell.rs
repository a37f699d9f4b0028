//! Board cells.

use crate::grid::{CellCoord, GameId};
use crate::ledger::UnitId;
use serde::{Deserialize, Serialize};

/// Cell identifier.
pub type CellId = u64;

/// Background colour for new cells.
pub const DEFAULT_BACKGROUND: &str = "#3a3a3a";

/// Longest allowed cell status.
pub const MAX_STATUS_LEN: usize = 20;

/// Status text of a cell holding a unit.
pub(crate) const OCCUPIED_STATUS: &str = "warrior";

/// A single square of a game board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Unique identifier.
    pub id: CellId,
    /// Owning game.
    pub game: GameId,
    /// Position on the board.
    pub coord: CellCoord,
    /// Spreadsheet label, e.g. `A1`.
    pub label: String,
    /// Display name.
    pub name: String,
    /// Description text.
    pub description: String,
    /// Background colour.
    pub background: String,
    /// Inactive cells cannot be entered.
    pub active: bool,
    /// Terrain element, if any.
    pub element: String,
    /// Unit standing here.
    pub occupied_by: Option<UnitId>,
    /// Free-form status, at most [`MAX_STATUS_LEN`] characters.
    pub status: String,
}

impl Cell {
    /// Create an empty, active cell.
    #[must_use]
    pub fn new(id: CellId, game: GameId, coord: CellCoord) -> Self {
        let label = coord.label();
        Self {
            id,
            game,
            coord,
            name: label.clone(),
            label,
            description: String::new(),
            background: DEFAULT_BACKGROUND.to_string(),
            active: true,
            element: String::new(),
            occupied_by: None,
            status: String::new(),
        }
    }

    /// Whether a unit may enter.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.active && self.occupied_by.is_none()
    }

    /// Put `unit` here.
    pub fn occupy(&mut self, unit: UnitId) {
        self.occupied_by = Some(unit);
        self.status = OCCUPIED_STATUS.to_string();
    }

    /// Clear the occupant.
    pub fn vacate(&mut self) {
        self.occupied_by = None;
        self.status.clear();
    }
}

/// Full replacement of a cell's editable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellUpdate {
    /// Display name.
    pub name: String,
    /// Description text.
    #[serde(default)]
    pub description: String,
    /// Background colour.
    #[serde(default = "default_background")]
    pub background: String,
    /// Activity flag.
    pub active: bool,
    /// Terrain element.
    #[serde(default)]
    pub element: String,
    /// Occupant.
    #[serde(default)]
    pub occupied_by: Option<UnitId>,
    /// Status text.
    #[serde(default)]
    pub status: String,
}

fn default_background() -> String {
    DEFAULT_BACKGROUND.to_string()
}

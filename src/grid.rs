//! Occupancy grid: games, cells, placement and movement.

mod board;
mod cell;
mod coord;
mod game;
mod occupancy;
mod render;

pub use board::{cells_of, create_game, delete_game, update_cell, update_game};
pub use cell::{Cell, CellId, CellUpdate, DEFAULT_BACKGROUND, MAX_STATUS_LEN};
pub use coord::{CellCoord, MAX_LABELED_ROWS};
pub use game::{Game, GameId, GameSetup};
pub use occupancy::{cell_of, evict, move_unit, place_unit};
pub use render::render_board;

//! ASCII board renderer for terminal viewing, with optional ANSI colors.

use crate::error::EngineResult;
use crate::grid::{Cell, CellCoord, Game, GameId, cells_of};
use crate::store::Tables;
use std::fmt::Write;

/// ANSI color codes by turn position.
const PARTICIPANT_COLORS: [&str; 6] = [
    "\x1b[31m", // Red
    "\x1b[34m", // Blue
    "\x1b[32m", // Green
    "\x1b[33m", // Yellow
    "\x1b[35m", // Magenta
    "\x1b[36m", // Cyan
];

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const GRAY: &str = "\x1b[90m";

/// Render a game board.
///
/// Output format:
/// ```text
/// Castle (game 1)                   turn: North
/// ┌─────────┐
/// │ . 1 . # │ A
/// │ . . 2 . │ B
/// └─────────┘
///
/// Legend: .=Open  #=Inactive  1-9=Occupant's turn position
///
/// > 1 North   units on board: 1
///   2 South   units on board: 1
/// ```
///
/// # Errors
///
/// Returns `NotFound` for an unknown game.
pub fn render_board(tables: &Tables, game_id: GameId, color: bool) -> EngineResult<String> {
    let game = tables.game(game_id)?;
    let cells = cells_of(tables, game_id);
    let mut output = String::new();

    render_header(&mut output, tables, game);
    render_grid(&mut output, tables, game, &cells, color);
    output.push_str("\nLegend: .=Open  #=Inactive  1-9=Occupant's turn position\n\n");
    render_participants(&mut output, tables, game, &cells, color);

    Ok(output)
}

fn render_header(output: &mut String, tables: &Tables, game: &Game) {
    let title = format!("{} (game {})", game.name, game.id);
    let turn = game
        .current_roster()
        .and_then(|r| tables.rosters.get(&r))
        .map_or_else(|| "-".to_string(), |r| r.name.clone());
    let _ = write!(output, "{title:<34}turn: {turn}");
    if let Some(battle) = game.battle_id {
        let _ = write!(output, "  [paused by battle {battle}]");
    }
    output.push('\n');
}

fn render_grid(output: &mut String, tables: &Tables, game: &Game, cells: &[Cell], color: bool) {
    let width = usize::from(game.columns) * 2 + 1;
    let border = "─".repeat(width);
    let _ = writeln!(output, "┌{border}┐");

    for row in cells.chunks(usize::from(game.columns).max(1)) {
        output.push_str("│ ");
        for cell in row {
            render_cell(output, tables, game, cell, color);
            output.push(' ');
        }
        let letters = row
            .first()
            .map(|c| CellCoord::row_letters(c.coord.row))
            .unwrap_or_default();
        let _ = writeln!(output, "│ {letters}");
    }

    let _ = writeln!(output, "└{border}┘");
}

fn render_cell(output: &mut String, tables: &Tables, game: &Game, cell: &Cell, color: bool) {
    if !cell.active {
        paint(output, "#", GRAY, color);
        return;
    }
    let Some(unit) = cell.occupied_by else {
        output.push('.');
        return;
    };
    let position = tables
        .units
        .get(&unit)
        .and_then(|u| u.owner)
        .and_then(|owner| game.position_of(owner));
    match position {
        Some(p) => {
            let symbol = position_symbol(p);
            paint(output, &symbol.to_string(), participant_color(p), color);
        }
        None => output.push('?'),
    }
}

fn render_participants(
    output: &mut String,
    tables: &Tables,
    game: &Game,
    cells: &[Cell],
    color: bool,
) {
    for (position, roster) in game.participants.iter().enumerate() {
        let name = tables
            .rosters
            .get(roster)
            .map_or("Unknown", |r| r.name.as_str());
        let on_board = cells
            .iter()
            .filter_map(|c| c.occupied_by)
            .filter(|u| tables.units.get(u).and_then(|u| u.owner) == Some(*roster))
            .count();
        let marker = if position == game.current_turn_index { '>' } else { ' ' };
        let line = format!("{} {name:<8}", position_symbol(position));
        output.push(marker);
        output.push(' ');
        if color && position == game.current_turn_index {
            output.push_str(BOLD);
        }
        paint(output, &line, participant_color(position), color);
        let _ = writeln!(output, "  units on board: {on_board}");
    }
}

/// Symbol for a turn position: 1-9, then `+`.
fn position_symbol(position: usize) -> char {
    u32::try_from(position + 1)
        .ok()
        .filter(|n| *n <= 9)
        .and_then(|n| char::from_digit(n, 10))
        .unwrap_or('+')
}

fn participant_color(position: usize) -> &'static str {
    PARTICIPANT_COLORS[position % PARTICIPANT_COLORS.len()]
}

fn paint(output: &mut String, text: &str, code: &str, color: bool) {
    if color {
        let _ = write!(output, "{code}{text}{RESET}");
    } else {
        output.push_str(text);
    }
}

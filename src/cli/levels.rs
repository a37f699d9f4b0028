//! Levels command implementation.

use super::output::{LevelRow, format_levels_text};
use super::{CliError, OutputFormat, print_json};
use quizgrid::ledger::progression_table;
use quizgrid::{ArenaConfig, Stats};

/// Execute the levels command.
///
/// # Errors
///
/// Returns an error if `to_level` is out of range or output fails.
pub(crate) fn execute(
    config: &ArenaConfig,
    base: Stats,
    base_cost: u32,
    to_level: u32,
    format: OutputFormat,
) -> Result<(), CliError> {
    if to_level == 0 || to_level > config.max_level {
        return Err(CliError::Argument(format!(
            "--to-level must be between 1 and {}",
            config.max_level
        )));
    }

    let rows: Vec<LevelRow> = progression_table(base, base_cost, config)
        .take_while(|&(level, _, _)| level <= to_level)
        .map(|(level, stats, cost)| LevelRow { level, stats, cost })
        .collect();

    match format {
        OutputFormat::Text => print!("{}", format_levels_text(&rows)),
        OutputFormat::Json => print_json(&rows)?,
    }
    Ok(())
}

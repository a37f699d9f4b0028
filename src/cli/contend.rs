//! Contend command implementation.
//!
//! Opens one game, then for each round moves the clock past the turn window
//! and fires every caller's `advance_turn` at once on a rayon pool. A correct
//! gate admits exactly one advance per round.

use super::output::{ContendReport, format_contend_text};
use super::{CliError, OutputFormat, print_json};
use chrono::Utc;
use quizgrid::clock::ManualClock;
use quizgrid::grid::GameSetup;
use quizgrid::notify::NotificationLog;
use quizgrid::{Arena, ArenaConfig, Caller};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

/// Per-thread tally.
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    advances: u64,
    holds: u64,
    errors: u64,
}

impl Tally {
    fn merge(self, other: Self) -> Self {
        Self {
            advances: self.advances + other.advances,
            holds: self.holds + other.holds,
            errors: self.errors + other.errors,
        }
    }
}

/// Execute the contend command.
///
/// # Errors
///
/// Returns an error if the arena cannot be set up or the thread pool fails.
pub(crate) fn execute(
    config: ArenaConfig,
    callers: usize,
    rounds: u32,
    participants: u32,
    threads: Option<usize>,
    format: OutputFormat,
) -> Result<(), CliError> {
    if participants == 0 {
        return Err(CliError::Argument("--participants must be at least 1".into()));
    }

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let arena = Arena::new(config, clock.clone(), Arc::new(NotificationLog::new()));
    let admin = Caller::admin(0);

    let rosters = (1..=participants)
        .map(|i| arena.add_roster(&admin, &format!("Roster {i}"), None, 0))
        .collect::<Result<Vec<_>, _>>()?;
    let game = arena.create_game(
        &admin,
        GameSetup {
            name: "Contention".into(),
            thumbnail: String::new(),
            rows: 1,
            columns: 1,
            participants: rosters,
        },
    )?;

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    let pool = builder.build()?;

    let start = Instant::now();
    let mut total = Tally::default();
    for _ in 0..rounds {
        clock.advance_secs(i64::from(arena.config().turn_duration_secs));
        let round = pool.install(|| {
            (0..callers)
                .into_par_iter()
                .fold(Tally::default, |mut tally, _| {
                    match arena.advance_turn(game) {
                        Ok(outcome) if outcome.advanced => tally.advances += 1,
                        Ok(_) => tally.holds += 1,
                        Err(_) => tally.errors += 1,
                    }
                    tally
                })
                .reduce(Tally::default, Tally::merge)
        });
        total = total.merge(round);
    }

    let report = ContendReport {
        rounds,
        callers,
        advances: total.advances,
        holds: total.holds,
        errors: total.errors,
        final_turn_index: arena.game(game)?.game.current_turn_index,
        duration_ms: start.elapsed().as_millis(),
    };

    match format {
        OutputFormat::Text => print!("{}", format_contend_text(&report)),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(())
}

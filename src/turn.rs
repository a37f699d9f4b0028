//! Turn scheduling.
//!
//! Any viewer may ask to advance the turn once the window runs out, so many
//! requests arrive at nearly the same moment. The advance runs inside the
//! store's exclusive transaction and only acts once `advance_threshold` of the
//! window has elapsed, which makes every request after the first one in a
//! window a no-op.

use crate::config::ArenaConfig;
use crate::error::{EngineError, EngineResult};
use crate::grid::GameId;
use crate::ledger::RosterId;
use crate::store::Tables;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

/// Why an advance request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnHold {
    /// The window has not run long enough.
    TooEarly,
    /// A battle is holding the game.
    Paused,
}

/// Result of an advance or set request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    /// Game concerned.
    pub game: GameId,
    /// Whether the turn moved.
    pub advanced: bool,
    /// Turn index after the request.
    pub turn_index: usize,
    /// Roster whose turn it is after the request.
    pub roster: Option<RosterId>,
    /// Seconds elapsed in the window at request time.
    pub elapsed_secs: f64,
    /// Seconds that must elapse before an advance is admitted.
    pub required_secs: f64,
    /// Reason for a no-op.
    pub hold: Option<TurnHold>,
}

#[allow(clippy::cast_precision_loss)]
fn elapsed_secs(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    start.map_or(f64::INFINITY, |start| {
        now.signed_duration_since(start).num_milliseconds() as f64 / 1000.0
    })
}

/// Move to the next participant if the current window has run out.
///
/// # Errors
///
/// Returns `NotFound` for an unknown game or one with no participants.
pub fn advance_turn(
    tables: &mut Tables,
    game_id: GameId,
    now: DateTime<Utc>,
    config: &ArenaConfig,
) -> EngineResult<TurnOutcome> {
    let game = tables.game_mut(game_id)?;
    if game.participants.is_empty() {
        return Err(EngineError::NotFound(format!("participants of game {game_id}")));
    }

    let elapsed = elapsed_secs(game.turn_start_time, now);
    let required = config.required_elapsed_secs(game.turn_duration_secs);
    let mut outcome = TurnOutcome {
        game: game_id,
        advanced: false,
        turn_index: game.current_turn_index,
        roster: game.current_roster(),
        elapsed_secs: elapsed,
        required_secs: required,
        hold: None,
    };

    if game.is_paused() {
        debug!(game = game_id, battle = ?game.battle_id, "turn held by battle");
        outcome.hold = Some(TurnHold::Paused);
        return Ok(outcome);
    }
    if elapsed < required {
        debug!(game = game_id, elapsed, required, "turn not ready to advance");
        outcome.hold = Some(TurnHold::TooEarly);
        return Ok(outcome);
    }

    game.current_turn_index = (game.current_turn_index + 1) % game.participants.len();
    game.turn_start_time = Some(now);
    outcome.advanced = true;
    outcome.turn_index = game.current_turn_index;
    outcome.roster = game.current_roster();
    info!(game = game_id, turn = outcome.turn_index, "turn advanced");
    Ok(outcome)
}

/// Give the turn to `roster` immediately and restart the window.
///
/// # Errors
///
/// Returns `NotFound` for an unknown game or a roster that is not playing.
pub fn set_turn(
    tables: &mut Tables,
    game_id: GameId,
    roster: RosterId,
    now: DateTime<Utc>,
    config: &ArenaConfig,
) -> EngineResult<TurnOutcome> {
    let game = tables.game_mut(game_id)?;
    let position = game
        .position_of(roster)
        .ok_or_else(|| EngineError::NotFound(format!("roster {roster} in game {game_id}")))?;

    let elapsed = elapsed_secs(game.turn_start_time, now);
    game.current_turn_index = position;
    game.turn_start_time = Some(now);
    info!(game = game_id, turn = position, roster, "turn set");
    Ok(TurnOutcome {
        game: game_id,
        advanced: true,
        turn_index: position,
        roster: Some(roster),
        elapsed_secs: elapsed,
        required_secs: config.required_elapsed_secs(game.turn_duration_secs),
        hold: None,
    })
}

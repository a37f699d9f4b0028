//! Arena configuration.
//!
//! Every field has a default matching the classroom deployment, so a config
//! file only needs to name the values it overrides.

use crate::grid::MAX_LABELED_ROWS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Tunable constants for turns, progression and battle penalties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Length of one turn window in seconds.
    pub turn_duration_secs: u32,
    /// Fraction of the turn window that must elapse before `advance_turn` acts.
    ///
    /// 0.9 absorbs clock skew between the client that renders "time's up" and
    /// the server clock.
    pub advance_threshold: f64,
    /// Largest allowed row or column count for a new board.
    pub max_board_dimension: u16,
    /// Experience needed per level for newly created units.
    pub xp_required: u32,
    /// Stat points gained per level above 1.
    pub points_per_level: u32,
    /// Ceiling on the total stat gain above base.
    pub stat_gain_cap: u32,
    /// Highest reachable level.
    pub max_level: u32,
    /// Flat health/stamina penalty for wrong answers.
    pub miss_penalty: u32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            turn_duration_secs: 20,
            advance_threshold: 0.9,
            max_board_dimension: 100,
            xp_required: 100,
            points_per_level: 30,
            stat_gain_cap: 3000,
            max_level: 100,
            miss_penalty: 25,
        }
    }
}

/// Errors loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    /// The file is not valid JSON for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ArenaConfig {
    /// Load a configuration from a JSON file and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.turn_duration_secs == 0 {
            return Err(ConfigError::Invalid("turn_duration_secs must be positive".into()));
        }
        if !(self.advance_threshold > 0.0 && self.advance_threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "advance_threshold must be in (0, 1], got {}",
                self.advance_threshold
            )));
        }
        if self.max_board_dimension == 0 || self.max_board_dimension > MAX_LABELED_ROWS {
            return Err(ConfigError::Invalid(format!(
                "max_board_dimension must be in 1..={MAX_LABELED_ROWS}, got {}",
                self.max_board_dimension
            )));
        }
        if self.xp_required == 0 {
            return Err(ConfigError::Invalid("xp_required must be positive".into()));
        }
        if self.max_level == 0 {
            return Err(ConfigError::Invalid("max_level must be at least 1".into()));
        }
        Ok(())
    }

    /// Stat points above base for a unit at `level`.
    ///
    /// Linear growth of `points_per_level` per level, capped at `stat_gain_cap`.
    #[must_use]
    pub fn stat_bonus(&self, level: u32) -> u32 {
        self.points_per_level
            .saturating_mul(level.saturating_sub(1))
            .min(self.stat_gain_cap)
    }

    /// Seconds that must elapse in a window of `duration_secs` before advancing.
    #[must_use]
    pub fn required_elapsed_secs(&self, duration_secs: u32) -> f64 {
        f64::from(duration_secs) * self.advance_threshold
    }
}

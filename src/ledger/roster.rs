//! Rosters: a player's kingdom and coin balance.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Authenticated user identifier.
pub type UserId = u64;

/// Roster (player kingdom) identifier.
pub type RosterId = u64;

/// A player's collection of units and coin balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    /// Unique identifier.
    pub id: RosterId,
    /// Display name, used in access-request notifications.
    pub name: String,
    /// User who controls this roster, if any.
    pub owner: Option<UserId>,
    /// Coin balance.
    pub coins: u32,
}

impl Roster {
    /// Create a roster.
    #[must_use]
    pub fn new(id: RosterId, name: impl Into<String>, owner: Option<UserId>, coins: u32) -> Self {
        Self {
            id,
            name: name.into(),
            owner,
            coins,
        }
    }

    /// Deduct `cost` coins, returning the new balance.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` without touching the balance if it is short.
    pub fn debit(&mut self, cost: u32) -> EngineResult<u32> {
        let remaining = self
            .coins
            .checked_sub(cost)
            .ok_or(EngineError::InsufficientFunds {
                cost,
                balance: self.coins,
            })?;
        self.coins = remaining;
        Ok(remaining)
    }
}

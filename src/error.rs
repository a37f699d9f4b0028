//! Error types for the engine.

use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// `Unauthorized` and `Forbidden` are never retried. The business rejections
/// (`PreconditionFailed`, `InsufficientFunds`, `LockedByOther`) are expected in
/// normal play and are reported to callers as structured failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// No caller identity, or an invalid one.
    #[error("unauthorized")]
    Unauthorized,
    /// Valid caller without the required relationship or role.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// A referenced game, cell, battle, question, roster or asset is absent.
    #[error("{0} not found")]
    NotFound(String),
    /// Malformed input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// A business rule rejected the request (cell occupied, battle finished, ...).
    #[error("{0}")]
    PreconditionFailed(String),
    /// The buyer cannot afford the asset.
    #[error("not enough coins: costs {cost}, balance is {balance}")]
    InsufficientFunds {
        /// Price of the candidate unit.
        cost: u32,
        /// Buyer's balance at the time of the check.
        balance: u32,
    },
    /// Every matching store unit is reserved for another roster.
    #[error("{asset} is locked by another user. Request access to purchase it.")]
    LockedByOther {
        /// Asset name that was requested.
        asset: String,
    },
    /// Persistence failure. The enclosing transaction is discarded.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Shorthand for a `NotFound` naming an entity kind and id.
    #[must_use]
    pub fn missing(kind: &str, id: u64) -> Self {
        Self::NotFound(format!("{kind} {id}"))
    }

    /// Shorthand for a `PreconditionFailed` with the given reason.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::PreconditionFailed(reason.into())
    }

    /// HTTP-style status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::BadRequest(_) => 400,
            Self::PreconditionFailed(_) => 409,
            // Purchase rejections travel as 200 with success=false.
            Self::InsufficientFunds { .. } | Self::LockedByOther { .. } => 200,
            Self::Internal(_) => 500,
        }
    }

    /// Whether this is a routine business-rule rejection rather than a fault.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::PreconditionFailed(_) | Self::InsufficientFunds { .. } | Self::LockedByOther { .. }
        )
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

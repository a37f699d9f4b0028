// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Quizgrid: a classroom quiz-battle game engine.
//!
//! Players own rosters of units, buy more from a shared store, place them on
//! a lettered grid and take turns. Attacks are fought as quiz battles: each
//! side answers a question, and the answers decide the damage.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   api::dispatch  (tagged requests)  │
//! ├─────────────────────────────────────┤
//! │   Arena  (auth, notify, broadcast)  │
//! ├──────────┬──────────┬───────┬───────┤
//! │  ledger  │   grid   │ turn  │battle │
//! ├──────────┴──────────┴───────┴───────┤
//! │   Store  (transactional tables)     │
//! └─────────────────────────────────────┘
//! ```
//!
//! Every mutation runs inside [`store::Store::transact`], so a rejected
//! request leaves no partial writes behind.

pub mod api;
pub mod arena;
pub mod battle;
pub mod broadcast;
pub mod clock;
pub mod config;
pub mod error;
pub mod grid;
pub mod invariants;
pub mod ledger;
pub mod notify;
pub mod store;
pub mod turn;

pub use api::{Request, Response, dispatch};
pub use arena::{Arena, BattleView, Caller, GameView, PurchaseReceipt};
pub use config::ArenaConfig;
pub use error::{EngineError, EngineResult};
pub use invariants::{InvariantViolation, check_invariants};
pub use store::{Store, Tables};

// Re-export key domain types at crate root for convenience
pub use battle::{Battle, BattleId, BattleStatus, Verdict};
pub use grid::{Cell, CellCoord, CellId, Game, GameId};
pub use ledger::{Roster, RosterId, Stats, Unit, UnitId, UnitStatus, UnitTemplate, UserId};
pub use turn::{TurnHold, TurnOutcome};

//! Asset ledger: rosters, units, the store, access reservations and progression.

mod access;
mod progression;
mod purchase;
mod roster;
mod unit;

pub use access::{
    AccessDecision, AccessRequest, RequestId, RequestStatus, decide_access, latest_request,
    request_access,
};
pub use progression::{ExperienceReport, LevelUp, apply_experience, grant_experience, progression_table};
pub use purchase::{Purchase, StoreListing, enroll, purchase, restock, store_listing};
pub use roster::{Roster, RosterId, UserId};
pub use unit::{LegacyUnitRecord, Stats, Unit, UnitId, UnitStatus, UnitTemplate};

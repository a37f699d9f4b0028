//! Access negotiation for locked store units.
//!
//! A store unit may be locked for one roster. Anyone else who wants it files a
//! request; the lock holder approves (the unit becomes purchasable by the
//! requester) or denies (nothing changes). Only the most recent request for an
//! asset is actionable, and no new request is taken while a release is
//! outstanding, so a released unit always names its latest requester.

use crate::error::{EngineError, EngineResult};
use crate::ledger::{RosterId, UnitId};
use crate::store::Tables;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access request identifier.
pub type RequestId = u64;

/// State of an access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Awaiting the lock holder's decision.
    Pending,
    /// Released to the requester.
    Approved,
    /// Refused; locks unchanged.
    Denied,
}

/// The lock holder's answer to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    /// Release the unit to the requester.
    Approve,
    /// Keep the lock as is.
    Deny,
}

/// A request to buy a locked unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    /// Unique identifier; higher is more recent.
    pub id: RequestId,
    /// Requested unit.
    pub asset: UnitId,
    /// Roster asking for access.
    pub requester: RosterId,
    /// Roster holding the lock when the request was filed.
    pub locker: RosterId,
    /// Current state.
    pub status: RequestStatus,
    /// When the request was filed.
    pub requested_at: DateTime<Utc>,
    /// When the lock holder decided.
    pub decided_at: Option<DateTime<Utc>>,
}

/// Most recent request for `asset`.
#[must_use]
pub fn latest_request(tables: &Tables, asset: UnitId) -> Option<&AccessRequest> {
    tables
        .access_requests
        .values()
        .filter(|r| r.asset == asset)
        .max_by_key(|r| r.id)
}

/// File a request for a locked store unit.
///
/// # Errors
///
/// Returns `NotFound` for an unknown asset or roster, and
/// `PreconditionFailed` if the asset is not in the store, not locked,
/// already locked by the asker, or already released to a requester.
pub fn request_access(
    tables: &mut Tables,
    requester: RosterId,
    asset: UnitId,
    now: DateTime<Utc>,
) -> EngineResult<AccessRequest> {
    tables.roster(requester)?;
    let unit = tables.unit(asset)?;
    if !unit.is_in_store() {
        return Err(EngineError::rejected(format!("{} is not in the store", unit.name)));
    }
    let locker = unit
        .locked_by
        .ok_or_else(|| EngineError::rejected("This asset is not locked by anyone"))?;
    if locker == requester {
        return Err(EngineError::rejected("You already hold the lock on this asset"));
    }
    if let Some(released) = unit.unlocked_for {
        return Err(EngineError::rejected(format!(
            "{} has already been released to roster {released}",
            unit.name
        )));
    }

    let id = tables.seq.access_requests.next_id();
    let request = AccessRequest {
        id,
        asset,
        requester,
        locker,
        status: RequestStatus::Pending,
        requested_at: now,
        decided_at: None,
    };
    tables.access_requests.insert(id, request.clone());
    Ok(request)
}

/// Approve or deny the latest request for `asset`.
///
/// # Errors
///
/// Returns `NotFound` for an unknown asset, `Forbidden` if `decider` does not
/// hold the lock, and `PreconditionFailed` unless the latest request is a
/// pending one from `requester`.
pub fn decide_access(
    tables: &mut Tables,
    decider: RosterId,
    asset: UnitId,
    requester: RosterId,
    decision: AccessDecision,
    now: DateTime<Utc>,
) -> EngineResult<AccessRequest> {
    let unit = tables.unit(asset)?;
    if unit.locked_by != Some(decider) {
        return Err(EngineError::Forbidden("You do not own this asset".into()));
    }

    let request_id = match latest_request(tables, asset) {
        Some(r) if r.requester == requester && r.status == RequestStatus::Pending => r.id,
        _ => {
            return Err(EngineError::rejected(format!(
                "no pending request from roster {requester} for this asset"
            )));
        }
    };

    if decision == AccessDecision::Approve {
        tables.unit_mut(asset)?.unlocked_for = Some(requester);
    }

    let request = tables
        .access_requests
        .get_mut(&request_id)
        .ok_or_else(|| EngineError::missing("access request", request_id))?;
    request.status = match decision {
        AccessDecision::Approve => RequestStatus::Approved,
        AccessDecision::Deny => RequestStatus::Denied,
    };
    request.decided_at = Some(now);
    Ok(request.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArenaConfig;
    use crate::ledger::{Unit, UnitStatus, UnitTemplate};

    fn setup() -> Tables {
        let config = ArenaConfig::default();
        let mut tables = Tables::default();
        tables.add_roster("North", Some(10), 100);
        tables.add_roster("South", Some(20), 100);
        tables.add_roster("East", Some(30), 100);
        let template = UnitTemplate {
            name: "Wolf".into(),
            ..UnitTemplate::default()
        };
        let mut unit = Unit::from_template(1, &template, None, UnitStatus::Store, &config);
        unit.locked_by = Some(1);
        tables.units.insert(1, unit);
        tables
    }

    #[test]
    fn test_request_requires_lock() {
        let mut tables = setup();
        tables.unit_mut(1).unwrap().locked_by = None;
        let err = request_access(&mut tables, 2, 1, Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::PreconditionFailed(_)));
        assert!(tables.access_requests.is_empty());
    }

    #[test]
    fn test_request_by_lock_holder_rejected() {
        let mut tables = setup();
        assert!(request_access(&mut tables, 1, 1, Utc::now()).is_err());
    }

    #[test]
    fn test_approve_sets_unlocked_for() {
        let mut tables = setup();
        let request = request_access(&mut tables, 2, 1, Utc::now()).unwrap();
        assert_eq!(request.locker, 1);

        let decided = decide_access(&mut tables, 1, 1, 2, AccessDecision::Approve, Utc::now()).unwrap();
        assert_eq!(decided.status, RequestStatus::Approved);
        assert_eq!(tables.unit(1).unwrap().unlocked_for, Some(2));
        assert_eq!(tables.unit(1).unwrap().locked_by, Some(1));
    }

    #[test]
    fn test_deny_leaves_locks() {
        let mut tables = setup();
        request_access(&mut tables, 2, 1, Utc::now()).unwrap();
        let decided = decide_access(&mut tables, 1, 1, 2, AccessDecision::Deny, Utc::now()).unwrap();
        assert_eq!(decided.status, RequestStatus::Denied);
        assert_eq!(tables.unit(1).unwrap().unlocked_for, None);
    }

    #[test]
    fn test_only_lock_holder_decides() {
        let mut tables = setup();
        request_access(&mut tables, 2, 1, Utc::now()).unwrap();
        let err = decide_access(&mut tables, 3, 1, 2, AccessDecision::Approve, Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[test]
    fn test_only_latest_request_is_actionable() {
        let mut tables = setup();
        request_access(&mut tables, 2, 1, Utc::now()).unwrap();
        request_access(&mut tables, 3, 1, Utc::now()).unwrap();

        assert!(decide_access(&mut tables, 1, 1, 2, AccessDecision::Approve, Utc::now()).is_err());
        decide_access(&mut tables, 1, 1, 3, AccessDecision::Approve, Utc::now()).unwrap();
        assert_eq!(tables.unit(1).unwrap().unlocked_for, Some(3));

        // Already decided.
        assert!(decide_access(&mut tables, 1, 1, 3, AccessDecision::Deny, Utc::now()).is_err());
    }

    #[test]
    fn test_no_request_while_released() {
        let mut tables = setup();
        request_access(&mut tables, 2, 1, Utc::now()).unwrap();
        decide_access(&mut tables, 1, 1, 2, AccessDecision::Approve, Utc::now()).unwrap();

        let err = request_access(&mut tables, 3, 1, Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::PreconditionFailed(_)));
        assert_eq!(tables.access_requests.len(), 1);
        assert_eq!(latest_request(&tables, 1).unwrap().requester, 2);
        assert_eq!(tables.unit(1).unwrap().unlocked_for, Some(2));
    }

    #[test]
    fn test_request_after_denial_allowed() {
        let mut tables = setup();
        request_access(&mut tables, 2, 1, Utc::now()).unwrap();
        decide_access(&mut tables, 1, 1, 2, AccessDecision::Deny, Utc::now()).unwrap();
        let next = request_access(&mut tables, 3, 1, Utc::now()).unwrap();
        assert_eq!(latest_request(&tables, 1).unwrap().id, next.id);
    }
}

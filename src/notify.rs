//! Out-of-band notifications.

use crate::error::{EngineError, EngineResult};
use crate::ledger::UserId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

/// A stored notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Sequence number, starting at 1.
    pub id: u64,
    /// Recipient.
    pub user: UserId,
    /// Title.
    pub title: String,
    /// Body.
    pub message: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Notification collaborator.
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Store a notification for `user`.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the notification could not be stored.
    fn record(&self, user: UserId, title: &str, message: &str, at: DateTime<Utc>) -> EngineResult<()>;
}

/// In-memory notifier.
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored notification, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<Notification> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Notifications for `user`, oldest first.
    #[must_use]
    pub fn for_user(&self, user: UserId) -> Vec<Notification> {
        self.all().into_iter().filter(|n| n.user == user).collect()
    }

    /// Number of stored notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    /// Whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for NotificationLog {
    fn record(&self, user: UserId, title: &str, message: &str, at: DateTime<Utc>) -> EngineResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| EngineError::Internal("notification log poisoned".into()))?;
        let id = entries.len() as u64 + 1;
        entries.push(Notification {
            id,
            user,
            title: title.to_string(),
            message: message.to_string(),
            created_at: at,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_records_per_user() {
        let log = NotificationLog::new();
        assert!(log.is_empty());
        log.record(1, "Hello", "first", Utc::now()).unwrap();
        log.record(2, "Hello", "second", Utc::now()).unwrap();
        log.record(1, "Again", "third", Utc::now()).unwrap();

        assert_eq!(log.len(), 3);
        let mine = log.for_user(1);
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[1].title, "Again");
        assert_eq!(mine[1].id, 3);
    }
}

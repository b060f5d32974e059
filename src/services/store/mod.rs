//! Persistence boundary for meetings.
//!
//! The sync engine only talks to a [`MeetingStore`]. Calls are blocking and
//! are run off the UI thread; errors are classified so the engine can decide
//! between keeping a local edit (retryable) and discarding it (not found).

use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::meeting::Meeting;
use crate::models::timeslot::MeetingId;
use crate::services::database::Database;
use crate::services::meeting::MeetingService;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or the write did not complete
    #[error("{0}")]
    Network(String),
    /// The target meeting no longer exists remotely
    #[error("{0}")]
    NotFound(String),
    /// The store rejected the payload
    #[error("{0}")]
    Validation(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn message(&self) -> &str {
        match self {
            StoreError::Network(msg) | StoreError::NotFound(msg) | StoreError::Validation(msg) => msg,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait MeetingStore: Send + Sync {
    fn create(&self, meeting: &Meeting) -> Result<Meeting, StoreError>;
    fn update(&self, id: &MeetingId, meeting: &Meeting) -> Result<Meeting, StoreError>;
    fn delete(&self, id: &MeetingId) -> Result<(), StoreError>;
    fn list_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Meeting>, StoreError>;
}

/// [`MeetingStore`] backed by the local SQLite database
pub struct SqliteMeetingStore {
    db: Mutex<Database>,
}

impl SqliteMeetingStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Open (creating if needed) the database file and prepare its schema
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let path_str = path
            .to_str()
            .with_context(|| format!("Database path {:?} is not valid UTF-8", path))?;
        let db = Database::new(path_str)?;
        db.initialize_schema()?;
        log::info!("Opened meeting database at {:?}", path);
        Ok(Self::new(db))
    }

    fn with_service<T>(
        &self,
        op: impl FnOnce(&MeetingService<'_>) -> anyhow::Result<T>,
    ) -> Result<T, StoreError> {
        let db = self
            .db
            .lock()
            .map_err(|_| StoreError::Network("database lock poisoned".to_string()))?;
        let service = MeetingService::new(db.connection());
        op(&service).map_err(|e| StoreError::Network(format!("{:#}", e)))
    }
}

fn row_id(id: &MeetingId) -> Result<i64, StoreError> {
    match id {
        MeetingId::Temporary(_) => Err(StoreError::Validation(format!(
            "meeting {} has not been created yet",
            id
        ))),
        MeetingId::Persisted(raw) => raw
            .parse::<i64>()
            .map_err(|_| StoreError::NotFound(format!("meeting {} not found", id))),
    }
}

fn validated(meeting: &Meeting) -> Result<(), StoreError> {
    meeting
        .validate()
        .map_err(|e| StoreError::Validation(e.to_string()))
}

impl MeetingStore for SqliteMeetingStore {
    fn create(&self, meeting: &Meeting) -> Result<Meeting, StoreError> {
        validated(meeting)?;
        self.with_service(|service| service.create(meeting))
    }

    fn update(&self, id: &MeetingId, meeting: &Meeting) -> Result<Meeting, StoreError> {
        validated(meeting)?;
        let row = row_id(id)?;
        self.with_service(|service| service.update(row, meeting))?
            .ok_or_else(|| StoreError::NotFound(format!("meeting {} not found", id)))
    }

    fn delete(&self, id: &MeetingId) -> Result<(), StoreError> {
        let row = row_id(id)?;
        if self.with_service(|service| service.delete(row))? {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("meeting {} not found", id)))
        }
    }

    fn list_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Meeting>, StoreError> {
        self.with_service(|service| service.list_range(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn store() -> SqliteMeetingStore {
        let db = Database::new(":memory:").unwrap();
        db.initialize_schema().unwrap();
        SqliteMeetingStore::new(db)
    }

    fn nine() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_create_swaps_temporary_id() {
        let store = store();
        let meeting = Meeting::new(nine(), nine() + Duration::hours(1)).unwrap();

        let created = store.create(&meeting).unwrap();
        assert!(!created.id.is_temporary());
        assert_eq!(created.time.from, meeting.time.from);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = store();
        let meeting = Meeting::new(nine(), nine() + Duration::hours(1))
            .unwrap()
            .with_id(MeetingId::persisted("41"));

        let err = store.update(&meeting.id, &meeting).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_temporary_id_is_rejected() {
        let store = store();
        let meeting = Meeting::new(nine(), nine() + Duration::hours(1)).unwrap();

        let err = store.update(&meeting.id, &meeting).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_invalid_payload_is_rejected() {
        let store = store();
        let mut meeting = Meeting::new(nine(), nine() + Duration::hours(1)).unwrap();
        meeting.time.to = meeting.time.from;

        assert!(matches!(store.create(&meeting), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_delete_twice_is_not_found() {
        let store = store();
        let created = store
            .create(&Meeting::new(nine(), nine() + Duration::hours(1)).unwrap())
            .unwrap();

        assert_eq!(store.delete(&created.id), Ok(()));
        assert!(store.delete(&created.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meetings.db");
        let store = SqliteMeetingStore::open(&path).unwrap();

        store
            .create(&Meeting::new(nine(), nine() + Duration::hours(1)).unwrap())
            .unwrap();
        assert!(path.exists());
        assert_eq!(store.list_range(nine(), nine() + Duration::days(1)).unwrap().len(), 1);
    }
}

//! Error types for the inventory store and the reservation engine.
//!
//! Contention is modelled as [`StoreError::Busy`] so the engine can retry it;
//! everything else is a fault that is rolled back and propagated.

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::models::{BookingId, EventId};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The exclusive lock (or any lock needed mid-transaction) was not granted
    /// within the busy timeout.
    #[error("store is busy: lock not granted within the busy timeout")]
    Busy,

    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("event {0} disappeared inside an open transaction")]
    MissingEvent(EventId),

    #[error("booking {id} has an unreadable createdAt value {value:?}")]
    InvalidTimestamp { id: BookingId, value: String },
}

impl StoreError {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(
                    failure.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
                ) =>
            {
                Self::Busy
            }
            _ => Self::Sqlite(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("invalid purchase request: {0}")]
    InvalidRequest(&'static str),

    /// Store fault other than contention. The attempt was rolled back before this was returned.
    #[error("unexpected store failure: {0}")]
    Unexpected(#[source] StoreError),

    #[error("purchase task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn busy_and_locked_classify_as_busy() {
        assert!(StoreError::from(failure(rusqlite::ffi::SQLITE_BUSY)).is_busy());
        assert!(StoreError::from(failure(rusqlite::ffi::SQLITE_LOCKED)).is_busy());
    }

    #[test]
    fn other_failures_stay_faults() {
        let err = StoreError::from(failure(rusqlite::ffi::SQLITE_CONSTRAINT));
        assert!(matches!(err, StoreError::Sqlite(_)));
        assert!(!StoreError::from(rusqlite::Error::QueryReturnedNoRows).is_busy());
    }
}

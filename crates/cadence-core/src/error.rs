use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Occurrence end lies before its start. Every generated occurrence
    /// inherits the duration, so this is never recovered from.
    #[error("Invalid range: end {end} is before start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Persisting the generated rows of an event failed after some were written.
    /// Recover by running the whole regeneration again.
    #[error("Partial write for event {event_id}: {written} of {expected} rows persisted")]
    PartialWriteFailure {
        event_id: Uuid,
        written: usize,
        expected: usize,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

impl CoreError {
    /// Builds an `InvalidRange` from instants in any zone.
    pub fn invalid_range<Tz: chrono::TimeZone>(start: &DateTime<Tz>, end: &DateTime<Tz>) -> Self {
        CoreError::InvalidRange {
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
        }
    }
}

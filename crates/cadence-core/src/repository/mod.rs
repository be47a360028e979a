use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{NewEventData, Occurrence};
use crate::regeneration::OccurrenceStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod events;
pub mod inmemory;
pub mod occurrences;

pub use inmemory::InMemoryOccurrenceStore;

/// Event-level operations around the regeneration contract
#[async_trait]
pub trait EventRepository: OccurrenceStore {
    /// First save of an event's schedule: writes its Single occurrence.
    async fn create_event(&self, data: NewEventData) -> Result<Occurrence, CoreError>;
    /// Every row of the event ordered by start.
    async fn find_event_occurrences(&self, event_id: Uuid) -> Result<Vec<Occurrence>, CoreError>;
    /// Rows of any event starting in `[from, to)`, ordered by start then id.
    async fn find_occurrences_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Occurrence>, CoreError>;
    /// Removes every row of the event and returns how many there were.
    async fn delete_event(&self, event_id: Uuid) -> Result<u64, CoreError>;
    /// Distinct event ids whose hex digits start with `prefix` (hyphens ignored).
    async fn find_event_ids_by_prefix(&self, prefix: &str) -> Result<Vec<Uuid>, CoreError>;
}

/// SQLite implementation of the occurrence storage collaborator
pub struct SqliteOccurrenceStore {
    pool: DbPool,
}

impl SqliteOccurrenceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Lowercase hex digits of an id prefix, or `None` if it holds anything else.
pub(crate) fn normalize_id_prefix(prefix: &str) -> Option<String> {
    let digits: String = prefix.chars().filter(|c| *c != '-').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(digits.to_ascii_lowercase())
}

pub(crate) fn validate_new_event(data: &NewEventData) -> Result<Occurrence, CoreError> {
    if data.end_at < data.start_at {
        return Err(CoreError::InvalidRange {
            start: data.start_at,
            end: data.end_at,
        });
    }
    let event_id = data.event_id.unwrap_or_else(Uuid::now_v7);
    Ok(Occurrence::single(event_id, data.start_at, data.end_at, data.all_day))
}

use crate::error::CoreError;
use crate::models::{NewEventData, Occurrence, OccurrenceKind};
use crate::regeneration::OccurrenceStore;
use crate::repository::{normalize_id_prefix, validate_new_event, EventRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Occurrence store kept in process memory. Useful for previews and tests.
#[derive(Debug, Default)]
pub struct InMemoryOccurrenceStore {
    occurrences: Mutex<Vec<Occurrence>>,
}

impl InMemoryOccurrenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> MutexGuard<'_, Vec<Occurrence>> {
        self.occurrences.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of every row of the event, ordered by start then id.
    pub fn occurrences_for_event(&self, event_id: Uuid) -> Vec<Occurrence> {
        let mut rows: Vec<Occurrence> = self
            .rows()
            .iter()
            .filter(|o| o.event_id == event_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.start_at.cmp(&b.start_at).then(a.id.cmp(&b.id)));
        rows
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }
}

#[async_trait]
impl OccurrenceStore for InMemoryOccurrenceStore {
    async fn get_master_or_single(&self, event_id: Uuid) -> Result<Option<Occurrence>, CoreError> {
        Ok(self
            .rows()
            .iter()
            .find(|o| o.event_id == event_id && o.kind.is_base())
            .cloned())
    }

    async fn delete_generated(&self, event_id: Uuid) -> Result<u64, CoreError> {
        let mut rows = self.rows();
        let before = rows.len();
        rows.retain(|o| !(o.event_id == event_id && o.kind == OccurrenceKind::Generated));
        Ok((before - rows.len()) as u64)
    }

    async fn upsert_master(&self, occurrence: &Occurrence) -> Result<(), CoreError> {
        let mut rows = self.rows();
        match rows.iter_mut().find(|o| o.id == occurrence.id) {
            Some(existing) => *existing = occurrence.clone(),
            None => rows.push(occurrence.clone()),
        }
        Ok(())
    }

    async fn insert_generated(&self, occurrence: &Occurrence) -> Result<Uuid, CoreError> {
        let mut rows = self.rows();
        if rows.iter().any(|o| o.id == occurrence.id) {
            return Err(CoreError::InvalidInput(format!("Duplicate occurrence id {}", occurrence.id)));
        }
        rows.push(occurrence.clone());
        Ok(occurrence.id)
    }
}

#[async_trait]
impl EventRepository for InMemoryOccurrenceStore {
    async fn create_event(&self, data: NewEventData) -> Result<Occurrence, CoreError> {
        let occurrence = validate_new_event(&data)?;
        let mut rows = self.rows();
        if rows.iter().any(|o| o.event_id == occurrence.event_id && o.kind.is_base()) {
            return Err(CoreError::InvalidInput(format!(
                "Event {} already has a schedule",
                occurrence.event_id
            )));
        }
        rows.push(occurrence.clone());
        Ok(occurrence)
    }

    async fn find_event_occurrences(&self, event_id: Uuid) -> Result<Vec<Occurrence>, CoreError> {
        Ok(self.occurrences_for_event(event_id))
    }

    async fn find_occurrences_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Occurrence>, CoreError> {
        let mut found: Vec<Occurrence> = self
            .rows()
            .iter()
            .filter(|o| o.start_at >= from && o.start_at < to)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.start_at.cmp(&b.start_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn delete_event(&self, event_id: Uuid) -> Result<u64, CoreError> {
        let mut rows = self.rows();
        let before = rows.len();
        rows.retain(|o| o.event_id != event_id);
        Ok((before - rows.len()) as u64)
    }

    async fn find_event_ids_by_prefix(&self, prefix: &str) -> Result<Vec<Uuid>, CoreError> {
        let Some(digits) = normalize_id_prefix(prefix) else {
            return Ok(Vec::new());
        };
        let mut ids: Vec<Uuid> = self
            .rows()
            .iter()
            .map(|o| o.event_id)
            .filter(|id| id.simple().to_string().starts_with(&digits))
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

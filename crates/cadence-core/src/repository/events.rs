use crate::error::CoreError;
use crate::models::{NewEventData, Occurrence};
use crate::regeneration::OccurrenceStore;
use crate::repository::occurrences::insert_occurrence;
use crate::repository::{normalize_id_prefix, validate_new_event, SqliteOccurrenceStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
impl super::EventRepository for SqliteOccurrenceStore {
    #[tracing::instrument(skip(self))]
    async fn create_event(&self, data: NewEventData) -> Result<Occurrence, CoreError> {
        let occurrence = validate_new_event(&data)?;

        if self.get_master_or_single(occurrence.event_id).await?.is_some() {
            return Err(CoreError::InvalidInput(format!(
                "Event {} already has a schedule",
                occurrence.event_id
            )));
        }

        insert_occurrence(self.pool(), &occurrence).await?;
        Ok(occurrence)
    }

    async fn find_event_occurrences(&self, event_id: Uuid) -> Result<Vec<Occurrence>, CoreError> {
        let occurrences = sqlx::query_as(
            "SELECT * FROM occurrences WHERE event_id = $1 ORDER BY start_at, id",
        )
        .bind(event_id)
        .fetch_all(self.pool())
        .await?;
        Ok(occurrences)
    }

    async fn find_occurrences_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Occurrence>, CoreError> {
        let occurrences = sqlx::query_as(
            r#"SELECT * FROM occurrences
            WHERE start_at >= $1 AND start_at < $2
            ORDER BY start_at, id"#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(self.pool())
        .await?;
        Ok(occurrences)
    }

    async fn delete_event(&self, event_id: Uuid) -> Result<u64, CoreError> {
        let mut tx = self.pool().begin().await?;

        // Generated rows first so the base row is never a dangling master
        let generated = sqlx::query("DELETE FROM occurrences WHERE event_id = $1 AND master_id IS NOT NULL")
            .bind(event_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let base = sqlx::query("DELETE FROM occurrences WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(generated + base)
    }

    async fn find_event_ids_by_prefix(&self, prefix: &str) -> Result<Vec<Uuid>, CoreError> {
        let Some(digits) = normalize_id_prefix(prefix) else {
            return Ok(Vec::new());
        };
        let ids = sqlx::query_scalar(
            "SELECT DISTINCT event_id FROM occurrences WHERE lower(hex(event_id)) LIKE $1 ORDER BY event_id",
        )
        .bind(format!("{}%", digits))
        .fetch_all(self.pool())
        .await?;
        Ok(ids)
    }
}

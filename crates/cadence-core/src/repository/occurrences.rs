use crate::error::CoreError;
use crate::models::{Occurrence, OccurrenceKind};
use crate::regeneration::{OccurrenceStore, RegenerationPlan};
use crate::repository::SqliteOccurrenceStore;
use async_trait::async_trait;
use sqlx::{Executor, Sqlite};
use uuid::Uuid;

const INSERT_OCCURRENCE: &str = r#"INSERT INTO occurrences (id, event_id, start_at, end_at, all_day, kind, master_id, rrule, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#;

const UPSERT_OCCURRENCE: &str = r#"INSERT INTO occurrences (id, event_id, start_at, end_at, all_day, kind, master_id, rrule, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
    ON CONFLICT(id) DO UPDATE SET
        start_at = excluded.start_at,
        end_at = excluded.end_at,
        all_day = excluded.all_day,
        kind = excluded.kind,
        master_id = excluded.master_id,
        rrule = excluded.rrule,
        updated_at = excluded.updated_at"#;

pub(crate) async fn write_occurrence<'c, E>(
    executor: E,
    sql: &'static str,
    occurrence: &Occurrence,
) -> Result<(), CoreError>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query(sql)
        .bind(occurrence.id)
        .bind(occurrence.event_id)
        .bind(occurrence.start_at)
        .bind(occurrence.end_at)
        .bind(occurrence.all_day)
        .bind(occurrence.kind)
        .bind(occurrence.master_id)
        .bind(occurrence.rrule.clone())
        .bind(occurrence.created_at)
        .bind(occurrence.updated_at)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn insert_occurrence<'c, E>(executor: E, occurrence: &Occurrence) -> Result<(), CoreError>
where
    E: Executor<'c, Database = Sqlite>,
{
    write_occurrence(executor, INSERT_OCCURRENCE, occurrence).await
}

fn ensure_kind(occurrence: &Occurrence, base: bool) -> Result<(), CoreError> {
    if occurrence.kind.is_base() != base {
        return Err(CoreError::InvalidInput(format!(
            "Occurrence {} has unexpected kind '{}'",
            occurrence.id, occurrence.kind
        )));
    }
    Ok(())
}

#[async_trait]
impl OccurrenceStore for SqliteOccurrenceStore {
    async fn get_master_or_single(&self, event_id: Uuid) -> Result<Option<Occurrence>, CoreError> {
        let occurrence = sqlx::query_as(
            "SELECT * FROM occurrences WHERE event_id = $1 AND kind IN ('single', 'master')",
        )
        .bind(event_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(occurrence)
    }

    async fn delete_generated(&self, event_id: Uuid) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM occurrences WHERE event_id = $1 AND kind = $2")
            .bind(event_id)
            .bind(OccurrenceKind::Generated)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn upsert_master(&self, occurrence: &Occurrence) -> Result<(), CoreError> {
        ensure_kind(occurrence, true)?;
        write_occurrence(self.pool(), UPSERT_OCCURRENCE, occurrence).await
    }

    async fn insert_generated(&self, occurrence: &Occurrence) -> Result<Uuid, CoreError> {
        ensure_kind(occurrence, false)?;
        insert_occurrence(self.pool(), occurrence).await?;
        Ok(occurrence.id)
    }

    /// Applies the whole replacement in one transaction, so a failure leaves
    /// the previous rows untouched.
    #[tracing::instrument(skip(self, plan), fields(event_id = %plan.event_id(), rows = plan.persisted_count()))]
    async fn apply_plan(&self, plan: &RegenerationPlan) -> Result<usize, CoreError> {
        ensure_kind(&plan.base, true)?;
        for occurrence in &plan.generated {
            ensure_kind(occurrence, false)?;
        }

        let mut tx = self.pool().begin().await?;

        let deleted = sqlx::query("DELETE FROM occurrences WHERE event_id = $1 AND kind = $2")
            .bind(plan.event_id())
            .bind(OccurrenceKind::Generated)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        write_occurrence(&mut *tx, UPSERT_OCCURRENCE, &plan.base).await?;
        for occurrence in &plan.generated {
            insert_occurrence(&mut *tx, occurrence).await?;
        }

        tx.commit().await?;

        tracing::debug!(deleted, "generated occurrences replaced");
        Ok(plan.persisted_count())
    }
}

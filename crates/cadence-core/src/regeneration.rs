//! Keeping an event's generated occurrences consistent with its master rule.
//!
//! Regeneration never patches the existing generated set. The complete
//! desired state (updated base row plus every generated row) is computed in
//! memory first, then handed to the store to replace what is there.
//!
//! The coordinator holds no locks. Two regenerations of the same event
//! running at once can interleave their delete/insert steps, so callers must
//! serialize regeneration per event.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::error::CoreError;
use crate::generator::generate;
use crate::models::{EngineConfig, Occurrence, OccurrenceKind};
use crate::rule::{self, RecurrenceRule};

/// Storage collaborator consumed by [`RegenerationCoordinator`].
///
/// The engine only ever goes through these operations; it never issues
/// queries of its own.
#[async_trait]
pub trait OccurrenceStore: Send + Sync {
    /// The event's Single or Master row, if the event has a schedule.
    async fn get_master_or_single(&self, event_id: Uuid) -> Result<Option<Occurrence>, CoreError>;

    /// Removes every Generated row of the event. Removing none is not an error.
    async fn delete_generated(&self, event_id: Uuid) -> Result<u64, CoreError>;

    /// Writes the base row, inserting it if it does not exist yet.
    async fn upsert_master(&self, occurrence: &Occurrence) -> Result<(), CoreError>;

    async fn insert_generated(&self, occurrence: &Occurrence) -> Result<Uuid, CoreError>;

    /// Replaces the event's stored occurrences with `plan` and returns the
    /// number of rows it now has.
    ///
    /// The default implementation runs the primitives one after another. A
    /// failure after the old generated rows are gone is reported as
    /// [`CoreError::PartialWriteFailure`]. Stores with transactions should
    /// override this to apply the plan atomically.
    async fn apply_plan(&self, plan: &RegenerationPlan) -> Result<usize, CoreError> {
        let event_id = plan.event_id();
        let expected = plan.persisted_count();

        self.delete_generated(event_id).await?;

        let partial = |written: usize, source: CoreError| CoreError::PartialWriteFailure {
            event_id,
            written,
            expected,
            source: Box::new(source),
        };

        self.upsert_master(&plan.base)
            .await
            .map_err(|e| partial(0, e))?;

        for (index, occurrence) in plan.generated.iter().enumerate() {
            self.insert_generated(occurrence)
                .await
                .map_err(|e| partial(index + 1, e))?;
        }

        Ok(expected)
    }
}

/// The complete stored state of one event after regeneration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerationPlan {
    /// The Single or Master row, carrying the first occurrence.
    pub base: Occurrence,
    /// Every derived occurrence after the first, in start order.
    pub generated: Vec<Occurrence>,
}

impl RegenerationPlan {
    pub fn event_id(&self) -> Uuid {
        self.base.event_id
    }

    /// Rows the event will have once the plan is applied.
    pub fn persisted_count(&self) -> usize {
        1 + self.generated.len()
    }
}

/// Orchestrates replacing an event's derived occurrences whenever its master
/// occurrence or rule changes.
pub struct RegenerationCoordinator<S> {
    store: S,
    config: EngineConfig,
    timezone: Tz,
}

impl<S: OccurrenceStore> RegenerationCoordinator<S> {
    /// Fails with `InvalidTimezone` if the configured zone is unknown.
    pub fn new(store: S, config: EngineConfig) -> Result<Self, CoreError> {
        let timezone = config.tz()?;
        Ok(Self {
            store,
            config,
            timezone,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Computes the state `base` should end up in under `rule`, without I/O.
    ///
    /// Without a rule the base becomes a Single row. With one, it becomes the
    /// Master carrying the canonical rule string, and every later occurrence
    /// becomes a Generated row pointing at it. Generation happens in the
    /// configured timezone's wall-clock time.
    pub fn plan(
        &self,
        base: &Occurrence,
        rule: Option<&RecurrenceRule>,
    ) -> Result<RegenerationPlan, CoreError> {
        let now = Utc::now();

        let Some(rule) = rule else {
            let base = Occurrence {
                kind: OccurrenceKind::Single,
                master_id: None,
                rrule: None,
                updated_at: now,
                ..base.clone()
            };
            return Ok(RegenerationPlan {
                base,
                generated: Vec::new(),
            });
        };

        // Generate from the canonical rule so the stored string reproduces the rows.
        let rule = rule.canonical();
        let spans = generate(
            base.start_at.with_timezone(&self.timezone),
            base.end_at.with_timezone(&self.timezone),
            Some(&rule),
            self.config.max_occurrences,
        )?;

        let mut spans = spans.into_iter().map(|span| {
            (span.start.with_timezone(&Utc), span.end.with_timezone(&Utc))
        });

        let (start_at, end_at) = spans.next().unwrap_or((base.start_at, base.end_at));
        let master = Occurrence {
            start_at,
            end_at,
            kind: OccurrenceKind::Master,
            master_id: None,
            rrule: Some(rule::serialize(&rule)),
            updated_at: now,
            ..base.clone()
        };

        let generated = spans
            .map(|(start_at, end_at)| Occurrence {
                id: Uuid::now_v7(),
                event_id: master.event_id,
                start_at,
                end_at,
                all_day: master.all_day,
                kind: OccurrenceKind::Generated,
                master_id: Some(master.id),
                rrule: None,
                created_at: now,
                updated_at: now,
            })
            .collect();

        Ok(RegenerationPlan {
            base: master,
            generated,
        })
    }

    /// Replaces the event's generated occurrences according to `new_rule`.
    ///
    /// An absent, empty or unparseable rule turns the event back into a
    /// single occurrence. Returns how many rows the event has afterwards.
    ///
    /// # Errors
    /// - `NotFound` when the event has no base occurrence yet.
    /// - `InvalidRange` when the base occurrence ends before it starts.
    /// - `PartialWriteFailure` when the store failed midway; retry the whole call.
    #[tracing::instrument(skip(self), fields(timezone = %self.timezone))]
    pub async fn regenerate(&self, event_id: Uuid, new_rule: Option<&str>) -> Result<usize, CoreError> {
        let base = self.load_base(event_id).await?;
        let rule = new_rule
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .and_then(rule::parse);

        self.apply(base, rule.as_ref()).await
    }

    /// Moves the base occurrence and regenerates with the event's current rule.
    #[tracing::instrument(skip(self))]
    pub async fn reschedule(
        &self,
        event_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Result<usize, CoreError> {
        if end_at < start_at {
            return Err(CoreError::InvalidRange {
                start: start_at,
                end: end_at,
            });
        }

        let base = self.load_base(event_id).await?;
        let rule = base.rrule.as_deref().and_then(rule::parse);
        let moved = Occurrence {
            start_at,
            end_at,
            ..base
        };

        self.apply(moved, rule.as_ref()).await
    }

    /// The rule stored on the event's master row, reparsed.
    pub async fn current_rule(&self, event_id: Uuid) -> Result<Option<RecurrenceRule>, CoreError> {
        let base = self.load_base(event_id).await?;
        Ok(base.rrule.as_deref().and_then(rule::parse))
    }

    async fn load_base(&self, event_id: Uuid) -> Result<Occurrence, CoreError> {
        self.store
            .get_master_or_single(event_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("No base occurrence for event {}", event_id)))
    }

    async fn apply(&self, base: Occurrence, rule: Option<&RecurrenceRule>) -> Result<usize, CoreError> {
        let event_id = base.event_id;
        let plan = self.plan(&base, rule)?;
        let count = self.store.apply_plan(&plan).await?;

        tracing::info!(
            %event_id,
            rule = plan.base.rrule.as_deref().unwrap_or("none"),
            persisted = count,
            "occurrences regenerated"
        );
        Ok(count)
    }
}

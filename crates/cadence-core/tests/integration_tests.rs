use async_trait::async_trait;
use cadence_core::db::establish_connection;
use cadence_core::error::CoreError;
use cadence_core::grid::{build_grid, grid_bounds, utc_window};
use cadence_core::models::*;
use cadence_core::regeneration::{OccurrenceStore, RegenerationCoordinator};
use cadence_core::repository::{EventRepository, InMemoryOccurrenceStore, SqliteOccurrenceStore};
use cadence_core::rule::{Frequency, RecurrenceRule};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;
use uuid::Uuid;

/// Helper function to create a test database
async fn setup_test_db() -> (RegenerationCoordinator<SqliteOccurrenceStore>, TempDir) {
    setup_test_db_with(EngineConfig::default()).await
}

async fn setup_test_db_with(config: EngineConfig) -> (RegenerationCoordinator<SqliteOccurrenceStore>, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("Failed to establish test database connection");

    let coordinator = RegenerationCoordinator::new(SqliteOccurrenceStore::new(pool), config)
        .expect("Failed to create coordinator");

    (coordinator, temp_dir)
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// Helper function to create a one-hour event
async fn create_test_event<S: EventRepository>(store: &S, start: DateTime<Utc>) -> Occurrence {
    store
        .create_event(NewEventData {
            event_id: None,
            start_at: start,
            end_at: start + Duration::hours(1),
            all_day: false,
        })
        .await
        .expect("Failed to create test event")
}

#[tokio::test]
async fn test_event_lifecycle() {
    let (coordinator, _temp_dir) = setup_test_db().await;
    let store = coordinator.store();

    let event = create_test_event(store, at(2024, 1, 1, 9, 0)).await;
    assert_eq!(event.kind, OccurrenceKind::Single);

    let stored = store.get_master_or_single(event.event_id).await.unwrap().unwrap();
    assert_eq!(stored.id, event.id);
    assert_eq!(stored.start_at, event.start_at);

    // Attach a rule
    let count = coordinator.regenerate(event.event_id, Some("FREQ=WEEKLY;COUNT=5")).await.unwrap();
    assert_eq!(count, 5);

    let rows = store.find_event_occurrences(event.event_id).await.unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].kind, OccurrenceKind::Master);
    assert_eq!(rows[0].id, event.id);
    assert_eq!(rows[0].rrule.as_deref(), Some("FREQ=WEEKLY;COUNT=5"));
    for (index, row) in rows.iter().enumerate().skip(1) {
        assert_eq!(row.kind, OccurrenceKind::Generated);
        assert_eq!(row.master_id, Some(event.id));
        assert_eq!(row.start_at, event.start_at + Duration::weeks(index as i64));
        assert_eq!(row.end_at - row.start_at, Duration::hours(1));
    }

    // Edit the rule
    let count = coordinator.regenerate(event.event_id, Some("FREQ=DAILY;INTERVAL=3;COUNT=2")).await.unwrap();
    assert_eq!(count, 2);
    let rows = store.find_event_occurrences(event.event_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].start_at, at(2024, 1, 4, 9, 0));

    // Remove the rule
    let count = coordinator.regenerate(event.event_id, None).await.unwrap();
    assert_eq!(count, 1);
    let rows = store.find_event_occurrences(event.event_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, OccurrenceKind::Single);
    assert_eq!(rows[0].rrule, None);

    // Delete
    assert_eq!(store.delete_event(event.event_id).await.unwrap(), 1);
    assert!(store.get_master_or_single(event.event_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_regenerate_is_idempotent() {
    let (coordinator, _temp_dir) = setup_test_db().await;
    let event = create_test_event(coordinator.store(), at(2024, 1, 31, 18, 30)).await;

    let first = coordinator.regenerate(event.event_id, Some("FREQ=MONTHLY;COUNT=6")).await.unwrap();
    let first_rows = coordinator.store().find_event_occurrences(event.event_id).await.unwrap();
    let second = coordinator.regenerate(event.event_id, Some("FREQ=MONTHLY;COUNT=6")).await.unwrap();
    let second_rows = coordinator.store().find_event_occurrences(event.event_id).await.unwrap();

    assert_eq!(first, 6);
    assert_eq!(first, second);
    let first_starts: Vec<_> = first_rows.iter().map(|o| o.start_at).collect();
    let second_starts: Vec<_> = second_rows.iter().map(|o| o.start_at).collect();
    assert_eq!(first_starts, second_starts);

    // Month-end clamping without drift
    assert_eq!(
        first_starts,
        vec![
            at(2024, 1, 31, 18, 30),
            at(2024, 2, 29, 18, 30),
            at(2024, 3, 31, 18, 30),
            at(2024, 4, 30, 18, 30),
            at(2024, 5, 31, 18, 30),
            at(2024, 6, 30, 18, 30),
        ]
    );
}

#[tokio::test]
async fn test_regenerate_caps_unbounded_rules() {
    let (coordinator, _temp_dir) = setup_test_db_with(EngineConfig {
        max_occurrences: 25,
        ..Default::default()
    })
    .await;
    let event = create_test_event(coordinator.store(), at(2024, 1, 1, 9, 0)).await;

    let count = coordinator.regenerate(event.event_id, Some("FREQ=DAILY")).await.unwrap();
    assert_eq!(count, 25);
    assert_eq!(coordinator.store().find_event_occurrences(event.event_id).await.unwrap().len(), 25);
}

#[tokio::test]
async fn test_regenerate_until_is_inclusive() {
    let (coordinator, _temp_dir) = setup_test_db().await;
    let event = create_test_event(coordinator.store(), at(2024, 3, 1, 9, 0)).await;

    let count = coordinator
        .regenerate(event.event_id, Some("FREQ=DAILY;UNTIL=20240305T090000Z"))
        .await
        .unwrap();
    assert_eq!(count, 5);
}

#[tokio::test]
async fn test_regenerate_in_local_timezone_across_dst() {
    let (coordinator, _temp_dir) = setup_test_db_with(EngineConfig {
        timezone: "America/New_York".to_string(),
        ..Default::default()
    })
    .await;
    // 09:00 EST
    let event = create_test_event(coordinator.store(), at(2024, 3, 8, 14, 0)).await;

    coordinator.regenerate(event.event_id, Some("FREQ=DAILY;COUNT=4")).await.unwrap();
    let starts: Vec<_> = coordinator
        .store()
        .find_event_occurrences(event.event_id)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.start_at)
        .collect();

    // 09:00 EDT from 2024-03-10 onwards
    assert_eq!(
        starts,
        vec![at(2024, 3, 8, 14, 0), at(2024, 3, 9, 14, 0), at(2024, 3, 10, 13, 0), at(2024, 3, 11, 13, 0)]
    );
}

#[tokio::test]
async fn test_biweekly_shorthand() {
    let (coordinator, _temp_dir) = setup_test_db().await;
    let event = create_test_event(coordinator.store(), at(2024, 1, 1, 9, 0)).await;

    coordinator.regenerate(event.event_id, Some("FREQ=BIWEEKLY;COUNT=3")).await.unwrap();
    let rows = coordinator.store().find_event_occurrences(event.event_id).await.unwrap();
    assert_eq!(rows[0].rrule.as_deref(), Some("FREQ=WEEKLY;INTERVAL=2;COUNT=3"));
    assert_eq!(rows[2].start_at, at(2024, 1, 29, 9, 0));

    // The stored canonical rule reproduces the same rows
    let again = coordinator.regenerate(event.event_id, rows[0].rrule.as_deref()).await.unwrap();
    assert_eq!(again, 3);
    let rerun = coordinator.store().find_event_occurrences(event.event_id).await.unwrap();
    assert_eq!(rerun[2].start_at, rows[2].start_at);
}

#[tokio::test]
async fn test_regenerate_unknown_event() {
    let (coordinator, _temp_dir) = setup_test_db().await;
    let result = coordinator.regenerate(Uuid::now_v7(), Some("FREQ=DAILY")).await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));

    let result = coordinator.reschedule(Uuid::now_v7(), at(2024, 1, 1, 9, 0), at(2024, 1, 1, 10, 0)).await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_reschedule_master() {
    let (coordinator, _temp_dir) = setup_test_db().await;
    let event = create_test_event(coordinator.store(), at(2024, 1, 1, 9, 0)).await;
    coordinator.regenerate(event.event_id, Some("FREQ=DAILY;COUNT=3")).await.unwrap();

    let count = coordinator
        .reschedule(event.event_id, at(2024, 2, 1, 15, 0), at(2024, 2, 1, 17, 0))
        .await
        .unwrap();
    assert_eq!(count, 3);

    let rows = coordinator.store().find_event_occurrences(event.event_id).await.unwrap();
    assert_eq!(rows[0].id, event.id);
    assert_eq!(rows[0].start_at, at(2024, 2, 1, 15, 0));
    assert_eq!(rows[2].start_at, at(2024, 2, 3, 15, 0));
    assert_eq!(rows[2].end_at, at(2024, 2, 3, 17, 0));

    let rule = coordinator.current_rule(event.event_id).await.unwrap();
    assert_eq!(rule, Some(RecurrenceRule::new(Frequency::Daily).with_count(3)));
}

#[tokio::test]
async fn test_create_event_validation() {
    let (coordinator, _temp_dir) = setup_test_db().await;
    let store = coordinator.store();

    let start = at(2024, 1, 1, 9, 0);
    let inverted = store
        .create_event(NewEventData {
            event_id: None,
            start_at: start,
            end_at: start - Duration::hours(1),
            all_day: false,
        })
        .await;
    assert!(matches!(inverted, Err(CoreError::InvalidRange { .. })));

    let event = create_test_event(store, start).await;
    let duplicate = store
        .create_event(NewEventData {
            event_id: Some(event.event_id),
            start_at: start,
            end_at: start,
            all_day: true,
        })
        .await;
    assert!(matches!(duplicate, Err(CoreError::InvalidInput(_))));
}

#[tokio::test]
async fn test_sqlite_apply_plan_is_atomic() {
    let (coordinator, _temp_dir) = setup_test_db().await;
    let event = create_test_event(coordinator.store(), at(2024, 1, 1, 9, 0)).await;
    coordinator.regenerate(event.event_id, Some("FREQ=DAILY;COUNT=3")).await.unwrap();
    let before = coordinator.store().find_event_occurrences(event.event_id).await.unwrap();

    let base = coordinator.store().get_master_or_single(event.event_id).await.unwrap().unwrap();
    let rule = RecurrenceRule::new(Frequency::Weekly).with_count(4);
    let mut plan = coordinator.plan(&base, Some(&rule)).unwrap();
    // A duplicate primary key makes the last insert fail
    plan.generated[2].id = plan.generated[0].id;

    assert!(coordinator.store().apply_plan(&plan).await.is_err());

    let after = coordinator.store().find_event_occurrences(event.event_id).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_month_grid_from_stored_occurrences() {
    let (coordinator, _temp_dir) = setup_test_db_with(EngineConfig {
        timezone: "America/Los_Angeles".to_string(),
        ..Default::default()
    })
    .await;
    let tz = coordinator.config().tz().unwrap();

    // 23:30 local on 2024-06-01 is 06:30 UTC on 2024-06-02
    let event = create_test_event(coordinator.store(), at(2024, 6, 2, 6, 30)).await;
    coordinator.regenerate(event.event_id, Some("FREQ=WEEKLY;COUNT=10")).await.unwrap();
    let other = create_test_event(coordinator.store(), at(2024, 6, 15, 17, 0)).await;

    let anchor = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let (first, last) = grid_bounds(anchor, 0);
    let (from, to) = utc_window(first, last, &tz);
    let occurrences = coordinator.store().find_occurrences_between(from, to).await.unwrap();
    // June grid with a Sunday start runs from 2024-05-26 to 2024-07-06
    assert_eq!(first, NaiveDate::from_ymd_opt(2024, 5, 26).unwrap());
    assert_eq!(last, NaiveDate::from_ymd_opt(2024, 7, 6).unwrap());
    assert_eq!(occurrences.len(), 7);

    let cells = build_grid(anchor, 0, &occurrences, &tz);
    assert_eq!(cells.len(), 42);

    let day = |d: NaiveDate| cells.iter().find(|c| c.date == d).unwrap();
    let june_1 = day(anchor);
    assert_eq!(june_1.events.len(), 1);
    assert_eq!(june_1.events[0].id, event.id);
    assert!(day(NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()).events.is_empty());

    let june_15 = day(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
    assert_eq!(june_15.events.len(), 2);
    let ids: Vec<Uuid> = june_15.events.iter().map(|o| o.event_id).collect();
    assert!(ids.contains(&other.event_id));

    let july_6 = day(NaiveDate::from_ymd_opt(2024, 7, 6).unwrap());
    assert!(!july_6.is_in_current_period);
    assert_eq!(july_6.events.len(), 1);
}

#[tokio::test]
async fn test_delete_event_removes_generated_rows() {
    let (coordinator, _temp_dir) = setup_test_db().await;
    let event = create_test_event(coordinator.store(), at(2024, 1, 1, 9, 0)).await;
    let keep = create_test_event(coordinator.store(), at(2024, 1, 2, 9, 0)).await;
    coordinator.regenerate(event.event_id, Some("FREQ=DAILY;COUNT=4")).await.unwrap();

    assert_eq!(coordinator.store().delete_event(event.event_id).await.unwrap(), 4);
    assert!(coordinator.store().find_event_occurrences(event.event_id).await.unwrap().is_empty());
    assert_eq!(coordinator.store().find_event_occurrences(keep.event_id).await.unwrap().len(), 1);
    assert_eq!(coordinator.store().delete_event(event.event_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_find_event_ids_by_prefix() {
    let (coordinator, _temp_dir) = setup_test_db().await;
    let event = create_test_event(coordinator.store(), at(2024, 1, 1, 9, 0)).await;
    coordinator.regenerate(event.event_id, Some("FREQ=DAILY;COUNT=3")).await.unwrap();
    let full = event.event_id.to_string();

    let found = coordinator.store().find_event_ids_by_prefix(&full).await.unwrap();
    assert_eq!(found, vec![event.event_id]);

    let found = coordinator.store().find_event_ids_by_prefix(&full[..18]).await.unwrap();
    assert_eq!(found, vec![event.event_id]);

    assert!(coordinator.store().find_event_ids_by_prefix("not-hex").await.unwrap().is_empty());
    assert!(coordinator.store().find_event_ids_by_prefix("_").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_in_memory_database_url() {
    let pool = establish_connection("sqlite::memory:").await.unwrap();
    let coordinator = RegenerationCoordinator::new(SqliteOccurrenceStore::new(pool), EngineConfig::default()).unwrap();
    let event = create_test_event(coordinator.store(), at(2024, 1, 1, 9, 0)).await;
    assert_eq!(coordinator.regenerate(event.event_id, Some("FREQ=YEARLY;COUNT=3")).await.unwrap(), 3);
}

/// Store that starts failing generated inserts after a number of successes.
struct FlakyStore {
    inner: InMemoryOccurrenceStore,
    inserts_before_failure: AtomicUsize,
    failing: AtomicBool,
}

impl FlakyStore {
    fn failing_after(inserts: usize) -> Self {
        Self {
            inner: InMemoryOccurrenceStore::new(),
            inserts_before_failure: AtomicUsize::new(inserts),
            failing: AtomicBool::new(true),
        }
    }

    fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl OccurrenceStore for FlakyStore {
    async fn get_master_or_single(&self, event_id: Uuid) -> Result<Option<Occurrence>, CoreError> {
        self.inner.get_master_or_single(event_id).await
    }

    async fn delete_generated(&self, event_id: Uuid) -> Result<u64, CoreError> {
        self.inner.delete_generated(event_id).await
    }

    async fn upsert_master(&self, occurrence: &Occurrence) -> Result<(), CoreError> {
        self.inner.upsert_master(occurrence).await
    }

    async fn insert_generated(&self, occurrence: &Occurrence) -> Result<Uuid, CoreError> {
        if self.failing.load(Ordering::SeqCst) {
            let remaining = self.inserts_before_failure.load(Ordering::SeqCst);
            if remaining == 0 {
                return Err(CoreError::InvalidInput("disk full".to_string()));
            }
            self.inserts_before_failure.store(remaining - 1, Ordering::SeqCst);
        }
        self.inner.insert_generated(occurrence).await
    }
}

#[tokio::test]
async fn test_partial_write_failure_and_retry() {
    let coordinator = RegenerationCoordinator::new(FlakyStore::failing_after(2), EngineConfig::default()).unwrap();
    let event = create_test_event(&coordinator.store().inner, at(2024, 1, 1, 9, 0)).await;

    let result = coordinator.regenerate(event.event_id, Some("FREQ=DAILY;COUNT=5")).await;
    match result {
        Err(CoreError::PartialWriteFailure {
            event_id,
            written,
            expected,
            source,
        }) => {
            assert_eq!(event_id, event.event_id);
            assert_eq!(written, 3);
            assert_eq!(expected, 5);
            assert!(matches!(*source, CoreError::InvalidInput(_)));
        }
        other => panic!("expected a partial write failure, got {:?}", other),
    }
    assert_eq!(coordinator.store().inner.occurrences_for_event(event.event_id).len(), 3);

    coordinator.store().recover();
    let count = coordinator.regenerate(event.event_id, Some("FREQ=DAILY;COUNT=5")).await.unwrap();
    assert_eq!(count, 5);

    let rows = coordinator.store().inner.occurrences_for_event(event.event_id);
    assert_eq!(rows.len(), 5);
    assert_eq!(rows.iter().filter(|o| o.kind == OccurrenceKind::Master).count(), 1);
}

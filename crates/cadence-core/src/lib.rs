//! # Cadence Core Library
//!
//! Recurrence expansion and occurrence bookkeeping for calendar events.
//!
//! ## Features
//!
//! - **Recurrence Rules**: A small RRULE dialect (`FREQ`, `INTERVAL`, `COUNT`,
//!   `UNTIL`) with a canonical string form
//! - **Occurrence Generation**: Wall-clock expansion in any IANA timezone,
//!   with month-end clamping and DST gap handling
//! - **Regeneration**: Derived occurrences are recomputed as a whole and
//!   replace the stored set whenever the master or its rule changes
//! - **Calendar Grids**: Week-aligned month and week views with occurrences
//!   bucketed by local date
//!
//! ## Core Modules
//!
//! - [`rule`]: Rule model, parser and serializer
//! - [`generator`]: Occurrence generation
//! - [`regeneration`]: Store contract and regeneration coordinator
//! - [`grid`]: Calendar grid building
//! - [`models`]: Occurrence rows, grid cells and engine configuration
//! - [`repository`]: SQLite and in-memory occurrence stores
//! - [`db`]: Database connection and migration management
//! - [`timezone`]: Timezone utilities and validation
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cadence_core::{
//!     db, error::CoreError, models::{EngineConfig, NewEventData},
//!     regeneration::RegenerationCoordinator,
//!     repository::{EventRepository, SqliteOccurrenceStore},
//! };
//! use chrono::{Duration, Utc};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CoreError> {
//!     let pool = db::establish_connection("cadence.db").await?;
//!     let coordinator = RegenerationCoordinator::new(
//!         SqliteOccurrenceStore::new(pool),
//!         EngineConfig::default(),
//!     )?;
//!
//!     let start = Utc::now();
//!     let event = coordinator.store().create_event(NewEventData {
//!         event_id: None,
//!         start_at: start,
//!         end_at: start + Duration::hours(1),
//!         all_day: false,
//!     }).await?;
//!
//!     let rows = coordinator.regenerate(event.event_id, Some("FREQ=WEEKLY;COUNT=10")).await?;
//!     println!("Event now has {rows} occurrences");
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod generator;
pub mod grid;
pub mod models;
pub mod regeneration;
pub mod repository;
pub mod rule;
pub mod timezone;

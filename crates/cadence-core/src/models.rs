use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::error::CoreError;
use crate::generator::DEFAULT_MAX_OCCURRENCES;
use crate::timezone;

// ============================================================================
// Occurrences
// ============================================================================

/// Role of an occurrence row within its event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OccurrenceKind {
    /// The only row of a non-recurring event.
    Single,
    /// First occurrence of a recurring event; the only row holding the rule.
    Master,
    /// Derived from the master's rule. Never edited, only replaced wholesale.
    Generated,
}

impl OccurrenceKind {
    /// Single or Master: the row every event has exactly one of.
    pub fn is_base(&self) -> bool {
        matches!(self, OccurrenceKind::Single | OccurrenceKind::Master)
    }
}

impl std::fmt::Display for OccurrenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OccurrenceKind::Single => write!(f, "single"),
            OccurrenceKind::Master => write!(f, "master"),
            OccurrenceKind::Generated => write!(f, "generated"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid occurrence kind: {0}")]
pub struct ParseOccurrenceKindError(String);

impl FromStr for OccurrenceKind {
    type Err = ParseOccurrenceKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(OccurrenceKind::Single),
            "master" => Ok(OccurrenceKind::Master),
            "generated" => Ok(OccurrenceKind::Generated),
            _ => Err(ParseOccurrenceKindError(s.to_string())),
        }
    }
}

/// One concrete date of an event.
///
/// `master_id` is set only on `Generated` rows, `rrule` only on the `Master`
/// row (as the canonical rule string).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Occurrence {
    pub id: Uuid,
    pub event_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
    pub kind: OccurrenceKind,
    pub master_id: Option<Uuid>,
    pub rrule: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Occurrence {
    /// A fresh `Single` row: how every event's schedule starts out.
    pub fn single(event_id: Uuid, start_at: DateTime<Utc>, end_at: DateTime<Utc>, all_day: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            event_id,
            start_at,
            end_at,
            all_day,
            kind: OccurrenceKind::Single,
            master_id: None,
            rrule: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Data for the first save of an event's schedule.
#[derive(Debug, Clone)]
pub struct NewEventData {
    /// Identifier of the owning event; a new one is assigned when absent.
    pub event_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
}

// ============================================================================
// Calendar grid
// ============================================================================

/// One day of a rendered calendar grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarCell<'a> {
    pub date: NaiveDate,
    /// False for the leading/trailing days borrowed from adjacent months.
    pub is_in_current_period: bool,
    /// Occurrences starting on this local date, by start time then id.
    pub events: Vec<&'a Occurrence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    /// 0 = Sunday ... 6 = Saturday.
    pub start_of_week: u8,
    /// Any date inside the period to render.
    pub period_anchor: NaiveDate,
}

impl GridConfig {
    pub fn new(period_anchor: NaiveDate, start_of_week: u8) -> Self {
        Self {
            start_of_week: start_of_week % 7,
            period_anchor,
        }
    }

    /// Builds a config from loosely validated input.
    ///
    /// A month or year that does not form a valid date falls back to `today`.
    /// `start_of_week` wraps into 0..=6.
    pub fn normalized(year: i32, month: u32, start_of_week: i64, today: NaiveDate) -> Self {
        let period_anchor = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_else(|| {
            tracing::debug!(year, month, "invalid period anchor, using today");
            today.with_day(1).unwrap_or(today)
        });
        Self {
            start_of_week: Self::wrap_start_of_week(start_of_week),
            period_anchor,
        }
    }

    /// Maps any integer onto a weekday column, 0..=6.
    pub fn wrap_start_of_week(start_of_week: i64) -> u8 {
        u8::try_from(start_of_week.rem_euclid(7)).unwrap_or(0)
    }
}

// ============================================================================
// Engine configuration
// ============================================================================

/// Settings shared by the generator, coordinator and grid builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard cap on occurrences produced per expansion
    pub max_occurrences: usize,
    /// First column of grids, 0 = Sunday
    pub start_of_week: u8,
    /// IANA zone used for local wall-clock arithmetic and date bucketing
    pub timezone: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
            start_of_week: 0,
            timezone: "UTC".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn tz(&self) -> Result<Tz, CoreError> {
        timezone::parse_timezone(&self.timezone)
    }
}

use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Parse an IANA timezone name
pub fn parse_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone).map_err(|_| CoreError::InvalidTimezone(timezone.to_string()))
}

/// Validate IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<(), CoreError> {
    parse_timezone(timezone).map(|_| ())
}

/// Calendar date of an instant as seen on a wall clock in `tz`.
///
/// Grid bucketing relies on this: truncating the UTC instant instead would
/// put late-evening events west of UTC on the following day.
pub fn local_date<Z: TimeZone>(instant: &DateTime<Utc>, tz: &Z) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Interpret a wall-clock time in `tz`, mapping DST gaps one hour forward
pub fn local_to_utc(local: NaiveDateTime, tz: &Tz) -> Result<DateTime<Utc>, CoreError> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            let shifted = local.checked_add_signed(chrono::Duration::hours(1))?;
            tz.from_local_datetime(&shifted).earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CoreError::InvalidInput(format!("{} does not exist in {}", local, tz)))
}

/// Format datetime with timezone-aware display
pub fn format_with_timezone(datetime: DateTime<Utc>, tz: &Tz, format: &str) -> String {
    datetime.with_timezone(tz).format(format).to_string()
}

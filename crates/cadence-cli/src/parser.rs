use anyhow::{anyhow, Result};
use cadence_core::timezone::local_to_utc;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_english::{parse_date_string, Dialect};
use chrono_tz::Tz;

const LOCAL_DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Parses a user-supplied instant.
///
/// Accepts RFC 3339, `YYYY-MM-DD[ HH:MM]` read as wall-clock time in `tz`,
/// or English phrases such as "tomorrow 9am" relative to `now`.
pub fn parse_when(input: &str, tz: &Tz, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Ok(instant.with_timezone(&Utc));
    }

    for format in LOCAL_DATETIME_FORMATS {
        if let Ok(local) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(local_to_utc(local, tz)?);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(local_to_utc(date.and_time(NaiveTime::MIN), tz)?);
    }

    parse_date_string(input, now.with_timezone(tz), Dialect::Us)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow!("Failed to parse date '{}': {}", input, e))
}

/// Parses a calendar date, either `YYYY-MM-DD` or an English phrase.
pub fn parse_day(input: &str, tz: &Tz, now: DateTime<Utc>) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d") {
        return Ok(date);
    }
    Ok(parse_when(input, tz, now)?.with_timezone(tz).date_naive())
}

//! RRULE-lite: the `FREQ`/`INTERVAL`/`COUNT`/`UNTIL` subset of recurrence strings.
//!
//! Parsing is lenient. A rule without a recognizable `FREQ` is not an error,
//! it is "no recurrence" (`None`), and malformed optional fields are dropped
//! one by one so a scheduling form with partially invalid input keeps working.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const UNTIL_DATE_FORMAT: &str = "%Y%m%d";
const UNTIL_DATETIME_FORMAT: &str = "%Y%m%dT%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }

    fn unit(&self) -> &'static str {
        match self {
            Frequency::Daily => "day",
            Frequency::Weekly => "week",
            Frequency::Monthly => "month",
            Frequency::Yearly => "year",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid frequency: {0}")]
pub struct ParseFrequencyError(String);

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            _ => Err(ParseFrequencyError(s.to_string())),
        }
    }
}

/// How a series terminates. Exactly one bound applies to a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleBound {
    Unbounded,
    /// Total number of occurrences, the first one included. Always >= 1.
    Count(u32),
    /// Last admissible local start time, inclusive.
    Until(NaiveDateTime),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Always >= 1.
    pub interval: u32,
    pub bound: RuleBound,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            bound: RuleBound::Unbounded,
        }
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval.max(1);
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.bound = if count >= 1 {
            RuleBound::Count(count)
        } else {
            RuleBound::Unbounded
        };
        self
    }

    pub fn with_until(mut self, until: NaiveDateTime) -> Self {
        self.bound = RuleBound::Until(until);
        self
    }

    /// See [`parse`].
    pub fn parse(rule: &str) -> Option<Self> {
        parse(rule)
    }

    /// The rule exactly as its canonical string reads back.
    ///
    /// The canonical form stores `UNTIL` as a date only, so an `Until` bound
    /// widens to the end of that day.
    pub fn canonical(&self) -> Self {
        let bound = match self.bound {
            RuleBound::Until(until) => RuleBound::Until(end_of_day(until.date())),
            other => other,
        };
        Self { bound, ..*self }
    }

    /// Short human-readable summary, e.g. "every 2 weeks, 5 times".
    pub fn describe(&self) -> String {
        let mut text = match (self.frequency, self.interval) {
            (Frequency::Daily, 1) => "daily".to_string(),
            (Frequency::Weekly, 1) => "weekly".to_string(),
            (Frequency::Monthly, 1) => "monthly".to_string(),
            (Frequency::Yearly, 1) => "yearly".to_string(),
            (frequency, n) => format!("every {} {}s", n, frequency.unit()),
        };
        match self.bound {
            RuleBound::Unbounded => {}
            RuleBound::Count(1) => text.push_str(", once"),
            RuleBound::Count(n) => text.push_str(&format!(", {} times", n)),
            RuleBound::Until(until) => {
                text.push_str(&format!(" until {}", until.date().format("%Y-%m-%d")))
            }
        }
        text
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.frequency)?;
        if self.interval > 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        match self.bound {
            RuleBound::Unbounded => Ok(()),
            RuleBound::Count(n) => write!(f, ";COUNT={}", n),
            RuleBound::Until(until) => write!(f, ";UNTIL={}", until.format(UNTIL_DATE_FORMAT)),
        }
    }
}

/// Parses an RRULE-lite string.
///
/// Returns `None` ("no recurrence") when `FREQ` is missing or unrecognized.
/// Keys are case-insensitive and unknown keys are ignored. `BIWEEKLY` is
/// accepted as an alias for weekly with a doubled interval. When both
/// `COUNT` and `UNTIL` are valid, `COUNT` wins.
pub fn parse(rule: &str) -> Option<RecurrenceRule> {
    let body = strip_prefix_ignore_case(rule.trim(), "RRULE:");

    let mut frequency = None;
    let mut biweekly = false;
    let mut interval = 1u32;
    let mut count = None;
    let mut until = None;

    for token in body.split(';') {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        let value = value.trim();

        match key.trim().to_uppercase().as_str() {
            "FREQ" => {
                if value.eq_ignore_ascii_case("BIWEEKLY") {
                    frequency = Some(Frequency::Weekly);
                    biweekly = true;
                } else {
                    frequency = value.parse::<Frequency>().ok();
                    biweekly = false;
                }
            }
            "INTERVAL" => {
                interval = match value.parse::<u32>() {
                    Ok(n) if n >= 1 => n,
                    _ => {
                        tracing::debug!(value, "coercing invalid INTERVAL to 1");
                        1
                    }
                };
            }
            "COUNT" => {
                count = match value.parse::<u32>() {
                    Ok(n) if n >= 1 => Some(n),
                    _ => {
                        tracing::debug!(value, "ignoring invalid COUNT");
                        None
                    }
                };
            }
            "UNTIL" => {
                until = parse_until(value);
                if until.is_none() {
                    tracing::debug!(value, "dropping unparseable UNTIL");
                }
            }
            _ => {}
        }
    }

    let Some(frequency) = frequency else {
        tracing::debug!(rule, "no recognizable FREQ, treating as non-recurring");
        return None;
    };

    if biweekly {
        interval = interval.saturating_mul(2);
    }

    let bound = match (count, until) {
        (Some(n), _) => RuleBound::Count(n),
        (None, Some(until)) => RuleBound::Until(until),
        (None, None) => RuleBound::Unbounded,
    };

    Some(RecurrenceRule {
        frequency,
        interval,
        bound,
    })
}

/// Canonical string form: `FREQ=...[;INTERVAL=n][;COUNT=n|;UNTIL=YYYYMMDD]`.
pub fn serialize(rule: &RecurrenceRule) -> String {
    rule.to_string()
}

/// Accepts `YYYYMMDD` or `YYYYMMDDTHHMMSS`, with an optional trailing `Z`.
///
/// The `Z` is discarded and the value read as local wall-clock time. A
/// date-only value covers the whole day.
fn parse_until(value: &str) -> Option<NaiveDateTime> {
    let value = value
        .strip_suffix('Z')
        .or_else(|| value.strip_suffix('z'))
        .unwrap_or(value);

    match value.len() {
        8 => NaiveDate::parse_from_str(value, UNTIL_DATE_FORMAT)
            .ok()
            .map(end_of_day),
        15 => NaiveDateTime::parse_from_str(&value.to_uppercase(), UNTIL_DATETIME_FORMAT).ok(),
        _ => None,
    }
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> &'a str {
    match s.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &s[prefix.len()..],
        _ => s,
    }
}

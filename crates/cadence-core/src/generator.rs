//! Expansion of a recurrence rule into concrete, bounded occurrence spans.
//!
//! Everything here is pure: the same inputs always produce the same spans, and
//! nothing is shared between calls.

use chrono::{DateTime, Days, Duration, Months, NaiveDateTime, TimeZone};

use crate::error::CoreError;
use crate::rule::{Frequency, RecurrenceRule, RuleBound};

/// Upper bound on the number of spans a single expansion produces.
pub const DEFAULT_MAX_OCCURRENCES: usize = 100;

/// A start/end pair for one occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSpan<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl<Tz: TimeZone> TimeSpan<Tz> {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end.clone() - self.start.clone()
    }
}

/// Expands `rule` starting at the `(start, end)` occurrence.
///
/// # Behavior
/// - `end < start` fails with [`CoreError::InvalidRange`].
/// - Without a rule, the result is exactly the input span.
/// - The first span is always the input span. Every following span starts
///   `k * interval` units after `start` in local wall-clock time and keeps the
///   original duration.
/// - Expansion stops at the rule's `COUNT`, at the first start strictly after
///   `UNTIL`, or at `max_occurrences` spans, whichever comes first.
///   A `max_occurrences` of 0 behaves like 1.
///
/// Monthly and yearly steps that land past the end of a shorter month are
/// clamped to its last day. Steps are always taken from `start`, so a clamp
/// never shifts later occurrences (Jan 31, Feb 29, Mar 31, Apr 30, ...).
///
/// A local time that does not exist in `start`'s zone (DST gap) resolves to
/// the earliest valid instant one hour later; an ambiguous one takes the
/// earliest mapping.
pub fn generate<Tz: TimeZone>(
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    rule: Option<&RecurrenceRule>,
    max_occurrences: usize,
) -> Result<Vec<TimeSpan<Tz>>, CoreError> {
    if end < start {
        return Err(CoreError::invalid_range(&start, &end));
    }

    let duration = end.clone() - start.clone();
    let limit = max_occurrences.max(1);
    let mut spans = vec![TimeSpan::new(start.clone(), end)];

    let Some(rule) = rule else {
        return Ok(spans);
    };

    let target = match rule.bound {
        RuleBound::Count(n) => usize::try_from(n).unwrap_or(usize::MAX).min(limit),
        RuleBound::Unbounded | RuleBound::Until(_) => limit,
    };

    let tz = start.timezone();
    let anchor = start.naive_local();
    let mut step: u32 = 0;
    let mut exhausted = false;

    while spans.len() < target {
        step += 1;
        let Some(local) = rule
            .interval
            .checked_mul(step)
            .and_then(|offset| advance(anchor, rule.frequency, offset))
        else {
            exhausted = true;
            break;
        };

        if let RuleBound::Until(until) = rule.bound {
            if local > until {
                exhausted = true;
                break;
            }
        }

        let Some(next_start) = resolve_local(&tz, local) else {
            continue;
        };
        let Some(next_end) = next_start.clone().checked_add_signed(duration) else {
            exhausted = true;
            break;
        };
        spans.push(TimeSpan::new(next_start, next_end));
    }

    if !exhausted && spans.len() == limit {
        match rule.bound {
            RuleBound::Count(n) if usize::try_from(n).map_or(true, |n| n > limit) => {
                tracing::warn!(rule = %rule, limit, "occurrence limit reached before COUNT");
            }
            RuleBound::Until(_) => {
                tracing::warn!(rule = %rule, limit, "occurrence limit reached before UNTIL");
            }
            _ => {}
        }
    }

    Ok(spans)
}

/// Moves a local wall-clock time forward by `interval` units of `frequency`.
///
/// Daily and weekly steps add exact days. Monthly and yearly steps keep the
/// time of day and the day of month, clamping to the last day of a shorter
/// target month. Returns `None` when the result is out of range.
pub fn advance(local: NaiveDateTime, frequency: Frequency, interval: u32) -> Option<NaiveDateTime> {
    match frequency {
        Frequency::Daily => local.checked_add_days(Days::new(u64::from(interval))),
        Frequency::Weekly => local.checked_add_days(Days::new(u64::from(interval) * 7)),
        Frequency::Monthly => local.checked_add_months(Months::new(interval)),
        Frequency::Yearly => local.checked_add_months(Months::new(interval.checked_mul(12)?)),
    }
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&local).earliest().or_else(|| {
        let shifted = local.checked_add_signed(Duration::hours(1))?;
        tz.from_local_datetime(&shifted).earliest()
    })
}

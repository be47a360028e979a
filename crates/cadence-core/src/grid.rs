//! Month and week grids of day cells with occurrences bucketed by local date.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::models::{CalendarCell, GridConfig, Occurrence};
use crate::timezone::local_date;

/// Shape of a month grid: the displayed date range and the month inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MonthLayout {
    first_of_month: NaiveDate,
    last_of_month: NaiveDate,
    grid_start: NaiveDate,
    grid_end: NaiveDate,
    cell_count: usize,
}

impl MonthLayout {
    fn compute(anchor: NaiveDate, start_of_week: u8) -> Option<Self> {
        let first_of_month = anchor.with_day(1)?;
        let days = u64::from(days_in_month(first_of_month));
        let last_of_month = first_of_month.checked_add_days(Days::new(days - 1))?;

        let leading = u64::from(weekday_offset(first_of_month, start_of_week));
        let total = leading + days;
        let trailing = (7 - total % 7) % 7;
        let grid_start = first_of_month.checked_sub_days(Days::new(leading))?;

        Some(Self {
            first_of_month,
            last_of_month,
            grid_start,
            grid_end: grid_start.checked_add_days(Days::new(total + trailing - 1))?,
            cell_count: usize::try_from(total + trailing).ok()?,
        })
    }

    fn contains_month_day(&self, date: NaiveDate) -> bool {
        date >= self.first_of_month && date <= self.last_of_month
    }
}

/// Number of days in the month containing `date`.
pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = date.with_day(1).unwrap_or(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| u32::try_from((next - first).num_days()).ok())
        .unwrap_or(31)
}

/// Days between the week's first column and `date`, 0..=6.
///
/// `start_of_week` uses 0 = Sunday.
pub fn weekday_offset(date: NaiveDate, start_of_week: u8) -> u32 {
    let weekday = date.weekday().num_days_from_sunday();
    (weekday + 7 - u32::from(start_of_week % 7)) % 7
}

/// First and last date shown by the month grid around `period_anchor`.
pub fn grid_bounds(period_anchor: NaiveDate, start_of_week: u8) -> (NaiveDate, NaiveDate) {
    match layout_or_today(period_anchor, start_of_week) {
        Some(layout) => (layout.grid_start, layout.grid_end),
        None => (period_anchor, period_anchor),
    }
}

/// First and last date shown by the week grid around `anchor`.
pub fn week_bounds(anchor: NaiveDate, start_of_week: u8) -> (NaiveDate, NaiveDate) {
    match week_start_or_today(anchor, start_of_week) {
        Some(first) => (first, first.checked_add_days(Days::new(6)).unwrap_or(first)),
        None => (anchor, anchor),
    }
}

/// UTC instants covering whole local days `first..=last` in `tz`.
///
/// Handy for fetching exactly the occurrences a grid can show.
pub fn utc_window<Z: TimeZone>(first: NaiveDate, last: NaiveDate, tz: &Z) -> (DateTime<Utc>, DateTime<Utc>) {
    let day_after = last.checked_add_days(Days::new(1)).unwrap_or(last);
    (local_midnight(first, tz), local_midnight(day_after, tz))
}

/// Builds the month grid for `period_anchor`.
///
/// The grid starts on the `start_of_week` column (0 = Sunday) before the first
/// of the month and ends on the last column after its last day, so its length
/// is always a multiple of 7 (28 to 42 cells). Days outside the month have
/// `is_in_current_period == false`.
///
/// Each occurrence goes into the cell of the local date, in `tz`, of its
/// start. Occurrences outside the grid are dropped. Within a cell, events are
/// ordered by start then id.
pub fn build_grid<'a, Z: TimeZone>(
    period_anchor: NaiveDate,
    start_of_week: u8,
    occurrences: &'a [Occurrence],
    tz: &Z,
) -> Vec<CalendarCell<'a>> {
    let Some(layout) = layout_or_today(period_anchor, start_of_week) else {
        return Vec::new();
    };

    let mut cells: Vec<CalendarCell<'a>> = days_from(layout.grid_start)
        .take(layout.cell_count)
        .map(|date| CalendarCell {
            date,
            is_in_current_period: layout.contains_month_day(date),
            events: Vec::new(),
        })
        .collect();

    bucket(&mut cells, layout.grid_start, occurrences, tz);
    cells
}

/// [`build_grid`] driven by a [`GridConfig`].
pub fn build_grid_for<'a, Z: TimeZone>(
    config: &GridConfig,
    occurrences: &'a [Occurrence],
    tz: &Z,
) -> Vec<CalendarCell<'a>> {
    build_grid(config.period_anchor, config.start_of_week, occurrences, tz)
}

/// Seven cells for the week containing `anchor`, all in the current period.
pub fn build_week<'a, Z: TimeZone>(
    anchor: NaiveDate,
    start_of_week: u8,
    occurrences: &'a [Occurrence],
    tz: &Z,
) -> Vec<CalendarCell<'a>> {
    let Some(week_start) = week_start_or_today(anchor, start_of_week) else {
        return Vec::new();
    };

    let mut cells: Vec<CalendarCell<'a>> = days_from(week_start)
        .take(7)
        .map(|date| CalendarCell {
            date,
            is_in_current_period: true,
            events: Vec::new(),
        })
        .collect();

    bucket(&mut cells, week_start, occurrences, tz);
    cells
}

fn layout_or_today(anchor: NaiveDate, start_of_week: u8) -> Option<MonthLayout> {
    MonthLayout::compute(anchor, start_of_week).or_else(|| {
        tracing::debug!(%anchor, "period anchor out of range, using today");
        MonthLayout::compute(Utc::now().date_naive(), start_of_week)
    })
}

/// First day of the week containing `anchor`, when the whole week is representable.
fn checked_week_start(anchor: NaiveDate, start_of_week: u8) -> Option<NaiveDate> {
    let offset = u64::from(weekday_offset(anchor, start_of_week));
    let first = anchor.checked_sub_days(Days::new(offset))?;
    first.checked_add_days(Days::new(6))?;
    Some(first)
}

fn week_start_or_today(anchor: NaiveDate, start_of_week: u8) -> Option<NaiveDate> {
    checked_week_start(anchor, start_of_week).or_else(|| {
        tracing::debug!(%anchor, "week anchor out of range, using today");
        checked_week_start(Utc::now().date_naive(), start_of_week)
    })
}

/// Consecutive dates from `first`, ending early only at the calendar limit.
fn days_from(first: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(first), |date| date.succ_opt())
}

fn bucket<'a, Z: TimeZone>(
    cells: &mut [CalendarCell<'a>],
    first_day: NaiveDate,
    occurrences: &'a [Occurrence],
    tz: &Z,
) {
    for occurrence in occurrences {
        let date = local_date(&occurrence.start_at, tz);
        let Ok(index) = usize::try_from((date - first_day).num_days()) else {
            continue;
        };
        if let Some(cell) = cells.get_mut(index) {
            cell.events.push(occurrence);
        }
    }

    for cell in cells.iter_mut() {
        cell.events
            .sort_by(|a, b| a.start_at.cmp(&b.start_at).then(a.id.cmp(&b.id)));
    }
}

fn local_midnight<Z: TimeZone>(date: NaiveDate, tz: &Z) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

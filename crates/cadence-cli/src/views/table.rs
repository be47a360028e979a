use cadence_core::generator::TimeSpan;
use cadence_core::models::{CalendarCell, Occurrence, OccurrenceKind};
use cadence_core::timezone::format_with_timezone;
use chrono::NaiveDate;
use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Row, Table};

use crate::util::short_id;

const DATETIME_FORMAT: &str = "%a %Y-%m-%d %H:%M %Z";
const EVENTS_PER_CELL: usize = 3;

pub fn display_occurrences(occurrences: &[Occurrence], tz: &Tz) {
    if occurrences.is_empty() {
        println!("No occurrences found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Start", "End", "Kind", "ID"]);

    for (index, occurrence) in occurrences.iter().enumerate() {
        let mut row = Row::new();
        row.add_cell(Cell::new(index + 1).set_alignment(CellAlignment::Right));
        row.add_cell(Cell::new(format_instant(occurrence, true, tz)));
        row.add_cell(Cell::new(format_instant(occurrence, false, tz)));

        let kind_cell = Cell::new(occurrence.kind.to_string());
        row.add_cell(match occurrence.kind {
            OccurrenceKind::Master => kind_cell.fg(Color::Cyan).add_attribute(Attribute::Bold),
            OccurrenceKind::Generated => kind_cell.fg(Color::DarkGrey),
            OccurrenceKind::Single => kind_cell,
        });
        row.add_cell(Cell::new(short_id(&occurrence.id)));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_spans(spans: &[TimeSpan<Tz>]) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Start", "End", "Duration"]);

    for (index, span) in spans.iter().enumerate() {
        let minutes = span.duration().num_minutes();
        table.add_row(vec![
            Cell::new(index + 1).set_alignment(CellAlignment::Right),
            Cell::new(span.start.format(DATETIME_FORMAT)),
            Cell::new(span.end.format(DATETIME_FORMAT)),
            Cell::new(format!("{}h {:02}m", minutes / 60, minutes % 60)),
        ]);
    }

    println!("{table}");
}

/// Renders grid cells seven to a row, headed by weekday names.
pub fn display_grid(cells: &[CalendarCell<'_>], tz: &Tz, today: NaiveDate) {
    let mut table = Table::new();
    table.set_header(
        cells
            .iter()
            .take(7)
            .map(|cell| Cell::new(cell.date.format("%a")).add_attribute(Attribute::Bold)),
    );

    for week in cells.chunks(7) {
        table.add_row(week.iter().map(|cell| grid_cell(cell, tz, today)));
    }

    println!("{table}");
}

fn grid_cell(cell: &CalendarCell<'_>, tz: &Tz, today: NaiveDate) -> Cell {
    let mut lines = vec![cell.date.format("%d").to_string()];
    for occurrence in cell.events.iter().take(EVENTS_PER_CELL) {
        lines.push(event_label(occurrence, tz));
    }
    if cell.events.len() > EVENTS_PER_CELL {
        lines.push(format!("+{} more", cell.events.len() - EVENTS_PER_CELL));
    }

    let content = Cell::new(lines.join("\n"));
    if cell.date == today {
        content.fg(Color::Yellow).add_attribute(Attribute::Bold)
    } else if !cell.is_in_current_period {
        content.fg(Color::DarkGrey)
    } else {
        content
    }
}

fn event_label(occurrence: &Occurrence, tz: &Tz) -> String {
    let time = if occurrence.all_day {
        "all day".to_string()
    } else {
        occurrence.start_at.with_timezone(tz).format("%H:%M").to_string()
    };
    let marker = if occurrence.kind == OccurrenceKind::Single { "" } else { " ↻" };
    format!("{} {}{}", time, short_id(&occurrence.event_id), marker)
}

fn format_instant(occurrence: &Occurrence, start: bool, tz: &Tz) -> String {
    let instant = if start { occurrence.start_at } else { occurrence.end_at };
    let format = if occurrence.all_day { "%a %Y-%m-%d" } else { DATETIME_FORMAT };
    format_with_timezone(instant, tz, format)
}

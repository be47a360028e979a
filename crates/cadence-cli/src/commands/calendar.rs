use anyhow::Result;
use cadence_core::grid::{build_grid_for, build_week, grid_bounds, utc_window, week_bounds};
use cadence_core::models::{EngineConfig, GridConfig};
use cadence_core::repository::EventRepository;
use chrono::{Datelike, Utc};
use chrono_tz::Tz;
use owo_colors::OwoColorize;

use crate::cli::{MonthCommand, WeekCommand};
use crate::parser::parse_day;
use crate::views::table::display_grid;

pub async fn month_command(
    repo: &impl EventRepository,
    command: MonthCommand,
    engine: &EngineConfig,
    tz: &Tz,
) -> Result<()> {
    let today = Utc::now().with_timezone(tz).date_naive();
    let config = GridConfig::normalized(
        command.year.unwrap_or(today.year()),
        command.month.unwrap_or(today.month()),
        command.week_start.unwrap_or(i64::from(engine.start_of_week)),
        today,
    );

    let (first, last) = grid_bounds(config.period_anchor, config.start_of_week);
    let (from, to) = utc_window(first, last, tz);
    let occurrences = repo.find_occurrences_between(from, to).await?;
    let cells = build_grid_for(&config, &occurrences, tz);

    if command.json {
        println!("{}", serde_json::to_string_pretty(&cells)?);
        return Ok(());
    }

    println!("{}", config.period_anchor.format("%B %Y").bold());
    display_grid(&cells, tz, today);
    Ok(())
}

pub async fn week_command(
    repo: &impl EventRepository,
    command: WeekCommand,
    engine: &EngineConfig,
    tz: &Tz,
) -> Result<()> {
    let now = Utc::now();
    let today = now.with_timezone(tz).date_naive();
    let anchor = match command.date.as_deref() {
        Some(date) => parse_day(date, tz, now)?,
        None => today,
    };
    let config = GridConfig::new(
        anchor,
        GridConfig::wrap_start_of_week(command.week_start.unwrap_or(i64::from(engine.start_of_week))),
    );

    let (first, last) = week_bounds(config.period_anchor, config.start_of_week);
    let (from, to) = utc_window(first, last, tz);
    let occurrences = repo.find_occurrences_between(from, to).await?;
    let cells = build_week(config.period_anchor, config.start_of_week, &occurrences, tz);

    if command.json {
        println!("{}", serde_json::to_string_pretty(&cells)?);
        return Ok(());
    }

    println!("{}", format!("Week of {}", first.format("%a %Y-%m-%d")).bold());
    display_grid(&cells, tz, today);
    Ok(())
}

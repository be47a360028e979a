use anyhow::Result;
use cadence_core::generator::generate;
use cadence_core::models::EngineConfig;
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use owo_colors::OwoColorize;

use crate::cli::PreviewCommand;
use crate::parser::parse_when;
use crate::util::parse_rule;
use crate::views::table::display_spans;

pub fn preview_rule(command: PreviewCommand, engine: &EngineConfig, tz: &Tz) -> Result<()> {
    let now = Utc::now();
    let rule = parse_rule(&command.rule)?.canonical();
    let start_at = parse_when(&command.start, tz, now)?;
    let end_at = match command.end.as_deref() {
        Some(end) => parse_when(end, tz, now)?,
        None => start_at + Duration::hours(1),
    };

    let spans = generate(
        start_at.with_timezone(tz),
        end_at.with_timezone(tz),
        Some(&rule),
        command.max.unwrap_or(engine.max_occurrences),
    )?;

    println!("{} repeats {}", rule.to_string().bold(), rule.describe());
    display_spans(&spans);
    println!("{} occurrences", spans.len());
    Ok(())
}

use anyhow::Result;
use cadence_core::grid::utc_window;
use cadence_core::models::NewEventData;
use cadence_core::regeneration::RegenerationCoordinator;
use cadence_core::repository::EventRepository;
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use owo_colors::{OwoColorize, Style};

use crate::cli::AddCommand;
use crate::parser::{parse_day, parse_when};
use crate::util::parse_rule;

pub async fn add_event<S: EventRepository>(
    coordinator: &RegenerationCoordinator<S>,
    command: AddCommand,
    tz: &Tz,
) -> Result<()> {
    let now = Utc::now();
    let rule = command.rule.as_deref().map(parse_rule).transpose()?;

    let (start_at, end_at) = if command.all_day {
        let first = parse_day(&command.start, tz, now)?;
        let last = command
            .end
            .as_deref()
            .map(|end| parse_day(end, tz, now))
            .transpose()?
            .unwrap_or(first);
        utc_window(first, last, tz)
    } else {
        let start_at = parse_when(&command.start, tz, now)?;
        let end_at = match command.end.as_deref() {
            Some(end) => parse_when(end, tz, now)?,
            None => start_at + Duration::hours(1),
        };
        (start_at, end_at)
    };

    let event = coordinator
        .store()
        .create_event(NewEventData {
            event_id: None,
            start_at,
            end_at,
            all_day: command.all_day,
        })
        .await?;

    let count = match &rule {
        Some(rule) => {
            coordinator
                .regenerate(event.event_id, Some(&rule.to_string()))
                .await?
        }
        None => 1,
    };

    if command.quiet {
        println!("{}", event.event_id);
        return Ok(());
    }

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();

    println!(
        "{} Created event starting {}",
        "✓".style(success_style),
        start_at.with_timezone(tz).format("%a %Y-%m-%d %H:%M %Z").bright_white().bold()
    );
    println!("  {} Event ID: {}", "→".style(info_style), event.event_id.to_string().yellow());
    if let Some(rule) = &rule {
        println!(
            "  {} Repeats {} ({} occurrences stored)",
            "→".style(info_style),
            rule.describe(),
            count
        );
    }
    Ok(())
}

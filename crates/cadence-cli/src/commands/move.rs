use anyhow::Result;
use cadence_core::regeneration::RegenerationCoordinator;
use cadence_core::repository::EventRepository;
use chrono::Utc;
use chrono_tz::Tz;
use owo_colors::{OwoColorize, Style};

use crate::cli::MoveCommand;
use crate::parser::parse_when;
use crate::util::{load_base, resolve_event_id};

pub async fn move_event<S: EventRepository>(
    coordinator: &RegenerationCoordinator<S>,
    command: MoveCommand,
    tz: &Tz,
) -> Result<()> {
    let event_id = resolve_event_id(coordinator.store(), &command.id).await?;
    let base = load_base(coordinator.store(), event_id).await?;

    let now = Utc::now();
    let start_at = parse_when(&command.start, tz, now)?;
    let end_at = match command.end.as_deref() {
        Some(end) => parse_when(end, tz, now)?,
        None => start_at + (base.end_at - base.start_at),
    };

    let count = coordinator.reschedule(event_id, start_at, end_at).await?;

    println!(
        "{} Moved event {} to {} ({} occurrences)",
        "✓".style(Style::new().green().bold()),
        event_id.to_string().yellow(),
        start_at.with_timezone(tz).format("%a %Y-%m-%d %H:%M %Z"),
        count
    );
    Ok(())
}

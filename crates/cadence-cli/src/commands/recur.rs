use anyhow::Result;
use cadence_core::regeneration::RegenerationCoordinator;
use cadence_core::repository::EventRepository;
use owo_colors::{OwoColorize, Style};

use crate::cli::RecurCommand;
use crate::util::{parse_rule, resolve_event_id};

pub async fn recur_event<S: EventRepository>(
    coordinator: &RegenerationCoordinator<S>,
    command: RecurCommand,
) -> Result<()> {
    let event_id = resolve_event_id(coordinator.store(), &command.id).await?;

    // Only --clear removes the recurrence
    let rule = match (command.clear, command.rule.as_deref()) {
        (true, _) | (false, None) => None,
        (false, Some(text)) => Some(parse_rule(text)?),
    };

    let canonical = rule.as_ref().map(ToString::to_string);
    let count = coordinator.regenerate(event_id, canonical.as_deref()).await?;

    let success_style = Style::new().green().bold();
    match rule {
        Some(rule) => println!(
            "{} Event {} repeats {} ({} occurrences)",
            "✓".style(success_style),
            event_id.to_string().yellow(),
            rule.describe(),
            count
        ),
        None => println!(
            "{} Recurrence cleared for event {}",
            "✓".style(success_style),
            event_id.to_string().yellow()
        ),
    }
    Ok(())
}

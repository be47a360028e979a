use anyhow::Result;
use cadence_core::repository::EventRepository;
use dialoguer::Confirm;
use owo_colors::{OwoColorize, Style};

use crate::cli::DeleteCommand;
use crate::util::{load_base, resolve_event_id};

pub async fn delete_event(repo: &impl EventRepository, command: DeleteCommand) -> Result<()> {
    let event_id = resolve_event_id(repo, &command.id).await?;
    let base = load_base(repo, event_id).await?;

    if !command.force {
        let what = if base.rrule.is_some() { "recurring event" } else { "event" };
        let confirmation = Confirm::new()
            .with_prompt(format!("Are you sure you want to delete {} '{}'?", what, event_id))
            .default(false)
            .interact()?;

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    let removed = repo.delete_event(event_id).await?;
    println!(
        "{} Deleted event {} ({} occurrences removed)",
        "✓".style(Style::new().green().bold()),
        event_id.to_string().yellow(),
        removed
    );
    Ok(())
}

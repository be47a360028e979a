use anyhow::Result;
use cadence_core::repository::EventRepository;
use cadence_core::rule;
use chrono_tz::Tz;
use owo_colors::OwoColorize;

use crate::cli::ShowCommand;
use crate::util::{load_base, resolve_event_id};
use crate::views::table::display_occurrences;

pub async fn show_event(repo: &impl EventRepository, command: ShowCommand, tz: &Tz) -> Result<()> {
    let event_id = resolve_event_id(repo, &command.id).await?;
    let base = load_base(repo, event_id).await?;
    let occurrences = repo.find_event_occurrences(event_id).await?;

    if command.json {
        println!("{}", serde_json::to_string_pretty(&occurrences)?);
        return Ok(());
    }

    println!("Event {}", event_id.to_string().yellow());
    match base.rrule.as_deref().and_then(rule::parse) {
        Some(rule) => println!("  Repeats {} ({})", rule.describe(), rule.to_string().bright_black()),
        None => println!("  Does not repeat"),
    }
    display_occurrences(&occurrences, tz);
    Ok(())
}

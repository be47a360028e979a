use anyhow::{anyhow, Result};
use cadence_core::error::CoreError;
use cadence_core::models::Occurrence;
use cadence_core::regeneration::OccurrenceStore;
use cadence_core::repository::EventRepository;
use cadence_core::rule::RecurrenceRule;
use uuid::Uuid;

/// Resolves a full event ID or a unique prefix of one.
pub async fn resolve_event_id(repo: &impl EventRepository, input: &str) -> Result<Uuid> {
    if let Ok(id) = input.parse::<Uuid>() {
        return Ok(id);
    }
    if input.len() < 4 {
        return Err(anyhow!(CoreError::InvalidInput(
            "ID prefix must be at least 4 characters long.".to_string()
        )));
    }

    let ids = repo.find_event_ids_by_prefix(input).await?;
    match ids.as_slice() {
        [id] => Ok(*id),
        [] => Err(anyhow!(CoreError::NotFound(format!(
            "No event found with ID prefix '{}'",
            input
        )))),
        candidates => {
            let listed: Vec<String> = candidates.iter().map(Uuid::to_string).collect();
            Err(anyhow!(CoreError::InvalidInput(format!(
                "ID prefix '{}' is ambiguous: {}",
                input,
                listed.join(", ")
            ))))
        }
    }
}

/// Loads the event's base occurrence or fails with `NotFound`.
pub async fn load_base(repo: &impl EventRepository, event_id: Uuid) -> Result<Occurrence> {
    repo.get_master_or_single(event_id)
        .await?
        .ok_or_else(|| anyhow!(CoreError::NotFound(format!("Event '{}' not found", event_id))))
}

/// First eight characters of an ID, as shown in tables.
pub fn short_id(id: &Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Parses rule text, rejecting anything without a recognizable `FREQ`.
pub fn parse_rule(text: &str) -> Result<RecurrenceRule> {
    RecurrenceRule::parse(text).ok_or_else(|| {
        anyhow!(CoreError::InvalidInput(format!(
            "'{}' is not a recurrence rule; expected FREQ=DAILY|WEEKLY|BIWEEKLY|MONTHLY|YEARLY",
            text
        )))
    })
}

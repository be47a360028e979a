use clap::{Parser, Subcommand};

/// Recurring events and calendar grids from the command line
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a new event
    Add(AddCommand),
    /// Attach, change or clear an event's recurrence rule
    Recur(RecurCommand),
    /// Move an event's first occurrence
    Move(MoveCommand),
    /// Show every occurrence of an event
    Show(ShowCommand),
    /// Expand a rule without touching the database
    Preview(PreviewCommand),
    /// Parse a rule and print its canonical form
    Parse(ParseCommand),
    /// Show a month grid
    Month(MonthCommand),
    /// Show a week grid
    Week(WeekCommand),
    /// Delete an event and all its occurrences
    Delete(DeleteCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// When the event starts (e.g. "2024-06-01 09:00", "tomorrow 9am")
    #[arg(short, long)]
    pub start: String,
    /// When the event ends. Defaults to one hour later, or one day for all-day events
    #[arg(short, long)]
    pub end: Option<String>,
    /// Mark the event as lasting the whole day
    #[arg(long)]
    pub all_day: bool,
    /// Recurrence rule, e.g. "FREQ=WEEKLY;COUNT=10"
    #[arg(short, long)]
    pub rule: Option<String>,
    /// Print only the new event ID
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RecurCommand {
    /// Event ID or unique prefix
    pub id: String,
    /// New recurrence rule
    #[arg(required_unless_present = "clear", conflicts_with = "clear")]
    pub rule: Option<String>,
    /// Remove the recurrence and keep only the first occurrence
    #[arg(long)]
    pub clear: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct MoveCommand {
    /// Event ID or unique prefix
    pub id: String,
    /// New start of the first occurrence
    #[arg(short, long)]
    pub start: String,
    /// New end. Defaults to keeping the current duration
    #[arg(short, long)]
    pub end: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// Event ID or unique prefix
    pub id: String,
    /// Print occurrences as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PreviewCommand {
    #[arg(short, long)]
    pub start: String,
    #[arg(short, long)]
    pub end: Option<String>,
    #[arg(short, long)]
    pub rule: String,
    /// Cap on generated occurrences (defaults to the configured limit)
    #[arg(long)]
    pub max: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
pub struct ParseCommand {
    /// Rule text, e.g. "FREQ=BIWEEKLY;UNTIL=20251231"
    pub rule: String,
}

#[derive(Parser, Debug, Clone)]
pub struct MonthCommand {
    #[arg(long)]
    pub year: Option<i32>,
    /// 1-12
    #[arg(long)]
    pub month: Option<u32>,
    /// First column of the grid, 0 = Sunday. Wraps modulo 7
    #[arg(long, allow_negative_numbers = true)]
    pub week_start: Option<i64>,
    /// Print the grid as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct WeekCommand {
    /// Any day of the week to show. Defaults to today
    #[arg(long)]
    pub date: Option<String>,
    /// First day of the week, 0 = Sunday. Wraps modulo 7
    #[arg(long, allow_negative_numbers = true)]
    pub week_start: Option<i64>,
    /// Print the grid as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// Event ID or unique prefix
    pub id: String,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub force: bool,
}

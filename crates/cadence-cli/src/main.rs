use cadence_core::db;
use cadence_core::error::CoreError;
use cadence_core::regeneration::RegenerationCoordinator;
use cadence_core::repository::SqliteOccurrenceStore;
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

use cli::Commands;

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = cli::Cli::parse();
    if let Err(e) = run(cli).await {
        handle_error(e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CADENCE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: cli::Cli) -> anyhow::Result<()> {
    let config = config::Config::new().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable configuration");
        config::Config::default()
    });

    // `parse` needs neither the timezone nor the database
    let command = match cli.command {
        Commands::Parse(command) => return commands::parse::parse_command(command),
        other => other,
    };
    let tz = config.engine.tz()?;

    let command = match command {
        Commands::Preview(command) => {
            return commands::preview::preview_rule(command, &config.engine, &tz)
        }
        other => other,
    };

    let pool = db::establish_connection(&config.database_path).await?;
    let coordinator = RegenerationCoordinator::new(SqliteOccurrenceStore::new(pool), config.engine.clone())?;
    let store = coordinator.store();

    match command {
        Commands::Add(command) => commands::add::add_event(&coordinator, command, &tz).await,
        Commands::Recur(command) => commands::recur::recur_event(&coordinator, command).await,
        Commands::Move(command) => commands::r#move::move_event(&coordinator, command, &tz).await,
        Commands::Show(command) => commands::show::show_event(store, command, &tz).await,
        Commands::Month(command) => {
            commands::calendar::month_command(store, command, &config.engine, &tz).await
        }
        Commands::Week(command) => {
            commands::calendar::week_command(store, command, &config.engine, &tz).await
        }
        Commands::Delete(command) => commands::delete::delete_event(store, command).await,
        Commands::Parse(_) | Commands::Preview(_) => Ok(()),
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidRange { start, end } => {
                eprintln!(
                    "{} End {} is before start {}",
                    "Error:".style(error_style),
                    end.yellow(),
                    start.yellow()
                );
            }
            CoreError::InvalidTimezone(tz) => {
                eprintln!(
                    "{} Unknown timezone '{}'. Use IANA names like 'America/New_York'",
                    "Error:".style(error_style),
                    tz.yellow()
                );
            }
            CoreError::PartialWriteFailure {
                event_id,
                written,
                expected,
                source,
            } => {
                eprintln!(
                    "{} Only {} of {} occurrences of event {} were saved: {}",
                    "Error:".style(error_style),
                    written,
                    expected,
                    event_id.yellow(),
                    source
                );
                eprintln!("Run the same command again to finish.");
            }
            _ => eprintln!("{} {:#}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
    }
}

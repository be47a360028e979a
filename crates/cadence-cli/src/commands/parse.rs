use anyhow::Result;
use owo_colors::OwoColorize;

use crate::cli::ParseCommand;
use crate::util::parse_rule;

pub fn parse_command(command: ParseCommand) -> Result<()> {
    let rule = parse_rule(&command.rule)?;
    println!("{}", rule.to_string().bold());
    println!("  {}", rule.describe().bright_black());
    Ok(())
}

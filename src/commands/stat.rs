//! Stat command implementation.
//!
//! Computes one key for a team, a single match-team, or the whole event.

use super::models::StatArgs;
use super::utils::load_dataset;
use crate::aggregator::Value;
use crate::parser::schema::Subject;
use anyhow::{Context, Result};
use log::info;

/// Execute the stat command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Input files cannot be loaded
/// * The key does not resolve
pub fn execute_stat(args: StatArgs) -> Result<()> {
    validate_stat_args(&args)?;

    let dataset = load_dataset(&args.event)?;
    let key = dataset
        .parse_key(&args.key)
        .with_context(|| format!("Cannot compute '{}'", args.key))?;

    let subject = match (args.team, &args.match_key) {
        (Some(team), Some(match_key)) => Some(Subject::match_team(team, match_key.clone())),
        (Some(team), None) => Some(Subject::team(team)),
        _ => None,
    };
    let scope = subject
        .as_ref()
        .map_or_else(|| "event".to_string(), |s| s.to_string());

    if args.raw {
        let subject = subject.context("--raw needs a --team")?;
        let value = dataset.get_value(&key, &subject, None)?;
        println!("{} for {}:", dataset.display_name(&key, None), scope);
        print_value(&value, 1);
        return Ok(());
    }

    let function = args
        .function
        .unwrap_or_else(|| dataset.default_function(&key));
    info!("Computing {} ({}) for {}", key, function, scope);

    let value = dataset.compute_stat(&key, subject.as_ref(), Some(function))?;
    println!(
        "{} [{}]: {}",
        dataset.display_name(&key, Some(function)),
        scope,
        dataset.display(&key, &value)
    );

    Ok(())
}

/// Validate stat arguments
///
/// **Public** - can be called before execute_stat for early validation
pub fn validate_stat_args(args: &StatArgs) -> Result<()> {
    if args.key.trim().is_empty() {
        anyhow::bail!("Key cannot be empty");
    }

    if args.match_key.is_some() && args.team.is_none() {
        anyhow::bail!("--match requires --team");
    }

    if args.raw && args.team.is_none() {
        anyhow::bail!("--raw requires --team");
    }

    Ok(())
}

/// Print raw values, one observation per line
fn print_value(value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match value {
        Value::List(values) => {
            for value in values {
                print_value(value, depth);
            }
        }
        Value::Missing => println!("{}(missing)", indent),
        Value::Bool(b) => println!("{}{}", indent, b),
        Value::Number(n) => println!("{}{}", indent, n),
        Value::Choice(i) => println!("{}option {}", indent, i),
        Value::Flags(flags) => println!("{}{:?}", indent, flags),
        Value::Text(text) => println!("{}{}", indent, text),
        Value::Cycles(entries) => println!("{}{} cycles", indent, entries.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::models::EventArgs;
    use std::path::PathBuf;

    fn args() -> StatArgs {
        StatArgs {
            event: EventArgs {
                records: PathBuf::from("records.json"),
                config: PathBuf::from("config.json"),
                fms: None,
                settings: None,
            },
            key: "result.auto".to_string(),
            team: None,
            match_key: None,
            function: None,
            raw: false,
        }
    }

    #[test]
    fn test_validate_event_wide() {
        assert!(validate_stat_args(&args()).is_ok());
    }

    #[test]
    fn test_validate_match_without_team() {
        let args = StatArgs {
            match_key: Some("e_qm1".to_string()),
            ..args()
        };
        assert!(validate_stat_args(&args).is_err());
    }

    #[test]
    fn test_validate_raw_without_team() {
        let args = StatArgs { raw: true, ..args() };
        assert!(validate_stat_args(&args).is_err());
    }

    #[test]
    fn test_validate_empty_key() {
        let args = StatArgs {
            key: "  ".to_string(),
            ..args()
        };
        assert!(validate_stat_args(&args).is_err());
    }
}

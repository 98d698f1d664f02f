//! Rank command implementation.
//!
//! The rank command:
//! 1. Loads the event
//! 2. Picks the teams to rank (all, explicit, or a saved picklist)
//! 3. Ranks them by a key
//! 4. Prints the table and optionally saves outputs

use super::models::RankArgs;
use super::utils::load_dataset;
use crate::output::{read_picklists, render_ranking, write_json, write_picklists};
use crate::parser::schema::TeamNumber;
use crate::ranking::RankingEngine;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::time::Instant;

/// Execute the rank command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Input files cannot be loaded
/// * The key does not resolve
/// * The source picklist does not exist
/// * Output files cannot be written
pub fn execute_rank(args: RankArgs) -> Result<()> {
    let start_time = Instant::now();
    validate_rank_args(&args)?;

    info!("Step 1/4: Loading event...");
    let dataset = load_dataset(&args.event)?;
    let key = dataset
        .parse_key(&args.key)
        .with_context(|| format!("Cannot rank by '{}'", args.key))?;

    info!("Step 2/4: Selecting teams...");
    let mut picklists = read_picklists(&args.picklists)
        .with_context(|| format!("Failed to read picklists from {}", args.picklists.display()))?;

    let teams: Vec<TeamNumber> = if let Some(name) = &args.from_list {
        let list = picklists
            .get(name)
            .with_context(|| format!("No picklist named '{}'", name))?;
        parse_team_list(list)
    } else if !args.teams.is_empty() {
        args.teams.clone()
    } else {
        dataset.teams()
    };
    debug!("Ranking {} teams", teams.len());

    info!("Step 3/4: Ranking by {}...", key);
    let ranking = RankingEngine::new(&dataset).ranking(&key, &teams, args.function)?;

    info!("Step 4/4: Writing outputs...");
    println!("{}", render_ranking(&dataset, &ranking, args.top));

    if let Some(name) = &args.save {
        picklists.replace(name, ranking.to_picklist());
        write_picklists(&picklists, &args.picklists).context("Failed to save picklist")?;
        info!("✓ Saved picklist '{}' to: {}", name, args.picklists.display());
    }

    if let Some(path) = &args.output_json {
        write_json(&ranking, path).context("Failed to write ranking JSON")?;
        info!("✓ Ranking written to: {}", path.display());
    }

    info!(
        "Ranked {} of {} teams in {:.2}s",
        ranking.ranked_count(),
        ranking.entries.len(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Validate rank arguments
///
/// **Public** - can be called before execute_rank for early validation
pub fn validate_rank_args(args: &RankArgs) -> Result<()> {
    if args.key.trim().is_empty() {
        anyhow::bail!("Key cannot be empty");
    }

    if args.from_list.is_some() && !args.teams.is_empty() {
        anyhow::bail!("Use either --teams or --from-list, not both");
    }

    if args.top == Some(0) {
        anyhow::bail!("--top must be greater than 0");
    }

    if let Some(name) = &args.save {
        if name.trim().is_empty() {
            anyhow::bail!("Picklist name cannot be empty");
        }
    }

    Ok(())
}

/// Team numbers from picklist entries, skipping anything unparseable
fn parse_team_list(list: &[String]) -> Vec<TeamNumber> {
    list.iter()
        .filter_map(|entry| match entry.trim().parse() {
            Ok(team) => Some(team),
            Err(_) => {
                warn!("Skipping picklist entry '{}': not a team number", entry);
                None
            }
        })
        .collect()
}

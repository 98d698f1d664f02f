//! Scout Stats CLI
//!
//! Computes stats and rankings from scouting records.
//! Prints tables and saves rankings as picklists.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use scout_stats::aggregator::AggregateFn;
use scout_stats::commands::{
    display_version, execute_keys, execute_rank, execute_stat, execute_validate, EventArgs,
    KeysArgs, RankArgs, StatArgs,
};
use scout_stats::parser::TeamNumber;

/// Scout Stats - derived metrics and rankings for scouting data
#[derive(Parser, Debug)]
#[command(name = "scout-stats")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute one key for a team, a match, or the whole event
    Stat {
        #[command(flatten)]
        event: EventArgs,

        /// Key to compute (e.g. result.auto_points, smart.score)
        key: String,

        /// Team number; omit for the event-wide value
        #[arg(short, long)]
        team: Option<TeamNumber>,

        /// Match key (e.g. 2024casj_qm12); requires --team
        #[arg(short, long = "match")]
        match_key: Option<String>,

        /// Aggregation function
        #[arg(short, long, value_enum)]
        function: Option<AggregateFn>,

        /// Print raw per-match values instead of an aggregate
        #[arg(long)]
        raw: bool,
    },

    /// Rank teams by a key
    Rank {
        #[command(flatten)]
        event: EventArgs,

        /// Key to rank by
        key: String,

        /// Teams to rank (comma separated); defaults to every team
        #[arg(short, long, value_delimiter = ',')]
        teams: Vec<TeamNumber>,

        /// Rank the teams of a saved picklist
        #[arg(long)]
        from_list: Option<String>,

        /// Picklist file
        #[arg(short, long, default_value = "picklists.json")]
        picklists: PathBuf,

        /// Save the ranking as a picklist with this name
        #[arg(short, long)]
        save: Option<String>,

        /// Aggregation function
        #[arg(short, long, value_enum)]
        function: Option<AggregateFn>,

        /// Number of rows to print
        #[arg(long)]
        top: Option<usize>,

        /// Output path for the ranking as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a config and report every invalid smart stat
    Validate {
        /// Path to config JSON file
        #[arg(short, long)]
        config: PathBuf,

        /// Path to official results JSON (for fms.* references)
        #[arg(long)]
        fms: Option<PathBuf>,
    },

    /// List resolvable keys
    Keys {
        #[command(flatten)]
        event: EventArgs,

        /// Only keys in this namespace (result, fms, smart, meta)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Only keys of these field kinds (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        kind: Vec<String>,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Stat {
            event,
            key,
            team,
            match_key,
            function,
            raw,
        } => {
            execute_stat(StatArgs {
                event,
                key,
                team,
                match_key,
                function,
                raw,
            })?;
        }

        Commands::Rank {
            event,
            key,
            teams,
            from_list,
            picklists,
            save,
            function,
            top,
            output,
        } => {
            execute_rank(RankArgs {
                event,
                key,
                teams,
                from_list,
                picklists,
                save,
                function,
                top,
                output_json: output,
            })?;
        }

        Commands::Validate { config, fms } => {
            execute_validate(&config, fms.as_deref())?;
        }

        Commands::Keys {
            event,
            namespace,
            kind,
        } => {
            execute_keys(KeysArgs {
                event,
                namespace,
                kinds: kind,
            })?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}

use crate::aggregator::AggregateFn;
use crate::parser::schema::TeamNumber;
use std::path::PathBuf;

/// Input files shared by every command that loads an event
///
/// **Public** - flattened into each subcommand by main.rs
#[derive(Debug, Clone, clap::Args)]
pub struct EventArgs {
    /// Path to the scouted records JSON
    #[arg(short, long, env = "SCOUT_RECORDS")]
    pub records: PathBuf,

    /// Path to the field / smart stat / team configuration JSON
    #[arg(short, long, env = "SCOUT_CONFIG")]
    pub config: PathBuf,

    /// Path to imported official results JSON (optional)
    #[arg(long)]
    pub fms: Option<PathBuf>,

    /// Path to engine settings TOML (optional)
    #[arg(long, env = "SCOUT_SETTINGS")]
    pub settings: Option<PathBuf>,
}

/// Arguments for the stat command
#[derive(Debug, Clone)]
pub struct StatArgs {
    pub event: EventArgs,

    /// Key to compute, e.g. `result.auto_points`
    pub key: String,

    /// Team to compute for; `None` means the whole event
    pub team: Option<TeamNumber>,

    /// Restrict to one match (requires a team)
    pub match_key: Option<String>,

    /// Aggregation override
    pub function: Option<AggregateFn>,

    /// Print the raw per-match values instead of an aggregate
    pub raw: bool,
}

/// Arguments for the rank command
#[derive(Debug, Clone)]
pub struct RankArgs {
    pub event: EventArgs,

    /// Key to rank by
    pub key: String,

    /// Explicit teams to rank; empty means every team
    pub teams: Vec<TeamNumber>,

    /// Rank the teams of a saved picklist instead
    pub from_list: Option<String>,

    /// Picklist file to read from and save to
    pub picklists: PathBuf,

    /// Save the ranking as a picklist with this name
    pub save: Option<String>,

    /// Aggregation override
    pub function: Option<AggregateFn>,

    /// Number of rows to print
    pub top: Option<usize>,

    /// Also write the ranking (with values) as JSON
    pub output_json: Option<PathBuf>,
}

/// Arguments for the keys command
#[derive(Debug, Clone)]
pub struct KeysArgs {
    pub event: EventArgs,

    /// Namespace filter (`result`, `fms`, `smart`, `meta`)
    pub namespace: Option<String>,

    /// Field kind filters (`counter`, `select`, ...)
    pub kinds: Vec<String>,
}

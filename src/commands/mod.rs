//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod keys;
pub mod models;
pub mod rank;
pub mod stat;
pub mod utils;
pub mod validate;

// Re-export main command functions
pub use keys::execute_keys;
pub use models::{EventArgs, KeysArgs, RankArgs, StatArgs};
pub use rank::{execute_rank, validate_rank_args};
pub use stat::{execute_stat, validate_stat_args};
pub use utils::{display_version, load_dataset};
pub use validate::execute_validate;

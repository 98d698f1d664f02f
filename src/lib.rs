//! Scout Stats
//!
//! Derived metrics, aggregation and team rankings over competition
//! scouting data.
//!
//! A [`dataset::Dataset`] holds the scouted records, the field and smart
//! stat configuration, and an immutable snapshot that every read goes
//! through. Keys such as `result.auto_points` or `smart.cycle_rate` are
//! resolved by [`keys::KeyResolver`], aggregated by [`aggregator`], and
//! ordered into picklists by [`ranking::RankingEngine`].
//!
//! ## Getting Started
//!
//! ```bash
//! scout-stats rank --records records.json --config config.json smart.score
//! scout-stats --help
//! ```

pub mod aggregator;
pub mod commands;
pub mod dataset;
pub mod keys;
pub mod output;
pub mod parser;
pub mod ranking;
pub mod smart;
pub mod store;
pub mod utils;

pub use dataset::Dataset;

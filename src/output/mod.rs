//! Input loading and output writers.
//!
//! This module handles reading and writing data on disk:
//! - JSON inputs (records, config, official results)
//! - Picklist persistence
//! - Text tables for the terminal

pub mod json;
pub mod table;

// Re-export main functions
pub use json::{
    load_config, load_fms, load_records, read_json, read_picklists, write_json, write_picklists,
};
pub use table::{render_keys, render_ranking};

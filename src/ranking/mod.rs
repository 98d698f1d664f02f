//! Team rankings and the picklists built from them.

pub mod picklist;
pub mod rank;

pub use picklist::Picklists;
pub use rank::{RankedTeam, Ranking, RankingEngine};

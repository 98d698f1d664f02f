//! Raw record storage and the read-only snapshot built from it.

pub mod record_store;
pub mod snapshot;

pub use record_store::{RecordId, RecordStore};
pub use snapshot::Snapshot;

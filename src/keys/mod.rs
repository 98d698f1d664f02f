//! Namespaced keys and their resolution.
//!
//! Every readable value is addressed as `<namespace>.<id>`:
//! - `result.*` raw scouted inputs
//! - `fms.*` imported official results
//! - `smart.*` user-defined derived stats
//! - `meta.*` team identity attributes

pub mod key;
pub mod meta;
pub mod resolver;

pub use key::{is_identifier, Namespace, NamespacedKey};
pub use meta::{infer_kind, title_case, FieldMeta};
pub use resolver::{KeyResolver, SmartSource};

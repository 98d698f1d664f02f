//! Keys command implementation.

use super::models::KeysArgs;
use super::utils::load_dataset;
use crate::keys::Namespace;
use crate::output::render_keys;
use crate::parser::schema::FieldKind;
use anyhow::{Context, Result};

/// List every resolvable key
///
/// **Public** - main entry point called from main.rs
pub fn execute_keys(args: KeysArgs) -> Result<()> {
    let namespace = args
        .namespace
        .as_deref()
        .map(|ns| ns.parse::<Namespace>())
        .transpose()
        .context("Unknown namespace (expected result, fms, smart or meta)")?;
    let kinds = parse_kinds(&args.kinds)?;

    let dataset = load_dataset(&args.event)?;
    let keys = dataset.resolver().keys(namespace, &kinds);

    println!("{}", render_keys(&keys));
    println!();
    println!("{} keys", keys.len());
    Ok(())
}

/// Parse field kind names as written in configs
fn parse_kinds(kinds: &[String]) -> Result<Vec<FieldKind>> {
    kinds
        .iter()
        .map(|kind| {
            serde_json::from_value(serde_json::Value::String(kind.to_lowercase()))
                .with_context(|| format!("Unknown field kind '{}'", kind))
        })
        .collect()
}

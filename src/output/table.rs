//! Plain-text tables for terminal output.

use crate::dataset::Dataset;
use crate::keys::FieldMeta;
use crate::ranking::Ranking;

/// Truncate a cell so the table stays aligned
fn fit(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

/// Render a ranking as position / team / value rows
///
/// **Public** - used by the `rank` command
///
/// # Arguments
/// * `dataset` - Supplies team names and value formatting
/// * `ranking` - Computed ranking
/// * `max_lines` - Row limit; `None` prints every team
pub fn render_ranking(dataset: &Dataset, ranking: &Ranking, max_lines: Option<usize>) -> String {
    let title = dataset.display_name(&ranking.key, Some(ranking.function));
    let mut lines = Vec::new();

    lines.push(format!(
        "  {}{}",
        title,
        if ranking.negative { " (lower is better)" } else { "" }
    ));
    lines.push(format!("  ┏━━━━━━┳━━━━━━━━┳{}┳━━━━━━━━━━━━━━━━━━━━━━┓", "━".repeat(30)));
    lines.push(format!("  ┃ {:>4} ┃ {:>6} ┃ {:<28} ┃ {:>20} ┃", "#", "TEAM", "NAME", "VALUE"));
    lines.push(format!("  ┣━━━━━━╋━━━━━━━━╋{}╋━━━━━━━━━━━━━━━━━━━━━━┫", "━".repeat(30)));

    let snapshot = dataset.snapshot();
    let limit = max_lines.unwrap_or(ranking.entries.len());
    for (position, entry) in ranking.entries.iter().take(limit).enumerate() {
        let name = snapshot
            .team_info(entry.team)
            .map(|info| info.name.clone())
            .unwrap_or_default();
        lines.push(format!(
            "  ┃ {:>4} ┃ {:>6} ┃ {:<28} ┃ {:>20} ┃",
            position + 1,
            entry.team,
            fit(&name, 28),
            fit(&dataset.display(&ranking.key, &entry.value), 20)
        ));
    }

    lines.push(format!("  ┗━━━━━━┻━━━━━━━━┻{}┻━━━━━━━━━━━━━━━━━━━━━━┛", "━".repeat(30)));
    if ranking.entries.len() > limit {
        lines.push(format!("  ... {} more", ranking.entries.len() - limit));
    }
    lines.join("\n")
}

/// Render key listings as key / kind / name rows
pub fn render_keys(keys: &[&FieldMeta]) -> String {
    let width = keys
        .iter()
        .map(|meta| meta.key.to_string().len())
        .max()
        .unwrap_or(0)
        .max(3);

    let mut lines = vec![format!("{:<width$}  {:<12}  {}", "KEY", "KIND", "NAME", width = width)];
    for meta in keys {
        let mut name = meta.name.clone();
        if !meta.options.is_empty() {
            name = format!("{} [{}]", name, meta.options.join(", "));
        }
        lines.push(format!(
            "{:<width$}  {:<12}  {}",
            meta.key.to_string(),
            meta.kind.as_str(),
            name,
            width = width
        ));
    }
    lines.join("\n")
}

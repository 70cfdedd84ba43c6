//! Common display utilities for CLI commands.

use callisto::{CodeGraph, SymbolId};
use colored::Colorize;

pub const MAX_DISPLAY_ITEMS: usize = 10;

/// `qualified_name (path:line)` for a symbol, or its bare id if unknown.
pub fn symbol_label(graph: &CodeGraph, id: SymbolId) -> String {
    match graph.node(id) {
        Some(node) => format!(
            "{} {}",
            node.qualified_name,
            format!("({}:{})", node.file_path.display(), node.line_start).dimmed()
        ),
        None => format!("#{id}"),
    }
}

/// Print up to `MAX_DISPLAY_ITEMS` symbols as bullets, with an overflow line.
pub fn print_symbols(graph: &CodeGraph, ids: &[SymbolId], empty_message: &str) {
    if ids.is_empty() {
        println!("    {}", empty_message.dimmed());
        return;
    }

    for &id in ids.iter().take(MAX_DISPLAY_ITEMS) {
        println!("    {} {}", "•".dimmed(), symbol_label(graph, id));
    }

    if ids.len() > MAX_DISPLAY_ITEMS {
        println!(
            "    {} ... and {} more",
            "•".dimmed(),
            ids.len() - MAX_DISPLAY_ITEMS
        );
    }
}

/// Note that an analysis was skipped, with the reason.
pub fn print_skipped(what: &str, reason: &dyn std::fmt::Display) {
    println!("  {} {what}: {reason}", "skipped".yellow());
}

/// Health score colored by band.
pub fn score(value: u32) -> colored::ColoredString {
    let text = value.to_string();
    match value {
        80.. => text.green().bold(),
        60..80 => text.yellow().bold(),
        _ => text.red().bold(),
    }
}

/// Print a result as pretty JSON.
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), callisto::Error> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| callisto::Error::Internal(format!("Failed to serialize result to JSON: {e}")))?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_keeps_the_value_text() {
        assert!(score(95).to_string().contains("95"));
        assert!(score(59).to_string().contains("59"));
    }

    #[test]
    fn print_json_accepts_query_results() {
        let report = callisto::query::ForecastStatus::Stable;
        assert!(print_json(&report).is_ok());
        assert!(print_json(&[1u32, 2, 3][..]).is_ok());
    }
}

//! `callisto impact` and `callisto safe-zones` command implementations.

use std::path::Path;

use callisto::Callisto;
use callisto::query::SafeZone;
use colored::Colorize;

use super::display::{MAX_DISPLAY_ITEMS, print_json, print_symbols, symbol_label};

/// Run the impact command.
pub fn run(
    workspace: &Path,
    symbol: &str,
    depth: Option<usize>,
    json: bool,
) -> Result<(), callisto::Error> {
    let callisto = Callisto::new(workspace)?;
    let report = callisto.impact(symbol, depth)?;
    if json {
        return print_json(&report);
    }
    let graph = callisto.graph()?;

    println!(
        "{} {}",
        "Impact analysis for".cyan().bold(),
        symbol_label(&graph, report.target)
    );
    println!();

    println!(
        "  {}: {}",
        "Direct callers".white().bold(),
        report.direct_callers.len()
    );
    print_symbols(&graph, &report.direct_callers, "(none)");
    println!();

    println!(
        "  {}: {} ({:.1}% of the graph)",
        "Affected symbols".white().bold(),
        report.affected_symbol_ids.len(),
        report.reach_ratio * 100.0
    );
    println!(
        "  {}: {:.4}",
        "Weighted importance".white().bold(),
        report.weighted_importance
    );
    println!();

    println!(
        "  {}: {}",
        "Affected files".white().bold(),
        report.affected_files.len()
    );
    if report.affected_files.is_empty() {
        println!("    {}", "(none)".dimmed());
    }
    for file in report.affected_files.iter().take(MAX_DISPLAY_ITEMS) {
        println!(
            "    {} {} {}",
            "•".dimmed(),
            file.path.display(),
            format!("({} symbols, importance {:.4})", file.symbols, file.importance).dimmed()
        );
    }
    if report.affected_files.len() > MAX_DISPLAY_ITEMS {
        println!(
            "    ... and {} more",
            report.affected_files.len() - MAX_DISPLAY_ITEMS
        );
    }

    Ok(())
}

/// Run the safe-zones command.
pub fn safe_zones(
    workspace: &Path,
    target: &str,
    depth: usize,
    json: bool,
) -> Result<(), callisto::Error> {
    let callisto = Callisto::new(workspace)?;
    let report = callisto.safe_zones(target, depth)?;
    if json {
        return print_json(&report);
    }
    let graph = callisto.graph()?;

    let zone = match report.zone {
        SafeZone::Isolated => report.zone.to_string().green().bold(),
        SafeZone::Contained => report.zone.to_string().yellow().bold(),
        SafeZone::Exposed => report.zone.to_string().red().bold(),
    };
    println!(
        "{} {} (depth {}): {}",
        "Safe zone for".cyan().bold(),
        target,
        report.depth,
        zone
    );
    println!();

    println!(
        "  {}: {}",
        "Internal symbols".white().bold(),
        report.internal_ids.len()
    );
    print_symbols(&graph, &report.internal_ids, "(none)");
    println!();

    println!(
        "  {}: {}",
        "Boundary symbols".white().bold(),
        report.boundary_ids.len()
    );
    if report.boundary_ids.is_empty() {
        println!("    {}", "(none)".dimmed());
    }
    for &id in report.boundary_ids.iter().take(MAX_DISPLAY_ITEMS) {
        let external = report.external_ref_counts.get(&id).copied().unwrap_or(0);
        println!(
            "    {} {} {}",
            "•".dimmed(),
            symbol_label(&graph, id),
            format!("[{external} external]").yellow()
        );
    }
    if report.boundary_ids.len() > MAX_DISPLAY_ITEMS {
        println!(
            "    ... and {} more",
            report.boundary_ids.len() - MAX_DISPLAY_ITEMS
        );
    }

    Ok(())
}

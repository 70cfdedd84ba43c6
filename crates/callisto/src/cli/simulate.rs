//! `callisto simulate` command implementation.

use std::path::Path;

use callisto::Callisto;
use callisto::simulate::{Direction, Operation};
use colored::Colorize;

use super::display::{print_json, print_symbols, score};

/// Run the simulate command.
pub fn run(workspace: &Path, operation: &Operation, json: bool) -> Result<(), callisto::Error> {
    let callisto = Callisto::new(workspace)?;
    let result = callisto.simulate(operation)?;
    if json {
        return print_json(&result);
    }
    let graph = callisto.graph()?;

    println!("{} {}", "Simulating".cyan().bold(), result.operation);
    println!();

    println!(
        "  {}: {}",
        "Affected symbols".white().bold(),
        result.report.affected.len()
    );
    print_symbols(&graph, &result.report.affected, "(none)");
    if result.report.removed_edges > 0 {
        println!(
            "  {}: {}",
            "Removed edges".white().bold(),
            result.report.removed_edges
        );
    }
    if !result.report.removed_names.is_empty() {
        println!(
            "  {}: {}",
            "Removed".white().bold(),
            result.report.removed_names.join(", ")
        );
    }
    println!();

    println!(
        "  {}: {} → {}",
        "Health".white().bold(),
        score(result.before.health_score),
        score(result.after.health_score)
    );
    println!();

    println!(
        "  {:<20} {:>12} {:>12} {:>10}  {}",
        "metric".dimmed(),
        "before".dimmed(),
        "after".dimmed(),
        "change".dimmed(),
        "direction".dimmed()
    );
    for delta in &result.deltas {
        let direction = match delta.direction {
            Direction::Unchanged => delta.direction.to_string().dimmed(),
            Direction::Improved => delta.direction.to_string().green(),
            Direction::Degraded => delta.direction.to_string().red(),
        };
        println!(
            "  {:<20} {:>12.4} {:>12.4} {:>9.1}%  {}",
            delta.metric, delta.before, delta.after, delta.pct_change, direction
        );
    }

    Ok(())
}

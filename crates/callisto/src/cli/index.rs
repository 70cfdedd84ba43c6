//! `callisto index` and `callisto status` command implementations.

use std::path::{Path, PathBuf};

use callisto::Callisto;
use colored::Colorize;

use super::display::MAX_DISPLAY_ITEMS;

/// Run the index command.
pub fn run(workspace: &Path, rebuild: bool) -> Result<(), callisto::Error> {
    println!("{} {}...", "Indexing".cyan().bold(), workspace.display());

    let mut callisto = Callisto::new(workspace)?;

    let stats = if rebuild {
        println!("{}", "Rebuilding index from scratch".yellow());
        callisto.rebuild()?
    } else {
        callisto.update()?
    };

    println!();
    println!(
        "{} {} files ({} unchanged, {} removed), {} symbols, {} references",
        "Indexed".green().bold(),
        stats.files_indexed,
        stats.files_unchanged,
        stats.files_removed,
        stats.symbols_found,
        stats.references_found
    );
    println!(
        "{} {} edges across {} affected files, {} references unresolved, {} recursive",
        "Resolved".green().bold(),
        stats.edges_created,
        stats.affected_files,
        stats.references_unresolved,
        stats.self_references
    );
    println!("{}: {:.2?}", "Duration".dimmed(), stats.duration);

    if !stats.errors.is_empty() {
        println!();
        println!(
            "{} ({} in source files, {} internal):",
            "Errors".red().bold(),
            stats.input_error_count(),
            stats.internal_error_count()
        );
        for err in stats.errors.iter().take(5) {
            println!(
                "  {} {}: {} {}",
                "•".red(),
                err.path.display(),
                err.message,
                format!("({})", err.kind).dimmed()
            );
        }
        if stats.errors.len() > 5 {
            println!("  ... and {} more", stats.errors.len() - 5);
        }
        println!("  {}", "Failed files are retried on the next run.".dimmed());
    }

    Ok(())
}

/// Run the status command.
pub fn status(workspace: &Path) -> Result<(), callisto::Error> {
    let callisto = Callisto::new(workspace)?;
    let report = callisto.get_stale_files()?;

    if !report.is_stale() {
        println!("{}", "Index is up to date.".green());
        return Ok(());
    }

    println!("{}", "Index is stale:".yellow().bold());
    print_paths("Modified", &report.modified);
    print_paths("Added", &report.added);
    print_paths("Deleted", &report.deleted);
    print_paths("Retry", &report.retry);
    println!();
    println!("{}", "Run `callisto index` to update.".dimmed());
    Ok(())
}

fn print_paths(label: &str, paths: &[PathBuf]) {
    if paths.is_empty() {
        return;
    }
    println!("  {} ({}):", label.white().bold(), paths.len());
    for path in paths.iter().take(MAX_DISPLAY_ITEMS) {
        println!("    {} {}", "•".dimmed(), path.display());
    }
    if paths.len() > MAX_DISPLAY_ITEMS {
        println!("    ... and {} more", paths.len() - MAX_DISPLAY_ITEMS);
    }
}

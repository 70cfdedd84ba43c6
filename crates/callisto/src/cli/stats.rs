//! `callisto stats` command implementation.

use std::path::Path;

use callisto::Callisto;
use colored::Colorize;

/// Run the stats command.
pub fn run(workspace: &Path) -> Result<(), callisto::Error> {
    let callisto = Callisto::new(workspace)?;

    let db_path = callisto.db_path();
    let db_size_str = match std::fs::metadata(db_path) {
        Ok(meta) => format_size(meta.len()),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => "not created".to_string(),
            std::io::ErrorKind::PermissionDenied => {
                tracing::warn!(path = %db_path.display(), "Permission denied reading database");
                "permission denied".to_string()
            }
            _ => {
                tracing::debug!(error = %e, "Failed to get database file size");
                "size unknown".to_string()
            }
        },
    };

    let stats = callisto.stats()?;

    println!("{}", "Callisto Index Statistics".cyan().bold());
    println!();
    println!(
        "  {}: {} ({})",
        "Database".white().bold(),
        db_path.display(),
        db_size_str
    );
    println!();

    println!(
        "  {}: {} total",
        "Files".white().bold(),
        stats.file_count.to_string().green()
    );
    let mut languages: Vec<_> = stats.files_by_language.iter().collect();
    languages.sort_by_key(|(lang, _)| lang.as_str());
    for (lang, count) in languages {
        println!("    {}: {}", lang.as_str().dimmed(), count);
    }
    if stats.retry_count > 0 {
        println!(
            "    {}: {}",
            "awaiting retry".yellow(),
            stats.retry_count
        );
    }
    println!();

    println!(
        "  {}: {} total",
        "Symbols".white().bold(),
        stats.symbol_count.to_string().green()
    );
    let mut kinds: Vec<_> = stats.symbols_by_kind.into_iter().collect();
    kinds.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    for (kind, count) in kinds {
        println!("    {}: {}", kind.as_str().dimmed(), count);
    }
    println!();

    println!(
        "  {}: {} ({} unresolved)",
        "References".white().bold(),
        stats.reference_count.to_string().green(),
        stats.unresolved_count.to_string().yellow()
    );
    println!(
        "  {}: {}",
        "Symbol edges".white().bold(),
        stats.edge_count.to_string().green()
    );
    println!(
        "  {}: {}",
        "File edges".white().bold(),
        stats.file_edge_count.to_string().green()
    );
    println!(
        "  {}: {}",
        "Snapshots".white().bold(),
        stats.snapshot_count.to_string().green()
    );

    if stats.skipped_unknown_languages > 0 || stats.skipped_unknown_kinds > 0 {
        println!();
        println!(
            "  {}: Database contains unrecognized entries",
            "Warning".yellow().bold()
        );
        if stats.skipped_unknown_languages > 0 {
            println!(
                "    {} files with unknown language",
                stats.skipped_unknown_languages.to_string().yellow()
            );
        }
        if stats.skipped_unknown_kinds > 0 {
            println!(
                "    {} symbols with unknown kind",
                stats.skipped_unknown_kinds.to_string().yellow()
            );
        }
        println!(
            "    {}",
            "Database may be from a newer Callisto version. Consider `callisto index --rebuild`."
                .dimmed()
        );
    }

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

//! `callisto diagnose` command implementation.

use std::path::Path;

use callisto::Callisto;
use callisto::query::Suspect;
use colored::Colorize;

use super::display::{MAX_DISPLAY_ITEMS, print_json, symbol_label};

/// Run the diagnose command.
pub fn run(workspace: &Path, symbol: &str, depth: usize, json: bool) -> Result<(), callisto::Error> {
    let callisto = Callisto::new(workspace)?;
    let diagnosis = callisto.diagnose(symbol, depth)?;
    if json {
        return print_json(&diagnosis);
    }
    let graph = callisto.graph()?;

    println!(
        "{} {} {}",
        "Diagnosing".cyan().bold(),
        symbol_label(&graph, diagnosis.target),
        format!("(risk {:.3})", diagnosis.target_risk).dimmed()
    );
    println!();

    print_suspects("Upstream suspects", &diagnosis.upstream);
    print_suspects("Downstream suspects", &diagnosis.downstream);

    println!("{}", diagnosis.verdict.white().bold());
    Ok(())
}

fn print_suspects(label: &str, suspects: &[Suspect]) {
    println!("  {} ({}):", label.white().bold(), suspects.len());
    if suspects.is_empty() {
        println!("    {}", "(none)".dimmed());
    }
    for s in suspects.iter().take(MAX_DISPLAY_ITEMS) {
        let risk = format!("{:.3}", s.risk);
        let risk = if s.risk >= 0.5 {
            risk.red().bold()
        } else if s.risk >= 0.25 {
            risk.yellow()
        } else {
            risk.normal()
        };
        println!(
            "    {} {} {} {}",
            risk,
            s.name,
            format!("({}:{})", s.file.display(), s.line).dimmed(),
            format!(
                "commits {:.0}, complexity {:.0}",
                s.inputs.commits, s.inputs.complexity
            )
            .dimmed()
        );
    }
    if suspects.len() > MAX_DISPLAY_ITEMS {
        println!("    ... and {} more", suspects.len() - MAX_DISPLAY_ITEMS);
    }
    println!();
}

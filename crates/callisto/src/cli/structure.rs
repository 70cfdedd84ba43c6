//! `callisto cycles` and `callisto layers` command implementations.

use std::path::Path;

use callisto::Callisto;
use callisto::algo::layers::{detect_layers, find_violations, group_layers};
use callisto::algo::scc::{find_cycles, propagation_cost, tangle_ratio, weakest_edge};
use colored::Colorize;

use super::display::{print_skipped, print_symbols, symbol_label};

/// Run the cycles command.
pub fn cycles(workspace: &Path) -> Result<(), callisto::Error> {
    let callisto = Callisto::new(workspace)?;
    let graph = callisto.graph()?;
    let adj = graph.adjacency();
    let cycles = find_cycles(&adj, 2);

    if cycles.is_empty() {
        println!("{}", "No dependency cycles detected.".green());
        return Ok(());
    }

    println!(
        "Found {} cycles, tangle ratio {:.1}%:",
        cycles.len().to_string().red().bold(),
        tangle_ratio(&adj, &cycles) * 100.0
    );
    match propagation_cost(&adj, callisto.config().analysis.propagation_cost_max_nodes) {
        Ok(cost) => println!("Propagation cost {:.1}%", cost * 100.0),
        Err(e) => print_skipped("propagation cost", &e),
    }
    println!();

    for (i, cycle) in cycles.iter().enumerate() {
        println!(
            "  {} {} ({} symbols):",
            "Cycle".yellow().bold(),
            i + 1,
            cycle.len()
        );
        print_symbols(&graph, &cycle.members, "(empty)");
        if let Some(edge) = weakest_edge(&adj, cycle) {
            println!(
                "    {} {} → {} {}",
                "cut first:".cyan(),
                symbol_label(&graph, edge.source),
                symbol_label(&graph, edge.target),
                format!("[{}]", edge.reason).dimmed()
            );
        }
        println!();
    }

    Ok(())
}

/// Run the layers command.
pub fn layers(workspace: &Path) -> Result<(), callisto::Error> {
    let callisto = Callisto::new(workspace)?;
    let graph = callisto.graph()?;
    let adj = graph.adjacency();

    let layers = detect_layers(&adj);
    if layers.is_empty() {
        println!("{}", "Index is empty.".dimmed());
        return Ok(());
    }

    for (layer, members) in group_layers(&layers) {
        println!(
            "  {} {} ({} symbols)",
            "Layer".cyan().bold(),
            layer,
            members.len()
        );
        print_symbols(&graph, &members, "(empty)");
    }
    println!();

    let violations = find_violations(&adj, &layers, callisto.config().analysis.allowed_layer_skip);
    if violations.is_empty() {
        println!("{}", "No layer violations.".green());
        return Ok(());
    }

    println!(
        "{} layer violations:",
        violations.len().to_string().red().bold()
    );
    for v in &violations {
        println!(
            "  {} {} (L{}) → {} (L{}) {}",
            "•".red(),
            symbol_label(&graph, v.source),
            v.source_layer,
            symbol_label(&graph, v.target),
            v.target_layer,
            format!("severity {:.2}", v.severity).dimmed()
        );
    }

    Ok(())
}

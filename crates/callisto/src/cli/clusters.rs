//! `callisto clusters` and `callisto cut` command implementations.

use std::path::Path;

use callisto::Callisto;
use callisto::algo::centrality::pagerank_dense;
use callisto::algo::community::{cluster_quality, detect_communities, label_clusters};
use callisto::algo::mincut::{analyze_boundaries, leak_edges, verdict};
use callisto::algo::spectral::{spectral_communities, spectral_gap, verdict_from_gap};
use colored::Colorize;

use super::display::{MAX_DISPLAY_ITEMS, print_skipped, symbol_label};

/// Run the clusters command.
pub fn run(workspace: &Path, spectral: bool, k: Option<usize>) -> Result<(), callisto::Error> {
    let callisto = Callisto::new(workspace)?;
    let graph = callisto.graph()?;
    let adj = graph.adjacency();
    let analysis = &callisto.config().analysis;

    if adj.is_empty() {
        println!("{}", "Index is empty.".dimmed());
        return Ok(());
    }

    let partition = if spectral {
        match spectral_communities(&adj, k, analysis.spectral_max_nodes) {
            Ok(p) => p,
            Err(e) => {
                print_skipped("spectral clustering", &e);
                println!("  {}", "Falling back to Louvain.".dimmed());
                detect_communities(&adj)
            }
        }
    } else {
        detect_communities(&adj)
    };

    let quality = cluster_quality(&adj, &partition);
    let ranks = pagerank_dense(&adj, analysis.pagerank_damping);
    let labels = label_clusters(&graph, &adj, &partition, &ranks);

    println!(
        "{} {} clusters, modularity {:.3}, mean conductance {:.3}",
        "Found".cyan().bold(),
        labels.len().to_string().green(),
        quality.modularity,
        quality.mean_conductance
    );
    match spectral_gap(&adj, analysis.spectral_max_nodes) {
        Ok(gap) => println!(
            "  {}: {:.4} ({})",
            "Spectral gap".white().bold(),
            gap,
            verdict_from_gap(gap)
        ),
        Err(e) => print_skipped("spectral gap", &e),
    }
    println!();

    let mut sizes = vec![0usize; labels.len()];
    for &c in &partition {
        sizes[c] += 1;
    }
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| sizes[b].cmp(&sizes[a]).then_with(|| a.cmp(&b)));

    for &cid in order.iter().take(MAX_DISPLAY_ITEMS) {
        let conductance = quality.per_cluster.get(&cid).copied().unwrap_or(0.0);
        println!(
            "  {} {} {} ({} symbols, conductance {:.2})",
            "•".dimmed(),
            format!("#{cid}").dimmed(),
            labels.get(&cid).map_or("?", String::as_str).white().bold(),
            sizes[cid],
            conductance
        );
    }
    if order.len() > MAX_DISPLAY_ITEMS {
        println!("  ... and {} more", order.len() - MAX_DISPLAY_ITEMS);
    }

    Ok(())
}

/// Run the cut command.
pub fn cut(workspace: &Path, top: usize) -> Result<(), callisto::Error> {
    let callisto = Callisto::new(workspace)?;
    let graph = callisto.graph()?;
    let adj = graph.adjacency();
    let max_nodes = callisto.config().analysis.mincut_max_nodes;

    if adj.is_empty() {
        println!("{}", "Index is empty.".dimmed());
        return Ok(());
    }

    let partition = detect_communities(&adj);

    let reports = match analyze_boundaries(&adj, &partition, top, max_nodes) {
        Ok(r) => r,
        Err(e) => {
            print_skipped("boundary analysis", &e);
            return Ok(());
        }
    };

    println!("{}", verdict(&reports).cyan().bold());
    println!();

    for report in &reports {
        let marker = if report.fragile {
            "fragile".red().bold()
        } else {
            "isolated".green()
        };
        println!(
            "  {} #{} ↔ #{}: min cut {} of {} crossing edges, thinness {:.2} [{}]",
            "•".dimmed(),
            report.cluster_a,
            report.cluster_b,
            report.min_cut,
            report.cross_edges,
            report.thinness,
            marker
        );
        for &(source, target) in &report.cut_edges {
            println!(
                "      {} → {}",
                symbol_label(&graph, source),
                symbol_label(&graph, target)
            );
        }
    }

    match leak_edges(&adj, &partition, top, max_nodes) {
        Ok(leaks) if !leaks.is_empty() => {
            println!();
            println!("{}", "Leak edges".cyan().bold());
            for leak in &leaks {
                println!(
                    "  {} {} → {} {}",
                    "•".yellow(),
                    symbol_label(&graph, leak.source),
                    symbol_label(&graph, leak.target),
                    format!("(betweenness {:.3})", leak.betweenness).dimmed()
                );
                println!("      {}", leak.suggestion.dimmed());
            }
        }
        Ok(_) => {}
        Err(e) => print_skipped("leak edges", &e),
    }

    Ok(())
}

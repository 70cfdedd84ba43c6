//! What-if simulation of structural refactorings.
//!
//! Each [`Operation`] is applied to a [`SimulationGraph`], a private clone of
//! the code graph, and the full [`MetricSuite`] is recomputed on both sides.
//! The store is never touched. Moves only rewrite a symbol's owning file;
//! they do not model new imports, so results are architecture-level
//! estimates, not compiler-checked refactorings.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::algo::centrality::{betweenness, bottlenecks, god_components};
use crate::algo::community::{detect_communities, modularity};
use crate::algo::health::{HealthSignals, HealthWeights, health_score};
use crate::algo::layers::{detect_layers, find_violations};
use crate::algo::scc::{find_cycles, propagation_cost, tangle_ratio};
use crate::algo::spectral::algebraic_connectivity;
use crate::algo::round_to;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::graph::{CodeGraph, SimulationGraph};
use crate::types::SymbolId;

/// Architecture metrics recomputed before and after every simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSuite {
    /// Health score with [`HealthWeights::simulation`]
    pub health_score: u32,
    /// Symbols
    pub nodes: usize,
    /// Edges, counting each kind separately
    pub edges: usize,
    /// Non-trivial SCCs
    pub cycles: usize,
    /// Fraction of symbols in cycles, rounded to 4 places
    pub tangle_ratio: f64,
    /// Upward layer edges
    pub layer_violations: usize,
    /// Louvain modularity, rounded to 4 places
    pub modularity: f64,
    /// Algebraic connectivity of the largest component
    pub fiedler: f64,
    /// Transitive-closure density; `None` above the size gate
    pub propagation_cost: Option<f64>,
    /// Degree outliers
    pub god_components: usize,
    /// Betweenness outliers
    pub bottlenecks: usize,
}

impl MetricSuite {
    /// Compute every metric for `graph`.
    ///
    /// Degenerate algorithm results fall back to their neutral value
    /// (0 modularity, 0 connectivity, no propagation cost).
    #[must_use]
    pub fn compute(graph: &CodeGraph, config: &AnalysisConfig) -> Self {
        let adj = graph.adjacency();
        let n = adj.len();

        let cycles = find_cycles(&adj, 2);
        let tangle = tangle_ratio(&adj, &cycles);
        let layers = detect_layers(&adj);
        let layer_violations = find_violations(&adj, &layers, config.allowed_layer_skip).len();
        let modularity = if adj.undirected_edge_count() > 0 {
            round_to(modularity(&adj, &detect_communities(&adj)), 4)
        } else {
            0.0
        };
        let fiedler = algebraic_connectivity(&adj, config.spectral_max_nodes).unwrap_or_else(|e| {
            debug!(error = %e, "Algebraic connectivity unavailable");
            0.0
        });
        let propagation_cost = propagation_cost(&adj, config.propagation_cost_max_nodes).ok();
        let god_components = god_components(&adj, config.god_degree_threshold as usize).len();
        let bottlenecks = if n > 2 {
            bottlenecks(&betweenness(&adj, config)).len()
        } else {
            0
        };

        let signals = HealthSignals {
            tangle_ratio: tangle,
            god_components,
            bottlenecks,
            layer_violations,
            avg_file_health: None,
        };

        Self {
            health_score: health_score(&signals, &HealthWeights::simulation()),
            nodes: n,
            edges: graph.edge_count(),
            cycles: cycles.len(),
            tangle_ratio: round_to(tangle, 4),
            layer_violations,
            modularity,
            fiedler,
            propagation_cost,
            god_components,
            bottlenecks,
        }
    }

    /// `(name, value, polarity)` for every metric that has a value.
    #[allow(clippy::cast_precision_loss)]
    fn values(&self) -> Vec<(&'static str, f64, Polarity)> {
        use Polarity::{HigherIsBetter, LowerIsBetter};
        let mut values = vec![
            ("health_score", f64::from(self.health_score), HigherIsBetter),
            ("nodes", self.nodes as f64, HigherIsBetter),
            ("edges", self.edges as f64, HigherIsBetter),
            ("cycles", self.cycles as f64, LowerIsBetter),
            ("tangle_ratio", self.tangle_ratio, LowerIsBetter),
            ("layer_violations", self.layer_violations as f64, LowerIsBetter),
            ("modularity", self.modularity, HigherIsBetter),
            ("fiedler", self.fiedler, HigherIsBetter),
        ];
        if let Some(cost) = self.propagation_cost {
            values.push(("propagation_cost", cost, LowerIsBetter));
        }
        values.push(("god_components", self.god_components as f64, LowerIsBetter));
        values.push(("bottlenecks", self.bottlenecks as f64, LowerIsBetter));
        values
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

/// Which way a metric moved, judged by its polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// No change
    Unchanged,
    /// Moved the healthy way
    Improved,
    /// Moved the unhealthy way
    Degraded,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unchanged => "unchanged",
            Self::Improved => "improved",
            Self::Degraded => "degraded",
        })
    }
}

/// Before/after comparison of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDelta {
    /// Metric name
    pub metric: &'static str,
    /// Baseline value
    pub before: f64,
    /// Simulated value
    pub after: f64,
    /// `after - before`, rounded to 4 places
    pub delta: f64,
    /// Change relative to `|before|` in percent, rounded to 1 place
    pub pct_change: f64,
    /// Healthier, unhealthier or the same
    pub direction: Direction,
}

/// Compare two suites metric by metric. Metrics missing on either side are
/// skipped.
#[must_use]
pub fn metric_deltas(before: &MetricSuite, after: &MetricSuite) -> Vec<MetricDelta> {
    let after_values = after.values();
    before
        .values()
        .into_iter()
        .filter_map(|(metric, b, polarity)| {
            let &(_, a, _) = after_values.iter().find(|(name, _, _)| *name == metric)?;
            Some(metric_delta(metric, b, a, polarity))
        })
        .collect()
}

fn metric_delta(metric: &'static str, before: f64, after: f64, polarity: Polarity) -> MetricDelta {
    let delta = round_to(after - before, 4);
    let pct_change = if before != 0.0 {
        round_to(100.0 * (after - before) / before.abs(), 1)
    } else if delta == 0.0 {
        0.0
    } else {
        100.0
    };
    let direction = if delta == 0.0 {
        Direction::Unchanged
    } else if (delta > 0.0) == (polarity == Polarity::HigherIsBetter) {
        Direction::Improved
    } else {
        Direction::Degraded
    };
    MetricDelta {
        metric,
        before,
        after,
        delta,
        pct_change,
        direction,
    }
}

/// A structural edit to try out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Move one symbol to another file.
    Move {
        /// Symbol name or qualified name
        symbol: String,
        /// Destination file
        target_file: PathBuf,
    },
    /// Move a symbol plus the private helpers it calls in its own file.
    Extract {
        /// Symbol name or qualified name
        symbol: String,
        /// Destination file
        target_file: PathBuf,
    },
    /// Fold every symbol of `file_b` into `file_a`.
    Merge {
        /// Surviving file
        file_a: PathBuf,
        /// File whose symbols move
        file_b: PathBuf,
    },
    /// Remove a symbol, or every symbol in a file.
    Delete {
        /// Symbol name or file path
        target: String,
    },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move {
                symbol,
                target_file,
            } => write!(f, "move {symbol} -> {}", target_file.display()),
            Self::Extract {
                symbol,
                target_file,
            } => write!(f, "extract {symbol} -> {}", target_file.display()),
            Self::Merge { file_a, file_b } => {
                write!(f, "merge {} <- {}", file_a.display(), file_b.display())
            }
            Self::Delete { target } => write!(f, "delete {target}"),
        }
    }
}

/// What an operation actually changed in the working copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationReport {
    /// Symbols moved or removed
    pub affected: Vec<SymbolId>,
    /// Names of removed symbols (delete only)
    pub removed_names: Vec<String>,
    /// Edges removed with them (delete only)
    pub removed_edges: usize,
}

/// Full outcome of one simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    /// The operation as applied
    pub operation: Operation,
    /// Changes made to the working copy
    pub report: OperationReport,
    /// Metrics of the untouched graph
    pub before: MetricSuite,
    /// Metrics after the operation
    pub after: MetricSuite,
    /// Per-metric comparison
    pub deltas: Vec<MetricDelta>,
}

/// Apply `operation` to a clone of `graph` and diff the metric suites.
///
/// # Errors
///
/// `Error::NotFound` when a named symbol or file does not resolve.
pub fn simulate(
    graph: &CodeGraph,
    operation: &Operation,
    config: &AnalysisConfig,
) -> Result<SimulationResult> {
    let mut working = SimulationGraph::new(graph);
    let report = apply(&mut working, operation)?;
    info!(%operation, affected = report.affected.len(), "Simulating");

    let (before, after) = rayon::join(
        || MetricSuite::compute(graph, config),
        || MetricSuite::compute(&working, config),
    );
    let deltas = metric_deltas(&before, &after);
    Ok(SimulationResult {
        operation: operation.clone(),
        report,
        before,
        after,
        deltas,
    })
}

fn apply(working: &mut SimulationGraph, operation: &Operation) -> Result<OperationReport> {
    match operation {
        Operation::Move {
            symbol,
            target_file,
        } => {
            let id = resolve_symbol(working, symbol)?;
            working.set_file_path(id, target_file);
            Ok(OperationReport {
                affected: vec![id],
                ..OperationReport::default()
            })
        }
        Operation::Extract {
            symbol,
            target_file,
        } => {
            let id = resolve_symbol(working, symbol)?;
            let home = working
                .node(id)
                .map(|n| n.file_path.clone())
                .ok_or_else(|| Error::NotFound(symbol.clone()))?;
            let mut affected = vec![id];
            for callee in working.callees(id) {
                let Some(node) = working.node(callee) else {
                    continue;
                };
                if node.file_path == home && (node.name.starts_with('_') || !node.is_exported) {
                    affected.push(callee);
                }
            }
            for &moved in &affected {
                working.set_file_path(moved, target_file);
            }
            debug!(helpers = affected.len() - 1, "Extracted with private helpers");
            Ok(OperationReport {
                affected,
                ..OperationReport::default()
            })
        }
        Operation::Merge { file_a, file_b } => {
            let into = resolve_file(working, file_a)?;
            let from = resolve_file(working, file_b)?;
            let affected = working.symbols_in_file(&from);
            for &id in &affected {
                working.set_file_path(id, &into);
            }
            Ok(OperationReport {
                affected,
                ..OperationReport::default()
            })
        }
        Operation::Delete { target } => {
            let ids = resolve_target(working, target);
            if ids.is_empty() {
                return Err(Error::NotFound(target.clone()));
            }
            let removed_names = ids
                .iter()
                .filter_map(|&id| working.node(id).map(|n| n.name.clone()))
                .collect();
            let removed_edges = working.remove_nodes(&ids);
            Ok(OperationReport {
                affected: ids,
                removed_names,
                removed_edges,
            })
        }
    }
}

/// Symbols named by `target`: the one symbol it names (qualified name first,
/// then simple name, lowest id on ties), else every symbol in the file with
/// exactly that path, else every symbol in files whose path ends with or
/// contains `target`. Ascending; empty when nothing matches.
#[must_use]
pub fn resolve_target(graph: &CodeGraph, target: &str) -> Vec<SymbolId> {
    if let Ok(id) = resolve_symbol(graph, target) {
        return vec![id];
    }

    let wanted = target.replace('\\', "/");
    let exact = graph.symbols_in_file(Path::new(&wanted));
    if !exact.is_empty() {
        return exact;
    }
    graph
        .nodes()
        .filter(|n| {
            let path = n.file_path.to_string_lossy().replace('\\', "/");
            path.ends_with(&wanted) || path.contains(&wanted)
        })
        .map(|n| n.id)
        .collect()
}

/// One symbol by qualified name, else by simple name; lowest id wins ties.
fn resolve_symbol(graph: &CodeGraph, name: &str) -> Result<SymbolId> {
    graph
        .nodes()
        .find(|n| n.qualified_name == name)
        .or_else(|| graph.nodes().find(|n| n.name == name))
        .map(|n| n.id)
        .ok_or_else(|| Error::NotFound(format!("symbol '{name}'")))
}

/// A file path present in the graph: exact, else the first path ending
/// with `path`.
fn resolve_file(graph: &CodeGraph, path: &Path) -> Result<PathBuf> {
    let wanted = path.to_string_lossy().replace('\\', "/");
    let paths = graph.file_paths();
    paths
        .iter()
        .find(|p| p.to_string_lossy() == wanted)
        .or_else(|| paths.iter().find(|p| p.to_string_lossy().ends_with(&wanted)))
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("file '{}'", path.display())))
}

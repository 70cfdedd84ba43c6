//! Canonical metric snapshots.
//!
//! A snapshot freezes the canonical health score and the metrics behind it
//! at one point in time. The history is append-only and feeds trend and
//! forecast reports.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::Serialize;

use crate::algo::centrality::{bottlenecks, god_components};
use crate::algo::health::{HealthSignals, HealthWeights, health_score};
use crate::algo::layers::{detect_layers, find_violations};
use crate::algo::scc::{find_cycles, tangle_ratio};
use crate::algo::round_to;
use crate::config::AnalysisConfig;
use crate::graph::CodeGraph;
use crate::types::{FileStats, Snapshot, SymbolComplexity, SymbolId};

/// Cognitive complexity at which a long symbol becomes a brain method.
pub const BRAIN_METHOD_COMPLEXITY: f64 = 25.0;

/// Body length at which a complex symbol becomes a brain method.
pub const BRAIN_METHOD_LINES: u32 = 50;

/// Metric names a snapshot can be queried by.
pub const SNAPSHOT_METRICS: [&str; 12] = [
    "files",
    "symbols",
    "edges",
    "cycles",
    "god_components",
    "bottlenecks",
    "dead_exports",
    "layer_violations",
    "health_score",
    "tangle_ratio",
    "avg_complexity",
    "brain_methods",
];

/// Everything besides the graph that goes into a snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotInputs<'a> {
    /// Indexed file count
    pub files: usize,
    /// Stored betweenness per symbol
    pub betweenness: HashMap<SymbolId, f64>,
    /// Recorded per-file stats (only `health_score` is used)
    pub file_stats: Vec<FileStats>,
    /// Recorded per-symbol complexity
    pub complexity: Vec<SymbolComplexity>,
    /// Optional label
    pub tag: Option<&'a str>,
    /// What produced the snapshot
    pub source: &'a str,
    /// Branch at capture time
    pub git_branch: Option<&'a str>,
    /// Commit at capture time
    pub git_commit: Option<&'a str>,
}

/// Value of a named metric, `None` for unknown names.
#[must_use]
pub fn metric_value(snapshot: &Snapshot, name: &str) -> Option<f64> {
    Some(match name {
        "files" => f64::from(snapshot.files),
        "symbols" => f64::from(snapshot.symbols),
        "edges" => f64::from(snapshot.edges),
        "cycles" => f64::from(snapshot.cycles),
        "god_components" => f64::from(snapshot.god_components),
        "bottlenecks" => f64::from(snapshot.bottlenecks),
        "dead_exports" => f64::from(snapshot.dead_exports),
        "layer_violations" => f64::from(snapshot.layer_violations),
        "health_score" => f64::from(snapshot.health_score),
        "tangle_ratio" => snapshot.tangle_ratio,
        "avg_complexity" => snapshot.avg_complexity,
        "brain_methods" => f64::from(snapshot.brain_methods),
        _ => return None,
    })
}

/// Compute the canonical metric set for `graph`. The returned snapshot has
/// id 0 until it is stored.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn compute_snapshot(
    graph: &CodeGraph,
    inputs: &SnapshotInputs<'_>,
    config: &AnalysisConfig,
) -> Snapshot {
    let adj = graph.adjacency();
    let cycles = find_cycles(&adj, 2);
    let tangle = tangle_ratio(&adj, &cycles);
    let layers = detect_layers(&adj);
    let violations = find_violations(&adj, &layers, config.allowed_layer_skip).len();
    let gods = god_components(&adj, config.god_degree_threshold as usize).len();
    let bottleneck_count = bottlenecks(&inputs.betweenness).len();

    let health_values: Vec<f64> = inputs.file_stats.iter().filter_map(|s| s.health_score).collect();
    let avg_file_health = (!health_values.is_empty())
        .then(|| health_values.iter().sum::<f64>() / health_values.len() as f64);
    let health = health_score(
        &HealthSignals {
            tangle_ratio: tangle,
            god_components: gods,
            bottlenecks: bottleneck_count,
            layer_violations: violations,
            avg_file_health,
        },
        &HealthWeights::canonical(),
    );

    let avg_complexity = if inputs.complexity.is_empty() {
        0.0
    } else {
        round_to(
            inputs
                .complexity
                .iter()
                .map(|c| c.cognitive_complexity)
                .sum::<f64>()
                / inputs.complexity.len() as f64,
            2,
        )
    };
    let brain_methods = inputs
        .complexity
        .iter()
        .filter(|c| {
            c.cognitive_complexity >= BRAIN_METHOD_COMPLEXITY && c.line_count >= BRAIN_METHOD_LINES
        })
        .count();

    let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
    Snapshot {
        id: 0,
        timestamp: Utc::now().timestamp(),
        tag: inputs.tag.map(str::to_string),
        source: inputs.source.to_string(),
        git_branch: inputs.git_branch.map(str::to_string),
        git_commit: inputs.git_commit.map(str::to_string),
        files: count(inputs.files),
        symbols: count(graph.node_count()),
        edges: count(graph.edge_count()),
        cycles: count(cycles.len()),
        god_components: count(gods),
        bottlenecks: count(bottleneck_count),
        dead_exports: count(dead_exports(graph).len()),
        layer_violations: count(violations),
        health_score: health,
        tangle_ratio: round_to(tangle, 4),
        avg_complexity,
        brain_methods: count(brain_methods),
    }
}

/// Exported symbols that nothing outside their own file uses, ascending.
#[must_use]
pub fn dead_exports(graph: &CodeGraph) -> Vec<SymbolId> {
    let mut used_externally: HashSet<SymbolId> = HashSet::new();
    for (source, target, _) in graph.edges() {
        let (Some(s), Some(t)) = (graph.node(source), graph.node(target)) else {
            continue;
        };
        if s.file_path != t.file_path {
            used_externally.insert(target);
        }
    }
    graph
        .nodes()
        .filter(|n| n.is_exported && !used_externally.contains(&n.id))
        .map(|n| n.id)
        .collect()
}

/// Change between two consecutive snapshots for one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    /// Snapshot id
    pub snapshot_id: i64,
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    /// Value at this snapshot
    pub value: f64,
    /// Change from the previous (older) snapshot, if any
    pub delta: Option<f64>,
}

/// History of `metric` oldest first, with step deltas.
///
/// `snapshots` may come in any order.
#[must_use]
pub fn trend(snapshots: &[Snapshot], metric: &str) -> Vec<TrendPoint> {
    let mut ordered: Vec<&Snapshot> = snapshots.iter().collect();
    ordered.sort_by_key(|s| (s.timestamp, s.id));
    let mut previous: Option<f64> = None;
    ordered
        .into_iter()
        .filter_map(|s| {
            let value = metric_value(s, metric)?;
            let delta = previous.map(|p| round_to(value - p, 4));
            previous = Some(value);
            Some(TrendPoint {
                snapshot_id: s.id,
                timestamp: s.timestamp,
                value,
                delta,
            })
        })
        .collect()
}

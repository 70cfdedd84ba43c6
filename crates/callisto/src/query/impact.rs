//! Blast radius of a symbol.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;

use serde::Serialize;

use crate::algo::centrality::{pagerank, personalized_pagerank};
use crate::algo::round_to;
use crate::error::{Error, Result};
use crate::graph::CodeGraph;
use crate::types::SymbolId;

/// A file containing at least one dependent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffectedFile {
    /// Workspace-relative path
    pub path: PathBuf,
    /// Dependents in this file
    pub symbols: usize,
    /// Highest global PageRank among those dependents
    pub importance: f64,
}

/// Everything that transitively depends on a symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactReport {
    /// The symbol under change
    pub target: SymbolId,
    /// Transitive dependents, ascending; the target itself is excluded
    pub affected_symbol_ids: Vec<SymbolId>,
    /// Dependents one hop away, ascending
    pub direct_callers: Vec<SymbolId>,
    /// Files holding dependents, most important first
    pub affected_files: Vec<AffectedFile>,
    /// Sum of personalized PageRank (seeded at the target) over dependents
    pub weighted_importance: f64,
    /// Dependents as a share of all other symbols
    pub reach_ratio: f64,
}

/// Reverse reachability from `target`, optionally bounded to `depth` hops.
///
/// # Errors
///
/// `Error::NotFound` if `target` is not in the graph.
#[allow(clippy::cast_precision_loss)]
pub fn impact(
    graph: &CodeGraph,
    target: SymbolId,
    depth: Option<usize>,
    damping: f64,
) -> Result<ImpactReport> {
    let adj = graph.adjacency();
    let start = adj
        .index_of(target)
        .ok_or_else(|| Error::NotFound(format!("symbol {target}")))?;

    let mut hops: HashMap<usize, usize> = HashMap::from([(start, 0)]);
    let mut queue = VecDeque::from([start]);
    while let Some(u) = queue.pop_front() {
        let d = hops[&u];
        if depth.is_some_and(|max| d >= max) {
            continue;
        }
        for &caller in adj.inc(u) {
            if !hops.contains_key(&caller) {
                hops.insert(caller, d + 1);
                queue.push_back(caller);
            }
        }
    }
    hops.remove(&start);

    let mut affected: Vec<SymbolId> = hops.keys().map(|&i| adj.id(i)).collect();
    affected.sort_unstable();
    let direct_callers = graph.callers(target);

    let global = pagerank(&adj, damping);
    let personalized = personalized_pagerank(&adj, target, damping);
    let weighted: f64 = affected
        .iter()
        .map(|id| personalized.get(id).copied().unwrap_or(0.0))
        .sum();

    let mut files: BTreeMap<PathBuf, (usize, f64)> = BTreeMap::new();
    for id in &affected {
        let Some(node) = graph.node(*id) else { continue };
        let entry = files.entry(node.file_path.clone()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 = entry.1.max(global.get(id).copied().unwrap_or(0.0));
    }
    let mut affected_files: Vec<AffectedFile> = files
        .into_iter()
        .map(|(path, (symbols, importance))| AffectedFile {
            path,
            symbols,
            importance: round_to(importance, 6),
        })
        .collect();
    affected_files.sort_by(|a, b| {
        b.importance
            .total_cmp(&a.importance)
            .then_with(|| a.path.cmp(&b.path))
    });

    let others = adj.len().saturating_sub(1);
    let reach_ratio = if others == 0 {
        0.0
    } else {
        round_to(affected.len() as f64 / others as f64, 4)
    };

    Ok(ImpactReport {
        target,
        affected_symbol_ids: affected,
        direct_callers,
        affected_files,
        weighted_importance: round_to(weighted, 6),
        reach_ratio,
    })
}

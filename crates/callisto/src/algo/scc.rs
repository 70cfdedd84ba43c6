//! Strongly connected components, tangle and propagation cost.

use std::collections::VecDeque;

use petgraph::algo::tarjan_scc;
use serde::Serialize;

use super::centrality::edge_betweenness_directed;
use super::round_to;
use crate::error::AlgorithmError;
use crate::graph::Adjacency;
use crate::types::SymbolId;

/// SCCs larger than this fall back to the degree heuristic in
/// [`weakest_edge`].
pub const WEAKEST_EDGE_EXACT_MAX: usize = 500;

/// A strongly connected component with at least two members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    /// Members, ascending
    pub members: Vec<SymbolId>,
}

impl Cycle {
    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The edge to cut first when breaking a cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeakestEdge {
    /// Edge source
    pub source: SymbolId,
    /// Edge target
    pub target: SymbolId,
    /// Why this edge was chosen
    pub reason: String,
}

/// SCCs with at least `min_size` members (never below 2), largest first.
#[must_use]
pub fn find_cycles(adj: &Adjacency, min_size: usize) -> Vec<Cycle> {
    let min_size = min_size.max(2);
    let graph = adj.to_digraph();
    let mut cycles: Vec<Cycle> = tarjan_scc(&graph)
        .into_iter()
        .filter(|c| c.len() >= min_size)
        .map(|c| {
            let mut members: Vec<SymbolId> = c.into_iter().map(|ix| adj.id(graph[ix])).collect();
            members.sort_unstable();
            Cycle { members }
        })
        .collect();
    cycles.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.members.cmp(&b.members)));
    cycles
}

/// Fraction of symbols that sit in a cycle.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn tangle_ratio(adj: &Adjacency, cycles: &[Cycle]) -> f64 {
    if adj.is_empty() {
        return 0.0;
    }
    let in_cycles: usize = cycles.iter().map(Cycle::len).sum();
    in_cycles as f64 / adj.len() as f64
}

/// Share of ordered pairs `(i, j)`, `i != j`, where `j` is reachable from
/// `i`. 0 means fully decoupled, 1 means everything reaches everything.
///
/// Quadratic in node count, so refused above `max_nodes`.
#[allow(clippy::cast_precision_loss)]
pub fn propagation_cost(adj: &Adjacency, max_nodes: usize) -> Result<f64, AlgorithmError> {
    let n = adj.len();
    if n > max_nodes {
        return Err(AlgorithmError::SizeGate {
            algorithm: "propagation_cost",
            nodes: n,
            limit: max_nodes,
        });
    }
    if n <= 1 {
        return Ok(0.0);
    }

    let mut reachable_pairs = 0usize;
    let mut seen = vec![usize::MAX; n];
    let mut queue = VecDeque::new();
    for start in 0..n {
        seen[start] = start;
        queue.push_back(start);
        while let Some(u) = queue.pop_front() {
            for &v in adj.out(u) {
                if seen[v] != start {
                    seen[v] = start;
                    reachable_pairs += 1;
                    queue.push_back(v);
                }
            }
        }
    }
    Ok(round_to(reachable_pairs as f64 / (n * (n - 1)) as f64, 4))
}

/// The single edge whose removal most likely breaks `cycle`.
///
/// Highest directed edge betweenness inside the SCC, or for very large
/// SCCs the edge whose source fans out most and whose target fans in most.
#[must_use]
pub fn weakest_edge(adj: &Adjacency, cycle: &Cycle) -> Option<WeakestEdge> {
    let members: Vec<usize> = cycle.members.iter().filter_map(|&id| adj.index_of(id)).collect();
    if members.len() < 2 {
        return None;
    }
    let local: std::collections::HashMap<usize, usize> =
        members.iter().enumerate().map(|(l, &g)| (g, l)).collect();
    let lists: Vec<Vec<usize>> = members
        .iter()
        .map(|&g| adj.out(g).iter().filter_map(|v| local.get(v).copied()).collect())
        .collect();
    let internal: Vec<(usize, usize)> = lists
        .iter()
        .enumerate()
        .flat_map(|(u, vs)| vs.iter().map(move |&v| (u, v)))
        .collect();
    if internal.is_empty() {
        return None;
    }

    if members.len() <= WEAKEST_EDGE_EXACT_MAX {
        let scores = edge_betweenness_directed(&lists);
        let mut best: Option<((usize, usize), f64)> = None;
        for &edge in &internal {
            let score = scores.get(&edge).copied().unwrap_or(0.0);
            if best.is_none_or(|(_, b)| score > b) {
                best = Some((edge, score));
            }
        }
        if let Some(((u, v), score)) = best {
            return Some(WeakestEdge {
                source: adj.id(members[u]),
                target: adj.id(members[v]),
                reason: format!("highest edge betweenness in cycle ({score:.3})"),
            });
        }
    }

    let mut out_deg = vec![0usize; members.len()];
    let mut in_deg = vec![0usize; members.len()];
    for &(u, v) in &internal {
        out_deg[u] += 1;
        in_deg[v] += 1;
    }
    let &(u, v) = internal
        .iter()
        .rev()
        .max_by_key(|&&(u, v)| (out_deg[u], in_deg[v]))?;
    let plural = if out_deg[u] == 1 { "" } else { "s" };
    Some(WeakestEdge {
        source: adj.id(members[u]),
        target: adj.id(members[v]),
        reason: format!(
            "source has {} outgoing edge{plural} in cycle, target has {} incoming",
            out_deg[u], in_deg[v]
        ),
    })
}

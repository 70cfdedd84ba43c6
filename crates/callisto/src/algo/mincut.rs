//! Module boundary analysis via max-flow / min-cut.
//!
//! For every pair of communities joined by at least one edge, the minimum
//! edge cut between one representative connected pair is compared with the
//! number of edges crossing the boundary. A thin cut relative to the
//! crossing traffic means the boundary hangs on very few links.

#![allow(clippy::cast_precision_loss)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::Serialize;

use super::centrality::edge_betweenness;
use super::round_to;
use crate::error::AlgorithmError;
use crate::graph::Adjacency;
use crate::types::SymbolId;

/// Boundaries with `min_cut / cross_edges` below this are fragile.
pub const FRAGILE_THINNESS: f64 = 0.4;

/// Cut edges listed per boundary.
pub const MAX_CUT_EDGES: usize = 5;

/// Default number of boundaries and leak edges reported.
pub const DEFAULT_TOP_N: usize = 10;

/// One community pair and how thin the cut between them is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundaryReport {
    /// Lower community id
    pub cluster_a: usize,
    /// Higher community id
    pub cluster_b: usize,
    /// Directed edges between the two communities, either direction
    pub cross_edges: usize,
    /// Size of the minimum edge cut between the representative pair
    pub min_cut: usize,
    /// `min_cut / cross_edges`, rounded to 2 places
    pub thinness: f64,
    /// `thinness < FRAGILE_THINNESS`
    pub fragile: bool,
    /// Up to [`MAX_CUT_EDGES`] edges of the cut, ascending
    pub cut_edges: Vec<(SymbolId, SymbolId)>,
}

/// A cross-community edge carrying a lot of shortest-path traffic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeakEdge {
    /// Endpoint with the smaller dense index
    pub source: SymbolId,
    /// Other endpoint
    pub target: SymbolId,
    /// Community of `source`
    pub source_cluster: usize,
    /// Community of `target`
    pub target_cluster: usize,
    /// Normalized edge betweenness, rounded to 4 places
    pub betweenness: f64,
    /// What to do about it
    pub suggestion: String,
}

/// Min-cut report for every community pair with crossing edges, thinnest
/// first, at most `top_n`.
///
/// The flow runs on the undirected projection of the subgraph induced by
/// the two communities, so the cut never exceeds the crossing edge count.
pub fn analyze_boundaries(
    adj: &Adjacency,
    partition: &[usize],
    top_n: usize,
    max_nodes: usize,
) -> Result<Vec<BoundaryReport>, AlgorithmError> {
    gate(adj, max_nodes)?;

    // (c1, c2) with c1 < c2 -> directed crossing edges in discovery order
    let mut crossings: BTreeMap<(usize, usize), Vec<(usize, usize)>> = BTreeMap::new();
    for (u, v) in adj.directed_edges() {
        let (cu, cv) = (partition[u], partition[v]);
        if cu != cv {
            crossings.entry((cu.min(cv), cu.max(cv))).or_default().push((u, v));
        }
    }

    let mut reports: Vec<BoundaryReport> = crossings
        .into_iter()
        .map(|((a, b), edges)| {
            let (source, sink) = edges[0];
            let members: Vec<usize> = (0..adj.len())
                .filter(|&i| partition[i] == a || partition[i] == b)
                .collect();
            let cut = min_cut(adj, &members, source, sink);
            let thinness = round_to(cut.len() as f64 / edges.len() as f64, 2);
            BoundaryReport {
                cluster_a: a,
                cluster_b: b,
                cross_edges: edges.len(),
                min_cut: cut.len(),
                thinness,
                fragile: thinness < FRAGILE_THINNESS,
                cut_edges: cut
                    .into_iter()
                    .take(MAX_CUT_EDGES)
                    .map(|(u, v)| (adj.id(u), adj.id(v)))
                    .collect(),
            }
        })
        .collect();

    reports.sort_by(|x, y| {
        x.thinness
            .total_cmp(&y.thinness)
            .then_with(|| (x.cluster_a, x.cluster_b).cmp(&(y.cluster_a, y.cluster_b)))
    });
    reports.truncate(top_n);
    Ok(reports)
}

/// Cross-community edges ranked by undirected edge betweenness, at most
/// `top_n`.
pub fn leak_edges(
    adj: &Adjacency,
    partition: &[usize],
    top_n: usize,
    max_nodes: usize,
) -> Result<Vec<LeakEdge>, AlgorithmError> {
    gate(adj, max_nodes)?;
    let mut ranked: Vec<((usize, usize), f64)> = edge_betweenness(adj)
        .into_iter()
        .filter(|&((u, v), _)| partition[u] != partition[v])
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Ok(ranked
        .into_iter()
        .take(top_n)
        .map(|((u, v), score)| {
            let (source, target) = (adj.id(u), adj.id(v));
            LeakEdge {
                source,
                target,
                source_cluster: partition[u],
                target_cluster: partition[v],
                betweenness: round_to(score, 4),
                suggestion: format!("Extract interface between {source} and {target}"),
            }
        })
        .collect())
}

/// One-line summary of a boundary analysis.
#[must_use]
pub fn verdict(reports: &[BoundaryReport]) -> String {
    if reports.is_empty() {
        return "No cross-cluster boundaries found".to_string();
    }
    let fragile = reports.iter().filter(|r| r.fragile).count();
    if fragile == 0 {
        format!(
            "{} boundaries analyzed, all adequately isolated",
            reports.len()
        )
    } else {
        format!("{} boundaries analyzed, {fragile} fragile", reports.len())
    }
}

fn gate(adj: &Adjacency, max_nodes: usize) -> Result<(), AlgorithmError> {
    if adj.len() > max_nodes {
        return Err(AlgorithmError::SizeGate {
            algorithm: "mincut",
            nodes: adj.len(),
            limit: max_nodes,
        });
    }
    Ok(())
}

/// Edmonds–Karp with unit capacities on the undirected subgraph induced by
/// `members`. Returns the cut as sorted `(inside, outside)` dense pairs.
fn min_cut(adj: &Adjacency, members: &[usize], source: usize, sink: usize) -> Vec<(usize, usize)> {
    let allowed_set: HashSet<usize> = members.iter().copied().collect();
    let allowed = &allowed_set;
    let mut residual: HashMap<(usize, usize), i32> = HashMap::new();
    for &u in members {
        for &v in adj.neighbors(u) {
            if allowed.contains(&v) {
                residual.insert((u, v), 1);
            }
        }
    }
    let neighbors = move |u: usize| {
        adj.neighbors(u)
            .iter()
            .copied()
            .filter(move |v| allowed.contains(v))
    };

    loop {
        let mut parent: HashMap<usize, usize> = HashMap::from([(source, source)]);
        let mut queue = VecDeque::from([source]);
        while let Some(u) = queue.pop_front() {
            if u == sink {
                break;
            }
            for v in neighbors(u) {
                if !parent.contains_key(&v) && residual.get(&(u, v)).copied().unwrap_or(0) > 0 {
                    parent.insert(v, u);
                    queue.push_back(v);
                }
            }
        }
        if !parent.contains_key(&sink) {
            break;
        }
        let mut v = sink;
        while v != source {
            let u = parent[&v];
            *residual.entry((u, v)).or_insert(0) -= 1;
            *residual.entry((v, u)).or_insert(0) += 1;
            v = u;
        }
    }

    let mut reachable: HashSet<usize> = HashSet::from([source]);
    let mut queue = VecDeque::from([source]);
    while let Some(u) = queue.pop_front() {
        for v in neighbors(u) {
            if residual.get(&(u, v)).copied().unwrap_or(0) > 0 && reachable.insert(v) {
                queue.push_back(v);
            }
        }
    }

    let mut cut: Vec<(usize, usize)> = reachable
        .iter()
        .flat_map(|&u| neighbors(u).map(move |v| (u, v)))
        .filter(|(_, v)| !reachable.contains(v))
        .collect();
    cut.sort_unstable();
    cut
}

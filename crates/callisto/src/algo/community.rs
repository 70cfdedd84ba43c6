//! Community detection and cluster quality.
//!
//! Partitions are `Vec<usize>` indexed by dense node index, holding dense
//! community ids `0..k`. All work happens on the undirected, unweighted
//! projection.
//!
//! ## Louvain
//!
//! Local moving followed by aggregation, repeated until a level moves no
//! node. Nodes are visited in an order shuffled by a fixed seed, so the
//! result is deterministic. A partition scoring below the single-community
//! baseline (Q = 0) is replaced by that baseline.

// Edge and node counts fit comfortably in f64's exact integer range.
#![allow(clippy::cast_precision_loss)]

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;

use super::{SEED, densify, group_by_label, round_to};
use crate::error::AlgorithmError;
use crate::graph::{Adjacency, CodeGraph};

/// Clusters bigger than this are labelled by directory share.
pub const MEGA_CLUSTER_MIN_SIZE: usize = 100;

/// Clusters holding more than this share of all nodes are labelled by
/// directory share.
pub const MEGA_CLUSTER_SHARE: f64 = 0.4;

/// Minimum modularity gain for a move to count.
const MIN_GAIN: f64 = 1e-12;

/// Modularity and per-cluster conductance of a partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterQuality {
    /// Newman modularity Q, rounded to 4 places
    pub modularity: f64,
    /// Conductance per cluster id, each in `[0, 1]`
    pub per_cluster: BTreeMap<usize, f64>,
    /// Mean of `per_cluster`, rounded to 4 places
    pub mean_conductance: f64,
}

/// Louvain communities of the undirected projection.
///
/// A graph without edges yields one community per node.
pub fn louvain(adj: &Adjacency) -> Result<Vec<usize>, AlgorithmError> {
    let n = adj.len();
    if n == 0 {
        return Err(AlgorithmError::EmptyGraph);
    }
    if adj.undirected_edge_count() == 0 {
        return Ok((0..n).collect());
    }

    let mut level = Level::from_adjacency(adj);
    let mut membership: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut levels = 0usize;

    loop {
        let (moved, mut communities) = level.local_moving(&mut rng);
        if !moved {
            break;
        }
        let count = densify(&mut communities);
        for m in &mut membership {
            *m = communities[*m];
        }
        levels += 1;
        if count == level.len() {
            break;
        }
        level = level.aggregate(&communities, count);
    }
    densify(&mut membership);

    let q = modularity(adj, &membership);
    tracing::debug!(levels, modularity = q, "Louvain finished");
    if q < 0.0 {
        return Ok(vec![0; n]);
    }
    Ok(membership)
}

/// Weighted graph for one Louvain level.
struct Level {
    neighbors: Vec<Vec<(usize, f64)>>,
    self_loops: Vec<f64>,
    degree: Vec<f64>,
    two_m: f64,
}

impl Level {
    fn from_adjacency(adj: &Adjacency) -> Self {
        let neighbors: Vec<Vec<(usize, f64)>> = (0..adj.len())
            .map(|i| adj.neighbors(i).iter().map(|&j| (j, 1.0)).collect())
            .collect();
        let degree: Vec<f64> = neighbors.iter().map(|ns| ns.len() as f64).collect();
        let two_m = degree.iter().sum();
        Self {
            self_loops: vec![0.0; adj.len()],
            neighbors,
            degree,
            two_m,
        }
    }

    fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Move nodes greedily until no single move improves modularity.
    fn local_moving(&self, rng: &mut StdRng) -> (bool, Vec<usize>) {
        let n = self.len();
        let mut community: Vec<usize> = (0..n).collect();
        let mut total: Vec<f64> = self.degree.clone();
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);

        let mut any_move = false;
        loop {
            let mut moved = false;
            for &i in &order {
                let k_i = self.degree[i];
                let current = community[i];
                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for &(j, w) in &self.neighbors[i] {
                    *links.entry(community[j]).or_insert(0.0) += w;
                }

                total[current] -= k_i;
                let gain = |c: usize, w: f64| w - total[c] * k_i / self.two_m;
                let mut best = current;
                let mut best_gain = gain(current, links.get(&current).copied().unwrap_or(0.0));
                for (&c, &w) in &links {
                    let g = gain(c, w);
                    if g > best_gain + MIN_GAIN {
                        best = c;
                        best_gain = g;
                    }
                }
                total[best] += k_i;

                if best != current {
                    community[i] = best;
                    moved = true;
                    any_move = true;
                }
            }
            if !moved {
                break;
            }
        }
        (any_move, community)
    }

    /// Collapse each community into one node.
    fn aggregate(&self, community: &[usize], count: usize) -> Self {
        let mut weights: Vec<HashMap<usize, f64>> = vec![HashMap::new(); count];
        let mut self_loops = vec![0.0; count];
        for (i, ns) in self.neighbors.iter().enumerate() {
            let ci = community[i];
            self_loops[ci] += self.self_loops[i];
            for &(j, w) in ns {
                let cj = community[j];
                if ci == cj {
                    // Each internal edge is seen from both ends.
                    self_loops[ci] += w / 2.0;
                } else {
                    *weights[ci].entry(cj).or_insert(0.0) += w;
                }
            }
        }
        let neighbors: Vec<Vec<(usize, f64)>> = weights
            .into_iter()
            .map(|m| {
                let mut v: Vec<(usize, f64)> = m.into_iter().collect();
                v.sort_unstable_by_key(|&(c, _)| c);
                v
            })
            .collect();
        let degree: Vec<f64> = neighbors
            .iter()
            .zip(&self_loops)
            .map(|(ns, &l)| ns.iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * l)
            .collect();
        Self {
            neighbors,
            self_loops,
            degree,
            two_m: self.two_m,
        }
    }
}

/// Clauset–Newman–Moore style greedy agglomeration.
///
/// Starts from singletons and repeatedly merges the connected pair with the
/// largest modularity gain until no merge helps.
pub fn greedy_modularity(adj: &Adjacency) -> Result<Vec<usize>, AlgorithmError> {
    let n = adj.len();
    if n == 0 {
        return Err(AlgorithmError::EmptyGraph);
    }
    let m = adj.undirected_edge_count() as f64;
    if m == 0.0 {
        return Ok((0..n).collect());
    }

    let mut membership: Vec<usize> = (0..n).collect();
    // e[i][j]: fraction of edge ends joining community i to j (i != j).
    let mut e: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
    for (u, v) in adj.undirected_edges() {
        *e[u].entry(v).or_insert(0.0) += 1.0 / (2.0 * m);
        *e[v].entry(u).or_insert(0.0) += 1.0 / (2.0 * m);
    }
    let mut a: Vec<f64> = (0..n).map(|i| adj.degree(i) as f64 / (2.0 * m)).collect();
    let mut alive = vec![true; n];

    loop {
        let mut best: Option<(f64, usize, usize)> = None;
        for i in (0..n).filter(|&i| alive[i]) {
            for (&j, &eij) in &e[i] {
                if j <= i {
                    continue;
                }
                let dq = 2.0 * (eij - a[i] * a[j]);
                if best.is_none_or(|(b, _, _)| dq > b + MIN_GAIN) {
                    best = Some((dq, i, j));
                }
            }
        }
        let Some((dq, i, j)) = best else { break };
        if dq <= 0.0 {
            break;
        }

        // Merge j into i.
        let ej = std::mem::take(&mut e[j]);
        for (k, w) in ej {
            if k == i {
                continue;
            }
            *e[i].entry(k).or_insert(0.0) += w;
            if let Some(row) = e.get_mut(k) {
                let moved = row.remove(&j).unwrap_or(0.0);
                *row.entry(i).or_insert(0.0) += moved;
            }
        }
        e[i].remove(&j);
        a[i] += a[j];
        a[j] = 0.0;
        alive[j] = false;
        for label in &mut membership {
            if *label == j {
                *label = i;
            }
        }
    }

    densify(&mut membership);
    Ok(membership)
}

/// Louvain, falling back to greedy modularity, falling back to singletons.
#[must_use]
pub fn detect_communities(adj: &Adjacency) -> Vec<usize> {
    match louvain(adj) {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(error = %e, "Louvain failed; trying greedy modularity");
            greedy_modularity(adj).unwrap_or_else(|_| (0..adj.len()).collect())
        }
    }
}

/// Newman modularity `Q = Σ_c [L_c/m − (d_c/2m)²]`. 0 for edgeless graphs.
#[must_use]
pub fn modularity(adj: &Adjacency, partition: &[usize]) -> f64 {
    let m = adj.undirected_edge_count() as f64;
    if m == 0.0 || partition.is_empty() {
        return 0.0;
    }
    let count = partition.iter().max().map_or(0, |c| c + 1);
    let mut internal = vec![0.0; count];
    let mut degree = vec![0.0; count];
    for (u, v) in adj.undirected_edges() {
        if partition[u] == partition[v] {
            internal[partition[u]] += 1.0;
        }
    }
    for (i, &c) in partition.iter().enumerate() {
        degree[c] += adj.degree(i) as f64;
    }
    internal
        .iter()
        .zip(&degree)
        .map(|(l, d)| l / m - (d / (2.0 * m)).powi(2))
        .sum()
}

/// Conductance `cut(S, S̄) / min(vol(S), vol(S̄))` of each cluster.
///
/// Singleton clusters and clusters with an empty side score 0.
#[must_use]
pub fn conductance(adj: &Adjacency, partition: &[usize]) -> BTreeMap<usize, f64> {
    let groups = group_by_label(partition);
    let total_volume: usize = (0..adj.len()).map(|i| adj.degree(i)).sum();
    let mut result = BTreeMap::new();
    for (cid, members) in groups.iter().enumerate() {
        if members.is_empty() {
            continue;
        }
        if members.len() < 2 {
            result.insert(cid, 0.0);
            continue;
        }
        let volume: usize = members.iter().map(|&i| adj.degree(i)).sum();
        let cut: usize = members
            .iter()
            .flat_map(|&i| adj.neighbors(i))
            .filter(|&&j| partition[j] != cid)
            .count();
        let min_volume = volume.min(total_volume - volume);
        let value = if min_volume == 0 {
            0.0
        } else {
            round_to(cut as f64 / min_volume as f64, 4)
        };
        result.insert(cid, value);
    }
    result
}

/// Modularity plus conductance summary.
#[must_use]
pub fn cluster_quality(adj: &Adjacency, partition: &[usize]) -> ClusterQuality {
    if adj.is_empty() || partition.is_empty() {
        return ClusterQuality {
            modularity: 0.0,
            per_cluster: BTreeMap::new(),
            mean_conductance: 0.0,
        };
    }
    let per_cluster = conductance(adj, partition);
    let mean = if per_cluster.is_empty() {
        0.0
    } else {
        per_cluster.values().sum::<f64>() / per_cluster.len() as f64
    };
    ClusterQuality {
        modularity: round_to(modularity(adj, partition), 4),
        per_cluster,
        mean_conductance: round_to(mean, 4),
    }
}

/// Human-readable label per cluster.
///
/// `dir/Name` from the cluster's most common directory and its best anchor
/// symbol (struct, trait, enum, ... by PageRank, then any symbol by
/// PageRank). Very large clusters get a directory breakdown such as
/// `"db 60% + query 30%"` instead.
#[must_use]
pub fn label_clusters(
    graph: &CodeGraph,
    adj: &Adjacency,
    partition: &[usize],
    pagerank: &[f64],
) -> BTreeMap<usize, String> {
    let n = adj.len();
    let mut labels = BTreeMap::new();
    for (cid, members) in group_by_label(partition).into_iter().enumerate() {
        if members.is_empty() {
            continue;
        }
        let nodes: Vec<(usize, &crate::graph::NodeData)> = members
            .iter()
            .filter_map(|&i| graph.node(adj.id(i)).map(|node| (i, node)))
            .collect();

        let mut dir_counts: BTreeMap<String, usize> = BTreeMap::new();
        for (_, node) in &nodes {
            *dir_counts.entry(parent_dir(&node.file_path)).or_insert(0) += 1;
        }
        let mut ranked_dirs: Vec<(&String, &usize)> = dir_counts.iter().collect();
        ranked_dirs.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        let is_mega = members.len() > MEGA_CLUSTER_MIN_SIZE
            || members.len() as f64 > n as f64 * MEGA_CLUSTER_SHARE;
        if is_mega && dir_counts.len() > 1 {
            let parts: Vec<String> = ranked_dirs
                .iter()
                .take(3)
                .map(|(dir, count)| {
                    let short = if dir.is_empty() { "." } else { short_dir(dir) };
                    let pct = **count as f64 * 100.0 / members.len() as f64;
                    format!("{short} {pct:.0}%")
                })
                .collect();
            labels.insert(cid, parts.join(" + "));
            continue;
        }

        let score = |i: usize| pagerank.get(i).copied().unwrap_or(0.0);
        let best = |anchors_only: bool| {
            nodes
                .iter()
                .filter(|(_, node)| !anchors_only || node.kind.is_anchor())
                .fold(None::<(f64, &str)>, |best, (i, node)| match best {
                    Some((b, _)) if score(*i) <= b => best,
                    _ => Some((score(*i), node.name.as_str())),
                })
                .map(|(_, name)| name)
        };
        let name = best(true).or_else(|| best(false));
        let dir = ranked_dirs.first().map_or("", |(d, _)| short_dir(d));

        let label = match (name, dir.is_empty()) {
            (Some(name), false) => format!("{dir}/{name}"),
            (Some(name), true) => name.to_string(),
            (None, false) => dir.to_string(),
            (None, true) => format!("cluster-{cid}"),
        };
        labels.insert(cid, label);
    }
    labels
}

fn parent_dir(path: &Path) -> String {
    path.parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default()
}

fn short_dir(dir: &str) -> &str {
    dir.trim_end_matches('/').rsplit('/').next().unwrap_or(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::{graph, node};
    use crate::types::{EdgeKind, SymbolId, SymbolKind};
    use proptest::prelude::*;

    /// Two triangles joined by a single edge 3-4.
    fn barbell() -> Adjacency {
        graph(
            &[1, 2, 3, 4, 5, 6],
            &[(1, 2), (2, 3), (3, 1), (4, 5), (5, 6), (6, 4), (3, 4)],
        )
        .adjacency()
    }

    #[test]
    fn louvain_splits_the_barbell() {
        let adj = barbell();

        let p = louvain(&adj).unwrap();

        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
        assert_eq!(p[3], p[4]);
        assert_eq!(p[4], p[5]);
        assert_ne!(p[0], p[3]);
        assert!(modularity(&adj, &p) > 0.3);
    }

    #[test]
    fn louvain_is_deterministic() {
        let adj = barbell();

        assert_eq!(louvain(&adj).unwrap(), louvain(&adj).unwrap());
    }

    #[test]
    fn greedy_modularity_splits_the_barbell() {
        let adj = barbell();

        let p = greedy_modularity(&adj).unwrap();

        assert_eq!(p, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn empty_graph_is_an_error_and_detect_falls_back() {
        let adj = graph(&[], &[]).adjacency();

        assert_eq!(louvain(&adj), Err(AlgorithmError::EmptyGraph));
        assert!(detect_communities(&adj).is_empty());
    }

    #[test]
    fn edgeless_graph_yields_singletons() {
        let adj = graph(&[1, 2, 3], &[]).adjacency();

        assert_eq!(louvain(&adj).unwrap(), vec![0, 1, 2]);
        assert!(modularity(&adj, &[0, 1, 2]).abs() < f64::EPSILON);
    }

    #[test]
    fn conductance_of_barbell_halves() {
        let adj = barbell();

        let c = conductance(&adj, &[0, 0, 0, 1, 1, 1]);

        // cut = 1, vol(S) = vol(S̄) = 7
        assert!((c[&0] - round_to(1.0 / 7.0, 4)).abs() < 1e-12);
        assert!((c[&1] - c[&0]).abs() < 1e-12);
    }

    #[test]
    fn labels_use_directory_and_anchor() {
        let mut core = node(1, "src/db/index.rs");
        core.kind = SymbolKind::Struct;
        core.name = "Index".to_string();
        let g = CodeGraph::from_parts(
            [core, node(2, "src/db/files.rs"), node(3, "main.rs")],
            [(SymbolId(2), SymbolId(1), EdgeKind::Calls)],
        );
        let adj = g.adjacency();

        let labels = label_clusters(&g, &adj, &[0, 0, 1], &[0.5, 0.3, 0.2]);

        assert_eq!(labels[&0], "db/Index");
        assert_eq!(labels[&1], "f3");
    }

    #[test]
    fn mega_clusters_get_directory_breakdown() {
        let nodes = (1..=10).map(|i| node(i, if i <= 6 { "src/a/x.rs" } else { "src/b/y.rs" }));
        let g = CodeGraph::from_parts(nodes, []);
        let adj = g.adjacency();

        let labels = label_clusters(&g, &adj, &[0; 10], &[0.1; 10]);

        assert_eq!(labels[&0], "a 60% + b 40%");
    }

    proptest! {
        #[test]
        fn louvain_never_worse_than_one_community(
            edges in proptest::collection::vec((1i64..15, 1i64..15), 1..40)
        ) {
            let ids: Vec<i64> = (1..15).collect();
            let adj = graph(&ids, &edges).adjacency();
            prop_assume!(adj.undirected_edge_count() > 0);

            let p = louvain(&adj).unwrap();
            let trivial = modularity(&adj, &vec![0; adj.len()]);

            prop_assert!(modularity(&adj, &p) >= trivial - 1e-9);
        }

        #[test]
        fn conductance_stays_in_unit_interval(
            edges in proptest::collection::vec((1i64..12, 1i64..12), 0..30),
            labels in proptest::collection::vec(0usize..4, 11)
        ) {
            let ids: Vec<i64> = (1..12).collect();
            let adj = graph(&ids, &edges).adjacency();
            let mut partition = labels;
            densify(&mut partition);

            for value in conductance(&adj, &partition).values() {
                prop_assert!((0.0..=1.0).contains(value));
            }
        }
    }
}

//! PageRank, betweenness and degree centrality.
//!
//! ## PageRank
//!
//! Power iteration with uniform (or single-seed) teleport. Dangling mass is
//! redistributed along the teleport vector. Personalized PageRank runs on
//! the reversed graph: seeded at a target, score flows to its dependents.
//!
//! ## Betweenness
//!
//! Brandes' algorithm on the collapsed directed graph, normalized by
//! `(n-1)(n-2)`. Exact up to a node-count cutoff, otherwise estimated from
//! `k = min(n, max(min_samples, 3·√n))` seeded pivots and scaled by `n/k`.
//! Pivots are processed in parallel.

// Node counts fit comfortably in f64's exact integer range.
#![allow(clippy::cast_precision_loss)]

use std::collections::{HashMap, VecDeque};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use super::SEED;
use crate::config::AnalysisConfig;
use crate::graph::Adjacency;
use crate::types::{SymbolId, SymbolMetrics};

/// Power iteration cap.
pub const PAGERANK_MAX_ITER: usize = 100;

/// Per-node convergence tolerance; the iteration stops when the L1 change
/// drops below `n * PAGERANK_TOL`.
pub const PAGERANK_TOL: f64 = 1e-6;

/// PageRank of every node.
#[must_use]
pub fn pagerank(adj: &Adjacency, damping: f64) -> HashMap<SymbolId, f64> {
    let lists: Vec<&[usize]> = (0..adj.len()).map(|i| adj.out(i)).collect();
    let scores = power_iteration(&lists, damping, None);
    adj.ids().iter().copied().zip(scores).collect()
}

/// PageRank seeded at `seed` on the reversed graph.
///
/// Scores concentrate on symbols that (transitively) depend on `seed`.
/// Returns an empty map if `seed` is not in the graph.
#[must_use]
pub fn personalized_pagerank(adj: &Adjacency, seed: SymbolId, damping: f64) -> HashMap<SymbolId, f64> {
    let Some(start) = adj.index_of(seed) else {
        return HashMap::new();
    };
    let lists: Vec<&[usize]> = (0..adj.len()).map(|i| adj.inc(i)).collect();
    let scores = power_iteration(&lists, damping, Some(start));
    adj.ids().iter().copied().zip(scores).collect()
}

/// Dense PageRank vector in adjacency order.
#[must_use]
pub fn pagerank_dense(adj: &Adjacency, damping: f64) -> Vec<f64> {
    let lists: Vec<&[usize]> = (0..adj.len()).map(|i| adj.out(i)).collect();
    power_iteration(&lists, damping, None)
}

fn power_iteration(lists: &[&[usize]], damping: f64, seed: Option<usize>) -> Vec<f64> {
    let n = lists.len();
    if n == 0 {
        return Vec::new();
    }
    let teleport: Vec<f64> = match seed {
        Some(s) => {
            let mut p = vec![0.0; n];
            p[s] = 1.0;
            p
        }
        None => vec![1.0 / n as f64; n],
    };

    let mut x = vec![1.0 / n as f64; n];
    for iteration in 0..PAGERANK_MAX_ITER {
        let last = std::mem::replace(&mut x, vec![0.0; n]);
        let dangling: f64 = damping
            * lists
                .iter()
                .zip(&last)
                .filter(|(out, _)| out.is_empty())
                .map(|(_, v)| v)
                .sum::<f64>();
        for (u, out) in lists.iter().enumerate() {
            if out.is_empty() {
                continue;
            }
            let share = damping * last[u] / out.len() as f64;
            for &v in *out {
                x[v] += share;
            }
        }
        for (v, p) in teleport.iter().enumerate() {
            x[v] += dangling * p + (1.0 - damping) * p;
        }

        let err: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
        if err < n as f64 * PAGERANK_TOL {
            tracing::trace!(iteration, "PageRank converged");
            return x;
        }
    }
    tracing::debug!(
        max_iter = PAGERANK_MAX_ITER,
        "PageRank hit the iteration cap; using last estimate"
    );
    x
}

/// Betweenness of every node, exact or pivot-sampled per `config`.
#[must_use]
pub fn betweenness(adj: &Adjacency, config: &AnalysisConfig) -> HashMap<SymbolId, f64> {
    let scores = betweenness_dense(adj, config.exact_betweenness_max_nodes, config.min_betweenness_samples);
    adj.ids().iter().copied().zip(scores).collect()
}

/// Number of pivots used for a graph of `n` nodes.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn sample_size(n: usize, exact_max_nodes: usize, min_samples: usize) -> usize {
    if n <= exact_max_nodes {
        return n;
    }
    let scaled = (3.0 * (n as f64).sqrt()) as usize;
    n.min(min_samples.max(scaled))
}

/// Dense betweenness vector in adjacency order.
#[must_use]
pub fn betweenness_dense(adj: &Adjacency, exact_max_nodes: usize, min_samples: usize) -> Vec<f64> {
    let n = adj.len();
    if n < 3 {
        return vec![0.0; n];
    }
    let k = sample_size(n, exact_max_nodes, min_samples);
    let pivots: Vec<usize> = if k == n {
        (0..n).collect()
    } else {
        let mut rng = StdRng::seed_from_u64(SEED);
        rand::seq::index::sample(&mut rng, n, k).into_vec()
    };
    tracing::debug!(nodes = n, pivots = pivots.len(), exact = k == n, "Computing betweenness");

    let lists: Vec<&[usize]> = (0..n).map(|i| adj.out(i)).collect();
    let raw = pivots
        .par_iter()
        .fold(
            || vec![0.0; n],
            |mut acc, &s| {
                accumulate_node(&lists, s, &mut acc);
                acc
            },
        )
        .reduce(
            || vec![0.0; n],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b) {
                    *x += y;
                }
                a
            },
        );

    let mut scale = 1.0 / ((n - 1) * (n - 2)) as f64;
    if k < n {
        scale *= n as f64 / k as f64;
    }
    raw.into_iter().map(|v| v * scale).collect()
}

/// BFS shortest-path DAG from one source.
struct ShortestPaths {
    order: Vec<usize>,
    preds: Vec<Vec<usize>>,
    sigma: Vec<f64>,
}

fn shortest_paths<L: AsRef<[usize]>>(lists: &[L], source: usize) -> ShortestPaths {
    let n = lists.len();
    let mut order = Vec::with_capacity(n);
    let mut preds = vec![Vec::new(); n];
    let mut sigma = vec![0.0; n];
    let mut dist = vec![usize::MAX; n];
    sigma[source] = 1.0;
    dist[source] = 0;
    let mut queue = VecDeque::from([source]);
    while let Some(v) = queue.pop_front() {
        order.push(v);
        for &w in lists[v].as_ref() {
            if dist[w] == usize::MAX {
                dist[w] = dist[v] + 1;
                queue.push_back(w);
            }
            if dist[w] == dist[v] + 1 {
                sigma[w] += sigma[v];
                preds[w].push(v);
            }
        }
    }
    ShortestPaths { order, preds, sigma }
}

fn accumulate_node<L: AsRef<[usize]>>(lists: &[L], source: usize, acc: &mut [f64]) {
    let sp = shortest_paths(lists, source);
    let mut delta = vec![0.0; lists.len()];
    for &w in sp.order.iter().rev() {
        for &v in &sp.preds[w] {
            delta[v] += sp.sigma[v] / sp.sigma[w] * (1.0 + delta[w]);
        }
        if w != source {
            acc[w] += delta[w];
        }
    }
}

fn accumulate_edges<L: AsRef<[usize]>>(
    lists: &[L],
    source: usize,
    acc: &mut HashMap<(usize, usize), f64>,
) {
    let sp = shortest_paths(lists, source);
    let mut delta = vec![0.0; lists.len()];
    for &w in sp.order.iter().rev() {
        for &v in &sp.preds[w] {
            let c = sp.sigma[v] / sp.sigma[w] * (1.0 + delta[w]);
            *acc.entry((v, w)).or_insert(0.0) += c;
            delta[v] += c;
        }
    }
}

/// Directed edge betweenness over local adjacency lists, normalized by
/// `n(n-1)`.
pub(crate) fn edge_betweenness_directed<L: AsRef<[usize]>>(
    lists: &[L],
) -> HashMap<(usize, usize), f64> {
    let n = lists.len();
    let mut acc = HashMap::new();
    for s in 0..n {
        accumulate_edges(lists, s, &mut acc);
    }
    if n > 1 {
        let scale = 1.0 / (n * (n - 1)) as f64;
        for v in acc.values_mut() {
            *v *= scale;
        }
    }
    acc
}

/// Edge betweenness on the undirected projection, keyed by `(u, v)` with
/// `u < v` in dense indices and normalized by `n(n-1)`.
///
/// Used for ranking only. Exact, so callers gate it by graph size.
#[must_use]
pub fn edge_betweenness(adj: &Adjacency) -> HashMap<(usize, usize), f64> {
    let n = adj.len();
    let lists: Vec<&[usize]> = (0..n).map(|i| adj.neighbors(i)).collect();
    let partial: Vec<HashMap<(usize, usize), f64>> = (0..n)
        .into_par_iter()
        .map(|s| {
            let mut acc = HashMap::new();
            accumulate_edges(&lists, s, &mut acc);
            acc
        })
        .collect();

    let mut combined: HashMap<(usize, usize), f64> = HashMap::new();
    for acc in partial {
        for ((u, v), c) in acc {
            *combined.entry((u.min(v), u.max(v))).or_insert(0.0) += c;
        }
    }
    if n > 1 {
        let scale = 1.0 / (n * (n - 1)) as f64;
        for v in combined.values_mut() {
            *v *= scale;
        }
    }
    combined
}

/// Nodes whose betweenness is strictly above the 90th percentile, highest
/// first. Empty when the percentile itself is zero.
#[must_use]
pub fn bottlenecks(scores: &HashMap<SymbolId, f64>) -> Vec<SymbolId> {
    let p90 = percentile_90(scores.values().copied());
    if p90 <= 0.0 {
        return Vec::new();
    }
    let mut flagged: Vec<(SymbolId, f64)> = scores
        .iter()
        .filter(|&(_, &v)| v > p90)
        .map(|(&id, &v)| (id, v))
        .collect();
    flagged.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    flagged.into_iter().map(|(id, _)| id).collect()
}

/// `sorted[floor(len * 0.9)]`, clamped to the last element; 0 when empty.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn percentile_90(values: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = values.collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(f64::total_cmp);
    let idx = ((sorted.len() as f64 * 0.9) as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// Symbols whose collapsed in+out degree exceeds `threshold`.
#[must_use]
pub fn god_components(adj: &Adjacency, threshold: usize) -> Vec<SymbolId> {
    (0..adj.len())
        .filter(|&i| adj.total_degree(i) > threshold)
        .map(|i| adj.id(i))
        .collect()
}

/// PageRank, degrees and betweenness for every symbol, ready to store.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn compute_symbol_metrics(adj: &Adjacency, config: &AnalysisConfig) -> Vec<SymbolMetrics> {
    let pr = pagerank_dense(adj, config.pagerank_damping);
    let bc = betweenness_dense(adj, config.exact_betweenness_max_nodes, config.min_betweenness_samples);
    (0..adj.len())
        .map(|i| SymbolMetrics {
            symbol_id: adj.id(i),
            pagerank: pr[i],
            in_degree: adj.inc(i).len() as u32,
            out_degree: adj.out(i).len() as u32,
            betweenness: bc[i],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::graph;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn pagerank_sums_to_one_and_favours_sinks() {
        //   1 -> 3 <- 2
        let adj = graph(&[1, 2, 3], &[(1, 3), (2, 3)]).adjacency();

        let pr = pagerank(&adj, 0.85);

        assert!(close(pr.values().sum::<f64>(), 1.0));
        assert!(pr[&SymbolId(3)] > pr[&SymbolId(1)]);
        assert!(close(pr[&SymbolId(1)], pr[&SymbolId(2)]));
    }

    #[test]
    fn personalized_pagerank_reaches_only_dependents() {
        //   1 -> 2 -> 3    4 -> 5
        let adj = graph(&[1, 2, 3, 4, 5], &[(1, 2), (2, 3), (4, 5)]).adjacency();

        let ppr = personalized_pagerank(&adj, SymbolId(3), 0.85);

        assert!(ppr[&SymbolId(2)] > 0.0);
        assert!(ppr[&SymbolId(1)] > 0.0);
        assert!(close(ppr[&SymbolId(4)], 0.0));
        assert!(ppr[&SymbolId(3)] > ppr[&SymbolId(2)]);
        assert!(personalized_pagerank(&adj, SymbolId(99), 0.85).is_empty());
    }

    #[test]
    fn betweenness_of_a_path_peaks_in_the_middle() {
        //   1 -> 2 -> 3
        let adj = graph(&[1, 2, 3], &[(1, 2), (2, 3)]).adjacency();

        let bc = betweenness_dense(&adj, 1000, 50);

        // One of the (n-1)(n-2) = 2 ordered pairs passes through 2.
        assert!(close(bc[1], 0.5));
        assert!(close(bc[0], 0.0));
        assert!(close(bc[2], 0.0));
    }

    #[test]
    fn sample_size_switches_at_the_cutoff() {
        assert_eq!(sample_size(900, 1000, 50), 900);
        assert_eq!(sample_size(10_000, 1000, 50), 300);
        assert_eq!(sample_size(1100, 1000, 200), 200);
    }

    #[test]
    fn sampled_betweenness_is_deterministic() {
        let edges: Vec<(i64, i64)> = (1..60).map(|i| (i, i + 1)).collect();
        let ids: Vec<i64> = (1..=60).collect();
        let adj = graph(&ids, &edges).adjacency();

        let a = betweenness_dense(&adj, 10, 20);
        let b = betweenness_dense(&adj, 10, 20);

        assert_eq!(a, b);
    }

    #[test]
    fn bottlenecks_need_positive_percentile() {
        let flat: HashMap<SymbolId, f64> = (1..=10).map(|i| (SymbolId(i), 0.0)).collect();
        assert!(bottlenecks(&flat).is_empty());

        let mut spread: HashMap<SymbolId, f64> = (1..=20).map(|i| (SymbolId(i), 0.1)).collect();
        spread.insert(SymbolId(21), 5.0);
        spread.insert(SymbolId(22), 9.0);
        assert_eq!(bottlenecks(&spread), vec![SymbolId(22), SymbolId(21)]);
    }

    #[test]
    fn edge_betweenness_ranks_the_bridge_highest() {
        //   1 - 2 - 3 - 4 - 5      (3-4 splits {1,2,3} from {4,5})
        //   |___|
        let adj = graph(&[1, 2, 3, 4, 5], &[(1, 2), (2, 3), (3, 1), (3, 4), (4, 5)]).adjacency();

        let ebc = edge_betweenness(&adj);
        let (best, _) = ebc
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .expect("edges present");

        assert_eq!(*best, (2, 3));
    }

    #[test]
    fn god_components_use_total_degree() {
        let hub_edges: Vec<(i64, i64)> = (2..=23).map(|i| (1, i)).collect();
        let ids: Vec<i64> = (1..=23).collect();
        let adj = graph(&ids, &hub_edges).adjacency();

        assert_eq!(god_components(&adj, 20), vec![SymbolId(1)]);
        assert!(god_components(&adj, 22).is_empty());
    }
}

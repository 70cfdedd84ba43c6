//! Spectral analysis of the undirected projection.
//!
//! The Fiedler pair (second-smallest Laplacian eigenvalue and its vector)
//! comes from inverse iteration on `L` restricted to the complement of the
//! constant vector. Each step solves `L·z = x` by conjugate gradients, so
//! the error shrinks by `λ₂/λ₃` per step regardless of how small `λ₂` is.
//! An eigenpair is accepted once its residual `‖Lx − λx‖` is below
//! tolerance; otherwise the solver reports non-convergence.
//!
//! All entry points work per connected component; a disconnected graph
//! never reaches the eigen solver as a whole.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use std::collections::{BTreeMap, HashMap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::community::detect_communities;
use super::{SEED, densify, group_by_label, round_to};
use crate::error::AlgorithmError;
use crate::graph::Adjacency;

/// Components smaller than this are never bisected.
pub const MIN_PARTITION_SIZE: usize = 5;

/// Bisection stops once the algebraic connectivity drops below this.
pub const GAP_STOP: f64 = 1e-6;

/// Spectral gap above which a graph counts as well-modularized.
pub const HIGH_GAP: f64 = 0.5;

/// Spectral gap above which a graph counts as moderately modular.
pub const MEDIUM_GAP: f64 = 0.1;

const MAX_ITERATIONS: usize = 300;
const RESIDUAL_TOLERANCE: f64 = 1e-8;
const SOLVE_TOLERANCE: f64 = 1e-12;

/// Human-readable reading of a spectral gap.
#[must_use]
pub fn verdict_from_gap(gap: f64) -> &'static str {
    if gap > HIGH_GAP {
        "Well-modularized"
    } else if gap > MEDIUM_GAP {
        "Moderately modular"
    } else {
        "Poorly modularized"
    }
}

/// Algebraic connectivity (λ₂) of the largest connected component.
///
/// 0.0 when that component has fewer than three nodes.
pub fn algebraic_connectivity(adj: &Adjacency, max_nodes: usize) -> Result<f64, AlgorithmError> {
    let Some(largest) = adj.components().into_iter().max_by_key(Vec::len) else {
        return Ok(0.0);
    };
    if largest.len() < 3 {
        return Ok(0.0);
    }
    gate(largest.len(), max_nodes)?;
    let (value, _) = fiedler(&local_lists(adj, &largest))?;
    Ok(round_to(value, 6))
}

/// Smallest λ₂ over all components with at least two nodes.
///
/// 0.0 when no such component exists.
pub fn spectral_gap(adj: &Adjacency, max_nodes: usize) -> Result<f64, AlgorithmError> {
    gate(adj.len(), max_nodes)?;
    let mut gap: Option<f64> = None;
    for component in adj.components() {
        if component.len() < 2 {
            continue;
        }
        let (value, _) = fiedler(&local_lists(adj, &component))?;
        gap = Some(gap.map_or(value, |g| g.min(value)));
    }
    Ok(gap.unwrap_or(0.0))
}

/// Recursive Fiedler bisection, at most `max_depth` levels deep.
///
/// Each component is split along the sign of its Fiedler vector until it
/// has fewer than [`MIN_PARTITION_SIZE`] nodes, its λ₂ falls below
/// [`GAP_STOP`], or the depth budget runs out. A component whose
/// eigenvector cannot be computed stays whole.
pub fn fiedler_partition(
    adj: &Adjacency,
    max_depth: u32,
    max_nodes: usize,
) -> Result<Vec<usize>, AlgorithmError> {
    if adj.is_empty() {
        return Err(AlgorithmError::EmptyGraph);
    }
    gate(adj.len(), max_nodes)?;

    let mut partition = vec![0; adj.len()];
    let mut next = 0;
    for component in adj.components() {
        bisect(adj, component, 0, max_depth, &mut partition, &mut next);
    }
    densify(&mut partition);
    Ok(partition)
}

/// Spectral communities, `k` chosen from the spectral gap when not given.
///
/// Graphs below [`MIN_PARTITION_SIZE`] nodes use Louvain instead. When
/// bisection yields more than `k` parts, the smallest part is merged into
/// its neighbour by id until `k` remain.
pub fn spectral_communities(
    adj: &Adjacency,
    k: Option<usize>,
    max_nodes: usize,
) -> Result<Vec<usize>, AlgorithmError> {
    let n = adj.len();
    if n == 0 {
        return Err(AlgorithmError::EmptyGraph);
    }
    gate(n, max_nodes)?;
    if n < MIN_PARTITION_SIZE {
        return Ok(detect_communities(adj));
    }

    let k = match k {
        Some(k) => k.max(1),
        None => auto_k(n, spectral_gap(adj, max_nodes)?),
    };
    let max_depth = (k.max(2) as f64).log2().ceil().max(1.0) as u32;
    let mut partition = fiedler_partition(adj, max_depth, max_nodes)?;

    let mut groups = group_by_label(&partition);
    while groups.len() > k {
        let Some((smallest, _)) = groups.iter().enumerate().min_by_key(|(_, g)| g.len()) else {
            break;
        };
        let into = if smallest + 1 < groups.len() {
            smallest + 1
        } else {
            smallest - 1
        };
        let moved = std::mem::take(&mut groups[smallest]);
        groups[into].extend(moved);
        groups.remove(smallest);
    }
    for (pid, members) in groups.iter().enumerate() {
        for &i in members {
            partition[i] = pid;
        }
    }
    tracing::debug!(k, parts = groups.len(), "Spectral communities");
    Ok(partition)
}

/// Adjusted Rand index between two labelings of the same nodes.
///
/// 1.0 for identical partitions (up to renaming), around 0.0 for unrelated
/// ones.
#[must_use]
pub fn adjusted_rand_index(a: &[usize], b: &[usize]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 1.0;
    }
    let comb2 = |x: usize| (x * x.saturating_sub(1)) as f64 / 2.0;

    let mut contingency: HashMap<(usize, usize), usize> = HashMap::new();
    let mut rows: BTreeMap<usize, usize> = BTreeMap::new();
    let mut cols: BTreeMap<usize, usize> = BTreeMap::new();
    for (&x, &y) in a.iter().zip(b) {
        *contingency.entry((x, y)).or_insert(0) += 1;
        *rows.entry(x).or_insert(0) += 1;
        *cols.entry(y).or_insert(0) += 1;
    }

    let index: f64 = contingency.values().map(|&c| comb2(c)).sum();
    let sum_a: f64 = rows.values().map(|&c| comb2(c)).sum();
    let sum_b: f64 = cols.values().map(|&c| comb2(c)).sum();
    let comb_n = comb2(n);
    if comb_n == 0.0 {
        return 1.0;
    }
    let expected = sum_a * sum_b / comb_n;
    let denominator = (sum_a + sum_b) / 2.0 - expected;
    if denominator.abs() < 1e-10 {
        return if (index - expected).abs() < 1e-10 { 1.0 } else { 0.0 };
    }
    round_to((index - expected) / denominator, 6)
}

fn auto_k(n: usize, gap: f64) -> usize {
    let log = (n as f64).log2().floor() as usize;
    let k = if gap > HIGH_GAP {
        log.saturating_sub(1).max(2)
    } else if gap > MEDIUM_GAP {
        log.max(2)
    } else {
        (log + 1).max(2)
    };
    k.min((n / 5).max(2))
}

fn gate(nodes: usize, limit: usize) -> Result<(), AlgorithmError> {
    if nodes > limit {
        return Err(AlgorithmError::SizeGate {
            algorithm: "spectral",
            nodes,
            limit,
        });
    }
    Ok(())
}

fn bisect(
    adj: &Adjacency,
    nodes: Vec<usize>,
    depth: u32,
    max_depth: u32,
    partition: &mut [usize],
    next: &mut usize,
) {
    if depth >= max_depth || nodes.len() < MIN_PARTITION_SIZE {
        assign(partition, &nodes, next);
        return;
    }

    let components = adj.components_within(&nodes);
    if components.len() > 1 {
        for component in components {
            bisect(adj, component, depth, max_depth, partition, next);
        }
        return;
    }

    let (gap, vector) = match fiedler(&local_lists(adj, &nodes)) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::debug!(error = %e, nodes = nodes.len(), "Keeping component whole");
            assign(partition, &nodes, next);
            return;
        }
    };
    if gap < GAP_STOP {
        assign(partition, &nodes, next);
        return;
    }
    let mut negative = Vec::new();
    let mut positive = Vec::new();
    for (&i, &x) in nodes.iter().zip(&vector) {
        if x < 0.0 {
            negative.push(i);
        } else {
            positive.push(i);
        }
    }
    if negative.is_empty() || positive.is_empty() {
        assign(partition, &nodes, next);
        return;
    }
    bisect(adj, negative, depth + 1, max_depth, partition, next);
    bisect(adj, positive, depth + 1, max_depth, partition, next);
}

fn assign(partition: &mut [usize], nodes: &[usize], next: &mut usize) {
    for &i in nodes {
        partition[i] = *next;
    }
    *next += 1;
}

/// Undirected neighbour lists of `members`, renumbered `0..members.len()`.
fn local_lists(adj: &Adjacency, members: &[usize]) -> Vec<Vec<usize>> {
    let local: HashMap<usize, usize> = members.iter().enumerate().map(|(l, &g)| (g, l)).collect();
    members
        .iter()
        .map(|&g| {
            adj.neighbors(g)
                .iter()
                .filter_map(|v| local.get(v).copied())
                .collect()
        })
        .collect()
}

/// λ₂ and its unit eigenvector for a connected graph given as neighbour
/// lists.
fn fiedler(lists: &[Vec<usize>]) -> Result<(f64, Vec<f64>), AlgorithmError> {
    fiedler_within(lists, MAX_ITERATIONS)
}

fn fiedler_within(
    lists: &[Vec<usize>],
    max_iterations: usize,
) -> Result<(f64, Vec<f64>), AlgorithmError> {
    let n = lists.len();
    if n < 2 {
        return Err(AlgorithmError::TooSmall {
            nodes: n,
            required: 2,
        });
    }

    let mut rng = StdRng::seed_from_u64(SEED);
    let mut x: Vec<f64> = (0..n).map(|_| rng.random_range(-1.0..1.0)).collect();
    if !deflate_and_normalize(&mut x) {
        return Err(AlgorithmError::NoConvergence { method: "fiedler" });
    }

    for iteration in 0..max_iterations {
        let mut z = solve_laplacian(lists, &x);
        if !deflate_and_normalize(&mut z) {
            return Err(AlgorithmError::NoConvergence { method: "fiedler" });
        }
        x = z;

        let lx = laplacian_times(lists, &x);
        let value = dot(&x, &lx);
        let residual = lx
            .iter()
            .zip(&x)
            .map(|(l, v)| (l - value * v).powi(2))
            .sum::<f64>()
            .sqrt();
        if residual < RESIDUAL_TOLERANCE {
            tracing::trace!(nodes = n, iterations = iteration + 1, "Fiedler converged");
            return Ok((value.max(0.0), x));
        }
    }
    Err(AlgorithmError::NoConvergence { method: "fiedler" })
}

/// Solve `L·z = b` for `b` orthogonal to the constant vector.
///
/// Conjugate gradients on the semidefinite Laplacian; a consistent right-hand
/// side keeps every iterate in the range of `L`. Returns the best iterate
/// when the step budget runs out.
fn solve_laplacian(lists: &[Vec<usize>], b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut z = vec![0.0; n];
    let mut r = b.to_vec();
    let mut p = r.clone();
    let mut rr = dot(&r, &r);
    let stop = SOLVE_TOLERANCE * SOLVE_TOLERANCE * rr;

    for _ in 0..4 * n + 100 {
        if rr <= stop {
            break;
        }
        let lp = laplacian_times(lists, &p);
        let curvature = dot(&p, &lp);
        if curvature <= 0.0 {
            break;
        }
        let alpha = rr / curvature;
        for ((zi, ri), (pi, lpi)) in z.iter_mut().zip(r.iter_mut()).zip(p.iter().zip(&lp)) {
            *zi += alpha * pi;
            *ri -= alpha * lpi;
        }
        let next = dot(&r, &r);
        let beta = next / rr;
        for (pi, ri) in p.iter_mut().zip(&r) {
            *pi = ri + beta * *pi;
        }
        rr = next;
    }
    z
}

fn laplacian_times(lists: &[Vec<usize>], x: &[f64]) -> Vec<f64> {
    lists
        .iter()
        .enumerate()
        .map(|(i, ns)| ns.len() as f64 * x[i] - ns.iter().map(|&j| x[j]).sum::<f64>())
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Remove the constant component and scale to unit length. False when
/// nothing is left.
fn deflate_and_normalize(v: &mut [f64]) -> bool {
    let mean = v.iter().sum::<f64>() / v.len() as f64;
    for x in v.iter_mut() {
        *x -= mean;
    }
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if !norm.is_finite() || norm < 1e-12 {
        return false;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
    true
}

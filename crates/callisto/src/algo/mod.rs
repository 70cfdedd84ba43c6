//! Graph algorithm suite.
//!
//! Every algorithm reads an [`Adjacency`](crate::graph::Adjacency) (or the
//! [`CodeGraph`](crate::graph::CodeGraph) it came from) and never mutates
//! it. Algorithms that can hit a degenerate input return
//! `Result<_, AlgorithmError>`; the caller chooses the neutral fallback.
//!
//! | Module | Answers |
//! |--------|---------|
//! | [`scc`] | Where are the cycles? How tangled is the code? |
//! | [`layers`] | What is the dependency layering? Which edges point upward? |
//! | [`centrality`] | Which symbols matter most? Which are bottlenecks? |
//! | [`community`] | What are the natural modules? How clean are they? |
//! | [`spectral`] | Is the graph well-modularized? Spectral partitions. |
//! | [`mincut`] | Which module boundaries are fragile? |
//! | [`health`] | One 0–100 number for all of the above. |

pub mod centrality;
pub mod community;
pub mod health;
pub mod layers;
pub mod mincut;
pub mod scc;
pub mod spectral;

/// Seed for every randomized step, so runs are reproducible.
pub const SEED: u64 = 42;

/// Round half away from zero to `places` decimal places.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Group dense node indices by label, returning groups in label order.
pub(crate) fn group_by_label(labels: &[usize]) -> Vec<Vec<usize>> {
    let count = labels.iter().max().map_or(0, |m| m + 1);
    let mut groups = vec![Vec::new(); count];
    for (node, &label) in labels.iter().enumerate() {
        groups[label].push(node);
    }
    groups
}

/// Renumber labels densely from 0 in order of first appearance.
pub(crate) fn densify(labels: &mut [usize]) -> usize {
    let mut remap = std::collections::HashMap::new();
    for label in labels.iter_mut() {
        let next = remap.len();
        *label = *remap.entry(*label).or_insert(next);
    }
    remap.len()
}

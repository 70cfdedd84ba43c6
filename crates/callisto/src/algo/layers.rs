//! Topological layering and upward-dependency detection.
//!
//! Nodes with no incoming edge sit in layer 0; every other node is one
//! layer below its deepest predecessor. Cycles are condensed first, so all
//! members of an SCC share a layer.

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::{condensation, toposort};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use super::round_to;
use crate::graph::Adjacency;
use crate::types::SymbolId;

/// An edge from a higher layer to a lower one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerViolation {
    /// Edge source
    pub source: SymbolId,
    /// Edge target
    pub target: SymbolId,
    /// Layer of the source
    pub source_layer: u32,
    /// Layer of the target
    pub target_layer: u32,
    /// `source_layer - target_layer`
    pub layer_distance: u32,
    /// `layer_distance / max_layer`, in `[0, 1]`
    pub severity: f64,
}

/// Layer number of every node (longest path from a source on the SCC
/// condensation).
#[must_use]
pub fn detect_layers(adj: &Adjacency) -> HashMap<SymbolId, u32> {
    if adj.is_empty() {
        return HashMap::new();
    }
    let dag = condensation(adj.to_digraph(), true);
    // The condensation of any graph is acyclic.
    let order = toposort(&dag, None).unwrap_or_default();

    let mut layer_of_scc = vec![0u32; dag.node_count()];
    for scc in order {
        let layer = layer_of_scc[scc.index()];
        for edge in dag.edges(scc) {
            let next = &mut layer_of_scc[edge.target().index()];
            *next = (*next).max(layer + 1);
        }
    }

    let mut layers = HashMap::with_capacity(adj.len());
    for scc in dag.node_indices() {
        for &dense in &dag[scc] {
            layers.insert(adj.id(dense), layer_of_scc[scc.index()]);
        }
    }
    layers
}

/// Edges that climb more than `allowed_skip` layers upward under `layers`.
///
/// Works with any layer assignment, not only [`detect_layers`] output;
/// edges with an unlayered endpoint are ignored.
#[must_use]
pub fn find_violations(
    adj: &Adjacency,
    layers: &HashMap<SymbolId, u32>,
    allowed_skip: u32,
) -> Vec<LayerViolation> {
    let max_layer = layers.values().copied().max().unwrap_or(0).max(1);
    adj.directed_edges()
        .filter_map(|(u, v)| {
            let (source, target) = (adj.id(u), adj.id(v));
            let source_layer = *layers.get(&source)?;
            let target_layer = *layers.get(&target)?;
            let distance = source_layer.checked_sub(target_layer)?;
            (distance > allowed_skip).then(|| LayerViolation {
                source,
                target,
                source_layer,
                target_layer,
                layer_distance: distance,
                severity: round_to(f64::from(distance) / f64::from(max_layer), 3),
            })
        })
        .collect()
}

/// Nodes grouped by layer, each group ascending.
#[must_use]
pub fn group_layers(layers: &HashMap<SymbolId, u32>) -> Vec<(u32, Vec<SymbolId>)> {
    let mut groups: BTreeMap<u32, Vec<SymbolId>> = BTreeMap::new();
    for (&id, &layer) in layers {
        groups.entry(layer).or_default().push(id);
    }
    groups
        .into_iter()
        .map(|(layer, mut ids)| {
            ids.sort_unstable();
            (layer, ids)
        })
        .collect()
}

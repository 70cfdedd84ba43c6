//! In-memory dependency graph built from the store.
//!
//! [`CodeGraph`] is a read-only projection: nodes are symbols (an arena
//! indexed by [`SymbolId`]), edges carry their [`EdgeKind`]. It has no
//! mutating methods, so queries and algorithms holding a `&CodeGraph`
//! cannot change it.
//!
//! [`SimulationGraph`] is the owned, mutable clone the simulation engine
//! works on. It derefs to `&CodeGraph` so every algorithm runs on it
//! unchanged.
//!
//! ## Lifetime
//!
//! A graph is a disposable snapshot of one store generation. Build a fresh
//! one per query; symbol ids it holds are invalid after the next re-index.

mod adjacency;
mod types;

pub use adjacency::Adjacency;
pub use types::NodeData;

use std::collections::{BTreeSet, HashMap};
use std::ops::Deref;
use std::path::{Path, PathBuf};

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use crate::db::Index;
use crate::error::Result;
use crate::types::{EdgeKind, SymbolId};

/// Directed multigraph of symbols and their resolved edges.
#[derive(Debug, Clone, Default)]
pub struct CodeGraph {
    graph: StableDiGraph<NodeData, EdgeKind>,
    by_id: HashMap<SymbolId, NodeIndex>,
}

impl CodeGraph {
    /// Project the current store generation.
    pub(crate) fn from_index(index: &Index) -> Result<Self> {
        let paths = index.file_paths()?;
        let symbols = index.list_all_symbols()?;
        let edges = index.list_all_edges()?;

        let nodes = symbols.into_iter().map(|s| NodeData {
            file_path: paths.get(&s.file_id).cloned().unwrap_or_default(),
            id: s.id,
            name: s.name,
            qualified_name: s.qualified_name,
            kind: s.kind,
            is_exported: s.is_exported,
            line_start: s.line_start,
        });
        let graph = Self::from_parts(nodes, edges.iter().map(|e| (e.source_id, e.target_id, e.kind)));

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built code graph"
        );
        Ok(graph)
    }

    /// Build from explicit nodes and edges.
    ///
    /// Edges whose endpoints are not among the nodes, self-loops and
    /// duplicate `(source, target, kind)` triples are skipped.
    #[must_use]
    pub fn from_parts(
        nodes: impl IntoIterator<Item = NodeData>,
        edges: impl IntoIterator<Item = (SymbolId, SymbolId, EdgeKind)>,
    ) -> Self {
        let mut graph = StableDiGraph::new();
        let mut by_id = HashMap::new();
        for node in nodes {
            let id = node.id;
            if by_id.contains_key(&id) {
                continue;
            }
            by_id.insert(id, graph.add_node(node));
        }

        let mut seen = std::collections::HashSet::new();
        for (source, target, kind) in edges {
            if source == target || !seen.insert((source, target, kind)) {
                continue;
            }
            if let (Some(&s), Some(&t)) = (by_id.get(&source), by_id.get(&target)) {
                graph.add_edge(s, t, kind);
            }
        }

        Self { graph, by_id }
    }

    /// Number of symbols.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges, counting each kind separately.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the graph has no symbols.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Whether `id` is a node.
    #[must_use]
    pub fn contains(&self, id: SymbolId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Node payload for a symbol.
    #[must_use]
    pub fn node(&self, id: SymbolId) -> Option<&NodeData> {
        self.by_id.get(&id).map(|&ix| &self.graph[ix])
    }

    /// All nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        let mut nodes: Vec<&NodeData> = self.graph.node_weights().collect();
        nodes.sort_unstable_by_key(|n| n.id);
        nodes.into_iter()
    }

    /// All edges as `(source, target, kind)`.
    pub fn edges(&self) -> impl Iterator<Item = (SymbolId, SymbolId, EdgeKind)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (self.graph[e.source()].id, self.graph[e.target()].id, *e.weight()))
    }

    /// Distinct direct callers of `id`, ascending.
    #[must_use]
    pub fn callers(&self, id: SymbolId) -> Vec<SymbolId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Distinct direct callees of `id`, ascending.
    #[must_use]
    pub fn callees(&self, id: SymbolId) -> Vec<SymbolId> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: SymbolId, direction: Direction) -> Vec<SymbolId> {
        let Some(&ix) = self.by_id.get(&id) else {
            return Vec::new();
        };
        let set: BTreeSet<SymbolId> = self
            .graph
            .neighbors_directed(ix, direction)
            .map(|n| self.graph[n].id)
            .collect();
        set.into_iter().collect()
    }

    /// Number of edges (all kinds) touching any of `ids`, each counted once.
    #[must_use]
    pub fn incident_edge_count(&self, ids: &[SymbolId]) -> usize {
        let targets: std::collections::HashSet<NodeIndex> =
            ids.iter().filter_map(|id| self.by_id.get(id).copied()).collect();
        self.graph
            .edge_references()
            .filter(|e| targets.contains(&e.source()) || targets.contains(&e.target()))
            .count()
    }

    /// Symbols whose owning file is exactly `path`, ascending.
    #[must_use]
    pub fn symbols_in_file(&self, path: &Path) -> Vec<SymbolId> {
        self.nodes()
            .filter(|n| n.file_path == path)
            .map(|n| n.id)
            .collect()
    }

    /// Distinct file paths, sorted.
    #[must_use]
    pub fn file_paths(&self) -> BTreeSet<PathBuf> {
        self.graph
            .node_weights()
            .map(|n| n.file_path.clone())
            .collect()
    }

    /// Dense adjacency view for the algorithm suite.
    #[must_use]
    pub fn adjacency(&self) -> Adjacency {
        Adjacency::of(self)
    }
}

/// An owned, mutable copy of a [`CodeGraph`] for what-if analysis.
///
/// Changes never reach the store.
#[derive(Debug, Clone)]
pub struct SimulationGraph {
    inner: CodeGraph,
}

impl SimulationGraph {
    /// Clone `graph` into a private working copy.
    #[must_use]
    pub fn new(graph: &CodeGraph) -> Self {
        Self {
            inner: graph.clone(),
        }
    }

    /// Reassign a symbol to another file. Returns `false` for unknown ids.
    pub fn set_file_path(&mut self, id: SymbolId, path: &Path) -> bool {
        let Some(&ix) = self.inner.by_id.get(&id) else {
            return false;
        };
        self.inner.graph[ix].file_path = path.to_path_buf();
        true
    }

    /// Remove symbols and their incident edges, returning the number of
    /// edges removed.
    pub fn remove_nodes(&mut self, ids: &[SymbolId]) -> usize {
        let before = self.inner.graph.edge_count();
        for id in ids {
            if let Some(ix) = self.inner.by_id.remove(id) {
                self.inner.graph.remove_node(ix);
            }
        }
        before - self.inner.graph.edge_count()
    }

    /// Give up mutability.
    #[must_use]
    pub fn into_graph(self) -> CodeGraph {
        self.inner
    }
}

impl Deref for SimulationGraph {
    type Target = CodeGraph;

    fn deref(&self) -> &CodeGraph {
        &self.inner
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Small hand-built graphs shared by algorithm tests.

    use super::{CodeGraph, NodeData};
    use crate::types::{EdgeKind, SymbolId, SymbolKind};
    use std::path::PathBuf;

    /// A function node `id` named `f{id}` in `file`.
    pub(crate) fn node(id: i64, file: &str) -> NodeData {
        NodeData {
            id: SymbolId(id),
            name: format!("f{id}"),
            qualified_name: format!("f{id}"),
            kind: SymbolKind::Function,
            file_path: PathBuf::from(file),
            is_exported: true,
            line_start: 1,
        }
    }

    /// Graph with nodes `ids` (all in `lib.rs`) and call edges.
    pub(crate) fn graph(ids: &[i64], edges: &[(i64, i64)]) -> CodeGraph {
        CodeGraph::from_parts(
            ids.iter().map(|&id| node(id, "lib.rs")),
            edges
                .iter()
                .map(|&(s, t)| (SymbolId(s), SymbolId(t), EdgeKind::Calls)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{graph, node};
    use super::*;

    #[test]
    fn from_parts_skips_dangling_and_duplicate_edges() {
        let g = CodeGraph::from_parts(
            [node(1, "a.rs"), node(2, "b.rs")],
            [
                (SymbolId(1), SymbolId(2), EdgeKind::Calls),
                (SymbolId(1), SymbolId(2), EdgeKind::Calls),
                (SymbolId(1), SymbolId(2), EdgeKind::Imports),
                (SymbolId(1), SymbolId(9), EdgeKind::Calls),
                (SymbolId(2), SymbolId(2), EdgeKind::Calls),
            ],
        );

        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.callers(SymbolId(2)), vec![SymbolId(1)]);
        assert_eq!(g.adjacency().directed_edge_count(), 1);
    }

    #[test]
    fn simulation_changes_do_not_touch_source_graph() {
        //   1 -> 2 -> 3
        let original = graph(&[1, 2, 3], &[(1, 2), (2, 3)]);
        let mut sim = SimulationGraph::new(&original);

        assert!(sim.set_file_path(SymbolId(1), Path::new("moved.rs")));
        let removed = sim.remove_nodes(&[SymbolId(2)]);

        assert_eq!(removed, 2);
        assert_eq!(sim.edge_count(), 0);
        assert_eq!(sim.node(SymbolId(1)).map(|n| n.file_path.clone()), Some(PathBuf::from("moved.rs")));
        assert_eq!(original.edge_count(), 2);
        assert_eq!(original.node(SymbolId(1)).map(|n| n.file_path.clone()), Some(PathBuf::from("lib.rs")));
    }

    #[test]
    fn incident_edge_count_counts_shared_edges_once() {
        //   1 <-> 2 -> 3
        let g = graph(&[1, 2, 3], &[(1, 2), (2, 1), (2, 3)]);

        assert_eq!(g.incident_edge_count(&[SymbolId(1), SymbolId(2)]), 3);
        assert_eq!(g.incident_edge_count(&[SymbolId(3)]), 1);
    }

    #[test]
    fn symbols_in_file_and_file_paths() {
        let g = CodeGraph::from_parts([node(2, "b.rs"), node(1, "a.rs"), node(3, "a.rs")], []);

        assert_eq!(g.symbols_in_file(Path::new("a.rs")), vec![SymbolId(1), SymbolId(3)]);
        assert_eq!(g.file_paths().len(), 2);
    }
}

//! Dense, index-addressed view of a [`CodeGraph`] for the algorithm suite.
//!
//! Nodes are numbered `0..n` in ascending [`SymbolId`] order so every
//! algorithm sees the same deterministic ordering. Parallel edges of
//! different kinds collapse to one directed edge; the undirected projection
//! additionally drops direction. Neither view contains self-loops.

use std::collections::{HashMap, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};

use super::CodeGraph;
use crate::types::SymbolId;

/// Collapsed adjacency lists over dense node indices.
#[derive(Debug, Clone)]
pub struct Adjacency {
    ids: Vec<SymbolId>,
    index: HashMap<SymbolId, usize>,
    out: Vec<Vec<usize>>,
    inc: Vec<Vec<usize>>,
    undirected: Vec<Vec<usize>>,
}

impl Adjacency {
    /// Build from any node set and edge list. Unknown endpoints and
    /// self-loops are ignored.
    #[must_use]
    pub fn from_edges(
        ids: impl IntoIterator<Item = SymbolId>,
        edges: impl IntoIterator<Item = (SymbolId, SymbolId)>,
    ) -> Self {
        let mut ids: Vec<SymbolId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        let index: HashMap<SymbolId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let n = ids.len();
        let mut out = vec![Vec::new(); n];
        let mut inc = vec![Vec::new(); n];
        let mut undirected = vec![Vec::new(); n];
        for (source, target) in edges {
            let (Some(&u), Some(&v)) = (index.get(&source), index.get(&target)) else {
                continue;
            };
            if u == v {
                continue;
            }
            out[u].push(v);
            inc[v].push(u);
            undirected[u].push(v);
            undirected[v].push(u);
        }
        for list in out.iter_mut().chain(&mut inc).chain(&mut undirected) {
            list.sort_unstable();
            list.dedup();
        }

        Self {
            ids,
            index,
            out,
            inc,
            undirected,
        }
    }

    /// Build from a graph projection.
    #[must_use]
    pub fn of(graph: &CodeGraph) -> Self {
        Self::from_edges(
            graph.nodes().map(|n| n.id),
            graph.edges().map(|(s, t, _)| (s, t)),
        )
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Symbol id of dense index `i`.
    #[must_use]
    pub fn id(&self, i: usize) -> SymbolId {
        self.ids[i]
    }

    /// All symbol ids in dense order.
    #[must_use]
    pub fn ids(&self) -> &[SymbolId] {
        &self.ids
    }

    /// Dense index of a symbol.
    #[must_use]
    pub fn index_of(&self, id: SymbolId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Successors of `i`.
    #[must_use]
    pub fn out(&self, i: usize) -> &[usize] {
        &self.out[i]
    }

    /// Predecessors of `i`.
    #[must_use]
    pub fn inc(&self, i: usize) -> &[usize] {
        &self.inc[i]
    }

    /// Neighbours of `i` ignoring direction.
    #[must_use]
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.undirected[i]
    }

    /// Collapsed directed in-degree plus out-degree.
    #[must_use]
    pub fn total_degree(&self, i: usize) -> usize {
        self.out[i].len() + self.inc[i].len()
    }

    /// Degree in the undirected projection.
    #[must_use]
    pub fn degree(&self, i: usize) -> usize {
        self.undirected[i].len()
    }

    /// Collapsed directed edges `(u, v)` in lexicographic order.
    pub fn directed_edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.out
            .iter()
            .enumerate()
            .flat_map(|(u, vs)| vs.iter().map(move |&v| (u, v)))
    }

    /// Number of collapsed directed edges.
    #[must_use]
    pub fn directed_edge_count(&self) -> usize {
        self.out.iter().map(Vec::len).sum()
    }

    /// Undirected edges `(u, v)` with `u < v`, in lexicographic order.
    pub fn undirected_edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.undirected
            .iter()
            .enumerate()
            .flat_map(|(u, vs)| vs.iter().filter(move |&&v| v > u).map(move |&v| (u, v)))
    }

    /// Number of undirected edges.
    #[must_use]
    pub fn undirected_edge_count(&self) -> usize {
        self.undirected.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Connected components of the undirected projection.
    ///
    /// Each component is sorted; components are ordered by their smallest
    /// member.
    #[must_use]
    pub fn components(&self) -> Vec<Vec<usize>> {
        self.components_within(&(0..self.len()).collect::<Vec<_>>())
    }

    /// Connected components of the subgraph induced by `members`.
    #[must_use]
    pub fn components_within(&self, members: &[usize]) -> Vec<Vec<usize>> {
        let mut allowed = vec![false; self.len()];
        for &m in members {
            allowed[m] = true;
        }
        let mut seen = vec![false; self.len()];
        let mut sorted = members.to_vec();
        sorted.sort_unstable();

        let mut components = Vec::new();
        for &start in &sorted {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(u) = queue.pop_front() {
                for &v in &self.undirected[u] {
                    if allowed[v] && !seen[v] {
                        seen[v] = true;
                        component.push(v);
                        queue.push_back(v);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    /// The collapsed directed graph as a petgraph `DiGraph` whose node
    /// indices equal the dense indices.
    #[must_use]
    pub fn to_digraph(&self) -> DiGraph<usize, ()> {
        let mut graph = DiGraph::with_capacity(self.len(), self.directed_edge_count());
        for i in 0..self.len() {
            graph.add_node(i);
        }
        for (u, v) in self.directed_edges() {
            graph.add_edge(NodeIndex::new(u), NodeIndex::new(v), ());
        }
        graph
    }
}

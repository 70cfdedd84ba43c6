//! Property tests for graph algorithm invariants.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

use callisto::algo::centrality::pagerank;
use callisto::algo::community::{cluster_quality, detect_communities};
use callisto::algo::layers::{detect_layers, find_violations};
use callisto::algo::scc::{find_cycles, tangle_ratio};
use callisto::graph::Adjacency;
use callisto::{CodeGraph, EdgeKind, NodeData, SimulationGraph, SymbolId, SymbolKind};
use proptest::prelude::*;

fn node(id: i64) -> NodeData {
    NodeData {
        id: SymbolId::from(id),
        name: format!("f{id}"),
        qualified_name: format!("m{}::f{id}", id % 3),
        kind: SymbolKind::Function,
        file_path: PathBuf::from(format!("src/m{}.rs", id % 3)),
        is_exported: true,
        line_start: 1,
    }
}

fn graph_strategy() -> impl Strategy<Value = CodeGraph> {
    (2i64..24).prop_flat_map(|n| {
        prop::collection::vec((1..=n, 1..=n), 0..(n as usize * 3)).prop_map(move |pairs| {
            CodeGraph::from_parts(
                (1..=n).map(node),
                pairs
                    .into_iter()
                    .map(|(s, t)| (SymbolId::from(s), SymbolId::from(t), EdgeKind::Calls)),
            )
        })
    })
}

fn reachable(adj: &Adjacency, from: usize) -> HashSet<usize> {
    let mut seen = HashSet::from([from]);
    let mut queue = VecDeque::from([from]);
    while let Some(u) = queue.pop_front() {
        for &v in adj.out(u) {
            if seen.insert(v) {
                queue.push_back(v);
            }
        }
    }
    seen
}

proptest! {
    #[test]
    fn cycle_members_reach_each_other(graph in graph_strategy()) {
        let adj = graph.adjacency();
        for cycle in find_cycles(&adj, 2) {
            let members: Vec<usize> = cycle
                .members
                .iter()
                .filter_map(|&id| adj.index_of(id))
                .collect();
            prop_assert_eq!(members.len(), cycle.len());
            for &u in &members {
                let reach = reachable(&adj, u);
                for &v in &members {
                    prop_assert!(reach.contains(&v));
                }
            }
        }
    }

    #[test]
    fn tangle_ratio_is_a_fraction(graph in graph_strategy()) {
        let adj = graph.adjacency();
        let ratio = tangle_ratio(&adj, &find_cycles(&adj, 2));
        prop_assert!((0.0..=1.0).contains(&ratio));
    }

    #[test]
    fn acyclic_graphs_have_no_layer_violations(
        pairs in prop::collection::vec((1i64..20, 1i64..20), 0..60)
    ) {
        // Only forward edges: a DAG by construction.
        let graph = CodeGraph::from_parts(
            (1..20).map(node),
            pairs
                .into_iter()
                .filter(|(s, t)| s < t)
                .map(|(s, t)| (SymbolId::from(s), SymbolId::from(t), EdgeKind::Calls)),
        );
        let adj = graph.adjacency();
        prop_assert!(find_cycles(&adj, 2).is_empty());
        let layers = detect_layers(&adj);
        prop_assert!(find_violations(&adj, &layers, 0).is_empty());
    }

    #[test]
    fn conductance_and_modularity_are_bounded(graph in graph_strategy()) {
        let adj = graph.adjacency();
        let partition = detect_communities(&adj);
        prop_assert_eq!(partition.len(), adj.len());
        let quality = cluster_quality(&adj, &partition);
        prop_assert!((-0.5..=1.0).contains(&quality.modularity));
        // The one-community partition scores exactly 0.
        prop_assert!(quality.modularity >= -1e-9);
        for &c in quality.per_cluster.values() {
            prop_assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn pagerank_sums_to_one(graph in graph_strategy()) {
        let adj = graph.adjacency();
        let total: f64 = pagerank(&adj, 0.85).values().sum();
        prop_assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn removing_nodes_drops_exactly_their_incident_edges(
        graph in graph_strategy(),
        doomed in prop::collection::vec(1i64..24, 0..6),
    ) {
        let ids: Vec<SymbolId> = doomed.into_iter().map(SymbolId::from).collect();
        let expected = graph.incident_edge_count(&ids);
        let mut working = SimulationGraph::new(&graph);

        let removed = working.remove_nodes(&ids);

        prop_assert_eq!(removed, expected);
        prop_assert_eq!(working.edge_count(), graph.edge_count() - expected);
        prop_assert!(graph.edges().all(|(s, t, _)| s != t));
    }
}

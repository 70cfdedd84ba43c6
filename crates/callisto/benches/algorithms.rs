//! Benchmarks for the graph algorithm suite.
//!
//! All algorithms run on the projection of one indexed layered workspace,
//! so the numbers are comparable across algorithms.

// Benchmark code - performance of the benchmark setup is not critical
#![allow(missing_docs)]

mod common;

use callisto::algo::centrality::{betweenness, pagerank};
use callisto::algo::community::{detect_communities, label_clusters};
use callisto::algo::layers::{detect_layers, find_violations};
use callisto::algo::mincut::analyze_boundaries;
use callisto::algo::scc::{find_cycles, propagation_cost};
use callisto::algo::spectral::{fiedler_partition, spectral_gap};
use callisto::config::AnalysisConfig;
use callisto::simulate::Operation;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use common::{as_file_refs, create_indexed_workspace, generate_layered_workspace};

fn bench_structure(c: &mut Criterion) {
    let mut group = c.benchmark_group("structure");
    let config = AnalysisConfig::default();

    for width in &[5, 20] {
        let files = generate_layered_workspace(5, *width);
        let workspace = create_indexed_workspace(&as_file_refs(&files));
        let graph = workspace.callisto.graph().expect("graph failed");
        let adj = graph.adjacency();
        let n = adj.len();

        group.bench_with_input(BenchmarkId::new("cycles", n), &adj, |b, adj| {
            b.iter(|| black_box(find_cycles(adj, 2)));
        });
        group.bench_with_input(BenchmarkId::new("layers", n), &adj, |b, adj| {
            b.iter(|| {
                let layers = detect_layers(adj);
                black_box(find_violations(adj, &layers, config.allowed_layer_skip))
            });
        });
        group.bench_with_input(BenchmarkId::new("propagation_cost", n), &adj, |b, adj| {
            b.iter(|| black_box(propagation_cost(adj, config.propagation_cost_max_nodes)));
        });
    }

    group.finish();
}

fn bench_centrality(c: &mut Criterion) {
    let mut group = c.benchmark_group("centrality");
    let config = AnalysisConfig::default();

    for width in &[5, 20] {
        let files = generate_layered_workspace(5, *width);
        let workspace = create_indexed_workspace(&as_file_refs(&files));
        let adj = workspace.callisto.graph().expect("graph failed").adjacency();
        let n = adj.len();

        group.bench_with_input(BenchmarkId::new("pagerank", n), &adj, |b, adj| {
            b.iter(|| black_box(pagerank(adj, config.pagerank_damping)));
        });
        group.bench_with_input(BenchmarkId::new("betweenness", n), &adj, |b, adj| {
            b.iter(|| black_box(betweenness(adj, &config)));
        });
    }

    group.finish();
}

fn bench_partitioning(c: &mut Criterion) {
    let mut group = c.benchmark_group("partitioning");
    group.sample_size(20);
    let config = AnalysisConfig::default();

    let files = generate_layered_workspace(5, 10);
    let workspace = create_indexed_workspace(&as_file_refs(&files));
    let graph = workspace.callisto.graph().expect("graph failed");
    let adj = graph.adjacency();

    group.bench_function("louvain", |b| {
        b.iter(|| black_box(detect_communities(&adj)));
    });
    group.bench_function("label_clusters", |b| {
        let partition = detect_communities(&adj);
        let ranks = callisto::algo::centrality::pagerank_dense(&adj, config.pagerank_damping);
        b.iter(|| black_box(label_clusters(&graph, &adj, &partition, &ranks)));
    });
    group.bench_function("spectral_gap", |b| {
        b.iter(|| black_box(spectral_gap(&adj, config.spectral_max_nodes)));
    });
    group.bench_function("fiedler_partition", |b| {
        b.iter(|| {
            black_box(fiedler_partition(
                &adj,
                config.spectral_max_depth,
                config.spectral_max_nodes,
            ))
        });
    });
    group.bench_function("min_cut_boundaries", |b| {
        let partition = detect_communities(&adj);
        b.iter(|| black_box(analyze_boundaries(&adj, &partition, 10, config.mincut_max_nodes)));
    });

    group.finish();
}

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    group.sample_size(20);

    let files = generate_layered_workspace(4, 10);
    let workspace = create_indexed_workspace(&as_file_refs(&files));

    group.bench_function("delete_file", |b| {
        let op = Operation::Delete {
            target: "src/layer1/m3.rs".to_string(),
        };
        b.iter(|| black_box(workspace.callisto.simulate(&op).expect("simulate failed")));
    });
    group.bench_function("health", |b| {
        b.iter(|| black_box(workspace.callisto.health().expect("health failed")));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_structure,
    bench_centrality,
    bench_partitioning,
    bench_simulation,
);

criterion_main!(benches);

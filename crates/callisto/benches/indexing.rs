//! Benchmarks for Callisto indexing.
//!
//! These benchmarks measure:
//! - Full index of layered workspaces of increasing size
//! - Incremental update when nothing changed
//! - Incremental update after a single-file edit

// Benchmark code - performance of the benchmark setup is not critical
#![allow(missing_docs)]
#![allow(clippy::cast_possible_truncation)]

mod common;

use std::fs;
use std::thread;
use std::time::Duration;

use callisto::Callisto;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use common::{as_file_refs, create_indexed_workspace, create_workspace, generate_layered_workspace};

/// Benchmark full index operation on workspaces of different sizes.
fn bench_full_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_index");
    group.sample_size(10);

    for width in &[2, 5, 10] {
        let files = generate_layered_workspace(4, *width);
        let file_refs = as_file_refs(&files);

        group.throughput(Throughput::Elements(files.len() as u64));
        group.bench_with_input(BenchmarkId::new("files", files.len()), width, |b, _| {
            b.iter_with_setup(
                || {
                    let (dir, path) = create_workspace(&file_refs);
                    let callisto = Callisto::new(&path).expect("failed to create Callisto");
                    (dir, callisto)
                },
                |(_dir, mut callisto)| black_box(callisto.index().expect("index failed")),
            );
        });
    }

    group.finish();
}

/// Benchmark the no-op update: stat every file, parse nothing.
fn bench_update_unchanged(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");

    let files = generate_layered_workspace(4, 10);
    let file_refs = as_file_refs(&files);
    let mut workspace = create_indexed_workspace(&file_refs);

    group.bench_function("unchanged", |b| {
        b.iter(|| black_box(workspace.callisto.update().expect("update failed")));
    });

    group.finish();
}

/// Benchmark an update after one leaf file changed.
fn bench_update_single_edit(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    group.sample_size(10);

    let files = generate_layered_workspace(4, 10);
    let file_refs = as_file_refs(&files);

    group.bench_function("single_edit", |b| {
        b.iter_with_setup(
            || {
                let workspace = create_indexed_workspace(&file_refs);
                thread::sleep(Duration::from_millis(5));
                let path = workspace.dir.path().join("src/layer3/m0.rs");
                let mut content = fs::read_to_string(&path).expect("read failed");
                content.push_str("\npub fn added_helper() {}\n");
                fs::write(&path, content).expect("write failed");
                workspace
            },
            |mut workspace| black_box(workspace.callisto.update().expect("update failed")),
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_full_index,
    bench_update_unchanged,
    bench_update_single_edit,
);

criterion_main!(benches);

//! Shared utilities for Callisto benchmarks.

// Benchmark utilities - pedantic lints not critical here
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::format_push_string)]
#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use callisto::Callisto;
use tempfile::TempDir;

/// A workspace ready for benchmarking with Callisto already indexed.
pub struct IndexedWorkspace {
    /// Temp directory - must be kept alive for the duration of the benchmark.
    pub dir: TempDir,
    /// Callisto instance with indexed workspace.
    pub callisto: Callisto,
}

/// Create a temporary workspace with the given files.
/// Returns the temp directory (must be kept alive) and the workspace path.
pub fn create_workspace(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");

    for (path, content) in files {
        let full_path = dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("failed to write file");
    }

    let path = dir.path().to_path_buf();
    (dir, path)
}

/// Convert owned file list to borrowed references for `create_workspace`.
pub fn as_file_refs(files: &[(String, String)]) -> Vec<(&str, &str)> {
    files
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

/// Create a workspace, initialize Callisto, and run indexing.
pub fn create_indexed_workspace(files: &[(&str, &str)]) -> IndexedWorkspace {
    let (dir, path) = create_workspace(files);
    let mut callisto = Callisto::new(&path).expect("failed to create Callisto");
    callisto.index().expect("index failed");
    IndexedWorkspace { dir, callisto }
}

/// A layered workspace: `layers` directories of `width` modules each.
///
/// Every function calls two functions in the layer below, and every fifth
/// module calls back up one layer so there are a few cycles to find.
pub fn generate_layered_workspace(layers: usize, width: usize) -> Vec<(String, String)> {
    let mut files = Vec::new();
    for layer in 0..layers {
        for m in 0..width {
            let mut code = String::new();
            for f in 0..4 {
                code.push_str(&format!("pub fn l{layer}_m{m}_f{f}() {{\n"));
                if layer + 1 < layers {
                    let below = layer + 1;
                    code.push_str(&format!("    l{below}_m{}_f{f}();\n", m % width));
                    code.push_str(&format!("    l{below}_m{}_f{}();\n", (m + 1) % width, (f + 1) % 4));
                }
                if layer > 0 && m % 5 == 0 && f == 0 {
                    code.push_str(&format!("    l{}_m{m}_f3();\n", layer - 1));
                }
                code.push_str("}\n\n");
            }
            code.push_str(&format!(
                "pub struct L{layer}M{m};\n\nimpl L{layer}M{m} {{\n    pub fn run(&self) {{\n        l{layer}_m{m}_f0();\n    }}\n}}\n"
            ));
            files.push((format!("src/layer{layer}/m{m}.rs"), code));
        }
    }
    files
}

//! Integration tests for incremental indexing.
//!
//! These tests drive the full pipeline through the public facade:
//! workspace → tree-sitter → `SQLite` generation → graph projection.

use std::fs;
use std::thread;
use std::time::Duration;

use callisto::algo::layers::{detect_layers, find_violations};
use callisto::{Callisto, Error, IndexErrorKind, WriterLock};
use tempfile::TempDir;

/// Create a temporary workspace with the given files.
/// Returns the temp directory (must be kept alive) and the Callisto instance.
fn workspace_with_files(files: &[(&str, &str)]) -> (TempDir, Callisto) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");

    for (path, content) in files {
        let full_path = dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("failed to write file");
    }

    let callisto = Callisto::new(dir.path()).expect("failed to create Callisto");
    (dir, callisto)
}

const CHAIN: &[(&str, &str)] = &[
    ("src/a.rs", "pub fn alpha() {\n    beta();\n}\n"),
    ("src/b.rs", "pub fn beta() {\n    gamma();\n}\n"),
    ("src/c.rs", "pub fn gamma() {}\n"),
];

/// Rewrite a file, making sure its mtime moves.
fn rewrite(dir: &TempDir, path: &str, content: &str) {
    thread::sleep(Duration::from_millis(20));
    fs::write(dir.path().join(path), content).expect("failed to rewrite file");
}

// ============================================================================
// Basic indexing
// ============================================================================

#[test]
fn index_empty_workspace_returns_zero_stats() {
    let (_dir, mut callisto) = workspace_with_files(&[]);

    let stats = callisto.index().expect("index failed");

    assert_eq!(stats.files_indexed, 0);
    assert_eq!(stats.symbols_found, 0);
    assert_eq!(stats.edges_created, 0);
    assert!(stats.errors.is_empty());
}

#[test]
fn index_chain_resolves_cross_file_calls() {
    let (_dir, mut callisto) = workspace_with_files(CHAIN);

    let stats = callisto.index().expect("index failed");

    assert_eq!(stats.files_indexed, 3);
    assert_eq!(stats.symbols_found, 3);
    assert_eq!(stats.edges_created, 2);
    assert_eq!(stats.references_unresolved, 0);

    let alpha = callisto.find_symbol("alpha").expect("alpha missing");
    let beta = callisto.find_symbol("beta").expect("beta missing");
    let graph = callisto.graph().expect("graph failed");
    assert_eq!(graph.callees(alpha.id), vec![beta.id]);
}

#[test]
fn index_skips_build_output_and_hidden_dirs() {
    let (_dir, mut callisto) = workspace_with_files(&[
        ("src/lib.rs", "pub fn kept() {}\n"),
        ("target/debug/build.rs", "fn generated() {}\n"),
        (".hidden/secret.rs", "fn secret() {}\n"),
    ]);

    let stats = callisto.index().expect("index failed");

    assert_eq!(stats.files_indexed, 1);
    assert!(matches!(callisto.find_symbol("generated"), Err(Error::NotFound(_))));
    assert!(matches!(callisto.find_symbol("secret"), Err(Error::NotFound(_))));
}

#[test]
fn stats_report_files_symbols_and_edges() {
    let (_dir, mut callisto) = workspace_with_files(CHAIN);
    callisto.index().expect("index failed");

    let stats = callisto.stats().expect("stats failed");

    assert_eq!(stats.file_count, 3);
    assert_eq!(stats.symbol_count, 3);
    assert_eq!(stats.edge_count, 2);
    assert_eq!(stats.file_edge_count, 2);
    assert_eq!(stats.unresolved_count, 0);
    assert_eq!(stats.retry_count, 0);
}

// ============================================================================
// Structural scenarios
// ============================================================================

#[test]
fn three_file_chain_layers_without_violations() {
    let (_dir, mut callisto) = workspace_with_files(CHAIN);
    callisto.index().expect("index failed");

    let graph = callisto.graph().expect("graph failed");
    let adj = graph.adjacency();
    let layers = detect_layers(&adj);

    let alpha = callisto.find_symbol("alpha").expect("alpha missing").id;
    let gamma = callisto.find_symbol("gamma").expect("gamma missing").id;
    assert_ne!(layers[&alpha], layers[&gamma]);
    assert!(find_violations(&adj, &layers, 0).is_empty());
}

#[test]
fn mutual_calls_form_one_two_member_cycle() {
    let (_dir, mut callisto) = workspace_with_files(&[
        ("src/ping.rs", "pub fn ping() {\n    pong();\n}\n\npub fn idle() {}\n"),
        ("src/pong.rs", "pub fn pong() {\n    ping();\n}\n"),
    ]);
    callisto.index().expect("index failed");

    let cycles = callisto.cycles().expect("cycles failed");
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].len(), 2);

    let health = callisto.health().expect("health failed");
    assert_eq!(health.cycles, 1);
    assert!((health.tangle_ratio - 0.6667).abs() < 1e-3);
}

// ============================================================================
// Incremental updates
// ============================================================================

#[test]
fn update_is_idempotent() {
    let (_dir, mut callisto) = workspace_with_files(CHAIN);
    callisto.update().expect("first update failed");
    let before = callisto.stats().expect("stats failed");

    let stats = callisto.update().expect("second update failed");

    assert_eq!(stats.files_indexed, 0);
    assert_eq!(stats.files_unchanged, 3);
    let after = callisto.stats().expect("stats failed");
    assert_eq!(before.symbol_count, after.symbol_count);
    assert_eq!(before.edge_count, after.edge_count);
}

#[test]
fn touched_file_with_same_content_is_not_reparsed() {
    let (dir, mut callisto) = workspace_with_files(CHAIN);
    callisto.update().expect("update failed");
    let beta = callisto.find_symbol("beta").expect("beta missing").id;

    rewrite(&dir, "src/b.rs", CHAIN[1].1);
    let stats = callisto.update().expect("update failed");

    assert_eq!(stats.files_indexed, 0);
    assert_eq!(callisto.find_symbol("beta").expect("beta missing").id, beta);
    assert!(!callisto.needs_update().expect("staleness failed"));
}

#[test]
fn renamed_target_leaves_old_calls_unresolved() {
    let (dir, mut callisto) = workspace_with_files(CHAIN);
    callisto.update().expect("update failed");

    rewrite(&dir, "src/c.rs", "pub fn delta() {}\n");
    let stats = callisto.update().expect("update failed");

    assert_eq!(stats.files_indexed, 1);
    assert!(stats.references_unresolved >= 1);

    let beta = callisto.find_symbol("beta").expect("beta missing").id;
    let graph = callisto.graph().expect("graph failed");
    assert!(graph.callees(beta).is_empty(), "beta must not point at a stale gamma");
    assert_eq!(callisto.stats().expect("stats failed").unresolved_count, 1);
}

#[test]
fn textual_edit_keeps_edges_into_unchanged_files() {
    let (dir, mut callisto) = workspace_with_files(CHAIN);
    callisto.update().expect("update failed");
    let beta_before = callisto.find_symbol("beta").expect("beta missing").id;
    let gamma_before = callisto.find_symbol("gamma").expect("gamma missing").id;

    rewrite(
        &dir,
        "src/a.rs",
        "// entry point\n\npub fn alpha() {\n    beta();\n}\n",
    );
    callisto.update().expect("update failed");

    let alpha = callisto.find_symbol("alpha").expect("alpha missing").id;
    let beta = callisto.find_symbol("beta").expect("beta missing").id;
    let gamma = callisto.find_symbol("gamma").expect("gamma missing").id;
    assert_eq!(beta, beta_before, "unchanged file keeps its symbol ids");
    assert_eq!(gamma, gamma_before);

    let graph = callisto.graph().expect("graph failed");
    assert_eq!(graph.callees(alpha), vec![beta]);
    assert_eq!(graph.callees(beta), vec![gamma]);
    assert_eq!(graph.edge_count(), 2);
}

#[test]
fn reintroduced_name_resolves_previously_unresolved_calls() {
    let (dir, mut callisto) = workspace_with_files(&[
        ("src/a.rs", "pub fn alpha() {\n    missing();\n}\n"),
        ("src/b.rs", "pub fn beta() {}\n"),
    ]);
    callisto.update().expect("update failed");
    assert_eq!(callisto.stats().expect("stats failed").unresolved_count, 1);

    rewrite(&dir, "src/b.rs", "pub fn beta() {}\n\npub fn missing() {}\n");
    callisto.update().expect("update failed");

    let alpha = callisto.find_symbol("alpha").expect("alpha missing").id;
    let missing = callisto.find_symbol("missing").expect("missing missing").id;
    let graph = callisto.graph().expect("graph failed");
    assert_eq!(graph.callees(alpha), vec![missing]);
    assert_eq!(callisto.stats().expect("stats failed").unresolved_count, 0);
}

#[test]
fn deleted_file_drops_its_symbols_and_edges() {
    let (dir, mut callisto) = workspace_with_files(CHAIN);
    callisto.update().expect("update failed");

    fs::remove_file(dir.path().join("src/c.rs")).expect("remove failed");
    let stats = callisto.update().expect("update failed");

    assert_eq!(stats.files_removed, 1);
    assert!(matches!(callisto.find_symbol("gamma"), Err(Error::NotFound(_))));
    let graph = callisto.graph().expect("graph failed");
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn rebuild_matches_incremental_result() {
    let (dir, mut callisto) = workspace_with_files(CHAIN);
    callisto.update().expect("update failed");
    rewrite(&dir, "src/b.rs", "pub fn beta() {\n    gamma();\n    alpha();\n}\n");
    callisto.update().expect("update failed");
    let incremental = callisto.stats().expect("stats failed");

    callisto.rebuild().expect("rebuild failed");
    let rebuilt = callisto.stats().expect("stats failed");

    assert_eq!(incremental.symbol_count, rebuilt.symbol_count);
    assert_eq!(incremental.edge_count, rebuilt.edge_count);
    assert_eq!(incremental.unresolved_count, rebuilt.unresolved_count);
}

// ============================================================================
// Failures and staleness
// ============================================================================

#[test]
fn invalid_utf8_is_reported_and_retried() {
    let (dir, mut callisto) = workspace_with_files(&[("src/ok.rs", "pub fn ok() {}\n")]);
    fs::write(dir.path().join("src/bad.rs"), [0xff, 0xfe, 0x00, 0x66]).expect("write failed");

    let stats = callisto.update().expect("update failed");

    assert_eq!(stats.files_failed, 1);
    assert_eq!(stats.errors.len(), 1);
    assert_eq!(stats.errors[0].kind, IndexErrorKind::EncodingError);
    assert_eq!(stats.input_error_count(), 1);
    assert_eq!(stats.internal_error_count(), 0);
    let report = callisto.get_stale_files().expect("staleness failed");
    assert_eq!(report.retry.len(), 1);

    rewrite(&dir, "src/bad.rs", "pub fn fixed() {}\n");
    let stats = callisto.update().expect("update failed");
    assert!(stats.errors.is_empty());
    assert!(callisto.find_symbol("fixed").is_ok());
    assert!(!callisto.needs_update().expect("staleness failed"));
}

#[test]
fn staleness_report_lists_each_change_kind() {
    let (dir, mut callisto) = workspace_with_files(CHAIN);
    callisto.update().expect("update failed");
    assert!(!callisto.needs_update().expect("staleness failed"));

    rewrite(&dir, "src/a.rs", "pub fn alpha() {}\n");
    fs::remove_file(dir.path().join("src/c.rs")).expect("remove failed");
    fs::write(dir.path().join("src/d.rs"), "pub fn delta() {}\n").expect("write failed");

    let report = callisto.get_stale_files().expect("staleness failed");
    assert!(report.is_stale());
    assert_eq!(report.modified.len(), 1);
    assert_eq!(report.added.len(), 1);
    assert_eq!(report.deleted.len(), 1);
}

#[test]
fn concurrent_writer_is_refused_and_lock_released_after() {
    let (dir, mut callisto) = workspace_with_files(CHAIN);
    let lock_path = dir.path().join(".callisto/index/callisto.lock");

    {
        let _held = WriterLock::acquire(&lock_path).expect("lock failed");
        assert!(matches!(callisto.update(), Err(Error::Locked(_))));
    }

    callisto.update().expect("update after release failed");
    assert!(!WriterLock::is_held(&lock_path));
}

#[test]
fn recursive_call_is_not_an_unresolved_reference() {
    let (_dir, mut callisto) = workspace_with_files(&[(
        "src/walk.rs",
        "pub fn walk(n: u32) {\n    if n > 0 {\n        walk(n - 1);\n    }\n}\n",
    )]);

    let stats = callisto.update().expect("update failed");

    assert_eq!(stats.references_unresolved, 0);
    assert_eq!(stats.self_references, 1);
    let db = callisto.stats().expect("stats failed");
    assert_eq!(db.unresolved_count, 0);
    assert_eq!(db.edge_count, 0);
}

#[test]
fn lock_file_left_by_a_dead_writer_does_not_block_update() {
    let (dir, mut callisto) = workspace_with_files(CHAIN);
    let lock_path = dir.path().join(".callisto/index/callisto.lock");
    fs::create_dir_all(lock_path.parent().expect("lock has a parent")).expect("mkdir failed");
    fs::write(&lock_path, "99999\n").expect("failed to plant lock file");

    let stats = callisto.update().expect("update should ignore an unheld lock file");

    assert_eq!(stats.files_indexed, 3);
    assert!(!WriterLock::is_held(&lock_path));
}

#[test]
fn reopened_index_sees_committed_generation() {
    let (dir, mut callisto) = workspace_with_files(CHAIN);
    callisto.update().expect("update failed");
    drop(callisto);

    let reopened = Callisto::new(dir.path()).expect("reopen failed");
    let stats = reopened.stats().expect("stats failed");
    assert_eq!(stats.symbol_count, 3);
    assert_eq!(stats.edge_count, 2);
}

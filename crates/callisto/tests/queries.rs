//! Integration tests for the query, simulation and history surface.

use std::fs;
use std::path::{Path, PathBuf};

use callisto::query::{ForecastStatus, SafeZone};
use callisto::simulate::{Direction, Operation};
use callisto::{Callisto, Error, FileStats, SymbolComplexity};
use rstest::rstest;
use tempfile::TempDir;

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

/// ```text
/// handler ──► service ──► repo ──► conn
///    │                     ▲
///    └────── audit ────────┘
/// orphan (no edges)
/// ```
fn indexed_service() -> (TempDir, Callisto) {
    let (dir, mut callisto) = workspace_with_files(&[
        (
            "src/api/handler.rs",
            "pub fn handler() {\n    service();\n    audit();\n}\n",
        ),
        ("src/api/audit.rs", "pub fn audit() {\n    repo();\n}\n"),
        ("src/core/service.rs", "pub fn service() {\n    repo();\n}\n"),
        ("src/db/repo.rs", "pub fn repo() {\n    conn();\n}\n"),
        ("src/db/conn.rs", "pub fn conn() {}\n"),
        ("src/misc/orphan.rs", "pub fn orphan() {}\n"),
    ]);
    callisto.index().expect("index failed");
    (dir, callisto)
}

// ============================================================================
// Impact and safe zones
// ============================================================================

#[test]
fn impact_collects_transitive_callers() {
    let (_dir, callisto) = indexed_service();
    let repo = callisto.find_symbol("repo").expect("repo missing").id;

    let report = callisto.impact("conn", None).expect("impact failed");

    assert_eq!(report.affected_symbol_ids.len(), 4);
    assert_eq!(report.direct_callers, vec![repo]);
    assert_eq!(report.affected_files.len(), 4);
    assert!((report.reach_ratio - 0.8).abs() < 1e-9);
    assert!(report.weighted_importance > 0.0);
}

#[rstest]
#[case(Some(1), 1)]
#[case(Some(2), 3)]
#[case(None, 4)]
fn impact_depth_bounds_reach(#[case] depth: Option<usize>, #[case] expected: usize) {
    let (_dir, callisto) = indexed_service();

    let report = callisto.impact("conn", depth).expect("impact failed");

    assert_eq!(report.affected_symbol_ids.len(), expected);
}

#[test]
fn impact_of_unknown_symbol_is_not_found() {
    let (_dir, callisto) = indexed_service();

    assert!(matches!(callisto.impact("nope", None), Err(Error::NotFound(_))));
}

#[test]
fn safe_zone_of_isolated_symbol_has_no_boundary() {
    let (_dir, callisto) = indexed_service();

    let report = callisto.safe_zones("orphan", 3).expect("safe zones failed");

    assert_eq!(report.zone, SafeZone::Isolated);
    assert_eq!(report.internal_ids.len(), 1);
    assert!(report.boundary_ids.is_empty());
}

#[test]
fn safe_zone_boundary_counts_external_references() {
    let (_dir, callisto) = indexed_service();
    let repo = callisto.find_symbol("repo").expect("repo missing").id;

    let report = callisto.safe_zones("conn", 1).expect("safe zones failed");

    assert_eq!(report.boundary_ids, vec![repo]);
    assert_eq!(report.external_ref_counts[&repo], 2);
    assert_eq!(report.zone, SafeZone::Contained);
}

#[test]
fn safe_zone_accepts_a_file_path() {
    let (_dir, callisto) = indexed_service();

    let report = callisto.safe_zones("src/db/repo.rs", 0).expect("safe zones failed");

    assert_eq!(report.seeds.len(), 1);
}

// ============================================================================
// Simulation
// ============================================================================

#[test]
fn deleting_isolated_leaf_changes_only_size() {
    let (_dir, callisto) = indexed_service();

    let result = callisto
        .simulate(&Operation::Delete {
            target: "orphan".to_string(),
        })
        .expect("simulate failed");

    assert_eq!(result.report.removed_edges, 0);
    assert_eq!(result.report.removed_names, vec!["orphan".to_string()]);
    for delta in &result.deltas {
        match delta.metric {
            "nodes" => assert_eq!(delta.delta, -1.0),
            "health_score" | "cycles" | "tangle_ratio" | "layer_violations" | "fiedler"
            | "edges" | "god_components" | "bottlenecks" => {
                assert_eq!(delta.direction, Direction::Unchanged, "{} moved", delta.metric);
            }
            _ => {}
        }
    }
}

#[test]
fn simulation_never_touches_the_store() {
    let (_dir, callisto) = indexed_service();
    let before = callisto.stats().expect("stats failed");

    callisto
        .simulate(&Operation::Delete {
            target: "src/db".to_string(),
        })
        .expect("simulate failed");
    callisto
        .simulate(&Operation::Move {
            symbol: "repo".to_string(),
            target_file: PathBuf::from("src/core/service.rs"),
        })
        .expect("simulate failed");

    let after = callisto.stats().expect("stats failed");
    assert_eq!(before.symbol_count, after.symbol_count);
    assert_eq!(before.edge_count, after.edge_count);
}

#[test]
fn delete_directory_counts_incident_edges() {
    let (_dir, callisto) = indexed_service();

    let result = callisto
        .simulate(&Operation::Delete {
            target: "src/db".to_string(),
        })
        .expect("simulate failed");

    assert_eq!(result.report.affected.len(), 2);
    // repo→conn plus service→repo and audit→repo
    assert_eq!(result.report.removed_edges, 3);
    assert_eq!(result.after.nodes, result.before.nodes - 2);
    assert_eq!(result.after.edges, result.before.edges - 3);
}

#[test]
fn merge_moves_every_symbol_of_second_file() {
    let (_dir, callisto) = indexed_service();

    let result = callisto
        .simulate(&Operation::Merge {
            file_a: PathBuf::from("src/db/repo.rs"),
            file_b: PathBuf::from("src/db/conn.rs"),
        })
        .expect("simulate failed");

    assert_eq!(result.report.affected.len(), 1);
    assert_eq!(result.before.nodes, result.after.nodes);
}

#[test]
fn simulate_unknown_target_is_not_found() {
    let (_dir, callisto) = indexed_service();

    let result = callisto.simulate(&Operation::Move {
        symbol: "ghost".to_string(),
        target_file: PathBuf::from("src/x.rs"),
    });

    assert!(matches!(result, Err(Error::NotFound(_))));
}

// ============================================================================
// Risk and diagnosis
// ============================================================================

#[test]
fn diagnose_splits_callers_and_callees() {
    let (_dir, callisto) = indexed_service();

    let diagnosis = callisto.diagnose("repo", 1).expect("diagnose failed");

    let mut upstream: Vec<&str> = diagnosis.upstream.iter().map(|s| s.name.as_str()).collect();
    upstream.sort_unstable();
    assert_eq!(upstream, vec!["audit", "service"]);
    let downstream: Vec<&str> = diagnosis.downstream.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(downstream, vec!["conn"]);
    assert!(!diagnosis.verdict.is_empty());
}

#[test]
fn recorded_signals_raise_suspect_risk() {
    let (_dir, mut callisto) = indexed_service();
    let conn = callisto.find_symbol("conn").expect("conn missing").id;

    callisto
        .record_file_stats(
            Path::new("src/db/conn.rs"),
            &FileStats {
                commit_count: 40,
                total_churn: 900,
                cochange_entropy: 2.5,
                health_score: Some(3.0),
            },
        )
        .expect("record stats failed");
    callisto
        .record_file_stats(
            Path::new("src/core/service.rs"),
            &FileStats {
                commit_count: 2,
                total_churn: 10,
                cochange_entropy: 0.1,
                health_score: Some(9.5),
            },
        )
        .expect("record stats failed");
    callisto
        .record_symbol_complexity(
            conn,
            &SymbolComplexity {
                cognitive_complexity: 30.0,
                line_count: 80,
            },
        )
        .expect("record complexity failed");

    let diagnosis = callisto.diagnose("repo", 1).expect("diagnose failed");
    let conn_risk = diagnosis.downstream[0].risk;
    let service_risk = diagnosis
        .upstream
        .iter()
        .find(|s| s.name == "service")
        .expect("service suspect")
        .risk;
    assert!(conn_risk > service_risk);
}

// ============================================================================
// Snapshots, trends and forecasts
// ============================================================================

#[test]
fn health_is_computed_without_storing() {
    let (_dir, callisto) = indexed_service();

    let health = callisto.health().expect("health failed");

    assert_eq!(health.symbols, 6);
    assert_eq!(health.edges, 5);
    assert_eq!(health.cycles, 0);
    assert!(health.health_score <= 100);
    assert!(callisto.get_snapshots(None, None).expect("list failed").is_empty());
}

#[test]
fn snapshots_append_and_trend_oldest_first() {
    let (_dir, mut callisto) = indexed_service();

    let first = callisto
        .append_snapshot(Some("baseline"), Some("main"), Some("abc123"))
        .expect("snapshot failed");
    callisto.append_snapshot(None, None, None).expect("snapshot failed");

    assert_eq!(first.tag.as_deref(), Some("baseline"));
    assert_eq!(first.git_commit.as_deref(), Some("abc123"));
    let stored = callisto.get_snapshots(None, None).expect("list failed");
    assert_eq!(stored.len(), 2);

    let trend = callisto.trend("symbols", None).expect("trend failed");
    assert_eq!(trend.len(), 2);
    assert_eq!(trend[0].snapshot_id, first.id);
    assert_eq!(trend[0].delta, None);
    assert_eq!(trend[1].delta, Some(0.0));
}

#[test]
fn forecast_needs_enough_history() {
    let (_dir, mut callisto) = indexed_service();
    callisto.append_snapshot(None, None, None).expect("snapshot failed");
    assert!(callisto.forecast(None).expect("forecast failed").is_empty());

    callisto.append_snapshot(None, None, None).expect("snapshot failed");
    callisto.append_snapshot(None, None, None).expect("snapshot failed");
    let forecasts = callisto.forecast(Some(5)).expect("forecast failed");

    assert!(!forecasts.is_empty());
    for f in &forecasts {
        assert_eq!(f.status, ForecastStatus::Stable, "{} not stable", f.metric);
    }
}

//! Database schema definition for Callisto.

/// Database schema definition.
pub(crate) const SCHEMA: &str = r"
-- Indexed source files
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    path TEXT NOT NULL UNIQUE,
    language TEXT NOT NULL,
    line_count INTEGER NOT NULL DEFAULT 0,
    mtime_ns INTEGER NOT NULL,
    size_bytes INTEGER NOT NULL,
    content_hash INTEGER,
    needs_retry INTEGER NOT NULL DEFAULT 0,
    indexed_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_files_retry ON files(needs_retry) WHERE needs_retry = 1;

-- Symbol definitions (replaced wholesale when the owning file is re-indexed)
CREATE TABLE IF NOT EXISTS symbols (
    id INTEGER PRIMARY KEY,
    file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    kind TEXT NOT NULL,
    line_start INTEGER NOT NULL,
    line_end INTEGER NOT NULL,
    signature TEXT,
    is_exported INTEGER NOT NULL DEFAULT 0,
    parent_id INTEGER REFERENCES symbols(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);
CREATE INDEX IF NOT EXISTS idx_symbols_qualified ON symbols(qualified_name);
CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_id);

-- Raw references, kept so unchanged files can be re-resolved without re-parsing.
-- target_simple is the last path segment of target_name (db::open -> open).
CREATE TABLE IF NOT EXISTS refs (
    id INTEGER PRIMARY KEY,
    file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    source_name TEXT,
    line INTEGER NOT NULL,
    target_name TEXT NOT NULL,
    target_simple TEXT NOT NULL,
    kind TEXT NOT NULL,
    resolved INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_refs_file ON refs(file_id);
CREATE INDEX IF NOT EXISTS idx_refs_target_simple ON refs(target_simple);
CREATE INDEX IF NOT EXISTS idx_refs_unresolved ON refs(resolved) WHERE resolved = 0;

-- Resolved symbol-to-symbol edges
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY,
    source_id INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
    target_id INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    line INTEGER NOT NULL,
    UNIQUE (source_id, target_id, kind),
    CHECK (source_id != target_id)
);

CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);

-- File-level dependencies, derived from edges
CREATE TABLE IF NOT EXISTS file_edges (
    source_file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    target_file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    symbol_count INTEGER NOT NULL,
    PRIMARY KEY (source_file_id, target_file_id, kind)
);

CREATE INDEX IF NOT EXISTS idx_file_edges_target ON file_edges(target_file_id);

-- Batch-computed per-symbol graph metrics
CREATE TABLE IF NOT EXISTS graph_metrics (
    symbol_id INTEGER PRIMARY KEY REFERENCES symbols(id) ON DELETE CASCADE,
    pagerank REAL NOT NULL,
    in_degree INTEGER NOT NULL,
    out_degree INTEGER NOT NULL,
    betweenness REAL NOT NULL
);

-- Community assignments
CREATE TABLE IF NOT EXISTS clusters (
    symbol_id INTEGER PRIMARY KEY REFERENCES symbols(id) ON DELETE CASCADE,
    cluster_id INTEGER NOT NULL,
    label TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_clusters_cluster ON clusters(cluster_id);

-- Upstream history signals (churn, co-change, per-file health)
CREATE TABLE IF NOT EXISTS file_stats (
    file_id INTEGER PRIMARY KEY REFERENCES files(id) ON DELETE CASCADE,
    commit_count INTEGER NOT NULL DEFAULT 0,
    total_churn INTEGER NOT NULL DEFAULT 0,
    cochange_entropy REAL NOT NULL DEFAULT 0,
    health_score REAL
);

-- Upstream complexity signals
CREATE TABLE IF NOT EXISTS symbol_metrics (
    symbol_id INTEGER PRIMARY KEY REFERENCES symbols(id) ON DELETE CASCADE,
    cognitive_complexity REAL NOT NULL DEFAULT 0,
    line_count INTEGER NOT NULL DEFAULT 0
);

-- Append-only metric history
CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY,
    timestamp INTEGER NOT NULL,
    tag TEXT,
    source TEXT NOT NULL,
    git_branch TEXT,
    git_commit TEXT,
    files INTEGER NOT NULL,
    symbols INTEGER NOT NULL,
    edges INTEGER NOT NULL,
    cycles INTEGER NOT NULL,
    god_components INTEGER NOT NULL,
    bottlenecks INTEGER NOT NULL,
    dead_exports INTEGER NOT NULL,
    layer_violations INTEGER NOT NULL,
    health_score INTEGER NOT NULL,
    tangle_ratio REAL NOT NULL,
    avg_complexity REAL NOT NULL,
    brain_methods INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_snapshots_timestamp ON snapshots(timestamp);
";

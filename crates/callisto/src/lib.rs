//! # Callisto: incremental code graph and architecture analytics
//!
//! Callisto indexes a workspace with pluggable parser adapters, resolves raw
//! references into a symbol-level dependency graph and keeps it in `SQLite`.
//! On top of that graph it answers architecture questions: cycles, layering,
//! centrality, communities, boundary fragility, blast radius, what-if
//! refactorings, risk and trend forecasts.
//!
//! ## Design Philosophy
//!
//! - **Store is the source of truth** - the in-memory graph is a disposable projection
//! - **Incremental by default** - only changed files and their dependents are re-resolved
//! - **Bounded algorithms** - expensive exact methods sit behind size gates
//! - **Structured results** - queries return plain data; rendering is the caller's job
//!
//! ## Quick Start
//!
//! ```no_run
//! use callisto::Callisto;
//! use std::path::Path;
//!
//! let mut callisto = Callisto::new(Path::new("/path/to/workspace"))?;
//!
//! let stats = callisto.update()?;
//! println!("Indexed {} files, {} edges", stats.files_indexed, stats.edges_created);
//!
//! let report = callisto.impact("Index::open", None)?;
//! println!("{} dependents", report.affected_symbol_ids.len());
//! # Ok::<(), callisto::Error>(())
//! ```

pub mod adapter;
pub mod algo;
pub mod config;
mod db;
mod error;
pub mod graph;
mod indexer;
mod lock;
pub mod query;
mod resolver;
pub mod simulate;
mod types;

pub use adapter::{AdapterRegistry, ParserAdapter, RustAdapter};
pub use config::Config;
pub use error::{AlgorithmError, Error, IndexError, IndexErrorKind, Result};
pub use graph::{CodeGraph, NodeData, SimulationGraph};
pub use indexer::IndexPhase;
pub use lock::WriterLock;
pub use types::{
    ClusterAssignment, DatabaseStats, Edge, EdgeKind, FileFacts, FileId, FileStats, IndexStats,
    IndexedFile, Language, RawReference, RawSymbol, Snapshot, StalenessReport, Symbol,
    SymbolComplexity, SymbolId, SymbolKind, SymbolMetrics,
};

use std::path::{Path, PathBuf};

use tracing::debug;

use algo::scc::{Cycle, find_cycles};
use config::CALLISTO_DIR_NAME;
use db::Index;
use query::forecast::MetricForecast;
use query::impact::ImpactReport;
use query::risk::{Diagnosis, RiskSignals};
use query::safe_zones::SafeZoneReport;
use query::snapshot::{SnapshotInputs, TrendPoint, compute_snapshot};
use simulate::{Operation, SimulationResult};

/// Code graph index and analysis interface for one workspace.
///
/// Owns the store, the adapter registry and the loaded configuration. Every
/// query builds its own graph projection, so results never observe another
/// caller's half-built state.
pub struct Callisto {
    workspace_root: PathBuf,
    db_path: PathBuf,
    lock_path: PathBuf,
    db: Index,
    registry: AdapterRegistry,
    config: Config,
}

#[allow(clippy::missing_errors_doc)]
impl Callisto {
    /// Open a workspace with the built-in adapters.
    ///
    /// Uses convention-based defaults:
    /// - Configuration from `.callisto/config.yaml` when present
    /// - Database stored at `.callisto/index/callisto.db`
    pub fn new(workspace_root: &Path) -> Result<Self> {
        Self::with_registry(workspace_root, AdapterRegistry::with_defaults())
    }

    /// Open a workspace with an explicitly constructed adapter registry.
    pub fn with_registry(workspace_root: &Path, registry: AdapterRegistry) -> Result<Self> {
        let workspace_root = workspace_root.canonicalize().map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("workspace root not found: {}", workspace_root.display()),
            ))
        })?;

        let config = Config::load_or_default(&workspace_root)?;
        let index_dir = workspace_root.join(CALLISTO_DIR_NAME).join("index");
        let db_path = index_dir.join("callisto.db");
        let lock_path = index_dir.join("callisto.lock");
        let db = Index::open(&db_path)?;

        debug!(
            workspace = %workspace_root.display(),
            adapters = registry.len(),
            "Opened workspace"
        );
        Ok(Self {
            workspace_root,
            db_path,
            lock_path,
            db,
            registry,
            config,
        })
    }

    /// Replace the loaded configuration.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Canonical workspace root.
    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    // === Indexing ===

    /// Re-parse every supported file in the workspace.
    pub fn index(&mut self) -> Result<IndexStats> {
        self.run_index(true)
    }

    /// Re-parse changed files and re-resolve everything they affect.
    pub fn update(&mut self) -> Result<IndexStats> {
        self.run_index(false)
    }

    /// Drop the store and index from scratch.
    pub fn rebuild(&mut self) -> Result<IndexStats> {
        {
            let _lock = WriterLock::acquire(&self.lock_path)?;
            self.db.reset()?;
        }
        self.run_index(true)
    }

    /// Files whose on-disk state differs from the index.
    pub fn get_stale_files(&self) -> Result<StalenessReport> {
        self.staleness()
    }

    /// Whether [`Self::update`] would change anything.
    pub fn needs_update(&self) -> Result<bool> {
        Ok(self.staleness()?.is_stale())
    }

    // === Graph ===

    /// A fresh projection of the current generation.
    pub fn graph(&self) -> Result<CodeGraph> {
        CodeGraph::from_index(&self.db)
    }

    /// Counts describing the store.
    pub fn stats(&self) -> Result<DatabaseStats> {
        self.db.get_stats()
    }

    /// Metrics stored by the last index run, ordered by symbol id.
    pub fn graph_metrics(&self) -> Result<Vec<SymbolMetrics>> {
        let mut metrics: Vec<SymbolMetrics> = self.db.get_graph_metrics()?.into_values().collect();
        metrics.sort_by_key(|m| m.symbol_id);
        Ok(metrics)
    }

    /// Community assignments stored by the last index run.
    pub fn clusters(&self) -> Result<Vec<ClusterAssignment>> {
        self.db.get_clusters()
    }

    /// Non-trivial strongly connected components, largest first.
    pub fn cycles(&self) -> Result<Vec<Cycle>> {
        Ok(find_cycles(&self.graph()?.adjacency(), 2))
    }

    /// Look up a symbol by qualified name, else simple name.
    pub fn find_symbol(&self, name: &str) -> Result<Symbol> {
        self.db
            .find_symbols_by_name(name)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("symbol '{name}'")))
    }

    // === Queries ===

    /// Everything that transitively depends on `symbol`.
    pub fn impact(&self, symbol: &str, depth: Option<usize>) -> Result<ImpactReport> {
        let target = self.find_symbol(symbol)?.id;
        query::impact(&self.graph()?, target, depth, self.config.analysis.pagerank_damping)
    }

    /// Bounded neighbourhood of a symbol, or of every symbol in a file.
    pub fn safe_zones(&self, target: &str, depth: usize) -> Result<SafeZoneReport> {
        let graph = self.graph()?;
        let seeds = simulate::resolve_target(&graph, target);
        if seeds.is_empty() {
            return Err(Error::NotFound(format!("symbol or file '{target}'")));
        }
        query::safe_zones(&graph, &seeds, depth)
    }

    /// Try a refactoring on a private copy of the graph.
    pub fn simulate(&self, operation: &Operation) -> Result<SimulationResult> {
        simulate::simulate(&self.graph()?, operation, &self.config.analysis)
    }

    /// Recorded risk inputs and the model fitted to them.
    pub fn risk_signals(&self) -> Result<RiskSignals> {
        query::risk::load_signals(&self.db)
    }

    /// Rank likely root causes around `symbol`.
    pub fn diagnose(&self, symbol: &str, depth: usize) -> Result<Diagnosis> {
        let target = self.find_symbol(symbol)?.id;
        query::diagnose(&self.graph()?, &self.risk_signals()?, target, depth)
    }

    // === Upstream signals ===

    /// Store churn and co-change numbers for an indexed file.
    pub fn record_file_stats(&mut self, path: &Path, stats: &FileStats) -> Result<()> {
        let relative = self.relative_path(path).to_path_buf();
        self.db.record_file_stats(&relative, stats)
    }

    /// Store complexity numbers for a symbol.
    pub fn record_symbol_complexity(&mut self, symbol: SymbolId, complexity: &SymbolComplexity) -> Result<()> {
        self.db.record_symbol_complexity(symbol, complexity)
    }

    // === Snapshots ===

    /// The canonical metric set right now, without storing it.
    pub fn health(&self) -> Result<Snapshot> {
        self.measure(None, "health", None, None)
    }

    /// Compute the canonical metric set and append it to the history.
    pub fn append_snapshot(
        &mut self,
        tag: Option<&str>,
        git_branch: Option<&str>,
        git_commit: Option<&str>,
    ) -> Result<Snapshot> {
        let snapshot = self.measure(tag, "snapshot", git_branch, git_commit)?;
        let stored = self.db.insert_snapshot(&snapshot)?;
        debug!(id = stored.id, health = stored.health_score, "Recorded snapshot");
        Ok(stored)
    }

    /// Stored snapshots, newest first.
    pub fn get_snapshots(&self, limit: Option<usize>, since: Option<i64>) -> Result<Vec<Snapshot>> {
        self.db.get_snapshots(limit, since)
    }

    /// One metric's history, oldest first.
    pub fn trend(&self, metric: &str, limit: Option<usize>) -> Result<Vec<TrendPoint>> {
        if query::snapshot::metric_value(&placeholder_snapshot(), metric).is_none() {
            return Err(Error::NotFound(format!("metric '{metric}'")));
        }
        Ok(query::trend(&self.db.get_snapshots(limit, None)?, metric))
    }

    /// Forecast every configured metric over the snapshot history.
    pub fn forecast(&self, horizon: Option<u32>) -> Result<Vec<MetricForecast>> {
        let history = self.db.get_snapshots(None, None)?;
        Ok(query::forecast(&history, &self.config.forecast, horizon))
    }

    fn measure(
        &self,
        tag: Option<&str>,
        source: &str,
        git_branch: Option<&str>,
        git_commit: Option<&str>,
    ) -> Result<Snapshot> {
        let graph = self.graph()?;
        let inputs = SnapshotInputs {
            files: self.db.list_all_files()?.len(),
            betweenness: self
                .db
                .get_graph_metrics()?
                .into_iter()
                .map(|(id, m)| (id, m.betweenness))
                .collect(),
            file_stats: self.db.get_all_file_stats()?.into_values().collect(),
            complexity: self.db.get_all_symbol_complexity()?.into_values().collect(),
            tag,
            source,
            git_branch,
            git_commit,
        };
        Ok(compute_snapshot(&graph, &inputs, &self.config.analysis))
    }

    // === Database ===

    /// Get path to the `SQLite` database file.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Vacuum the database to reclaim space.
    pub fn vacuum(&self) -> Result<()> {
        self.db.vacuum()
    }

    /// Get the path relative to the workspace root.
    ///
    /// Returns the original path if it's not under the workspace root.
    fn relative_path<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.workspace_root).unwrap_or(path)
    }
}

/// An all-zero snapshot, used to validate metric names.
fn placeholder_snapshot() -> Snapshot {
    Snapshot {
        id: 0,
        timestamp: 0,
        tag: None,
        source: String::new(),
        git_branch: None,
        git_commit: None,
        files: 0,
        symbols: 0,
        edges: 0,
        cycles: 0,
        god_components: 0,
        bottlenecks: 0,
        dead_exports: 0,
        layer_violations: 0,
        health_score: 0,
        tangle_ratio: 0.0,
        avg_complexity: 0.0,
        brain_methods: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_workspace() -> TempDir {
        tempfile::tempdir().expect("failed to create temp dir")
    }

    #[test]
    fn new_creates_instance_for_valid_workspace() {
        let workspace = temp_workspace();
        let callisto = Callisto::new(workspace.path()).unwrap();

        assert!(callisto.db_path().ends_with(".callisto/index/callisto.db"));
        assert!(callisto.db_path().exists());
    }

    #[test]
    fn new_fails_for_nonexistent_workspace() {
        let result = Callisto::new(Path::new("/nonexistent/path/that/does/not/exist"));

        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn unknown_trend_metric_is_not_found() {
        let workspace = temp_workspace();
        let callisto = Callisto::new(workspace.path()).unwrap();

        assert!(matches!(callisto.trend("bogus", None), Err(Error::NotFound(_))));
        assert!(callisto.trend("health_score", None).unwrap().is_empty());
    }

    #[test]
    fn held_lock_blocks_indexing() {
        let workspace = temp_workspace();
        let mut callisto = Callisto::new(workspace.path()).unwrap();
        let _held = WriterLock::acquire(&callisto.lock_path).unwrap();

        assert!(matches!(callisto.update(), Err(Error::Locked(_))));
    }
}

//! The incremental indexing pipeline.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │ Discovering    walk the workspace, stat every supported file       │
//! │ Extracting     rayon: read, hash, parse files whose stat moved     │
//! │ Resolving      affected set + one transaction (commit_generation)  │
//! │ Materializing  graph metrics and clusters, recomputed in full      │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The affected set is every changed file plus every unchanged file that
//! has an edge into a changed file or a raw reference naming one of a
//! changed file's old or new symbols. Re-resolving only changed files would
//! leave edges pointing at renamed or deleted targets.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Instant, UNIX_EPOCH};

use rayon::prelude::*;
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::Callisto;
use crate::adapter::AdapterRegistry;
use crate::algo::centrality::compute_symbol_metrics;
use crate::algo::community::{detect_communities, label_clusters};
use crate::config::IndexConfig;
use crate::db::{FailedFile, GenerationPlan, ParsedFile};
use crate::error::{IndexError, Result};
use crate::graph::CodeGraph;
use crate::lock::WriterLock;
use crate::types::{ClusterAssignment, FileId, IndexStats, IndexedFile, Language, StalenessReport};

/// Pipeline state, logged as each one is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPhase {
    /// No run in progress
    Idle,
    /// Walking the workspace
    Discovering,
    /// Hashing and parsing changed files
    Extracting,
    /// Writing the generation and re-resolving references
    Resolving,
    /// Recomputing graph metrics and clusters
    Materializing,
}

impl fmt::Display for IndexPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::Extracting => "extracting",
            Self::Resolving => "resolving",
            Self::Materializing => "materializing",
        })
    }
}

fn enter(phase: IndexPhase) {
    debug!(%phase, "Index phase");
}

/// A supported file found on disk.
#[derive(Debug, Clone)]
struct DiskFile {
    /// Workspace-relative
    relative: PathBuf,
    absolute: PathBuf,
    language: Language,
    mtime_ns: i64,
    size_bytes: u64,
}

/// What extraction made of one candidate file.
enum Extraction {
    /// Content hash matched; only the stored mtime needs refreshing
    Touched { file_id: FileId, mtime_ns: i64 },
    Parsed(ParsedFile),
    Failed(FailedFile, IndexError),
}

/// Walk `root` and stat every file an adapter in `registry` supports.
///
/// Unreadable directories and entries are logged and skipped.
fn discover(root: &Path, registry: &AdapterRegistry, config: &IndexConfig) -> Vec<DiskFile> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(directory = %dir.display(), error = %e, "Cannot read directory, skipping");
                continue;
            }
        };
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(directory = %dir.display(), error = %e, "Failed to read directory entry, skipping");
                    continue;
                }
            };
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                let hidden = name.starts_with('.') && !config.include_hidden;
                if !hidden && !config.exclude_dirs.iter().any(|d| d == name.as_ref()) {
                    pending.push(path);
                }
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            let Some(adapter) = registry.for_path(&path) else {
                continue;
            };
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot stat file, skipping");
                    continue;
                }
            };
            #[allow(clippy::cast_possible_truncation)]
            let mtime_ns = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |d| d.as_nanos() as i64);
            files.push(DiskFile {
                relative: path.strip_prefix(root).unwrap_or(&path).to_path_buf(),
                absolute: path,
                language: adapter.language(),
                mtime_ns,
                size_bytes: metadata.len(),
            });
        }
    }
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    files
}

/// Whether the stat alone proves `file` unchanged since `stored`.
fn stat_matches(file: &DiskFile, stored: &IndexedFile) -> bool {
    !stored.needs_retry && stored.mtime_ns == file.mtime_ns && stored.size_bytes == file.size_bytes
}

/// Read, hash and (when the hash moved) parse one file.
fn extract(file: &DiskFile, stored: Option<&IndexedFile>, registry: &AdapterRegistry, force: bool) -> Extraction {
    let failed = |error: IndexError| {
        Extraction::Failed(
            FailedFile {
                path: file.relative.clone(),
                language: file.language,
                mtime_ns: file.mtime_ns,
                size_bytes: file.size_bytes,
            },
            error,
        )
    };

    let bytes = match std::fs::read(&file.absolute) {
        Ok(b) => b,
        Err(e) => return failed(IndexError::io_error(file.relative.clone(), &e)),
    };
    let content_hash = xxh3_64(&bytes);
    if !force
        && let Some(stored) = stored
        && !stored.needs_retry
        && stored.content_hash == Some(content_hash)
    {
        return Extraction::Touched {
            file_id: stored.id,
            mtime_ns: file.mtime_ns,
        };
    }

    let Ok(source) = std::str::from_utf8(&bytes) else {
        return failed(IndexError::encoding_error(file.relative.clone()));
    };
    let Some(adapter) = registry.for_path(&file.relative) else {
        return failed(IndexError::unsupported_language(file.relative.clone()));
    };
    match adapter.parse(&file.relative, source) {
        Ok(facts) => Extraction::Parsed(ParsedFile {
            path: file.relative.clone(),
            language: file.language,
            mtime_ns: file.mtime_ns,
            size_bytes: file.size_bytes,
            content_hash,
            facts,
        }),
        Err(e) => failed(IndexError::parse_failed(file.relative.clone(), e.to_string())),
    }
}

impl Callisto {
    /// One pipeline run. With `force`, every discovered file is re-parsed.
    pub(crate) fn run_index(&mut self, force: bool) -> Result<IndexStats> {
        let start = Instant::now();
        let _lock = WriterLock::acquire(&self.lock_path)?;

        enter(IndexPhase::Discovering);
        let disk = discover(&self.workspace_root, &self.registry, &self.config.index);
        let stored: HashMap<PathBuf, IndexedFile> = self
            .db
            .list_all_files()?
            .into_iter()
            .map(|f| (f.path.clone(), f))
            .collect();
        let discovered: HashSet<&Path> = disk.iter().map(|f| f.relative.as_path()).collect();
        let removed: Vec<FileId> = stored
            .values()
            .filter(|f| !discovered.contains(f.path.as_path()))
            .map(|f| f.id)
            .collect();

        let (candidates, unchanged): (Vec<&DiskFile>, Vec<&DiskFile>) = disk
            .iter()
            .partition(|f| force || stored.get(&f.relative).is_none_or(|s| !stat_matches(f, s)));
        debug!(
            discovered = disk.len(),
            candidates = candidates.len(),
            removed = removed.len(),
            "Discovery complete"
        );

        enter(IndexPhase::Extracting);
        let registry = &self.registry;
        let extractions: Vec<Extraction> = candidates
            .par_iter()
            .map(|f| extract(f, stored.get(&f.relative), registry, force))
            .collect();

        let mut stats = IndexStats {
            files_unchanged: unchanged.len(),
            files_removed: removed.len(),
            ..IndexStats::default()
        };
        let mut plan = GenerationPlan {
            removed,
            ..GenerationPlan::default()
        };
        for extraction in extractions {
            match extraction {
                Extraction::Touched { file_id, mtime_ns } => {
                    self.db.touch_file_mtime(file_id, mtime_ns)?;
                    stats.files_unchanged += 1;
                }
                Extraction::Parsed(parsed) => plan.parsed.push(parsed),
                Extraction::Failed(failed, error) => {
                    if error.kind.is_internal_error() {
                        warn!(path = %failed.path.display(), error = %error, "File unreadable, will retry next run");
                    } else {
                        info!(path = %failed.path.display(), error = %error, "File skipped, will retry next run");
                    }
                    stats.errors.push(error);
                    plan.failed.push(failed);
                }
            }
        }
        stats.files_indexed = plan.parsed.len();
        stats.files_failed = plan.failed.len();

        if plan.parsed.is_empty() && plan.failed.is_empty() && plan.removed.is_empty() {
            enter(IndexPhase::Idle);
            stats.duration = start.elapsed();
            debug!("Index is up to date");
            return Ok(stats);
        }

        enter(IndexPhase::Resolving);
        plan.dependents = self.dependents_of(&plan, &stored)?;
        let outcome = self.db.commit_generation(&plan)?;
        stats.symbols_found = outcome.symbols_written;
        stats.references_found = outcome.references_written;
        stats.references_unresolved = outcome.references_unresolved;
        stats.self_references = outcome.self_references;
        stats.edges_created = outcome.edges_created;
        stats.affected_files = outcome.affected_files;

        enter(IndexPhase::Materializing);
        self.materialize()?;

        enter(IndexPhase::Idle);
        stats.duration = start.elapsed();
        info!(
            indexed = stats.files_indexed,
            unchanged = stats.files_unchanged,
            removed = stats.files_removed,
            failed = stats.files_failed,
            edges = stats.edges_created,
            unresolved = stats.references_unresolved,
            elapsed_ms = stats.duration.as_millis(),
            "Indexing complete"
        );
        Ok(stats)
    }

    /// Unchanged files whose references must be re-resolved for `plan`.
    fn dependents_of(&self, plan: &GenerationPlan, stored: &HashMap<PathBuf, IndexedFile>) -> Result<Vec<FileId>> {
        let rewritten: Vec<FileId> = plan
            .parsed
            .iter()
            .map(|p| &p.path)
            .chain(plan.failed.iter().map(|f| &f.path))
            .filter_map(|path| stored.get(path).map(|f| f.id))
            .chain(plan.removed.iter().copied())
            .collect();

        let mut names = self.db.symbol_names_in_files(&rewritten)?;
        names.extend(
            plan.parsed
                .iter()
                .flat_map(|p| p.facts.symbols.iter().map(|s| s.name.clone())),
        );

        let mut dependents = self.db.files_with_edges_into(&rewritten)?;
        dependents.extend(self.db.files_referencing_names(&names)?);
        for id in &rewritten {
            dependents.remove(id);
        }
        let mut dependents: Vec<FileId> = dependents.into_iter().collect();
        dependents.sort_unstable();
        debug!(
            rewritten = rewritten.len(),
            names = names.len(),
            dependents = dependents.len(),
            "Computed affected set"
        );
        Ok(dependents)
    }

    /// Recompute and store graph metrics and clusters for the whole graph.
    fn materialize(&mut self) -> Result<()> {
        let graph = CodeGraph::from_index(&self.db)?;
        let adj = graph.adjacency();
        let metrics = compute_symbol_metrics(&adj, &self.config.analysis);
        self.db.replace_graph_metrics(&metrics)?;

        let partition = detect_communities(&adj);
        let pagerank: Vec<f64> = metrics.iter().map(|m| m.pagerank).collect();
        let labels = label_clusters(&graph, &adj, &partition, &pagerank);
        let assignments: Vec<ClusterAssignment> = partition
            .iter()
            .enumerate()
            .map(|(i, &cid)| ClusterAssignment {
                symbol_id: adj.id(i),
                cluster_id: u32::try_from(cid).unwrap_or(u32::MAX),
                label: labels.get(&cid).cloned().unwrap_or_default(),
            })
            .collect();
        self.db.replace_clusters(&assignments)?;
        self.db.analyze()?;

        debug!(
            symbols = metrics.len(),
            clusters = labels.len(),
            "Materialized graph metrics"
        );
        Ok(())
    }

    /// Compare the workspace on disk with the index without writing anything.
    pub(crate) fn staleness(&self) -> Result<StalenessReport> {
        let disk = discover(&self.workspace_root, &self.registry, &self.config.index);
        let stored: HashMap<PathBuf, IndexedFile> = self
            .db
            .list_all_files()?
            .into_iter()
            .map(|f| (f.path.clone(), f))
            .collect();

        let mut report = StalenessReport::default();
        for file in &disk {
            let Some(entry) = stored.get(&file.relative) else {
                report.added.push(file.relative.clone());
                continue;
            };
            if entry.needs_retry {
                report.retry.push(file.relative.clone());
                continue;
            }
            if stat_matches(file, entry) {
                continue;
            }
            let same_content = entry.size_bytes == file.size_bytes
                && std::fs::read(&file.absolute)
                    .is_ok_and(|bytes| entry.content_hash == Some(xxh3_64(&bytes)));
            if !same_content {
                report.modified.push(file.relative.clone());
            }
        }

        let discovered: HashSet<&Path> = disk.iter().map(|f| f.relative.as_path()).collect();
        report.deleted = stored
            .keys()
            .filter(|p| !discovered.contains(p.as_path()))
            .cloned()
            .collect();
        report.deleted.sort();
        Ok(report)
    }
}

//! The atomic write of one index generation.
//!
//! Everything an index run changes (file rows, symbols, raw references,
//! edges, file edges) is written in a single transaction. Readers see either
//! the previous generation or the new one, never a mix.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use rusqlite::{Transaction, params};

use super::Index;
use super::file_edges::rebuild_file_edges;
use super::helpers::{normalize_path, simple_name};
use super::references::list_references_on;
use super::symbols::list_all_symbols_on;
use crate::error::Result;
use crate::resolver::{ReferenceInput, Resolution, SymbolTable};
use crate::types::{FileFacts, FileId, Language};

/// A file that parsed successfully in this run.
#[derive(Debug, Clone)]
pub(crate) struct ParsedFile {
    /// Workspace-relative path
    pub path: PathBuf,
    pub language: Language,
    pub mtime_ns: i64,
    pub size_bytes: u64,
    pub content_hash: u64,
    pub facts: FileFacts,
}

/// A file that failed to parse; stored with `needs_retry` set.
#[derive(Debug, Clone)]
pub(crate) struct FailedFile {
    pub path: PathBuf,
    pub language: Language,
    pub mtime_ns: i64,
    pub size_bytes: u64,
}

/// Inputs to one generation write.
#[derive(Debug, Default)]
pub(crate) struct GenerationPlan {
    /// Files no longer on disk
    pub removed: Vec<FileId>,
    /// Files re-extracted this run
    pub parsed: Vec<ParsedFile>,
    /// Files that failed extraction this run
    pub failed: Vec<FailedFile>,
    /// Unchanged files whose references must be re-resolved
    pub dependents: Vec<FileId>,
}

/// What a generation write did.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct GenerationOutcome {
    pub symbols_written: usize,
    pub references_written: usize,
    pub references_resolved: usize,
    pub references_unresolved: usize,
    pub self_references: usize,
    pub edges_created: usize,
    pub affected_files: usize,
}

impl Index {
    /// Write one generation atomically.
    ///
    /// 1. Drop removed files (symbols, references and edges cascade)
    /// 2. Replace symbols and raw references of parsed files
    /// 3. Clear failed files and mark them for retry
    /// 4. Drop every edge originating in an affected file
    /// 5. Re-resolve every raw reference of every affected file
    /// 6. Rebuild file edges
    pub(crate) fn commit_generation(&mut self, plan: &GenerationPlan) -> Result<GenerationOutcome> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let indexed_at = Self::now_ns()?;
        let mut outcome = GenerationOutcome::default();

        for file_id in &plan.removed {
            tx.execute("DELETE FROM files WHERE id = ?1", [file_id.as_i64()])?;
        }

        let mut affected: BTreeSet<FileId> = plan.dependents.iter().copied().collect();

        for parsed in &plan.parsed {
            let file_id = upsert_file_row(
                &tx,
                &parsed.path,
                parsed.language,
                parsed.facts.line_count,
                parsed.mtime_ns,
                parsed.size_bytes,
                Some(parsed.content_hash),
                false,
                indexed_at,
            )?;
            clear_file_contents(&tx, file_id)?;
            outcome.symbols_written += insert_symbols(&tx, file_id, &parsed.facts)?;
            outcome.references_written += insert_references(&tx, file_id, &parsed.facts)?;
            affected.insert(file_id);
        }

        for failed in &plan.failed {
            let file_id = upsert_file_row(
                &tx,
                &failed.path,
                failed.language,
                0,
                failed.mtime_ns,
                failed.size_bytes,
                None,
                true,
                indexed_at,
            )?;
            clear_file_contents(&tx, file_id)?;
            affected.insert(file_id);
        }

        for file_id in &affected {
            tx.execute(
                "DELETE FROM edges WHERE source_id IN (SELECT id FROM symbols WHERE file_id = ?1)",
                [file_id.as_i64()],
            )?;
        }

        resolve_affected(&tx, &affected, &mut outcome)?;

        let file_edges = rebuild_file_edges(&tx)?;
        outcome.affected_files = affected.len();

        tx.commit()?;

        tracing::debug!(
            affected = outcome.affected_files,
            edges = outcome.edges_created,
            unresolved = outcome.references_unresolved,
            file_edges,
            "Committed index generation"
        );
        Ok(outcome)
    }
}

// The column list is the argument list; grouping it would only add a struct
// used in one place.
#[allow(clippy::too_many_arguments, clippy::cast_possible_wrap)]
fn upsert_file_row(
    tx: &Transaction<'_>,
    path: &std::path::Path,
    language: Language,
    line_count: u32,
    mtime_ns: i64,
    size_bytes: u64,
    content_hash: Option<u64>,
    needs_retry: bool,
    indexed_at: i64,
) -> rusqlite::Result<FileId> {
    let path_str = normalize_path(path);
    tx.execute(
        "INSERT INTO files (path, language, line_count, mtime_ns, size_bytes, content_hash, needs_retry, indexed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(path) DO UPDATE SET
             language = excluded.language,
             line_count = excluded.line_count,
             mtime_ns = excluded.mtime_ns,
             size_bytes = excluded.size_bytes,
             content_hash = excluded.content_hash,
             needs_retry = excluded.needs_retry,
             indexed_at = excluded.indexed_at",
        params![
            path_str,
            language.as_str(),
            line_count,
            mtime_ns,
            size_bytes as i64,
            content_hash.map(|h| h as i64),
            needs_retry,
            indexed_at
        ],
    )?;
    tx.query_row("SELECT id FROM files WHERE path = ?1", [&path_str], |row| {
        row.get::<_, i64>(0).map(FileId::from)
    })
}

fn clear_file_contents(tx: &Transaction<'_>, file_id: FileId) -> rusqlite::Result<()> {
    tx.execute("DELETE FROM symbols WHERE file_id = ?1", [file_id.as_i64()])?;
    tx.execute("DELETE FROM refs WHERE file_id = ?1", [file_id.as_i64()])?;
    Ok(())
}

/// Insert a file's symbols, then link parents by qualified name.
fn insert_symbols(tx: &Transaction<'_>, file_id: FileId, facts: &FileFacts) -> rusqlite::Result<usize> {
    let mut ids: HashMap<&str, i64> = HashMap::with_capacity(facts.symbols.len());
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO symbols (file_id, name, qualified_name, kind, line_start, line_end, signature, is_exported)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for sym in &facts.symbols {
            stmt.execute(params![
                file_id.as_i64(),
                sym.name,
                sym.qualified_name,
                sym.kind.as_str(),
                sym.line_start,
                sym.line_end,
                sym.signature,
                sym.is_exported
            ])?;
            ids.entry(sym.qualified_name.as_str())
                .or_insert_with(|| tx.last_insert_rowid());
        }
    }

    let mut link = tx.prepare_cached(
        "UPDATE symbols SET parent_id = ?2 WHERE file_id = ?3 AND qualified_name = ?1",
    )?;
    for sym in &facts.symbols {
        let Some(parent) = sym.parent_name.as_deref() else {
            continue;
        };
        match ids.get(parent) {
            Some(&parent_id) if sym.qualified_name != parent => {
                link.execute(params![sym.qualified_name, parent_id, file_id.as_i64()])?;
            }
            _ => tracing::trace!(
                symbol = %sym.qualified_name,
                parent,
                "Parent not declared in file, leaving unlinked"
            ),
        }
    }

    Ok(facts.symbols.len())
}

fn insert_references(tx: &Transaction<'_>, file_id: FileId, facts: &FileFacts) -> rusqlite::Result<usize> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO refs (file_id, source_name, line, target_name, target_simple, kind)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for r in &facts.references {
        stmt.execute(params![
            file_id.as_i64(),
            r.source_name,
            r.line,
            r.target_name,
            simple_name(&r.target_name),
            r.kind.as_str()
        ])?;
    }
    Ok(facts.references.len())
}

/// Re-run the resolver over every raw reference of the affected files.
fn resolve_affected(
    tx: &Transaction<'_>,
    affected: &BTreeSet<FileId>,
    outcome: &mut GenerationOutcome,
) -> rusqlite::Result<()> {
    let symbols = list_all_symbols_on(tx)?;
    let paths: HashMap<FileId, PathBuf> = {
        let mut stmt = tx.prepare("SELECT id, path FROM files")?;
        stmt.query_map([], |row| {
            Ok((
                FileId::from(row.get::<_, i64>(0)?),
                PathBuf::from(row.get::<_, String>(1)?),
            ))
        })?
        .collect::<rusqlite::Result<_>>()?
    };
    let table = SymbolTable::new(&symbols, &paths);

    let mut insert_edge = tx.prepare_cached(
        "INSERT OR IGNORE INTO edges (source_id, target_id, kind, line) VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut mark = tx.prepare_cached("UPDATE refs SET resolved = ?2 WHERE id = ?1")?;

    for &file_id in affected {
        for reference in list_references_on(tx, file_id)? {
            let resolution = table.resolve(&ReferenceInput {
                source_file: file_id,
                source_name: reference.source_name.as_deref(),
                line: reference.line,
                target_name: &reference.target_name,
                kind: reference.kind,
            });

            match resolution {
                Resolution::Edge(edge) => {
                    outcome.edges_created += insert_edge.execute(params![
                        edge.source_id.as_i64(),
                        edge.target_id.as_i64(),
                        edge.kind.as_str(),
                        edge.line
                    ])?;
                    outcome.references_resolved += 1;
                }
                Resolution::SelfReference => outcome.self_references += 1,
                Resolution::Unresolved => {
                    tracing::debug!(
                        file_id = file_id.as_i64(),
                        target = %reference.target_name,
                        line = reference.line,
                        "Unresolved reference"
                    );
                    outcome.references_unresolved += 1;
                }
            }
            let resolved = !matches!(resolution, Resolution::Unresolved);
            mark.execute(params![reference.id, resolved])?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EdgeKind, RawReference, RawSymbol, SymbolKind};

    fn sym(name: &str, line: u32) -> RawSymbol {
        RawSymbol {
            name: name.to_string(),
            qualified_name: name.to_string(),
            kind: SymbolKind::Function,
            line_start: line,
            line_end: line + 2,
            signature: None,
            is_exported: true,
            parent_name: None,
        }
    }

    fn call(from: &str, to: &str, line: u32) -> RawReference {
        RawReference {
            source_name: Some(from.to_string()),
            line,
            target_name: to.to_string(),
            kind: EdgeKind::Calls,
        }
    }

    fn parsed(path: &str, symbols: Vec<RawSymbol>, references: Vec<RawReference>) -> ParsedFile {
        ParsedFile {
            path: PathBuf::from(path),
            language: Language::Rust,
            mtime_ns: 1,
            size_bytes: 10,
            content_hash: 7,
            facts: FileFacts {
                symbols,
                references,
                line_count: 10,
            },
        }
    }

    #[test]
    fn commit_resolves_cross_file_edges_and_file_edges() {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let mut index = Index::open(&dir.path().join("test.db")).unwrap();

        let plan = GenerationPlan {
            parsed: vec![
                parsed("src/a.rs", vec![sym("a", 1)], vec![call("a", "b", 2), call("a", "missing", 2)]),
                parsed("src/b.rs", vec![sym("b", 1)], vec![]),
            ],
            ..GenerationPlan::default()
        };

        let outcome = index.commit_generation(&plan).unwrap();

        assert_eq!(outcome.symbols_written, 2);
        assert_eq!(outcome.edges_created, 1);
        assert_eq!(outcome.references_unresolved, 1);
        assert_eq!(index.list_all_edges().unwrap().len(), 1);
        assert_eq!(index.list_file_edges().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_references_collapse_to_one_edge() {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let mut index = Index::open(&dir.path().join("test.db")).unwrap();

        let plan = GenerationPlan {
            parsed: vec![parsed(
                "src/a.rs",
                vec![sym("a", 1), sym("b", 5)],
                vec![call("a", "b", 2), call("a", "b", 3)],
            )],
            ..GenerationPlan::default()
        };

        let outcome = index.commit_generation(&plan).unwrap();

        assert_eq!(outcome.references_resolved, 2);
        assert_eq!(outcome.edges_created, 1);
    }

    #[test]
    fn recursion_is_not_counted_as_unresolved() {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let mut index = Index::open(&dir.path().join("test.db")).unwrap();

        let plan = GenerationPlan {
            parsed: vec![parsed(
                "src/a.rs",
                vec![sym("walk", 1)],
                vec![call("walk", "walk", 2), call("walk", "missing", 3)],
            )],
            ..GenerationPlan::default()
        };

        let outcome = index.commit_generation(&plan).unwrap();

        assert_eq!(outcome.self_references, 1);
        assert_eq!(outcome.references_unresolved, 1);
        assert_eq!(outcome.edges_created, 0);
        assert_eq!(index.get_stats().unwrap().unresolved_count, 1);
    }

    #[test]
    fn failed_file_is_marked_for_retry_and_emptied() {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let mut index = Index::open(&dir.path().join("test.db")).unwrap();
        index
            .commit_generation(&GenerationPlan {
                parsed: vec![parsed("src/a.rs", vec![sym("a", 1)], vec![])],
                ..GenerationPlan::default()
            })
            .unwrap();

        index
            .commit_generation(&GenerationPlan {
                failed: vec![FailedFile {
                    path: PathBuf::from("src/a.rs"),
                    language: Language::Rust,
                    mtime_ns: 2,
                    size_bytes: 3,
                }],
                ..GenerationPlan::default()
            })
            .unwrap();

        let file = index.get_file(std::path::Path::new("src/a.rs")).unwrap().unwrap();
        assert!(file.needs_retry);
        assert!(file.content_hash.is_none());
        assert!(index.list_symbols_in_file(file.id).unwrap().is_empty());
    }

    #[test]
    fn nested_symbols_link_to_parent() {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let mut index = Index::open(&dir.path().join("test.db")).unwrap();
        let mut method = sym("area", 3);
        method.qualified_name = "Circle::area".to_string();
        method.parent_name = Some("Circle".to_string());

        index
            .commit_generation(&GenerationPlan {
                parsed: vec![parsed("src/a.rs", vec![sym("Circle", 1), method], vec![])],
                ..GenerationPlan::default()
            })
            .unwrap();

        let symbols = index.list_all_symbols().unwrap();
        let circle = symbols.iter().find(|s| s.name == "Circle").unwrap();
        let area = symbols.iter().find(|s| s.name == "area").unwrap();
        assert_eq!(area.parent_id, Some(circle.id));
    }
}

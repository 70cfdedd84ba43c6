//! `SQLite` storage layer for Callisto.
//!
//! `SQLite` is the source of truth for files, symbols, raw references, resolved
//! edges and everything derived from them. The in-memory graph (see `graph`)
//! is a disposable projection of this store.
//!
//! ## Module Structure
//!
//! - `schema` - Database schema (DDL)
//! - `helpers` - Row conversion and parsing utilities
//! - `files` - File lookups and fingerprint maintenance
//! - `symbols` - Symbol lookups
//! - `references` - Raw reference lookups
//! - `edges` - Resolved edge lookups
//! - `file_edges` - File-level edge derivation
//! - `generation` - The atomic write of one index generation
//! - `metrics` - Graph metrics, clusters and upstream signals
//! - `snapshots` - Append-only metric history
//!
//! ## Access discipline
//!
//! Reads take `&self`; anything that writes takes `&mut self`, so within a
//! process the borrow checker serializes writers. Across processes the
//! indexer additionally holds a [`crate::lock::WriterLock`]. WAL mode lets
//! readers keep seeing the last committed generation while a write is open.

mod edges;
mod file_edges;
mod files;
mod generation;
mod helpers;
mod metrics;
mod references;
mod schema;
mod snapshots;
mod symbols;

pub(crate) use generation::{FailedFile, GenerationOutcome, GenerationPlan, ParsedFile};
pub(crate) use helpers::{normalize_path, simple_name};
pub(crate) use schema::SCHEMA;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;

use crate::error::{Error, Result};
use helpers::{parse_language, parse_symbol_kind};

/// `SQLite` database wrapper for a Callisto index.
///
/// The connection is wrapped in a `Mutex` so read-only analysis can share one
/// `Index` across threads. The path is stored to support `reset()`.
pub struct Index {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl Index {
    /// Open or create the index database.
    ///
    /// Fails with [`Error::Integrity`] if an existing database does not pass
    /// `SQLite`'s integrity and foreign-key checks.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        conn.execute_batch(SCHEMA)?;
        Self::check_integrity(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// Refuse to run against a store with corrupt pages or dangling foreign keys.
    fn check_integrity(conn: &Connection) -> Result<()> {
        let verdict: String = conn.query_row("PRAGMA quick_check", [], |row| row.get(0))?;
        if verdict != "ok" {
            return Err(Error::Integrity(format!("quick_check reported: {verdict}")));
        }

        let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
        let violations: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, Option<i64>>(1)?.unwrap_or(0))))?
            .collect::<std::result::Result<_, _>>()?;
        if let Some((table, rowid)) = violations.first() {
            return Err(Error::Integrity(format!(
                "{} dangling foreign key(s), first in table '{table}' row {rowid}",
                violations.len()
            )));
        }

        Ok(())
    }

    /// Acquire the connection lock.
    pub(crate) fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            Error::Internal(format!(
                "database connection mutex poisoned (a thread panicked while holding the lock): {e}"
            ))
        })
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the current unix timestamp in nanoseconds.
    // u128 nanoseconds won't exceed i64::MAX until year 2262
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub(crate) fn now_ns() -> Result<i64> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .map_err(|e| {
                Error::Config(format!(
                    "System clock is before Unix epoch: {e}. Fix system time before indexing."
                ))
            })
    }

    /// Delete the database file and reopen with a fresh schema.
    ///
    /// The old connection is replaced with an in-memory placeholder before
    /// deletion to release `SQLite` file locks.
    pub fn reset(&mut self) -> Result<()> {
        tracing::info!(path = %self.path.display(), "Resetting database");

        // `&mut self` guarantees no other user of the connection between the
        // swap and the file deletion.
        let mut conn = self.connection()?;
        *conn = Connection::open_in_memory()
            .map_err(|e| Error::Internal(format!("failed to create temporary connection: {e}")))?;
        drop(conn);

        // SQLite names sidecars by appending to the full filename
        // (callisto.db-wal), so use OsString::push rather than with_extension.
        Self::remove_file_if_exists(&self.path)?;
        let mut wal_path = self.path.as_os_str().to_owned();
        wal_path.push("-wal");
        Self::remove_file_if_exists(Path::new(&wal_path))?;
        let mut shm_path = self.path.as_os_str().to_owned();
        shm_path.push("-shm");
        Self::remove_file_if_exists(Path::new(&shm_path))?;

        match Self::open(&self.path) {
            Ok(new) => {
                *self = new;
                tracing::debug!(path = %self.path.display(), "Database reset complete");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to reopen database after reset; \
                     index holds an in-memory placeholder until next successful reset"
                );
                Err(e)
            }
        }
    }

    /// Remove a file, ignoring `NotFound` errors.
    fn remove_file_if_exists(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to delete file during reset"
                );
                Err(Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to delete {}: {e}", path.display()),
                )))
            }
        }
    }

    /// Get statistics about the database contents.
    pub fn get_stats(&self) -> Result<crate::types::DatabaseStats> {
        use std::collections::HashMap;

        let conn = self.connection()?;
        let mut stats = crate::types::DatabaseStats::default();

        let mut stmt = conn.prepare("SELECT language, COUNT(*) FROM files GROUP BY language")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?))
        })?;
        let mut files_by_language = HashMap::new();
        for row in rows {
            let (lang_str, count) = row?;
            if let Ok(lang) = parse_language(&lang_str) {
                files_by_language.insert(lang, count);
                stats.file_count += count;
            } else {
                tracing::warn!(
                    language = %lang_str,
                    count = count,
                    "Unknown language in database, skipping from stats"
                );
                stats.skipped_unknown_languages += count;
            }
        }
        stats.files_by_language = files_by_language;

        let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM symbols GROUP BY kind")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, usize>(1)?))
        })?;
        let mut symbols_by_kind = HashMap::new();
        for row in rows {
            let (kind_str, count) = row?;
            if let Ok(kind) = parse_symbol_kind(&kind_str) {
                symbols_by_kind.insert(kind, count);
                stats.symbol_count += count;
            } else {
                tracing::warn!(
                    kind = %kind_str,
                    count = count,
                    "Unknown symbol kind in database, skipping from stats"
                );
                stats.skipped_unknown_kinds += count;
            }
        }
        stats.symbols_by_kind = symbols_by_kind;

        let count = |sql: &str| -> Result<usize> {
            Ok(conn.query_row(sql, [], |row| row.get::<_, usize>(0))?)
        };
        stats.reference_count = count("SELECT COUNT(*) FROM refs")?;
        stats.unresolved_count = count("SELECT COUNT(*) FROM refs WHERE resolved = 0")?;
        stats.edge_count = count("SELECT COUNT(*) FROM edges")?;
        stats.file_edge_count = count("SELECT COUNT(*) FROM file_edges")?;
        stats.retry_count = count("SELECT COUNT(*) FROM files WHERE needs_retry = 1")?;
        stats.snapshot_count = count("SELECT COUNT(*) FROM snapshots")?;

        Ok(stats)
    }

    /// Update `SQLite` query planner statistics.
    ///
    /// Worth calling after a full index; not needed after small updates.
    pub fn analyze(&self) -> Result<()> {
        let conn = self.connection()?;

        conn.execute_batch("ANALYZE")?;
        Ok(())
    }

    /// Vacuum the database.
    pub fn vacuum(&self) -> Result<()> {
        let conn = self.connection()?;

        conn.execute_batch("VACUUM")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_db() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let path = dir.path().join("test.db");
        (dir, path)
    }

    #[test]
    fn open_creates_database_and_schema() {
        let (_dir, path) = temp_db();

        let index = Index::open(&path).expect("failed to open database");
        let conn = index.connection().expect("should get connection");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "files",
            "symbols",
            "refs",
            "edges",
            "file_edges",
            "graph_metrics",
            "clusters",
            "snapshots",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn edges_reject_self_loops() {
        let (_dir, path) = temp_db();
        let index = Index::open(&path).unwrap();
        let conn = index.connection().unwrap();

        conn.execute(
            "INSERT INTO files (path, language, mtime_ns, size_bytes, indexed_at)
             VALUES ('a.rs', 'rust', 0, 0, 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO symbols (file_id, name, qualified_name, kind, line_start, line_end)
             VALUES (1, 'a', 'a', 'function', 1, 1)",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO edges (source_id, target_id, kind, line) VALUES (1, 1, 'calls', 1)",
            [],
        );

        assert!(result.is_err(), "self-edge should violate CHECK constraint");
    }

    #[test]
    fn open_rejects_dangling_foreign_keys() {
        let (_dir, path) = temp_db();
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(SCHEMA).unwrap();
            // foreign_keys is off on this raw connection, so the orphan sticks
            conn.execute(
                "INSERT INTO symbols (file_id, name, qualified_name, kind, line_start, line_end)
                 VALUES (99, 'ghost', 'ghost', 'function', 1, 1)",
                [],
            )
            .unwrap();
        }

        let result = Index::open(&path);

        assert!(matches!(result, Err(Error::Integrity(_))));
    }

    #[test]
    fn reset_removes_data() {
        let (_dir, path) = temp_db();
        let mut index = Index::open(&path).unwrap();
        index
            .connection()
            .unwrap()
            .execute(
                "INSERT INTO files (path, language, mtime_ns, size_bytes, indexed_at)
                 VALUES ('a.rs', 'rust', 0, 0, 0)",
                [],
            )
            .unwrap();

        index.reset().expect("reset should succeed");

        assert_eq!(index.get_stats().unwrap().file_count, 0);
    }

    #[test]
    fn stats_on_empty_database_are_zero() {
        let (_dir, path) = temp_db();
        let index = Index::open(&path).unwrap();

        let stats = index.get_stats().unwrap();

        assert_eq!(stats.file_count, 0);
        assert_eq!(stats.edge_count, 0);
        assert_eq!(stats.snapshot_count, 0);
    }
}

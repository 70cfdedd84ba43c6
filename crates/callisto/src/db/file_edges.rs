//! File-level edges, derived from symbol edges.
//!
//! The table is recomputed from scratch after every edge change rather than
//! patched, so it can never drift from the edge set.

use super::Index;
use super::helpers::parse_edge_kind;
use crate::error::Result;
use crate::types::{FileEdge, FileId};

/// Replace `file_edges` with the aggregation of cross-file symbol edges.
///
/// Returns the number of file edges written.
pub(super) fn rebuild_file_edges(conn: &rusqlite::Connection) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM file_edges", [])?;
    conn.execute(
        "INSERT INTO file_edges (source_file_id, target_file_id, kind, symbol_count)
         SELECT s.file_id, t.file_id, 'imports', COUNT(*)
         FROM edges e
         JOIN symbols s ON s.id = e.source_id
         JOIN symbols t ON t.id = e.target_id
         WHERE s.file_id != t.file_id
         GROUP BY s.file_id, t.file_id",
        [],
    )
}

impl Index {
    /// All file-level edges, ordered by source then target.
    pub fn list_file_edges(&self) -> Result<Vec<FileEdge>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT source_file_id, target_file_id, kind, symbol_count FROM file_edges
             ORDER BY source_file_id, target_file_id",
        )?;
        let edges = stmt
            .query_map([], |row| {
                Ok(FileEdge {
                    source_file_id: FileId::from(row.get::<_, i64>(0)?),
                    target_file_id: FileId::from(row.get::<_, i64>(1)?),
                    kind: parse_edge_kind(row.get::<_, String>(2)?.as_str())?,
                    symbol_count: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuild_aggregates_cross_file_edges_only() {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let index = Index::open(&dir.path().join("test.db")).unwrap();
        {
            let conn = index.connection().unwrap();
            conn.execute_batch(
                "INSERT INTO files (id, path, language, mtime_ns, size_bytes, indexed_at)
                     VALUES (1, 'a.rs', 'rust', 0, 0, 0), (2, 'b.rs', 'rust', 0, 0, 0);
                 INSERT INTO symbols (id, file_id, name, qualified_name, kind, line_start, line_end)
                     VALUES (1, 1, 'a', 'a', 'function', 1, 2),
                            (2, 1, 'a2', 'a2', 'function', 3, 4),
                            (3, 2, 'b', 'b', 'function', 1, 2),
                            (4, 2, 'b2', 'b2', 'function', 3, 4);
                 INSERT INTO edges (source_id, target_id, kind, line)
                     VALUES (1, 3, 'calls', 1), (2, 4, 'calls', 3), (1, 2, 'calls', 1);",
            )
            .unwrap();
            let written = rebuild_file_edges(&conn).unwrap();
            assert_eq!(written, 1);
        }

        let edges = index.list_file_edges().unwrap();

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source_file_id, FileId(1));
        assert_eq!(edges[0].target_file_id, FileId(2));
        assert_eq!(edges[0].symbol_count, 2);
    }
}

//! Resolved edge lookups.

use std::collections::HashSet;

use super::Index;
use super::helpers::parse_edge_kind;
use crate::error::Result;
use crate::types::{Edge, FileId, SymbolId};

fn row_to_edge(row: &rusqlite::Row) -> rusqlite::Result<Edge> {
    Ok(Edge {
        source_id: SymbolId::from(row.get::<_, i64>(0)?),
        target_id: SymbolId::from(row.get::<_, i64>(1)?),
        kind: parse_edge_kind(row.get::<_, String>(2)?.as_str())?,
        line: row.get(3)?,
    })
}

impl Index {
    /// Every edge in the current generation, in a stable order.
    pub fn list_all_edges(&self) -> Result<Vec<Edge>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT source_id, target_id, kind, line FROM edges ORDER BY source_id, target_id, kind",
        )?;
        let edges = stmt
            .query_map([], row_to_edge)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    /// Edges pointing at `target`.
    pub fn edges_into(&self, target: SymbolId) -> Result<Vec<Edge>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT source_id, target_id, kind, line FROM edges WHERE target_id = ?1 ORDER BY source_id",
        )?;
        let edges = stmt
            .query_map([target.as_i64()], row_to_edge)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    /// Files other than the targets themselves with an edge into any of `targets`.
    pub fn files_with_edges_into(&self, targets: &[FileId]) -> Result<HashSet<FileId>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT s.file_id FROM edges e
             JOIN symbols s ON s.id = e.source_id
             JOIN symbols t ON t.id = e.target_id
             WHERE t.file_id = ?1 AND s.file_id != ?1",
        )?;
        let mut files = HashSet::new();
        for target in targets {
            let rows = stmt.query_map([target.as_i64()], |row| row.get::<_, i64>(0))?;
            for id in rows {
                files.insert(FileId::from(id?));
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EdgeKind;

    #[test]
    fn files_with_edges_into_excludes_the_target_file() {
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
                            (3, 2, 'b', 'b', 'function', 1, 2);
                 INSERT INTO edges (source_id, target_id, kind, line)
                     VALUES (3, 1, 'calls', 1), (2, 1, 'calls', 3);",
            )
            .unwrap();
        }

        let files = index.files_with_edges_into(&[FileId(1)]).unwrap();

        assert_eq!(files, [FileId(2)].into_iter().collect());
        let into_a = index.edges_into(SymbolId(1)).unwrap();
        assert_eq!(into_a.len(), 2);
        assert!(into_a.iter().all(|e| e.kind == EdgeKind::Calls));
    }
}

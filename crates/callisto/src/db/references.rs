//! Raw reference lookups.

use std::collections::HashSet;

use super::Index;
use super::helpers::{REFS_COLUMNS, row_to_reference};
use crate::error::Result;
use crate::types::{FileId, StoredReference};

impl Index {
    /// Raw references recorded for one file, in source order.
    pub fn list_references_in_file(&self, file_id: FileId) -> Result<Vec<StoredReference>> {
        let conn = self.connection()?;
        list_references_on(&conn, file_id).map_err(Into::into)
    }

    /// References that did not resolve to any symbol.
    pub fn list_unresolved_references(&self) -> Result<Vec<StoredReference>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REFS_COLUMNS} FROM refs WHERE resolved = 0 ORDER BY file_id, line, id"
        ))?;
        let refs = stmt
            .query_map([], row_to_reference)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(refs)
    }

    /// Files holding at least one raw reference whose simple target name is in `names`.
    ///
    /// This is how the indexer finds unchanged files that may now resolve to
    /// a symbol that was just added, renamed or removed.
    pub fn files_referencing_names(&self, names: &HashSet<String>) -> Result<HashSet<FileId>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT DISTINCT file_id FROM refs WHERE target_simple = ?1")?;
        let mut files = HashSet::new();
        for name in names {
            let rows = stmt.query_map([name], |row| row.get::<_, i64>(0))?;
            for id in rows {
                files.insert(FileId::from(id?));
            }
        }
        Ok(files)
    }
}

pub(super) fn list_references_on(
    conn: &rusqlite::Connection,
    file_id: FileId,
) -> rusqlite::Result<Vec<StoredReference>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {REFS_COLUMNS} FROM refs WHERE file_id = ?1 ORDER BY line, id"
    ))?;
    stmt.query_map([file_id.as_i64()], row_to_reference)?
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_referencing_names_matches_simple_target() {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let index = Index::open(&dir.path().join("test.db")).unwrap();
        {
            let conn = index.connection().unwrap();
            conn.execute_batch(
                "INSERT INTO files (id, path, language, mtime_ns, size_bytes, indexed_at)
                     VALUES (1, 'a.rs', 'rust', 0, 0, 0), (2, 'b.rs', 'rust', 0, 0, 0);
                 INSERT INTO refs (file_id, source_name, line, target_name, target_simple, kind)
                     VALUES (1, 'main', 3, 'db::open', 'open', 'calls'),
                            (2, NULL, 1, 'close', 'close', 'calls');",
            )
            .unwrap();
        }

        let names: HashSet<String> = ["open".to_string()].into_iter().collect();
        let files = index.files_referencing_names(&names).unwrap();

        assert_eq!(files, [FileId(1)].into_iter().collect());
        let unresolved = index.list_unresolved_references().unwrap();
        assert_eq!(unresolved.len(), 2);
        assert_eq!(unresolved[0].target_name, "db::open");
    }
}

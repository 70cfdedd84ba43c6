//! Symbol lookups.

use std::collections::HashSet;

use rusqlite::OptionalExtension;

use super::Index;
use super::helpers::{SYMBOLS_COLUMNS, row_to_symbol};
use crate::error::Result;
use crate::types::{FileId, Symbol, SymbolId};

impl Index {
    /// Get a symbol by its database ID.
    pub fn get_symbol_by_id(&self, id: SymbolId) -> Result<Option<Symbol>> {
        let conn = self.connection()?;

        conn.query_row(
            &format!("SELECT {SYMBOLS_COLUMNS} FROM symbols WHERE id = ?1"),
            [id.as_i64()],
            row_to_symbol,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Every symbol in the current generation, ordered by id.
    pub fn list_all_symbols(&self) -> Result<Vec<Symbol>> {
        let conn = self.connection()?;
        list_all_symbols_on(&conn).map_err(Into::into)
    }

    /// Symbols declared in one file, in source order.
    pub fn list_symbols_in_file(&self, file_id: FileId) -> Result<Vec<Symbol>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SYMBOLS_COLUMNS} FROM symbols WHERE file_id = ?1 ORDER BY line_start, id"
        ))?;
        let symbols = stmt
            .query_map([file_id.as_i64()], row_to_symbol)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(symbols)
    }

    /// Symbols whose simple or qualified name equals `name`, ordered by id.
    pub fn find_symbols_by_name(&self, name: &str) -> Result<Vec<Symbol>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SYMBOLS_COLUMNS} FROM symbols
             WHERE qualified_name = ?1 OR name = ?1
             ORDER BY (qualified_name = ?1) DESC, id"
        ))?;
        let symbols = stmt
            .query_map([name], row_to_symbol)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(symbols)
    }

    /// Distinct simple names declared in the given files.
    pub fn symbol_names_in_files(&self, file_ids: &[FileId]) -> Result<HashSet<String>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT DISTINCT name FROM symbols WHERE file_id = ?1")?;
        let mut names = HashSet::new();
        for id in file_ids {
            let rows = stmt.query_map([id.as_i64()], |row| row.get::<_, String>(0))?;
            for name in rows {
                names.insert(name?);
            }
        }
        Ok(names)
    }
}

pub(super) fn list_all_symbols_on(conn: &rusqlite::Connection) -> rusqlite::Result<Vec<Symbol>> {
    let mut stmt = conn.prepare(&format!("SELECT {SYMBOLS_COLUMNS} FROM symbols ORDER BY id"))?;
    stmt.query_map([], row_to_symbol)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_index() -> (tempfile::TempDir, Index) {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let index = Index::open(&dir.path().join("test.db")).expect("should open index");
        {
            let conn = index.connection().unwrap();
            conn.execute_batch(
                "INSERT INTO files (id, path, language, mtime_ns, size_bytes, indexed_at)
                     VALUES (1, 'src/a.rs', 'rust', 0, 0, 0), (2, 'src/b.rs', 'rust', 0, 0, 0);
                 INSERT INTO symbols (id, file_id, name, qualified_name, kind, line_start, line_end, is_exported)
                     VALUES (1, 1, 'open', 'Index::open', 'method', 10, 20, 1),
                            (2, 1, 'helper', 'helper', 'function', 1, 5, 0),
                            (3, 2, 'open', 'open', 'function', 1, 3, 1);",
            )
            .unwrap();
        }
        (dir, index)
    }

    #[test]
    fn find_by_name_prefers_exact_qualified_match() {
        let (_dir, index) = seeded_index();

        let found = index.find_symbols_by_name("open").unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, SymbolId(3), "qualified 'open' sorts first");
    }

    #[test]
    fn list_symbols_in_file_is_source_ordered() {
        let (_dir, index) = seeded_index();

        let symbols = index.list_symbols_in_file(FileId(1)).unwrap();

        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["helper", "open"]);
    }

    #[test]
    fn symbol_names_in_files_collects_simple_names() {
        let (_dir, index) = seeded_index();

        let names = index.symbol_names_in_files(&[FileId(1)]).unwrap();

        assert!(names.contains("open"));
        assert!(names.contains("helper"));
        assert_eq!(names.len(), 2);
    }
}

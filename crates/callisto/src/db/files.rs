//! File lookups and fingerprint maintenance.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::OptionalExtension;

use super::Index;
use super::helpers::{FILES_COLUMNS, normalize_path, row_to_indexed_file};
use crate::error::Result;
use crate::types::{FileId, IndexedFile};

impl Index {
    /// Get a file by path.
    pub fn get_file(&self, path: &Path) -> Result<Option<IndexedFile>> {
        let path_str = normalize_path(path);
        let conn = self.connection()?;

        conn.query_row(
            &format!("SELECT {FILES_COLUMNS} FROM files WHERE path = ?1"),
            [&path_str],
            row_to_indexed_file,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Get file ID by path.
    pub fn get_file_id(&self, path: &Path) -> Result<Option<FileId>> {
        let path_str = normalize_path(path);
        let conn = self.connection()?;

        conn.query_row("SELECT id FROM files WHERE path = ?1", [&path_str], |row| {
            row.get::<_, i64>(0).map(FileId::from)
        })
        .optional()
        .map_err(Into::into)
    }

    /// Get a file by its database ID.
    pub fn get_file_by_id(&self, id: FileId) -> Result<Option<IndexedFile>> {
        let conn = self.connection()?;

        conn.query_row(
            &format!("SELECT {FILES_COLUMNS} FROM files WHERE id = ?1"),
            [id.as_i64()],
            row_to_indexed_file,
        )
        .optional()
        .map_err(Into::into)
    }

    /// List all indexed files, ordered by path.
    pub fn list_all_files(&self) -> Result<Vec<IndexedFile>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!("SELECT {FILES_COLUMNS} FROM files ORDER BY path"))?;
        let files = stmt
            .query_map([], row_to_indexed_file)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    /// Map of file id to stored path.
    pub fn file_paths(&self) -> Result<HashMap<FileId, PathBuf>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT id, path FROM files")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                FileId::from(row.get::<_, i64>(0)?),
                PathBuf::from(row.get::<_, String>(1)?),
            ))
        })?;
        Ok(rows.collect::<std::result::Result<HashMap<_, _>, _>>()?)
    }

    /// Record a new mtime for a file whose content hash did not change.
    ///
    /// Keeps the next staleness check on the cheap mtime-only path.
    pub fn touch_file_mtime(&mut self, id: FileId, mtime_ns: i64) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            "UPDATE files SET mtime_ns = ?2 WHERE id = ?1",
            rusqlite::params![id.as_i64(), mtime_ns],
        )?;
        Ok(())
    }
}

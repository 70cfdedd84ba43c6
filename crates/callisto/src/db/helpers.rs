//! Helper functions for database row conversion and parsing.
//!
//! These utilities convert between database representations and domain types.
//! Also provides SQL column list constants to reduce duplication across query modules.

use std::path::{Path, PathBuf};

use crate::types::{
    EdgeKind, FileId, IndexedFile, Language, Snapshot, StoredReference, Symbol, SymbolId,
    SymbolKind,
};

/// SQL column list for files table.
///
/// Use with `row_to_indexed_file` for consistent column ordering.
pub(crate) const FILES_COLUMNS: &str =
    "id, path, language, line_count, mtime_ns, size_bytes, content_hash, needs_retry, indexed_at";

/// SQL column list for symbols table.
///
/// Use with `row_to_symbol` for consistent column ordering.
pub(crate) const SYMBOLS_COLUMNS: &str = "id, file_id, name, qualified_name, kind, line_start, \
     line_end, signature, is_exported, parent_id";

/// SQL column list for refs table.
///
/// Use with `row_to_reference` for consistent column ordering.
pub(crate) const REFS_COLUMNS: &str =
    "id, file_id, source_name, line, target_name, kind, resolved";

/// SQL column list for snapshots table.
///
/// Use with `row_to_snapshot` for consistent column ordering.
pub(crate) const SNAPSHOTS_COLUMNS: &str = "id, timestamp, tag, source, git_branch, git_commit, \
     files, symbols, edges, cycles, god_components, bottlenecks, dead_exports, \
     layer_violations, health_score, tangle_ratio, avg_complexity, brain_methods";

/// Normalize a file path to use forward slashes for consistent DB storage.
///
/// On Windows, `Path::to_string_lossy()` preserves backslashes from OS APIs,
/// but tests and cross-platform code use forward slashes.
pub(crate) fn normalize_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    if cfg!(windows) {
        s.replace('\\', "/")
    } else {
        s.into_owned()
    }
}

/// Last segment of a possibly-qualified name (`a::b::c` and `a.b.c` give `c`).
pub(crate) fn simple_name(name: &str) -> &str {
    let after_colons = name.rsplit("::").next().unwrap_or(name);
    after_colons.rsplit('.').next().unwrap_or(after_colons)
}

fn corrupt(what: &str, unknown: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        format!(
            "Unknown {what} '{unknown}' in database. Database may be corrupted or from a newer version."
        )
        .into(),
    )
}

/// Parse a language string from the database.
///
/// Returns an error for unrecognized values, indicating possible database corruption.
pub(crate) fn parse_language(s: &str) -> rusqlite::Result<Language> {
    match s {
        "rust" => Ok(Language::Rust),
        "python" => Ok(Language::Python),
        "typescript" => Ok(Language::TypeScript),
        "javascript" => Ok(Language::JavaScript),
        "go" => Ok(Language::Go),
        "java" => Ok(Language::Java),
        "csharp" => Ok(Language::CSharp),
        unknown => Err(corrupt("language", unknown)),
    }
}

/// Parse a symbol kind string from the database.
pub(crate) fn parse_symbol_kind(s: &str) -> rusqlite::Result<SymbolKind> {
    match s {
        "function" => Ok(SymbolKind::Function),
        "method" => Ok(SymbolKind::Method),
        "class" => Ok(SymbolKind::Class),
        "struct" => Ok(SymbolKind::Struct),
        "enum" => Ok(SymbolKind::Enum),
        "trait" => Ok(SymbolKind::Trait),
        "interface" => Ok(SymbolKind::Interface),
        "const" => Ok(SymbolKind::Const),
        "static" => Ok(SymbolKind::Static),
        "module" => Ok(SymbolKind::Module),
        "type_alias" => Ok(SymbolKind::TypeAlias),
        "macro" => Ok(SymbolKind::Macro),
        "variable" => Ok(SymbolKind::Variable),
        unknown => Err(corrupt("symbol kind", unknown)),
    }
}

/// Parse an edge kind string from the database.
pub(crate) fn parse_edge_kind(s: &str) -> rusqlite::Result<EdgeKind> {
    match s {
        "calls" => Ok(EdgeKind::Calls),
        "imports" => Ok(EdgeKind::Imports),
        "inherits" => Ok(EdgeKind::Inherits),
        "implements" => Ok(EdgeKind::Implements),
        unknown => Err(corrupt("edge kind", unknown)),
    }
}

/// Convert a database row to an [`IndexedFile`].
///
/// Expected columns: see [`FILES_COLUMNS`].
// Sizes and hashes round-trip through i64 storage bit-for-bit.
#[allow(clippy::cast_sign_loss)]
pub(crate) fn row_to_indexed_file(row: &rusqlite::Row) -> rusqlite::Result<IndexedFile> {
    Ok(IndexedFile {
        id: FileId::from(row.get::<_, i64>(0)?),
        path: PathBuf::from(row.get::<_, String>(1)?),
        language: parse_language(row.get::<_, String>(2)?.as_str())?,
        line_count: row.get(3)?,
        mtime_ns: row.get(4)?,
        size_bytes: row.get::<_, i64>(5)? as u64,
        content_hash: row.get::<_, Option<i64>>(6)?.map(|h| h as u64),
        needs_retry: row.get(7)?,
        indexed_at: row.get(8)?,
    })
}

/// Convert a database row to a [`Symbol`].
pub(crate) fn row_to_symbol(row: &rusqlite::Row) -> rusqlite::Result<Symbol> {
    Ok(Symbol {
        id: SymbolId::from(row.get::<_, i64>(0)?),
        file_id: FileId::from(row.get::<_, i64>(1)?),
        name: row.get(2)?,
        qualified_name: row.get(3)?,
        kind: parse_symbol_kind(row.get::<_, String>(4)?.as_str())?,
        line_start: row.get(5)?,
        line_end: row.get(6)?,
        signature: row.get(7)?,
        is_exported: row.get(8)?,
        parent_id: row.get::<_, Option<i64>>(9)?.map(SymbolId::from),
    })
}

/// Convert a database row to a [`StoredReference`].
pub(crate) fn row_to_reference(row: &rusqlite::Row) -> rusqlite::Result<StoredReference> {
    Ok(StoredReference {
        id: row.get(0)?,
        file_id: FileId::from(row.get::<_, i64>(1)?),
        source_name: row.get(2)?,
        line: row.get(3)?,
        target_name: row.get(4)?,
        kind: parse_edge_kind(row.get::<_, String>(5)?.as_str())?,
        resolved: row.get(6)?,
    })
}

/// Convert a database row to a [`Snapshot`].
pub(crate) fn row_to_snapshot(row: &rusqlite::Row) -> rusqlite::Result<Snapshot> {
    Ok(Snapshot {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        tag: row.get(2)?,
        source: row.get(3)?,
        git_branch: row.get(4)?,
        git_commit: row.get(5)?,
        files: row.get(6)?,
        symbols: row.get(7)?,
        edges: row.get(8)?,
        cycles: row.get(9)?,
        god_components: row.get(10)?,
        bottlenecks: row.get(11)?,
        dead_exports: row.get(12)?,
        layer_violations: row.get(13)?,
        health_score: row.get(14)?,
        tangle_ratio: row.get(15)?,
        avg_complexity: row.get(16)?,
        brain_methods: row.get(17)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("helper", "helper")]
    #[case("db::open", "open")]
    #[case("crate::db::Index::open", "open")]
    #[case("self.save", "save")]
    #[case("pkg.mod.Class", "Class")]
    fn simple_name_takes_last_segment(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(simple_name(input), expected);
    }

    #[test]
    fn parse_symbol_kind_round_trips_every_kind() {
        for kind in [
            SymbolKind::Function,
            SymbolKind::Method,
            SymbolKind::Class,
            SymbolKind::Struct,
            SymbolKind::Enum,
            SymbolKind::Trait,
            SymbolKind::Interface,
            SymbolKind::Const,
            SymbolKind::Static,
            SymbolKind::Module,
            SymbolKind::TypeAlias,
            SymbolKind::Macro,
            SymbolKind::Variable,
        ] {
            assert_eq!(parse_symbol_kind(kind.as_str()).expect("known kind"), kind);
        }
    }

    #[test]
    fn parse_edge_kind_rejects_unknown() {
        let err = parse_edge_kind("teleports").expect_err("unknown kind should fail");
        assert!(err.to_string().contains("teleports"));
    }
}

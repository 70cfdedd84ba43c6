//! Domain types for Callisto.
//!
//! These types represent the core domain model:
//! - **Adapter output**: `RawSymbol`, `RawReference`, `FileFacts` (per-file parse result)
//! - **Entities**: `IndexedFile`, `Symbol`, `Edge`, `FileEdge`, `StoredReference`
//! - **Derived**: `SymbolMetrics`, `ClusterAssignment`, `Snapshot`
//! - **Results**: `IndexStats`, `StalenessReport`, `DatabaseStats`
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | Symbol ids | Per-generation | Re-indexing a file reissues its ids |
//! | Reference kind | Same enum as edge kind | A resolved reference becomes exactly one edge |
//! | Parent link | Name from adapter, id in store | Adapters know names, only the store knows ids |

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::IndexError;

// ============================================================================
// Strongly-typed ID wrappers
// ============================================================================

/// A strongly-typed symbol ID to prevent mixing with file IDs.
///
/// Valid only within one index generation: re-indexing the owning file
/// discards the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub i64);

impl SymbolId {
    /// Extract the raw i64 value.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for SymbolId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SymbolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A strongly-typed file ID to prevent mixing with symbol IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub i64);

impl FileId {
    /// Extract the raw i64 value.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for FileId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Source languages Callisto knows how to label.
///
/// Only languages with a registered [`crate::ParserAdapter`] are actually
/// indexed; the rest are recognized so external adapters can claim them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Rust source files (`.rs`)
    Rust,
    /// Python source files (`.py`)
    Python,
    /// TypeScript source files (`.ts`, `.tsx`)
    TypeScript,
    /// JavaScript source files (`.js`, `.jsx`, `.mjs`)
    JavaScript,
    /// Go source files (`.go`)
    Go,
    /// Java source files (`.java`)
    Java,
    /// C# source files (`.cs`)
    CSharp,
}

impl Language {
    /// Detect language from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "rs" => Some(Self::Rust),
            "py" => Some(Self::Python),
            "ts" | "tsx" => Some(Self::TypeScript),
            "js" | "jsx" | "mjs" => Some(Self::JavaScript),
            "go" => Some(Self::Go),
            "java" => Some(Self::Java),
            "cs" => Some(Self::CSharp),
            _ => None,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Go => "go",
            Self::Java => "java",
            Self::CSharp => "csharp",
        }
    }
}

/// Symbol kinds, normalized across languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Free function
    Function,
    /// Function associated with a type
    Method,
    /// Class
    Class,
    /// Struct
    Struct,
    /// Enum type
    Enum,
    /// Trait
    Trait,
    /// Interface
    Interface,
    /// Constant
    Const,
    /// Static or global variable
    Static,
    /// Module or namespace
    Module,
    /// Type alias
    TypeAlias,
    /// Macro definition
    Macro,
    /// Module-level variable
    Variable,
}

impl SymbolKind {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Trait => "trait",
            Self::Interface => "interface",
            Self::Const => "const",
            Self::Static => "static",
            Self::Module => "module",
            Self::TypeAlias => "type_alias",
            Self::Macro => "macro",
            Self::Variable => "variable",
        }
    }

    /// Kinds a capitalized call name is likely constructing.
    ///
    /// Rust has no classes; a `Foo { .. }` literal or `Foo(..)` tuple-struct
    /// call plays the same role, so structs count too.
    #[must_use]
    pub fn is_class_like(&self) -> bool {
        matches!(self, Self::Class | Self::Struct)
    }

    /// Kinds that make a good human-readable name for a cluster.
    #[must_use]
    pub fn is_anchor(&self) -> bool {
        matches!(
            self,
            Self::Class | Self::Struct | Self::Interface | Self::Enum | Self::Trait | Self::Module
        )
    }
}

/// The kind of relationship an edge (or the reference it came from) expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Function or method call, including constructor calls
    Calls,
    /// Import or `use` of another module's symbol
    Imports,
    /// Class inheritance
    Inherits,
    /// Interface or trait implementation
    Implements,
}

impl EdgeKind {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calls => "calls",
            Self::Imports => "imports",
            Self::Inherits => "inherits",
            Self::Implements => "implements",
        }
    }
}

// ============================================================================
// Adapter output
// ============================================================================

/// A symbol declaration as reported by a parser adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSymbol {
    /// Simple name (`new`)
    pub name: String,
    /// Name including enclosing scopes (`Index::new`)
    pub qualified_name: String,
    /// Normalized kind
    pub kind: SymbolKind,
    /// 1-indexed first line
    pub line_start: u32,
    /// 1-indexed last line
    pub line_end: u32,
    /// Declaration text without body, if the adapter provides one
    pub signature: Option<String>,
    /// Visible outside its module (`pub`, `export`, public)
    pub is_exported: bool,
    /// Qualified name of the enclosing symbol, if nested
    pub parent_name: Option<String>,
}

/// An unresolved textual reference as reported by a parser adapter.
///
/// The source file is implied by the [`FileFacts`] it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReference {
    /// Qualified name of the enclosing symbol, or `None` for top-level code
    pub source_name: Option<String>,
    /// 1-indexed line of the reference
    pub line: u32,
    /// Name as written at the use site (`helper`, `db::open`, `Index`)
    pub target_name: String,
    /// What kind of edge this reference would become
    pub kind: EdgeKind,
}

/// Everything an adapter extracted from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFacts {
    /// Declarations in source order
    pub symbols: Vec<RawSymbol>,
    /// References in source order
    pub references: Vec<RawReference>,
    /// Total lines in the file
    pub line_count: u32,
}

// ============================================================================
// Stored entities
// ============================================================================

/// An indexed source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedFile {
    /// Database ID
    pub id: FileId,
    /// Path relative to the workspace root, `/`-separated
    pub path: PathBuf,
    /// Detected language
    pub language: Language,
    /// Number of lines at last index
    pub line_count: u32,
    /// Modification time in nanoseconds since the Unix epoch
    pub mtime_ns: i64,
    /// File size at last index
    pub size_bytes: u64,
    /// xxh3 hash of the content at last index
    pub content_hash: Option<u64>,
    /// Last parse failed; re-parse on next index regardless of fingerprint
    pub needs_retry: bool,
    /// When the file was indexed (ns since epoch)
    pub indexed_at: i64,
}

/// A declared program entity in the current generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    /// Database ID (generation-scoped)
    pub id: SymbolId,
    /// Owning file
    pub file_id: FileId,
    /// Simple name
    pub name: String,
    /// Fully qualified name
    pub qualified_name: String,
    /// Normalized kind
    pub kind: SymbolKind,
    /// 1-indexed first line
    pub line_start: u32,
    /// 1-indexed last line
    pub line_end: u32,
    /// Declaration text
    pub signature: Option<String>,
    /// Exported from its module
    pub is_exported: bool,
    /// Enclosing symbol
    pub parent_id: Option<SymbolId>,
}

/// A resolved relationship between two symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    /// Referring symbol
    pub source_id: SymbolId,
    /// Referenced symbol
    pub target_id: SymbolId,
    /// Relationship kind
    pub kind: EdgeKind,
    /// Line of the reference in the source file
    pub line: u32,
}

/// Aggregated dependency between two files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEdge {
    /// Depending file
    pub source_file_id: FileId,
    /// Depended-upon file
    pub target_file_id: FileId,
    /// Always `Imports` for the aggregated view
    pub kind: EdgeKind,
    /// Number of distinct symbol edges behind this file edge
    pub symbol_count: u32,
}

/// A raw reference as kept in the store, so it can be re-resolved
/// without re-parsing its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredReference {
    /// Database ID
    pub id: i64,
    /// File the reference occurs in
    pub file_id: FileId,
    /// Qualified name of the enclosing symbol, if any
    pub source_name: Option<String>,
    /// 1-indexed line
    pub line: u32,
    /// Name as written
    pub target_name: String,
    /// Reference kind
    pub kind: EdgeKind,
    /// Whether the last resolution produced an edge
    pub resolved: bool,
}

/// Per-symbol output of the batch graph-metric pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SymbolMetrics {
    /// Symbol the metrics belong to
    pub symbol_id: SymbolId,
    /// PageRank score
    pub pagerank: f64,
    /// Distinct callers/importers
    pub in_degree: u32,
    /// Distinct callees/imports
    pub out_degree: u32,
    /// Normalized betweenness (exact or sampled)
    pub betweenness: f64,
}

/// A symbol's community assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterAssignment {
    /// Member symbol
    pub symbol_id: SymbolId,
    /// Dense community id
    pub cluster_id: u32,
    /// Human-readable label shared by all members
    pub label: String,
}

/// Churn and co-change numbers for one file, supplied by history mining.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStats {
    /// Commits touching the file
    pub commit_count: u32,
    /// Lines added plus removed across those commits
    pub total_churn: u32,
    /// Shannon entropy of the file's co-change partners
    pub cochange_entropy: f64,
    /// Per-file health on a 0..=10 scale, if computed
    pub health_score: Option<f64>,
}

/// Complexity numbers for one symbol, supplied by an upstream analyzer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolComplexity {
    /// Cognitive complexity
    pub cognitive_complexity: f64,
    /// Lines spanned by the symbol body
    pub line_count: u32,
}

/// Point-in-time aggregate metrics.
///
/// Snapshots are append-only; nothing in normal operation mutates or deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Database ID
    pub id: i64,
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    /// Optional user label (`v1.2`, `before-refactor`)
    pub tag: Option<String>,
    /// What produced the snapshot (`index`, `snapshot`, `import`)
    pub source: String,
    /// Branch at capture time
    pub git_branch: Option<String>,
    /// Commit at capture time
    pub git_commit: Option<String>,
    /// Indexed files
    pub files: u32,
    /// Symbols
    pub symbols: u32,
    /// Edges
    pub edges: u32,
    /// Non-trivial SCCs
    pub cycles: u32,
    /// Degree outliers
    pub god_components: u32,
    /// Betweenness outliers
    pub bottlenecks: u32,
    /// Exported symbols nothing outside their file uses
    pub dead_exports: u32,
    /// Layer violations
    pub layer_violations: u32,
    /// Canonical health score (0..=100)
    pub health_score: u32,
    /// Fraction of symbols inside non-trivial SCCs
    pub tangle_ratio: f64,
    /// Mean cognitive complexity of measured symbols
    pub avg_complexity: f64,
    /// Symbols that are both very complex and very long
    pub brain_methods: u32,
}

// ============================================================================
// Results
// ============================================================================

/// Statistics from an indexing run.
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    /// Files parsed and written in this run
    pub files_indexed: usize,
    /// Files whose fingerprint matched and were skipped
    pub files_unchanged: usize,
    /// Files dropped because they disappeared from the tree
    pub files_removed: usize,
    /// Files that failed to parse (marked for retry)
    pub files_failed: usize,
    /// Symbols written for re-indexed files
    pub symbols_found: usize,
    /// References written for re-indexed files
    pub references_found: usize,
    /// References re-resolved this run whose target could not be found
    pub references_unresolved: usize,
    /// References re-resolved this run that point back at their own caller
    pub self_references: usize,
    /// Edges inserted this run
    pub edges_created: usize,
    /// Files whose references were re-resolved (changed plus dependents)
    pub affected_files: usize,
    /// Wall-clock duration
    pub duration: Duration,
    /// Per-file problems
    pub errors: Vec<IndexError>,
}

impl IndexStats {
    /// Per-file problems the user can fix in the source tree.
    #[must_use]
    pub fn input_error_count(&self) -> usize {
        self.errors.iter().filter(|e| e.kind.is_input_error()).count()
    }

    /// Per-file problems caused by the environment or by Callisto itself.
    #[must_use]
    pub fn internal_error_count(&self) -> usize {
        self.errors.iter().filter(|e| e.kind.is_internal_error()).count()
    }
}

/// Files whose on-disk state differs from the index.
///
/// Staleness is a status, not an error: callers decide whether to update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StalenessReport {
    /// Indexed files whose content changed
    pub modified: Vec<PathBuf>,
    /// Files on disk that are not indexed yet
    pub added: Vec<PathBuf>,
    /// Indexed files no longer on disk
    pub deleted: Vec<PathBuf>,
    /// Files whose last parse failed
    pub retry: Vec<PathBuf>,
}

impl StalenessReport {
    /// Whether any file needs re-indexing.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        !(self.modified.is_empty()
            && self.added.is_empty()
            && self.deleted.is_empty()
            && self.retry.is_empty())
    }
}

/// Counts describing the store contents.
#[derive(Debug, Clone, Default)]
pub struct DatabaseStats {
    /// Indexed files
    pub file_count: usize,
    /// Files by language
    pub files_by_language: std::collections::HashMap<Language, usize>,
    /// Symbols
    pub symbol_count: usize,
    /// Symbols by kind
    pub symbols_by_kind: std::collections::HashMap<SymbolKind, usize>,
    /// Stored raw references
    pub reference_count: usize,
    /// Raw references with no edge
    pub unresolved_count: usize,
    /// Symbol edges
    pub edge_count: usize,
    /// File edges
    pub file_edge_count: usize,
    /// Files awaiting a retry
    pub retry_count: usize,
    /// Snapshots recorded
    pub snapshot_count: usize,
    /// Rows with an unrecognized language (possible version mismatch)
    pub skipped_unknown_languages: usize,
    /// Rows with an unrecognized symbol kind
    pub skipped_unknown_kinds: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_from_extension_is_case_insensitive() {
        assert_eq!(Language::from_extension("RS"), Some(Language::Rust));
        assert_eq!(Language::from_extension("tsx"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("zig"), None);
    }

    #[test]
    fn structs_count_as_class_like_for_constructor_calls() {
        assert!(SymbolKind::Class.is_class_like());
        assert!(SymbolKind::Struct.is_class_like());
        assert!(!SymbolKind::Function.is_class_like());
    }

    #[test]
    fn staleness_report_empty_is_fresh() {
        let report = StalenessReport::default();
        assert!(!report.is_stale());

        let report = StalenessReport {
            retry: vec![PathBuf::from("src/bad.rs")],
            ..StalenessReport::default()
        };
        assert!(report.is_stale());
    }

    #[test]
    fn edge_kind_serializes_snake_case() {
        let json = serde_json::to_string(&EdgeKind::Implements).expect("serialize");
        assert_eq!(json, "\"implements\"");
    }

    #[test]
    fn index_stats_split_errors_by_class() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let stats = IndexStats {
            errors: vec![
                IndexError::parse_failed(PathBuf::from("a.rs"), "bad"),
                IndexError::encoding_error(PathBuf::from("b.rs")),
                IndexError::io_error(PathBuf::from("c.rs"), &io),
            ],
            ..IndexStats::default()
        };

        assert_eq!(stats.input_error_count(), 2);
        assert_eq!(stats.internal_error_count(), 1);
    }
}

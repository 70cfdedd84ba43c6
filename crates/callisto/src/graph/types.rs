//! Node payloads carried by the in-memory graph.

use std::path::PathBuf;

use serde::Serialize;

use crate::types::{SymbolId, SymbolKind};

/// A symbol as a graph node.
///
/// `file_path` is the only attribute the simulation engine rewrites.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeData {
    /// Symbol id in the store generation this graph was built from
    pub id: SymbolId,
    /// Simple name
    pub name: String,
    /// Qualified name
    pub qualified_name: String,
    /// Symbol kind
    pub kind: SymbolKind,
    /// Workspace-relative path of the owning file
    pub file_path: PathBuf,
    /// Whether the symbol is visible outside its file
    pub is_exported: bool,
    /// First line of the declaration
    pub line_start: u32,
}

impl NodeData {
    /// Parent directory of the owning file, `"."` at the workspace root.
    #[must_use]
    pub fn directory(&self) -> String {
        match self.file_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_string_lossy().replace('\\', "/"),
            _ => ".".to_string(),
        }
    }
}

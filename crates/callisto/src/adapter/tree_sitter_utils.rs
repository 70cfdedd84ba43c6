//! Shared tree-sitter helpers for adapters.

// Tree-sitter returns usize for positions, but we store u32 for compactness.
// No practical source file has 4 billion lines.
#![allow(clippy::cast_possible_truncation)]

/// Get text content of a tree-sitter node.
///
/// Returns `None` if the node's byte range contains invalid UTF-8.
pub(super) fn node_text(node: &tree_sitter::Node, content: &[u8]) -> Option<String> {
    match std::str::from_utf8(&content[node.byte_range()]) {
        Ok(s) => Some(s.to_string()),
        Err(e) => {
            tracing::trace!(
                byte_range = ?node.byte_range(),
                error = %e,
                node_kind = %node.kind(),
                "Failed to decode node text as UTF-8"
            );
            None
        }
    }
}

/// 1-indexed first line of a node.
pub(super) fn start_line(node: &tree_sitter::Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// 1-indexed last line of a node.
pub(super) fn end_line(node: &tree_sitter::Node) -> u32 {
    node.end_position().row as u32 + 1
}

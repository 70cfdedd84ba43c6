//! Reference resolution: raw textual references to concrete symbol edges.
//!
//! A reference names its target the way the source code spells it
//! (`helper`, `db::open`, `User`). Many symbols can share a name, so
//! resolution walks a fixed tie-break cascade that favors locality:
//!
//! 1. Exact qualified-name match, re-anchored to a same-file or same-directory
//!    namesake when the qualified match lives elsewhere
//! 2. Capitalized call names prefer class-like candidates (constructor calls)
//! 3. Several same-file candidates: prefer the one sharing the caller's parent
//! 4. Same-directory candidates, exported first
//! 5. Global fallback: any exported candidate, else the first
//!
//! The resolver never fails. A reference it cannot place is
//! [`Resolution::Unresolved`] and the indexer counts it. A reference that
//! lands on its own caller (recursion) is [`Resolution::SelfReference`]: it
//! found its target, but no edge is stored. Candidate lists are ordered by
//! symbol id, so every tie-break is deterministic.

use std::collections::HashMap;
use std::path::Path;

use crate::db::simple_name;
use crate::types::{Edge, EdgeKind, FileId, Symbol};

/// One reference to resolve.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceInput<'a> {
    /// File the reference occurs in
    pub source_file: FileId,
    /// Qualified name of the enclosing symbol, `None` for top-level code
    pub source_name: Option<&'a str>,
    /// 1-indexed line of the reference
    pub line: u32,
    /// Target as written
    pub target_name: &'a str,
    /// Reference kind
    pub kind: EdgeKind,
}

/// What became of one reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Caller and target are distinct symbols
    Edge(Edge),
    /// The target is the caller itself
    SelfReference,
    /// No caller or no target could be found
    Unresolved,
}

impl Resolution {
    /// The edge, if one should be stored.
    #[must_use]
    pub fn edge(self) -> Option<Edge> {
        match self {
            Self::Edge(edge) => Some(edge),
            Self::SelfReference | Self::Unresolved => None,
        }
    }
}

/// Lookup tables over one generation's symbols.
pub struct SymbolTable<'a> {
    symbols: &'a [Symbol],
    by_name: HashMap<&'a str, Vec<usize>>,
    by_qualified: HashMap<&'a str, usize>,
    /// Per-file symbol indices sorted by `line_start`, then id
    by_file: HashMap<FileId, Vec<usize>>,
    file_dirs: HashMap<FileId, String>,
}

impl<'a> SymbolTable<'a> {
    /// Build lookup tables.
    ///
    /// `symbols` should be ordered by id; `file_paths` maps every file id
    /// referenced by a symbol to its workspace-relative path.
    pub fn new<P: AsRef<Path>>(symbols: &'a [Symbol], file_paths: &HashMap<FileId, P>) -> Self {
        let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut by_qualified: HashMap<&str, usize> = HashMap::new();
        let mut by_file: HashMap<FileId, Vec<usize>> = HashMap::new();

        for (idx, sym) in symbols.iter().enumerate() {
            by_name.entry(sym.name.as_str()).or_default().push(idx);
            // First declaration wins for duplicate qualified names
            by_qualified.entry(sym.qualified_name.as_str()).or_insert(idx);
            by_file.entry(sym.file_id).or_default().push(idx);
        }
        for indices in by_file.values_mut() {
            indices.sort_by_key(|&i| (symbols[i].line_start, symbols[i].id));
        }

        let file_dirs = file_paths
            .iter()
            .map(|(id, path)| {
                let dir = path
                    .as_ref()
                    .parent()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (*id, dir)
            })
            .collect();

        Self {
            symbols,
            by_name,
            by_qualified,
            by_file,
            file_dirs,
        }
    }

    /// Resolve one reference.
    #[must_use]
    pub fn resolve(&self, reference: &ReferenceInput<'_>) -> Resolution {
        let Some(caller) = self.resolve_caller(reference) else {
            return Resolution::Unresolved;
        };
        let Some(target) = self.resolve_target(reference, caller) else {
            return Resolution::Unresolved;
        };

        let source_id = self.symbols[caller].id;
        let target_id = self.symbols[target].id;
        if source_id == target_id {
            tracing::trace!(
                symbol = %self.symbols[caller].qualified_name,
                "Dropping self-referential edge"
            );
            return Resolution::SelfReference;
        }

        Resolution::Edge(Edge {
            source_id,
            target_id,
            kind: reference.kind,
            line: reference.line,
        })
    }

    /// Find the symbol a reference originates from.
    ///
    /// A named source is looked up in its file. Without a name (or when the
    /// name is unknown) the closest preceding symbol owns the reference; a
    /// reference above every symbol belongs to the file's first symbol.
    fn resolve_caller(&self, reference: &ReferenceInput<'_>) -> Option<usize> {
        let in_file = self.by_file.get(&reference.source_file)?;
        if in_file.is_empty() {
            return None;
        }

        if let Some(name) = reference.source_name.filter(|n| !n.is_empty()) {
            let named: Vec<usize> = in_file
                .iter()
                .copied()
                .filter(|&i| {
                    self.symbols[i].qualified_name == name || self.symbols[i].name == name
                })
                .collect();
            if named.len() == 1 {
                return Some(named[0]);
            }
            if !named.is_empty() {
                return Some(Self::closest_preceding(self.symbols, &named, reference.line));
            }
        }

        Some(Self::closest_preceding(self.symbols, in_file, reference.line))
    }

    fn closest_preceding(symbols: &[Symbol], sorted: &[usize], line: u32) -> usize {
        sorted
            .iter()
            .copied()
            .rev()
            .find(|&i| symbols[i].line_start <= line)
            .unwrap_or(sorted[0])
    }

    fn resolve_target(&self, reference: &ReferenceInput<'_>, caller: usize) -> Option<usize> {
        let source_file = reference.source_file;
        let simple = simple_name(reference.target_name);

        // 1. Exact qualified match, re-anchored to a local namesake if possible
        if let Some(&qualified) = self.by_qualified.get(reference.target_name) {
            if self.symbols[qualified].file_id == source_file {
                return Some(qualified);
            }
            let namesakes = self.by_name.get(simple).map_or(&[][..], Vec::as_slice);
            if let Some(local) = self.first_in_file(namesakes, source_file) {
                return Some(local);
            }
            if let Some(near) = self.first_in_dir(namesakes, source_file) {
                return Some(near);
            }
            return Some(qualified);
        }

        let all = self.by_name.get(simple)?;
        if all.is_empty() {
            return None;
        }

        // 2. Constructor heuristic
        let class_like: Vec<usize>;
        let candidates: &[usize] = if reference.kind == EdgeKind::Calls
            && simple.chars().next().is_some_and(char::is_uppercase)
        {
            class_like = all
                .iter()
                .copied()
                .filter(|&i| self.symbols[i].kind.is_class_like())
                .collect();
            if class_like.is_empty() { all } else { &class_like }
        } else {
            all
        };

        // 3. Same file, tie-broken by shared parent
        let same_file: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&i| self.symbols[i].file_id == source_file)
            .collect();
        match same_file.len() {
            0 => {}
            1 => return Some(same_file[0]),
            _ => {
                let parent = parent_prefix(&self.symbols[caller].qualified_name);
                if let Some(parent) = parent {
                    let sibling = same_file.iter().copied().find(|&i| {
                        parent_prefix(&self.symbols[i].qualified_name) == Some(parent)
                    });
                    if let Some(sibling) = sibling {
                        return Some(sibling);
                    }
                }
                return Some(same_file[0]);
            }
        }

        // 4. Same directory, exported first
        let same_dir: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&i| self.same_dir(self.symbols[i].file_id, source_file))
            .collect();
        if !same_dir.is_empty() {
            return same_dir
                .iter()
                .copied()
                .find(|&i| self.symbols[i].is_exported)
                .or(Some(same_dir[0]));
        }

        // 5. Global fallback
        candidates
            .iter()
            .copied()
            .find(|&i| self.symbols[i].is_exported)
            .or_else(|| candidates.first().copied())
    }

    fn first_in_file(&self, candidates: &[usize], file: FileId) -> Option<usize> {
        candidates
            .iter()
            .copied()
            .find(|&i| self.symbols[i].file_id == file)
    }

    fn first_in_dir(&self, candidates: &[usize], file: FileId) -> Option<usize> {
        candidates
            .iter()
            .copied()
            .find(|&i| self.same_dir(self.symbols[i].file_id, file))
    }

    fn same_dir(&self, a: FileId, b: FileId) -> bool {
        match (self.file_dirs.get(&a), self.file_dirs.get(&b)) {
            (Some(da), Some(db)) => da == db,
            _ => false,
        }
    }
}

/// Enclosing-scope prefix of a qualified name: `Parent::member` and
/// `Parent.member` both give `Parent`.
fn parent_prefix(qualified: &str) -> Option<&str> {
    let colons = qualified.rfind("::");
    let dot = qualified.rfind('.');
    match (colons, dot) {
        (Some(c), Some(d)) if d > c => Some(&qualified[..d]),
        (Some(c), _) => Some(&qualified[..c]),
        (None, Some(d)) => Some(&qualified[..d]),
        (None, None) => None,
    }
}

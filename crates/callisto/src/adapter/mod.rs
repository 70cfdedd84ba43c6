//! Parser adapters: per-language extraction of symbols and raw references.
//!
//! An adapter turns one file's source text into [`FileFacts`]. Callisto does
//! no language-specific work outside this module. Which adapters are active
//! is decided by an explicitly constructed [`AdapterRegistry`] that the
//! caller owns and passes in; there is no process-wide registry.
//!
//! ## Adding a language
//!
//! 1. Implement [`ParserAdapter`]
//! 2. `registry.register(Box::new(MyAdapter))`
//! 3. Pass the registry to [`crate::Callisto::with_registry`]

mod rust;
mod tree_sitter_utils;

pub use rust::RustAdapter;

use std::path::Path;

use crate::error::Result;
use crate::types::{FileFacts, Language};

/// Extracts symbols and references from source files of one language.
///
/// Adapters must be `Send + Sync`: the indexer parses files in parallel and
/// shares one adapter across worker threads.
pub trait ParserAdapter: Send + Sync {
    /// Language label stored with each file.
    fn language(&self) -> Language;

    /// File extensions (without the dot) this adapter handles.
    fn extensions(&self) -> &[&str];

    /// Parse one file.
    ///
    /// An `Err` marks only this file as failed; indexing continues and the
    /// file is retried next run.
    fn parse(&self, path: &Path, source: &str) -> Result<FileFacts>;
}

/// The set of adapters an index run may use.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn ParserAdapter>>,
}

impl AdapterRegistry {
    /// An empty registry. Nothing is indexed until adapters are registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in adapters.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(RustAdapter));
        registry
    }

    /// Add an adapter. Later registrations win for a shared extension.
    pub fn register(&mut self, adapter: Box<dyn ParserAdapter>) {
        tracing::debug!(
            language = adapter.language().as_str(),
            extensions = ?adapter.extensions(),
            "Registered parser adapter"
        );
        self.adapters.push(adapter);
    }

    /// The adapter responsible for `path`, by extension.
    #[must_use]
    pub fn for_path(&self, path: &Path) -> Option<&dyn ParserAdapter> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.adapters
            .iter()
            .rev()
            .find(|a| a.extensions().iter().any(|e| e.eq_ignore_ascii_case(&ext)))
            .map(AsRef::as_ref)
    }

    /// Whether any adapter handles `path`.
    #[must_use]
    pub fn supports(&self, path: &Path) -> bool {
        self.for_path(path).is_some()
    }

    /// Number of registered adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether no adapters are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.adapters.iter().map(|a| a.language()))
            .finish()
    }
}

//! Rust adapter built on tree-sitter-rust.
//!
//! Symbols: functions, impl and trait methods (`Type::method`), structs,
//! enums, traits, consts, statics, type aliases, inline modules and
//! `macro_rules!` definitions. Items inside `mod foo { .. }` are qualified
//! with the module path.
//!
//! References: calls (plain, path and method), struct literals, macro
//! invocations, `impl Trait for Type` and `use` imports. A reference made
//! inside a function body names that function as its source.

use std::path::Path;

use super::ParserAdapter;
use super::tree_sitter_utils::{end_line, node_text, start_line};
use crate::error::{Error, Result};
use crate::types::{EdgeKind, FileFacts, Language, RawReference, RawSymbol, SymbolKind};

mod node_kinds {
    pub const FUNCTION_ITEM: &str = "function_item";
    pub const FUNCTION_SIGNATURE_ITEM: &str = "function_signature_item";
    pub const STRUCT_ITEM: &str = "struct_item";
    pub const ENUM_ITEM: &str = "enum_item";
    pub const TRAIT_ITEM: &str = "trait_item";
    pub const IMPL_ITEM: &str = "impl_item";
    pub const CONST_ITEM: &str = "const_item";
    pub const STATIC_ITEM: &str = "static_item";
    pub const TYPE_ITEM: &str = "type_item";
    pub const MACRO_DEFINITION: &str = "macro_definition";
    pub const MOD_ITEM: &str = "mod_item";
    pub const USE_DECLARATION: &str = "use_declaration";

    pub const DECLARATION_LIST: &str = "declaration_list";
    pub const VISIBILITY_MODIFIER: &str = "visibility_modifier";
    pub const TYPE_IDENTIFIER: &str = "type_identifier";
    pub const GENERIC_TYPE: &str = "generic_type";
    pub const SCOPED_TYPE_IDENTIFIER: &str = "scoped_type_identifier";

    pub const CALL_EXPRESSION: &str = "call_expression";
    pub const STRUCT_EXPRESSION: &str = "struct_expression";
    pub const FIELD_EXPRESSION: &str = "field_expression";
    pub const MACRO_INVOCATION: &str = "macro_invocation";
    pub const GENERIC_FUNCTION: &str = "generic_function";
    pub const SCOPED_IDENTIFIER: &str = "scoped_identifier";
    pub const IDENTIFIER: &str = "identifier";

    pub const USE_LIST: &str = "use_list";
    pub const SCOPED_USE_LIST: &str = "scoped_use_list";
    pub const USE_AS_CLAUSE: &str = "use_as_clause";
    pub const USE_WILDCARD: &str = "use_wildcard";
}

/// Path segments that say where to look, not what is referenced.
const PATH_ANCHORS: &[&str] = &["crate", "self", "super"];

/// Parser adapter for `.rs` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustAdapter;

impl ParserAdapter for RustAdapter {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn extensions(&self) -> &[&str] {
        &["rs"]
    }

    fn parse(&self, path: &Path, source: &str) -> Result<FileFacts> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .map_err(|e| Error::Parser(format!("failed to load Rust grammar: {e}")))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| Error::Parser(format!("tree-sitter gave up on {}", path.display())))?;

        let mut walker = Walker {
            content: source.as_bytes(),
            facts: FileFacts {
                line_count: u32::try_from(source.lines().count()).unwrap_or(u32::MAX),
                ..FileFacts::default()
            },
        };
        walker.items(&tree.root_node(), &Scope::default());
        Ok(walker.facts)
    }
}

/// Where an item sits: module path, enclosing type, enclosing function.
#[derive(Debug, Clone, Default)]
struct Scope {
    module: Vec<String>,
    owner: Option<String>,
    function: Option<String>,
}

impl Scope {
    fn qualify(&self, name: &str) -> String {
        let mut parts: Vec<&str> = self.module.iter().map(String::as_str).collect();
        if let Some(owner) = &self.owner {
            parts.push(owner);
        }
        parts.push(name);
        parts.join("::")
    }

    fn module_path(&self) -> Option<String> {
        (!self.module.is_empty()).then(|| self.module.join("::"))
    }

    fn owner_path(&self) -> Option<String> {
        let owner = self.owner.as_ref()?;
        let mut parts = self.module.clone();
        parts.push(owner.clone());
        Some(parts.join("::"))
    }
}

struct Walker<'a> {
    content: &'a [u8],
    facts: FileFacts,
}

impl Walker<'_> {
    /// Visit the items of a source file, module body, impl body or trait body.
    fn items(&mut self, node: &tree_sitter::Node, scope: &Scope) {
        use node_kinds::{
            CONST_ITEM, ENUM_ITEM, FUNCTION_ITEM, FUNCTION_SIGNATURE_ITEM, IMPL_ITEM,
            MACRO_DEFINITION, MOD_ITEM, STATIC_ITEM, STRUCT_ITEM, TRAIT_ITEM, TYPE_ITEM,
            USE_DECLARATION,
        };

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                FUNCTION_ITEM => self.function(&child, scope),
                FUNCTION_SIGNATURE_ITEM => {
                    let kind = if scope.owner.is_some() {
                        SymbolKind::Method
                    } else {
                        SymbolKind::Function
                    };
                    self.definition(&child, scope, kind);
                }
                STRUCT_ITEM => {
                    self.definition(&child, scope, SymbolKind::Struct);
                }
                ENUM_ITEM => {
                    self.definition(&child, scope, SymbolKind::Enum);
                }
                TYPE_ITEM => {
                    self.definition(&child, scope, SymbolKind::TypeAlias);
                }
                CONST_ITEM => self.valued_definition(&child, scope, SymbolKind::Const),
                STATIC_ITEM => self.valued_definition(&child, scope, SymbolKind::Static),
                MACRO_DEFINITION => {
                    self.definition(&child, scope, SymbolKind::Macro);
                }
                TRAIT_ITEM => self.trait_item(&child, scope),
                IMPL_ITEM => self.impl_item(&child, scope),
                MOD_ITEM => self.module(&child, scope),
                USE_DECLARATION => self.use_declaration(&child, scope),
                _ => self.expressions(&child, scope),
            }
        }
    }

    fn function(&mut self, node: &tree_sitter::Node, scope: &Scope) {
        let kind = if scope.owner.is_some() {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };
        let Some(qualified) = self.definition(node, scope, kind) else {
            return;
        };
        if let Some(body) = node.child_by_field_name("body") {
            let inner = Scope {
                function: Some(qualified),
                ..scope.clone()
            };
            self.expressions(&body, &inner);
        }
    }

    /// Record a named item and return its qualified name.
    fn definition(
        &mut self,
        node: &tree_sitter::Node,
        scope: &Scope,
        kind: SymbolKind,
    ) -> Option<String> {
        let name_node = node.child_by_field_name("name")?;
        let name = node_text(&name_node, self.content)?;
        let qualified = scope.qualify(&name);
        let parent_name = scope.owner_path().or_else(|| scope.module_path());
        self.facts.symbols.push(RawSymbol {
            name,
            qualified_name: qualified.clone(),
            kind,
            line_start: start_line(node),
            line_end: end_line(node),
            signature: self.signature(node, kind),
            is_exported: has_visibility(node) || (scope.owner.is_some() && is_trait_member(node)),
            parent_name,
        });
        Some(qualified)
    }

    /// Consts and statics: the initializer may call functions.
    fn valued_definition(&mut self, node: &tree_sitter::Node, scope: &Scope, kind: SymbolKind) {
        let qualified = self.definition(node, scope, kind);
        if let Some(value) = node.child_by_field_name("value") {
            let inner = Scope {
                function: qualified,
                ..scope.clone()
            };
            self.expressions(&value, &inner);
        }
    }

    fn trait_item(&mut self, node: &tree_sitter::Node, scope: &Scope) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let Some(name) = node_text(&name_node, self.content) else {
            return;
        };
        self.definition(node, scope, SymbolKind::Trait);
        if let Some(body) = node.child_by_field_name("body") {
            let inner = Scope {
                owner: Some(name),
                function: None,
                ..scope.clone()
            };
            self.items(&body, &inner);
        }
    }

    fn impl_item(&mut self, node: &tree_sitter::Node, scope: &Scope) {
        let Some(type_name) = node
            .child_by_field_name("type")
            .and_then(|t| self.type_name(&t))
        else {
            return;
        };
        let owner_scope = Scope {
            owner: Some(type_name.clone()),
            function: None,
            ..scope.clone()
        };

        if let Some(trait_name) = node
            .child_by_field_name("trait")
            .and_then(|t| self.type_path(&t))
        {
            self.facts.references.push(RawReference {
                source_name: Some(scope.qualify(&type_name)),
                line: start_line(node),
                target_name: trait_name,
                kind: EdgeKind::Implements,
            });
        }

        if let Some(body) = node.child_by_field_name("body") {
            self.items(&body, &owner_scope);
        }
    }

    fn module(&mut self, node: &tree_sitter::Node, scope: &Scope) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let Some(name) = node_text(&name_node, self.content) else {
            return;
        };
        self.definition(node, scope, SymbolKind::Module);
        // `mod foo;` declares an out-of-line module with no body here.
        if let Some(body) = node.child_by_field_name("body") {
            let mut inner = Scope {
                owner: None,
                function: None,
                ..scope.clone()
            };
            inner.module.push(name);
            self.items(&body, &inner);
        }
    }

    fn use_declaration(&mut self, node: &tree_sitter::Node, scope: &Scope) {
        let Some(argument) = node.child_by_field_name("argument") else {
            return;
        };
        let mut paths = Vec::new();
        self.use_paths(&argument, &[], &mut paths);
        for path in paths {
            if let Some(target_name) = strip_anchors(&path) {
                self.facts.references.push(RawReference {
                    source_name: scope.function.clone(),
                    line: start_line(node),
                    target_name,
                    kind: EdgeKind::Imports,
                });
            }
        }
    }

    /// Flatten a use tree into full paths. Globs are skipped.
    fn use_paths(&self, node: &tree_sitter::Node, prefix: &[String], out: &mut Vec<Vec<String>>) {
        use node_kinds::{
            IDENTIFIER, SCOPED_IDENTIFIER, SCOPED_USE_LIST, USE_AS_CLAUSE, USE_LIST,
            USE_WILDCARD,
        };

        match node.kind() {
            IDENTIFIER | SCOPED_IDENTIFIER => {
                let mut path = prefix.to_vec();
                path.extend(self.path_segments(node));
                out.push(path);
            }
            USE_AS_CLAUSE => {
                if let Some(path_node) = node.child_by_field_name("path") {
                    self.use_paths(&path_node, prefix, out);
                }
            }
            SCOPED_USE_LIST => {
                let mut inner = prefix.to_vec();
                if let Some(path_node) = node.child_by_field_name("path") {
                    inner.extend(self.path_segments(&path_node));
                }
                if let Some(list) = node.child_by_field_name("list") {
                    self.use_paths(&list, &inner, out);
                }
            }
            USE_LIST => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.use_paths(&child, prefix, out);
                }
            }
            USE_WILDCARD => {}
            // `self` inside a use list names the prefix itself.
            "self" if !prefix.is_empty() => out.push(prefix.to_vec()),
            _ => {}
        }
    }

    /// Walk an expression subtree collecting references.
    fn expressions(&mut self, node: &tree_sitter::Node, scope: &Scope) {
        use node_kinds::{
            CALL_EXPRESSION, FUNCTION_ITEM, IMPL_ITEM, MACRO_INVOCATION, MOD_ITEM,
            STRUCT_EXPRESSION, TRAIT_ITEM, USE_DECLARATION,
        };

        match node.kind() {
            CALL_EXPRESSION => {
                if let Some(function) = node.child_by_field_name("function")
                    && let Some(target) = self.callee(&function, scope)
                {
                    self.push_call(target, start_line(&function), scope);
                }
            }
            STRUCT_EXPRESSION => {
                if let Some(name_node) = node.child_by_field_name("name")
                    && let Some(target) = self.type_path(&name_node)
                {
                    let target = self.replace_self(&target, scope);
                    self.push_call(target, start_line(&name_node), scope);
                }
            }
            MACRO_INVOCATION => {
                if let Some(name_node) = node.child_by_field_name("macro")
                    && let Some(target) = self.path_text(&name_node)
                {
                    self.push_call(target, start_line(&name_node), scope);
                }
            }
            USE_DECLARATION => {
                self.use_declaration(node, scope);
                return;
            }
            // Items nested in a body: symbols belong to the file, calls to them.
            FUNCTION_ITEM | IMPL_ITEM | TRAIT_ITEM | MOD_ITEM => {
                let nested = Scope {
                    owner: None,
                    function: None,
                    ..scope.clone()
                };
                self.items_of(node, &nested);
                return;
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.expressions(&child, scope);
        }
    }

    /// Dispatch a single item node through [`Self::items`] logic.
    fn items_of(&mut self, node: &tree_sitter::Node, scope: &Scope) {
        use node_kinds::{FUNCTION_ITEM, IMPL_ITEM, MOD_ITEM, TRAIT_ITEM};

        match node.kind() {
            FUNCTION_ITEM => self.function(node, scope),
            IMPL_ITEM => self.impl_item(node, scope),
            TRAIT_ITEM => self.trait_item(node, scope),
            MOD_ITEM => self.module(node, scope),
            _ => {}
        }
    }

    fn push_call(&mut self, target_name: String, line: u32, scope: &Scope) {
        self.facts.references.push(RawReference {
            source_name: scope.function.clone(),
            line,
            target_name,
            kind: EdgeKind::Calls,
        });
    }

    /// Target name of the `function` child of a call expression.
    fn callee(&self, function: &tree_sitter::Node, scope: &Scope) -> Option<String> {
        use node_kinds::{FIELD_EXPRESSION, GENERIC_FUNCTION, IDENTIFIER, SCOPED_IDENTIFIER};

        match function.kind() {
            IDENTIFIER => node_text(function, self.content),
            SCOPED_IDENTIFIER => {
                let path = self.path_text(function)?;
                Some(self.replace_self(&path, scope))
            }
            FIELD_EXPRESSION => {
                let field = function.child_by_field_name("field")?;
                node_text(&field, self.content)
            }
            GENERIC_FUNCTION => {
                let inner = function.child_by_field_name("function")?;
                self.callee(&inner, scope)
            }
            _ => None,
        }
    }

    /// `Self::new` inside `impl Foo` means `Foo::new`.
    fn replace_self(&self, path: &str, scope: &Scope) -> String {
        match (path.strip_prefix("Self"), &scope.owner) {
            (Some(rest), Some(owner)) if rest.is_empty() || rest.starts_with("::") => {
                format!("{owner}{rest}")
            }
            _ => path.to_string(),
        }
    }

    /// Path text with `crate`/`self`/`super` anchors removed.
    fn path_text(&self, node: &tree_sitter::Node) -> Option<String> {
        strip_anchors(&self.path_segments(node))
    }

    fn path_segments(&self, node: &tree_sitter::Node) -> Vec<String> {
        use node_kinds::{SCOPED_IDENTIFIER, SCOPED_TYPE_IDENTIFIER};

        let mut segments = Vec::new();
        match node.kind() {
            SCOPED_IDENTIFIER | SCOPED_TYPE_IDENTIFIER => {
                if let Some(path) = node.child_by_field_name("path") {
                    segments.extend(self.path_segments(&path));
                }
                if let Some(name) = node
                    .child_by_field_name("name")
                    .and_then(|n| node_text(&n, self.content))
                {
                    segments.push(name);
                }
            }
            _ => {
                if let Some(text) = node_text(node, self.content) {
                    segments.push(text);
                }
            }
        }
        segments
    }

    /// A type reference as a path, generics dropped.
    fn type_path(&self, node: &tree_sitter::Node) -> Option<String> {
        use node_kinds::{GENERIC_TYPE, SCOPED_IDENTIFIER, SCOPED_TYPE_IDENTIFIER, TYPE_IDENTIFIER};

        match node.kind() {
            TYPE_IDENTIFIER => node_text(node, self.content),
            SCOPED_TYPE_IDENTIFIER | SCOPED_IDENTIFIER => self.path_text(node),
            GENERIC_TYPE => {
                let inner = node.child_by_field_name("type")?;
                self.type_path(&inner)
            }
            _ => None,
        }
    }

    /// The bare type name an impl block attaches methods to.
    fn type_name(&self, node: &tree_sitter::Node) -> Option<String> {
        let path = self.type_path(node)?;
        Some(path.rsplit("::").next().unwrap_or(&path).to_string())
    }

    fn signature(&self, node: &tree_sitter::Node, kind: SymbolKind) -> Option<String> {
        if !matches!(kind, SymbolKind::Function | SymbolKind::Method) {
            return None;
        }
        let name = node_text(&node.child_by_field_name("name")?, self.content)?;
        let params = node_text(&node.child_by_field_name("parameters")?, self.content)?;
        let signature = match node
            .child_by_field_name("return_type")
            .and_then(|rt| node_text(&rt, self.content))
        {
            Some(rt) => format!("fn {name}{params} -> {rt}"),
            None => format!("fn {name}{params}"),
        };
        Some(signature)
    }
}

fn has_visibility(node: &tree_sitter::Node) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|c| c.kind() == node_kinds::VISIBILITY_MODIFIER)
}

/// Trait members and trait impl methods are public through the trait.
fn is_trait_member(node: &tree_sitter::Node) -> bool {
    let Some(list) = node.parent() else {
        return false;
    };
    if list.kind() != node_kinds::DECLARATION_LIST {
        return false;
    }
    list.parent().is_some_and(|owner| {
        owner.kind() == node_kinds::TRAIT_ITEM
            || (owner.kind() == node_kinds::IMPL_ITEM && owner.child_by_field_name("trait").is_some())
    })
}

fn strip_anchors(segments: &[String]) -> Option<String> {
    let kept: Vec<&str> = segments
        .iter()
        .map(String::as_str)
        .skip_while(|s| PATH_ANCHORS.contains(s))
        .collect();
    (!kept.is_empty()).then(|| kept.join("::"))
}

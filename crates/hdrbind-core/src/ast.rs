//! The declaration tree handed over by an AST provider, and its traversal.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::descriptor::TypeDescriptor;
use crate::diag::SourceLocation;
use crate::error::Result;

/// Storage class of a declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    #[default]
    None,
    Extern,
    Auto,
    Static,
    PrivateExtern,
    OpenClWorkGroupLocal,
    Register,
}

impl StorageClass {
    /// Whether a function with this storage class has external linkage.
    pub fn is_exported(self) -> bool {
        matches!(self, StorageClass::None | StorageClass::Extern | StorageClass::Auto)
    }
}

/// Kinds of tree nodes the collector distinguishes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    TranslationUnit,
    FunctionDecl,
    ParmDecl,
    UnexposedAttr,
    CompoundStmt,
    FieldDecl,
    TypedefDecl,
    StructDecl,
    UnionDecl,
    EnumDecl,
    EnumConstantDecl,
    VarDecl,
    LinkageSpec,
    /// Any other provider node kind, by name.
    Other(String),
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Other(name) => write!(f, "{name}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// One node of the declaration tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    /// Declared name; empty for anonymous nodes.
    pub spelling: String,
    pub location: SourceLocation,
    pub storage: StorageClass,
    /// Declared type. Function declarations carry their function type here.
    pub ty: Option<TypeDescriptor>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, spelling: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
            location,
            storage: StorageClass::None,
            ty: None,
            children: Vec::new(),
        }
    }

    pub fn with_type(mut self, ty: TypeDescriptor) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn with_storage(mut self, storage: StorageClass) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }
}

/// What to do after visiting a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Visit the node's children next.
    Recurse,
    /// Skip the node's children and move on to its next sibling.
    Continue,
}

/// Receives nodes in depth-first pre-order.
pub trait Visitor {
    type Error;

    fn visit(&mut self, node: &Node) -> std::result::Result<Visit, Self::Error>;
}

/// Visit every descendant of `root` (not `root` itself) in depth-first pre-order.
pub fn walk<V: Visitor>(root: &Node, visitor: &mut V) -> std::result::Result<(), V::Error> {
    for child in &root.children {
        if visitor.visit(child)? == Visit::Recurse {
            walk(child, visitor)?;
        }
    }
    Ok(())
}

/// A parsed input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub path: PathBuf,
    pub root: Node,
}

/// Something that can turn a C source file into a declaration tree.
pub trait AstProvider {
    /// Parse `path` with compiler flags `args`.
    ///
    /// Inputs with problems are rejected with
    /// [`BindError::SourceDiagnostics`](crate::error::BindError::SourceDiagnostics);
    /// a returned unit is diagnostic-free.
    fn parse(&self, path: &Path, args: &[String]) -> Result<TranslationUnit>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        seen: Vec<String>,
        prune: &'static str,
    }

    impl Visitor for Recorder {
        type Error = std::convert::Infallible;

        fn visit(&mut self, node: &Node) -> std::result::Result<Visit, Self::Error> {
            self.seen.push(node.spelling.clone());
            if node.spelling == self.prune {
                Ok(Visit::Continue)
            } else {
                Ok(Visit::Recurse)
            }
        }
    }

    fn named(name: &str, children: Vec<Node>) -> Node {
        Node::new(NodeKind::Other("test".into()), name, SourceLocation::default())
            .with_children(children)
    }

    #[test]
    fn walk_is_preorder_and_honours_pruning() {
        let root = named(
            "root",
            vec![
                named("a", vec![named("a1", vec![]), named("a2", vec![])]),
                named("b", vec![named("b1", vec![])]),
                named("c", vec![]),
            ],
        );
        let mut recorder = Recorder {
            seen: Vec::new(),
            prune: "b",
        };
        walk(&root, &mut recorder).unwrap();
        assert_eq!(recorder.seen, ["a", "a1", "a2", "b", "c"]);
    }

    #[test]
    fn exported_storage_classes() {
        assert!(StorageClass::None.is_exported());
        assert!(StorageClass::Extern.is_exported());
        assert!(StorageClass::Auto.is_exported());
        assert!(!StorageClass::Static.is_exported());
        assert!(!StorageClass::PrivateExtern.is_exported());
        assert!(!StorageClass::Register.is_exported());
        assert!(!StorageClass::OpenClWorkGroupLocal.is_exported());
    }
}

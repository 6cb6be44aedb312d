//! Translation of exported C function signatures into `extern` blocks.
//!
//! An [`AstProvider`] parses a C file into a [`Node`] tree; the
//! [`Collector`] walks it and classifies every parameter and return type;
//! [`render_extern_block`] prints the result.
//!
//! ## Modules
//!
//! - [`descriptor`]: C type descriptors handed over by providers
//! - [`classify`]: descriptor to target type expression
//! - [`names`]: qualifier stripping for type spellings
//! - [`ast`]: declaration tree, traversal and the provider trait
//! - [`collect`]: function signature collection
//! - [`emit`]: `extern` block rendering
//! - [`diag`]: locations, diagnostics and reporters
//! - [`flags`]: compiler flag assembly
//! - [`translate`]: the end-to-end driver

pub mod ast;
pub mod classify;
pub mod collect;
pub mod descriptor;
pub mod diag;
pub mod emit;
pub mod error;
pub mod flags;
pub mod names;
pub mod translate;

// Re-export key types for convenience
pub use ast::{walk, AstProvider, Node, NodeKind, StorageClass, TranslationUnit, Visit, Visitor};
pub use classify::classify;
pub use collect::{Arg, Collector, FnDecl, ParamState};
pub use descriptor::{CallingConv, FunctionSignature, TypeDescriptor};
pub use diag::{Diagnostic, Reporter, Severity, SourceLocation, StderrReporter};
pub use emit::{render_extern_block, write_extern_block};
pub use error::{BindError, ErrorCategory, Result};
pub use translate::{collect_file, translate_file};

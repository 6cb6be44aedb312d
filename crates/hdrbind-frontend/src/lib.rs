//! AST providers for hdrbind.
//!
//! [`HeaderParser`] is a self-contained C declaration parser: it needs no
//! compiler installation and understands the declarations headers are made
//! of, but does not run the preprocessor. With the `libclang` feature,
//! [`LibClang`] hands the work to libclang instead.

pub mod declarator;
pub mod expr;
pub mod lexer;
#[cfg(feature = "libclang")]
pub mod libclang;
pub mod model;
pub mod parser;

use std::path::{Path, PathBuf};

use hdrbind_core::ast::{AstProvider, TranslationUnit};
use hdrbind_core::diag::{Diagnostic, SourceLocation};
use hdrbind_core::error::{BindError, Result};

#[cfg(feature = "libclang")]
pub use libclang::LibClang;
pub use model::DataModel;
pub use parser::Parser;

/// The built-in provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderParser;

impl HeaderParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse `source` as the contents of a file called `name`.
    pub fn parse_source(&self, name: &str, source: &str, args: &[String]) -> Result<TranslationUnit> {
        let model = DataModel::from_args(args);
        let (tokens, lex_errors) = lexer::tokenize(source);
        tracing::debug!(file = name, tokens = tokens.len(), "tokenized");

        let mut diagnostics: Vec<Diagnostic> = lex_errors
            .into_iter()
            .map(|e| Diagnostic::error(SourceLocation::new(name, e.line, e.column), e.message))
            .collect();
        let (root, parse_diagnostics) = Parser::new(name, tokens, model).parse();
        diagnostics.extend(parse_diagnostics);

        if !diagnostics.is_empty() {
            diagnostics.sort_by_key(|d| (d.location.line, d.location.column));
            return Err(BindError::SourceDiagnostics(diagnostics));
        }
        Ok(TranslationUnit {
            path: PathBuf::from(name),
            root,
        })
    }
}

impl AstProvider for HeaderParser {
    fn parse(&self, path: &Path, args: &[String]) -> Result<TranslationUnit> {
        let source = std::fs::read_to_string(path)?;
        let mut unit = self.parse_source(&path.display().to_string(), &source, args)?;
        unit.path = path.to_path_buf();
        Ok(unit)
    }
}

/// The libclang provider, or an error saying it was not compiled in.
pub fn libclang_provider() -> Result<Box<dyn AstProvider>> {
    #[cfg(feature = "libclang")]
    {
        Ok(Box::new(LibClang::new()))
    }
    #[cfg(not(feature = "libclang"))]
    {
        Err(BindError::Frontend {
            detail: "this build of hdrbind does not include the libclang front end (enable the `libclang` feature)".into(),
        })
    }
}

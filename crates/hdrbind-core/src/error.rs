//! Error types.

use crate::descriptor::UnsupportedKind;
use crate::diag::{Diagnostic, SourceLocation};

/// Broad failure classes, each with its own process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The AST provider rejected the input.
    Source,
    /// A type kind with no designed translation.
    Unsupported,
    /// An internal invariant failed: unclassifiable canonical types,
    /// runaway recursion, or a malformed traversal event sequence.
    Internal,
    /// The environment failed us (I/O, missing provider).
    Environment,
}

impl ErrorCategory {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCategory::Source | ErrorCategory::Environment => 1,
            ErrorCategory::Unsupported => 2,
            ErrorCategory::Internal => 101,
        }
    }
}

/// Errors that abort a translation run.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// A type with no mapping was reached.
    #[error("{location}: unsupported type: {kind}")]
    Unsupported {
        kind: String,
        location: SourceLocation,
    },

    /// The canonical form of an unexposed type is itself unexposed.
    #[error("{location}: type is still unexposed after canonicalization; provider cannot describe it")]
    Unexposed { location: SourceLocation },

    /// Type nesting went deeper than the classifier allows.
    #[error("{location}: type nesting exceeds {limit} levels")]
    DepthExceeded { limit: usize, location: SourceLocation },

    /// A parameter event arrived while no function was being collected.
    #[error("{location}: parameter `{name}` seen outside of any function")]
    OrphanParameter {
        name: String,
        location: SourceLocation,
    },

    /// More parameter events arrived than the function type declares.
    #[error("{location}: function `{function}` takes {arity} parameter(s) but parameter `{name}` was seen at index {index}")]
    ArityExceeded {
        function: String,
        name: String,
        arity: usize,
        index: usize,
        location: SourceLocation,
    },

    /// A provider handed over a node that breaks the tree contract.
    #[error("{location}: malformed declaration tree: {detail}")]
    MalformedTree {
        detail: String,
        location: SourceLocation,
    },

    /// The AST provider reported diagnostics for the input.
    #[error("{} diagnostic(s) reported for the input", .0.len())]
    SourceDiagnostics(Vec<Diagnostic>),

    /// The AST provider could not run at all.
    #[error("frontend failure: {detail}")]
    Frontend { detail: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BindError {
    pub(crate) fn unsupported(kind: impl std::fmt::Display, location: &SourceLocation) -> Self {
        BindError::Unsupported {
            kind: kind.to_string(),
            location: location.clone(),
        }
    }

    pub(crate) fn unsupported_kind(kind: &UnsupportedKind, location: &SourceLocation) -> Self {
        Self::unsupported(kind, location)
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BindError::Unsupported { .. } => ErrorCategory::Unsupported,
            BindError::Unexposed { .. }
            | BindError::DepthExceeded { .. }
            | BindError::OrphanParameter { .. }
            | BindError::ArityExceeded { .. }
            | BindError::MalformedTree { .. } => ErrorCategory::Internal,
            BindError::SourceDiagnostics(_) => ErrorCategory::Source,
            BindError::Frontend { .. } | BindError::Io(_) => ErrorCategory::Environment,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }
}

/// Result type alias for hdrbind operations.
pub type Result<T> = std::result::Result<T, BindError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_distinct_exit_codes() {
        let loc = SourceLocation::new("x.h", 3, 1);
        let unsupported = BindError::unsupported_kind(&UnsupportedKind::Vector, &loc);
        let internal = BindError::Unexposed { location: loc.clone() };
        let source = BindError::SourceDiagnostics(vec![Diagnostic::error(loc, "boom")]);

        assert_eq!(unsupported.exit_code(), 2);
        assert_eq!(internal.exit_code(), 101);
        assert_eq!(source.exit_code(), 1);
    }

    #[test]
    fn unsupported_message_carries_location() {
        let err = BindError::unsupported("128-bit integer", &SourceLocation::new("big.h", 7, 9));
        assert_eq!(err.to_string(), "big.h line 7, column 9: unsupported type: 128-bit integer");
    }
}

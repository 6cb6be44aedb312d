//! Location-aware diagnostics.

use serde::{Deserialize, Serialize};

/// A position in a source file. Lines and columns are 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} line {}, column {}", self.file, self.line, self.column)
    }
}

/// How bad a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Processing continues; the construct is skipped or replaced.
    Warning,
    /// The run cannot produce output.
    Error,
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: SourceLocation,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            location,
            message: message.into(),
        }
    }

    pub fn error(location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            location,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Sink for non-fatal diagnostics raised during classification and collection.
pub trait Reporter {
    fn report(&mut self, diagnostic: Diagnostic);

    /// Report a warning at `location`.
    fn warn(&mut self, location: &SourceLocation, message: &str) {
        tracing::warn!(%location, "{message}");
        self.report(Diagnostic::warning(location.clone(), message));
    }
}

/// Records diagnostics in memory.
impl Reporter for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Writes each diagnostic as one line on stderr as soon as it is raised.
#[derive(Debug, Default)]
pub struct StderrReporter {
    reported: usize,
}

impl StderrReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of diagnostics written so far.
    pub fn reported(&self) -> usize {
        self.reported
    }
}

impl Reporter for StderrReporter {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.reported += 1;
        eprintln!("{diagnostic}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_line_format() {
        let diag = Diagnostic::warning(
            SourceLocation::new("include/api.h", 12, 5),
            "skipping variadic function",
        );
        assert_eq!(
            diag.to_string(),
            "include/api.h line 12, column 5: skipping variadic function"
        );
    }

    #[test]
    fn vec_reporter_records_warnings() {
        let mut diags: Vec<Diagnostic> = Vec::new();
        diags.warn(&SourceLocation::new("a.h", 1, 1), "first");
        diags.warn(&SourceLocation::new("a.h", 2, 1), "second");
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.severity == Severity::Warning));
        assert_eq!(diags[1].message, "second");
    }
}

//! Non-fatal problems collected while loading and converting documents.

use std::fmt;

/// Category of a recorded problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Content reuse could not be resolved; the element was omitted.
    Resolution,
    /// Document shape is unexpected (multiple or empty bodies, bad href encoding).
    Validation,
    /// A referenced topic, map or image does not exist.
    NotFound,
}

impl DiagnosticKind {
    /// Lowercase label used in log output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolution => "resolution",
            Self::Validation => "validation",
            Self::NotFound => "not-found",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded problem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Problem category.
    pub kind: DiagnosticKind,
    /// Document being processed when the problem was found.
    pub path: String,
    /// Human-readable description.
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic.
    #[must_use]
    pub fn new(kind: DiagnosticKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] {}", self.path, self.kind, self.message)
    }
}

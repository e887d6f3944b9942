//! Public diagnostic types.
//!
//! Size diagnostics are converted to these types at the API boundary so the
//! embedding compiler can report them next to its own parse and type errors.

use core::fmt;
use core::ops::Range;

use serde::{Deserialize, Serialize};

/// A byte range in the source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span(pub Range<usize>);

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self(start..end)
    }
}

/// A diagnostic message with source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub severity: Severity,

    /// Primary diagnostic message.
    pub message: String,

    /// Source location of the primary issue.
    pub span: Span,

    /// Related locations that provide additional context.
    pub related: Vec<RelatedInfo>,

    /// Help lines suggesting how to fix the issue.
    pub help: Vec<String>,

    /// Optional error code for documentation lookup.
    pub code: Option<String>,
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - the method cannot be emitted.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Related information for a diagnostic (e.g., "declared here").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    pub span: Span,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_span_and_severity() {
        assert_eq!(Span::new(3, 9), Span(3..9));
        assert_eq!(Severity::Error.to_string(), "error");
    }
}

//! Compiler diagnostics.
//!
//! A [`Diagnostic`] is one message produced while compiling source text: its
//! severity, the message itself, and where in the source it points. Compilers
//! collect them into a [`Diagnostics`] list; a compilation fails when that list
//! contains at least one error.

use std::fmt;

use crate::Span;

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Informational note attached to the compilation.
    Info,
    /// Suspicious code that still compiles.
    Warning,
    /// Code that prevents the unit from being emitted.
    Error,
}

impl Severity {
    /// Lowercase label used when rendering diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message from a compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// How serious the message is.
    pub severity: Severity,
    /// Human-readable text.
    pub message: String,
    /// Where the message points in the source.
    pub location: Span,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(location: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            location,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(location: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            location,
        }
    }

    /// Whether this diagnostic blocks compilation.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render the diagnostic followed by the offending source line and a caret.
    pub fn display_with_source(&self, source: &str) -> String {
        let mut out = format!("{self}\n");
        let line_no = self.location.line as usize;
        if line_no == 0 {
            return out;
        }
        if let Some(text) = source.lines().nth(line_no - 1) {
            let indent = " ".repeat(self.location.col.saturating_sub(1) as usize);
            let marker = "^".repeat(self.location.len.max(1) as usize);
            out.push_str(&format!("{line_no:>4} | {text}\n     | {indent}{marker}\n"));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.severity, self.message)
    }
}

/// An ordered list of diagnostics from one compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Append an error at `location`.
    pub fn error(&mut self, location: Span, message: impl Into<String>) {
        self.push(Diagnostic::error(location, message));
    }

    /// Append a warning at `location`.
    pub fn warning(&mut self, location: Span, message: impl Into<String>) {
        self.push(Diagnostic::warning(location, message));
    }

    /// Move every diagnostic from `other` into this list.
    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Whether any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    /// Only the error diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_error())
    }

    /// Number of error diagnostics.
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// All diagnostics in the order they were reported.
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// Total number of diagnostics.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the list.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(items: Vec<Diagnostic>) -> Self {
        Self { items }
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let d = Diagnostic::error(Span::new(3, 7, 1), "expected ';'");
        assert_eq!(d.to_string(), "3:7: error: expected ';'");
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut list = Diagnostics::new();
        list.warning(Span::point(1, 1), "unreachable code");
        assert!(!list.has_errors());
        list.error(Span::point(2, 1), "unknown name 'x'");
        assert!(list.has_errors());
        assert_eq!(list.error_count(), 1);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn display_with_source_points_at_column() {
        let source = "class C {\n    int x = ;\n}";
        let d = Diagnostic::error(Span::new(2, 13, 1), "expected expression");
        let rendered = d.display_with_source(source);
        assert!(rendered.contains("int x = ;"));
        assert!(rendered.lines().last().unwrap().ends_with("            ^"));
    }
}

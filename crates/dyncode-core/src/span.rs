//! Source locations.
//!
//! A [`Span`] records where a token, declaration or diagnostic starts, plus the
//! number of bytes it covers. Lines and columns are 1-indexed.

use std::fmt;

/// A region of source text identified by its starting line and column.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// Create a span from a line, column and length.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Create a zero-length span.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    /// Whether this span covers no text.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length of the span in bytes.
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Extend this span so it reaches the end of `other`.
    ///
    /// Spans on different lines keep the start of `self`; the length then only
    /// approximates the covered text, which is enough for caret rendering.
    pub fn to(self, other: Span) -> Span {
        if self.line != other.line {
            return Span::new(self.line, self.col, self.len.max(1));
        }
        let start = self.col.min(other.col);
        let end = (self.col + self.len).max(other.col + other.len);
        Span::new(self.line, start, end - start)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}+{}", self.line, self.col, self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

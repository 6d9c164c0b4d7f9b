/// A position-tracking view over source text.
///
/// Hands out characters with peek/advance semantics and keeps the byte offset,
/// line and column of the next character up to date.
pub struct Cursor<'src> {
    source: &'src str,
    /// Remaining text, starting at the current position.
    rest: &'src str,
    offset: u32,
    /// 1-indexed.
    line: u32,
    /// 1-indexed, counted in bytes.
    column: u32,
}

impl<'src> Cursor<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            rest: source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[inline]
    pub fn column(&self) -> u32 {
        self.column
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.rest.is_empty()
    }

    /// The next character, without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    /// The character `n` positions ahead (0 = next).
    #[inline]
    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest.chars().nth(n)
    }

    /// Whether the remaining text starts with `s`.
    #[inline]
    pub fn check_str(&self, s: &str) -> bool {
        self.rest.starts_with(s)
    }

    /// Consume one character, updating line and column.
    pub fn advance(&mut self) -> Option<char> {
        let ch = self.rest.chars().next()?;
        let len = ch.len_utf8();
        self.rest = &self.rest[len..];
        self.offset += len as u32;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += len as u32;
        }
        Some(ch)
    }

    /// Consume the next character if it is `ch`.
    #[inline]
    pub fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume characters while `f` holds, returning the consumed text.
    pub fn eat_while(&mut self, f: impl Fn(char) -> bool) -> &'src str {
        let start = self.offset as usize;
        while self.peek().is_some_and(&f) {
            self.advance();
        }
        &self.source[start..self.offset as usize]
    }

    /// Source text between `start` and the current position.
    #[inline]
    pub fn slice_from(&self, start: u32) -> &'src str {
        &self.source[start as usize..self.offset as usize]
    }
}

#[inline]
pub fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

#[inline]
pub fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_lines_and_columns() {
        let mut cursor = Cursor::new("ab\ncd");
        cursor.advance();
        cursor.advance();
        assert_eq!((cursor.line(), cursor.column()), (1, 3));
        cursor.advance();
        assert_eq!((cursor.line(), cursor.column()), (2, 1));
        assert_eq!(cursor.peek(), Some('c'));
    }

    #[test]
    fn eat_while_returns_slice() {
        let mut cursor = Cursor::new("name42 rest");
        assert_eq!(cursor.eat_while(is_ident_continue), "name42");
        assert!(cursor.eat(' '));
        assert_eq!(cursor.slice_from(7), "");
        assert!(cursor.check_str("rest"));
    }

    #[test]
    fn multibyte_characters_advance_by_their_width() {
        let mut cursor = Cursor::new("é!");
        assert_eq!(cursor.advance(), Some('é'));
        assert_eq!(cursor.offset(), 2);
        assert_eq!(cursor.peek(), Some('!'));
    }
}

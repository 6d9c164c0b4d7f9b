//! Source text to tokens.
//!
//! The [`Lexer`] dispatches on the first character of each token. Lexemes are
//! copied into the arena, so the source string may be dropped once lexing is
//! done. Scanning never stops at an error: the bad input becomes an
//! [`TokenKind::Error`] token and the error is recorded for the parser.

use bumpalo::Bump;

use dyncode_core::{LexError, Span};

use super::cursor::{Cursor, is_ident_continue, is_ident_start};
use super::token::{Token, TokenKind, lookup_keyword};

pub struct Lexer<'src, 'ast> {
    cursor: Cursor<'src>,
    arena: &'ast Bump,
    errors: Vec<LexError>,
}

impl<'src, 'ast> Lexer<'src, 'ast> {
    pub fn new(source: &'src str, arena: &'ast Bump) -> Self {
        Self {
            cursor: Cursor::new(source),
            arena,
            errors: Vec::new(),
        }
    }

    /// Scan the whole input. The returned tokens always end with `Eof`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn tokenize(mut self) -> (Vec<Token<'ast>>, Vec<LexError>) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, self.errors)
    }

    pub fn next_token(&mut self) -> Token<'ast> {
        if let Some(token) = self.skip_trivia() {
            return token;
        }
        if self.cursor.is_eof() {
            let span = Span::point(self.cursor.line(), self.cursor.column());
            return Token::new(TokenKind::Eof, "", span);
        }

        let start = self.start();
        match self.cursor.peek() {
            Some('"') => self.scan_string(start),
            Some('@') if self.cursor.peek_nth(1) == Some('"') => self.scan_verbatim_string(start),
            Some('@') if self.cursor.peek_nth(1).is_some_and(is_ident_start) => {
                self.cursor.advance();
                self.cursor.eat_while(is_ident_continue);
                self.make_token(TokenKind::Identifier, start)
            }
            Some('\'') => self.scan_char(start),
            Some(c) if c.is_ascii_digit() => self.scan_number(start),
            Some('.') if self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.scan_number(start)
            }
            Some(c) if is_ident_start(c) => self.scan_identifier(start),
            _ => self.scan_operator(start),
        }
    }

    // =========================================
    // Internal helpers
    // =========================================

    fn start(&self) -> Start {
        Start {
            line: self.cursor.line(),
            col: self.cursor.column(),
            offset: self.cursor.offset(),
        }
    }

    fn span_from(&self, start: Start) -> Span {
        let len = if self.cursor.line() == start.line {
            self.cursor.offset() - start.offset
        } else {
            1
        };
        Span::new(start.line, start.col, len)
    }

    fn make_token(&self, kind: TokenKind, start: Start) -> Token<'ast> {
        let lexeme = self.arena.alloc_str(self.cursor.slice_from(start.offset));
        Token::new(kind, lexeme, self.span_from(start))
    }

    fn make_error(&mut self, error: LexError) -> Token<'ast> {
        let span = error.span();
        self.errors.push(error);
        Token::new(TokenKind::Error, "", span)
    }

    /// Skip whitespace and comments. Returns an error token for an
    /// unterminated block comment.
    fn skip_trivia(&mut self) -> Option<Token<'ast>> {
        loop {
            self.cursor.eat_while(char::is_whitespace);
            if self.cursor.check_str("//") {
                self.cursor.eat_while(|c| c != '\n');
            } else if self.cursor.check_str("/*") {
                let start = self.start();
                self.cursor.advance();
                self.cursor.advance();
                loop {
                    if self.cursor.is_eof() {
                        let span = self.span_from(start);
                        return Some(self.make_error(LexError::UnterminatedComment { span }));
                    }
                    if self.cursor.check_str("*/") {
                        self.cursor.advance();
                        self.cursor.advance();
                        break;
                    }
                    self.cursor.advance();
                }
            } else {
                return None;
            }
        }
    }

    // =========================================
    // Scanning: literals
    // =========================================

    fn scan_string(&mut self, start: Start) -> Token<'ast> {
        self.cursor.advance();
        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    let span = self.span_from(start);
                    return self.make_error(LexError::UnterminatedString { span });
                }
                Some('\\') => {
                    let escape_start = self.start();
                    self.cursor.advance();
                    if let Some(ch) = self.cursor.advance()
                        && !is_simple_escape(ch)
                        && ch != 'u'
                    {
                        let span = self.span_from(escape_start);
                        self.errors.push(LexError::InvalidEscape { ch, span });
                    }
                }
                Some('"') => {
                    self.cursor.advance();
                    return self.make_token(TokenKind::StringLiteral, start);
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    /// `@"..."`: no escapes except `""` for a literal quote; may span lines.
    fn scan_verbatim_string(&mut self, start: Start) -> Token<'ast> {
        self.cursor.advance();
        self.cursor.advance();
        loop {
            match self.cursor.advance() {
                None => {
                    let span = self.span_from(start);
                    return self.make_error(LexError::UnterminatedString { span });
                }
                Some('"') if self.cursor.eat('"') => {}
                Some('"') => return self.make_token(TokenKind::StringLiteral, start),
                Some(_) => {}
            }
        }
    }

    fn scan_char(&mut self, start: Start) -> Token<'ast> {
        self.cursor.advance();
        match self.cursor.advance() {
            Some('\\') => {
                self.cursor.advance();
            }
            Some('\'') | Some('\n') | None => {
                let span = self.span_from(start);
                return self.make_error(LexError::UnterminatedChar { span });
            }
            Some(_) => {}
        }
        if self.cursor.eat('\'') {
            self.make_token(TokenKind::CharLiteral, start)
        } else {
            let span = self.span_from(start);
            self.make_error(LexError::UnterminatedChar { span })
        }
    }

    fn scan_number(&mut self, start: Start) -> Token<'ast> {
        if self.cursor.check_str("0x") || self.cursor.check_str("0X") {
            self.cursor.advance();
            self.cursor.advance();
            let digits = self.cursor.eat_while(|c| c.is_ascii_hexdigit() || c == '_');
            if digits.is_empty() {
                let span = self.span_from(start);
                return self.make_error(LexError::InvalidNumber {
                    span,
                    detail: "expected hex digits after '0x'".to_string(),
                });
            }
            self.eat_integer_suffix();
            return self.make_token(TokenKind::IntLiteral, start);
        }

        let mut is_real = false;
        self.eat_digits();
        if self.cursor.peek() == Some('.') && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.cursor.advance();
            self.eat_digits();
            is_real = true;
        }
        if matches!(self.cursor.peek(), Some('e' | 'E')) {
            self.cursor.advance();
            if matches!(self.cursor.peek(), Some('+' | '-')) {
                self.cursor.advance();
            }
            if self.eat_digits().is_empty() {
                let span = self.span_from(start);
                return self.make_error(LexError::InvalidNumber {
                    span,
                    detail: "expected exponent digits".to_string(),
                });
            }
            is_real = true;
        }

        match self.cursor.peek() {
            Some('f' | 'F') => {
                self.cursor.advance();
                self.make_token(TokenKind::FloatLiteral, start)
            }
            Some('d' | 'D' | 'm' | 'M') => {
                self.cursor.advance();
                self.make_token(TokenKind::DoubleLiteral, start)
            }
            _ if is_real => self.make_token(TokenKind::DoubleLiteral, start),
            _ => {
                self.eat_integer_suffix();
                self.make_token(TokenKind::IntLiteral, start)
            }
        }
    }

    fn eat_digits(&mut self) -> &'src str {
        self.cursor.eat_while(|c| c.is_ascii_digit() || c == '_')
    }

    /// `L`, `U`, `UL` and `LU` in any case.
    fn eat_integer_suffix(&mut self) {
        self.cursor.eat_while(|c| matches!(c, 'l' | 'L' | 'u' | 'U'));
    }

    // =========================================
    // Scanning: identifiers and operators
    // =========================================

    fn scan_identifier(&mut self, start: Start) -> Token<'ast> {
        let text = self.cursor.eat_while(is_ident_continue);
        let kind = lookup_keyword(text).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, start)
    }

    fn scan_operator(&mut self, start: Start) -> Token<'ast> {
        let Some(c) = self.cursor.advance() else {
            return self.make_token(TokenKind::Eof, start);
        };
        let next = self.cursor.peek();

        let kind = match (c, next) {
            ('(', _) => TokenKind::LeftParen,
            (')', _) => TokenKind::RightParen,
            ('{', _) => TokenKind::LeftBrace,
            ('}', _) => TokenKind::RightBrace,
            ('[', _) => TokenKind::LeftBracket,
            (']', _) => TokenKind::RightBracket,
            (';', _) => TokenKind::Semicolon,
            (',', _) => TokenKind::Comma,
            ('.', _) => TokenKind::Dot,

            (':', Some(':')) => self.bump(TokenKind::ColonColon),
            (':', _) => TokenKind::Colon,
            ('?', Some('?')) => self.bump(TokenKind::QuestionQuestion),
            ('?', _) => TokenKind::Question,

            ('+', Some('+')) => self.bump(TokenKind::PlusPlus),
            ('+', Some('=')) => self.bump(TokenKind::PlusEqual),
            ('+', _) => TokenKind::Plus,
            ('-', Some('-')) => self.bump(TokenKind::MinusMinus),
            ('-', Some('=')) => self.bump(TokenKind::MinusEqual),
            ('-', _) => TokenKind::Minus,
            ('*', Some('=')) => self.bump(TokenKind::StarEqual),
            ('*', _) => TokenKind::Star,
            ('/', Some('=')) => self.bump(TokenKind::SlashEqual),
            ('/', _) => TokenKind::Slash,
            ('%', Some('=')) => self.bump(TokenKind::PercentEqual),
            ('%', _) => TokenKind::Percent,

            ('=', Some('=')) => self.bump(TokenKind::EqualEqual),
            ('=', Some('>')) => self.bump(TokenKind::Arrow),
            ('=', _) => TokenKind::Equal,
            ('!', Some('=')) => self.bump(TokenKind::BangEqual),
            ('!', _) => TokenKind::Bang,
            ('<', Some('=')) => self.bump(TokenKind::LessEqual),
            ('<', _) => TokenKind::Less,
            // `>>` is never one token so nested type arguments close cleanly.
            ('>', Some('=')) => self.bump(TokenKind::GreaterEqual),
            ('>', _) => TokenKind::Greater,

            ('&', Some('&')) => self.bump(TokenKind::AmpAmp),
            ('|', Some('|')) => self.bump(TokenKind::PipePipe),

            (ch, _) => {
                let span = self.span_from(start);
                return self.make_error(LexError::UnexpectedChar { ch, span });
            }
        };
        self.make_token(kind, start)
    }

    /// Consume the second character of a two-character operator.
    fn bump(&mut self, kind: TokenKind) -> TokenKind {
        self.cursor.advance();
        kind
    }
}

#[derive(Clone, Copy)]
struct Start {
    line: u32,
    col: u32,
    offset: u32,
}

fn is_simple_escape(ch: char) -> bool {
    matches!(ch, 'n' | 't' | 'r' | '0' | '\\' | '"' | '\'' | 'a' | 'b' | 'f' | 'v')
}

/// Decode the body of a string or character literal token, quotes included.
///
/// Returns `None` if the escape sequences are malformed; the lexer has
/// already reported those.
pub fn decode_literal(lexeme: &str) -> Option<String> {
    if let Some(body) = lexeme.strip_prefix("@\"").and_then(|s| s.strip_suffix('"')) {
        return Some(body.replace("\"\"", "\""));
    }
    let body = lexeme
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| lexeme.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))?;

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let decoded = match chars.next()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '\\' => '\\',
            '"' => '"',
            '\'' => '\'',
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return None;
                }
                char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?
            }
            _ => return None,
        };
        out.push(decoded);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let arena = Bump::new();
        let (tokens, errors) = Lexer::new(source, &arena).tokenize();
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn method_header() {
        use TokenKind::*;
        assert_eq!(
            kinds("public static int Add(int a, int b)"),
            vec![
                Public, Static, Identifier, Identifier, LeftParen, Identifier, Identifier, Comma,
                Identifier, Identifier, RightParen, Eof
            ]
        );
    }

    #[test]
    fn nested_generic_closers_are_separate() {
        use TokenKind::*;
        assert_eq!(
            kinds("List<List<int>>"),
            vec![Identifier, Less, Identifier, Less, Identifier, Greater, Greater, Eof]
        );
    }

    #[test]
    fn numeric_literals() {
        use TokenKind::*;
        assert_eq!(
            kinds("1 2L 0xFF 1.5 2e3 3f 4.0d"),
            vec![
                IntLiteral, IntLiteral, IntLiteral, DoubleLiteral, DoubleLiteral, FloatLiteral,
                DoubleLiteral, Eof
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        use TokenKind::*;
        assert_eq!(
            kinds("a // line\n /* block\n comment */ b"),
            vec![Identifier, Identifier, Eof]
        );
    }

    #[test]
    fn operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("=> == != <= >= && || ?? ++ -- += ::"),
            vec![
                Arrow, EqualEqual, BangEqual, LessEqual, GreaterEqual, AmpAmp, PipePipe,
                QuestionQuestion, PlusPlus, MinusMinus, PlusEqual, ColonColon, Eof
            ]
        );
    }

    #[test]
    fn verbatim_identifier_keeps_at_sign() {
        let arena = Bump::new();
        let (tokens, _) = Lexer::new("@int", &arena).tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "@int");
    }

    #[test]
    fn spans_are_one_indexed() {
        let arena = Bump::new();
        let (tokens, _) = Lexer::new("class\n  Foo", &arena).tokenize();
        assert_eq!(tokens[0].span, Span::new(1, 1, 5));
        assert_eq!(tokens[1].span, Span::new(2, 3, 3));
    }

    #[test]
    fn unterminated_string_is_reported() {
        let arena = Bump::new();
        let (tokens, errors) = Lexer::new("\"abc", &arena).tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert!(matches!(errors[0], LexError::UnterminatedString { .. }));
    }

    #[test]
    fn unexpected_character_is_reported() {
        let arena = Bump::new();
        let (_, errors) = Lexer::new("a # b", &arena).tokenize();
        assert!(matches!(errors[0], LexError::UnexpectedChar { ch: '#', .. }));
    }

    #[test]
    fn decode_escapes() {
        assert_eq!(decode_literal(r#""a\tb\n""#).as_deref(), Some("a\tb\n"));
        assert_eq!(decode_literal(r#"@"c:\dir""x""#).as_deref(), Some("c:\\dir\"x"));
        assert_eq!(decode_literal(r"'\u0041'").as_deref(), Some("A"));
        assert_eq!(decode_literal("'x'").as_deref(), Some("x"));
    }
}

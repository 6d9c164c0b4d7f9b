//! Parser state, token navigation and the public entry points.
//!
//! The whole source is tokenized up front so lookahead and speculative parses
//! can rewind by index. Errors are collected rather than returned early:
//! [`Parser::parse`] fails if any were found, [`Parser::parse_lenient`] hands
//! back whatever tree it recovered together with the errors.

use bumpalo::Bump;
use dyncode_core::Span;

use crate::ast::expr::Expr;
use crate::ast::stmt::Stmt;
use crate::ast::types::TypeExpr;
use crate::ast::{CompilationUnit, ParseError, ParseErrorKind, ParseErrors};
use crate::lexer::{Lexer, Token, TokenKind};

pub struct Parser<'ast> {
    pub(super) buffer: Vec<Token<'ast>>,
    pub(super) position: usize,
    pub(super) arena: &'ast Bump,
    pub(super) errors: Vec<ParseError>,
}

impl<'ast> Parser<'ast> {
    /// Tokenize `source`. Lexical errors are recorded and the offending
    /// input is dropped from the token stream.
    pub fn new(source: &str, arena: &'ast Bump) -> Self {
        let (tokens, lex_errors) = Lexer::new(source, arena).tokenize();
        let buffer = tokens
            .into_iter()
            .filter(|token| token.kind != TokenKind::Error)
            .collect();
        Self {
            buffer,
            position: 0,
            arena,
            errors: lex_errors.into_iter().map(ParseError::from).collect(),
        }
    }

    // =========================================
    // Entry points
    // =========================================

    /// Parse a complete source text, failing on any error.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn parse(source: &str, arena: &'ast Bump) -> Result<CompilationUnit<'ast>, ParseErrors> {
        let (unit, errors) = Self::parse_lenient(source, arena);
        if errors.is_empty() {
            Ok(unit)
        } else {
            Err(errors)
        }
    }

    /// Parse a complete source text, recovering from errors where possible.
    ///
    /// Recovery works at the statement, member and declaration level, so a
    /// broken method body still yields the method's declaration.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn parse_lenient(source: &str, arena: &'ast Bump) -> (CompilationUnit<'ast>, ParseErrors) {
        let mut parser = Parser::new(source, arena);
        let unit = parser.parse_compilation_unit();
        (unit, ParseErrors::from(parser.errors))
    }

    /// Parse a single expression that must span the whole input.
    pub fn expression(source: &str, arena: &'ast Bump) -> Result<&'ast Expr<'ast>, ParseErrors> {
        let mut parser = Parser::new(source, arena);
        let result = parser.parse_expr(0);
        parser.finish(result)
    }

    /// Parse a single statement that must span the whole input.
    pub fn statement(source: &str, arena: &'ast Bump) -> Result<Stmt<'ast>, ParseErrors> {
        let mut parser = Parser::new(source, arena);
        let result = parser.parse_statement();
        parser.finish(result)
    }

    /// Parse a type expression that must span the whole input.
    pub fn type_expr(source: &str, arena: &'ast Bump) -> Result<TypeExpr<'ast>, ParseErrors> {
        let mut parser = Parser::new(source, arena);
        let result = parser.parse_type();
        parser.finish(result)
    }

    fn finish<T>(mut self, result: Result<T, ParseError>) -> Result<T, ParseErrors> {
        match result {
            Ok(value) => {
                if !self.is_eof() {
                    let token = *self.peek();
                    self.errors.push(ParseError::expected_token(
                        token.span,
                        "end of input",
                        &token.describe(),
                    ));
                }
                if self.errors.is_empty() {
                    Ok(value)
                } else {
                    Err(ParseErrors::from(self.errors))
                }
            }
            Err(error) => {
                self.errors.push(error);
                Err(ParseErrors::from(self.errors))
            }
        }
    }

    // =========================================
    // Token navigation
    // =========================================

    #[inline]
    pub(super) fn peek(&self) -> &Token<'ast> {
        self.peek_nth(0)
    }

    /// The token `n` positions ahead; `Eof` once past the end.
    pub(super) fn peek_nth(&self, n: usize) -> &Token<'ast> {
        let last = self.buffer.len() - 1;
        &self.buffer[(self.position + n).min(last)]
    }

    /// The most recently consumed token's span.
    pub(super) fn previous_span(&self) -> Span {
        self.position
            .checked_sub(1)
            .and_then(|index| self.buffer.get(index))
            .map(|token| token.span)
            .unwrap_or_default()
    }

    pub(super) fn advance(&mut self) -> Token<'ast> {
        let token = *self.peek();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    #[inline]
    pub(super) fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    #[inline]
    pub(super) fn is_eof(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    pub(super) fn eat(&mut self, kind: TokenKind) -> Option<Token<'ast>> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    pub(super) fn expect(&mut self, kind: TokenKind) -> Result<Token<'ast>, ParseError> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let token = *self.peek();
        if token.kind == TokenKind::Eof {
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedEof,
                token.span,
                format!("expected {}, found end of file", describe_kind(kind)),
            ));
        }
        Err(ParseError::expected_token(
            token.span,
            describe_kind(kind),
            &token.describe(),
        ))
    }

    /// Whether the next token is the identifier `word`.
    pub(super) fn check_contextual(&self, word: &str) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Identifier && token.lexeme == word
    }

    // =========================================
    // Error recovery
    // =========================================

    pub(super) fn record(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    /// Skip the rest of a broken statement: up to and including the next `;`
    /// at the same nesting level, or up to (not including) the `}` closing
    /// the enclosing block.
    pub(super) fn synchronize_statement(&mut self, start: usize) {
        let mut depth = 0usize;
        while !self.is_eof() {
            match self.peek().kind {
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    break;
                }
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace if depth == 0 => break,
                TokenKind::RightBrace => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        self.ensure_progress(start);
    }

    /// Skip the rest of a broken type member: up to and including a `;` or a
    /// balanced `{ ... }` block, or up to the `}` closing the type body.
    pub(super) fn synchronize_member(&mut self, start: usize) {
        let mut depth = 0usize;
        while !self.is_eof() {
            match self.peek().kind {
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    break;
                }
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace if depth == 0 => break,
                TokenKind::RightBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                }
                _ => {}
            }
            self.advance();
        }
        self.ensure_progress(start);
    }

    /// Skip to the next token that can start a declaration at the current
    /// nesting level.
    pub(super) fn synchronize_declaration(&mut self, start: usize) {
        let mut depth = 0usize;
        while !self.is_eof() {
            let kind = self.peek().kind;
            if depth == 0
                && self.position > start
                && (kind.is_type_declaration()
                    || kind.is_modifier()
                    || matches!(kind, TokenKind::Namespace | TokenKind::Using))
            {
                break;
            }
            match kind {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace if depth == 0 => break,
                TokenKind::RightBrace => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        self.ensure_progress(start);
    }

    /// Recovery must always consume something, or the caller would loop.
    fn ensure_progress(&mut self, start: usize) {
        if self.position == start {
            self.advance();
        }
    }
}

/// How a token kind is named in "expected ..." messages.
pub(super) fn describe_kind(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Identifier => "identifier",
        TokenKind::LeftParen => "'('",
        TokenKind::RightParen => "')'",
        TokenKind::LeftBrace => "'{'",
        TokenKind::RightBrace => "'}'",
        TokenKind::LeftBracket => "'['",
        TokenKind::RightBracket => "']'",
        TokenKind::Semicolon => "';'",
        TokenKind::Comma => "','",
        TokenKind::Dot => "'.'",
        TokenKind::Colon => "':'",
        TokenKind::Greater => "'>'",
        TokenKind::Less => "'<'",
        TokenKind::Equal => "'='",
        TokenKind::While => "'while'",
        TokenKind::Eof => "end of file",
        _ => "token",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_past_end_returns_eof() {
        let arena = Bump::new();
        let mut parser = Parser::new("x", &arena);
        assert_eq!(parser.advance().kind, TokenKind::Identifier);
        assert_eq!(parser.peek_nth(5).kind, TokenKind::Eof);
        assert_eq!(parser.advance().kind, TokenKind::Eof);
        assert!(parser.is_eof());
    }

    #[test]
    fn expect_reports_found_token() {
        let arena = Bump::new();
        let mut parser = Parser::new("}", &arena);
        let err = parser.expect(TokenKind::Semicolon).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpectedToken);
        assert!(err.message.contains("';'"));
    }

    #[test]
    fn expect_at_eof_is_unexpected_eof() {
        let arena = Bump::new();
        let mut parser = Parser::new("", &arena);
        let err = parser.expect(TokenKind::RightBrace).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
    }

    #[test]
    fn statement_sync_stops_before_closing_brace() {
        let arena = Bump::new();
        let mut parser = Parser::new("a b c } d", &arena);
        parser.synchronize_statement(0);
        assert!(parser.check(TokenKind::RightBrace));
    }

    #[test]
    fn member_sync_consumes_balanced_block() {
        let arena = Bump::new();
        let mut parser = Parser::new("( { x; { } } int", &arena);
        parser.synchronize_member(0);
        assert!(parser.check_contextual("int"));
    }

    #[test]
    fn lexical_errors_are_recorded_and_dropped() {
        let arena = Bump::new();
        let parser = Parser::new("a # b", &arena);
        assert_eq!(parser.errors.len(), 1);
        assert_eq!(parser.buffer.len(), 3);
    }
}

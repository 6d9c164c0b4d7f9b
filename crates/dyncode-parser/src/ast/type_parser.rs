//! Type expression parsing.
//!
//! Grammar:
//! ```text
//! TYPE      := ('global' '::')? IDENT ('.' IDENT)* TYPEARGS? SUFFIX*
//! TYPEARGS  := '<' TYPE (',' TYPE)* '>'
//! SUFFIX    := '?' | '[' ','* ']'
//! ```

use super::parser::Parser;
use crate::ast::types::{TypeExpr, TypeKind};
use crate::ast::{Ident, ParseError};
use crate::lexer::TokenKind;
use bumpalo::collections::Vec as BVec;

impl<'ast> Parser<'ast> {
    /// Parse a type with its array and nullable suffixes.
    ///
    /// Examples: `int`, `System.String`, `List<int>[]`, `int?`, `double[,]`.
    pub fn parse_type(&mut self) -> Result<TypeExpr<'ast>, ParseError> {
        let mut ty = self.parse_type_base()?;
        loop {
            if self.check(TokenKind::Question) {
                self.advance();
                let span = ty.span.to(self.previous_span());
                ty = TypeExpr::new(TypeKind::Nullable(self.arena.alloc(ty)), span);
            } else if self.check(TokenKind::LeftBracket)
                && matches!(
                    self.peek_nth(1).kind,
                    TokenKind::RightBracket | TokenKind::Comma
                )
            {
                self.advance();
                let mut rank = 1;
                while self.eat(TokenKind::Comma).is_some() {
                    rank += 1;
                }
                self.expect(TokenKind::RightBracket)?;
                let span = ty.span.to(self.previous_span());
                ty = TypeExpr::new(
                    TypeKind::Array {
                        element: self.arena.alloc(ty),
                        rank,
                    },
                    span,
                );
            } else {
                return Ok(ty);
            }
        }
    }

    /// Parse a method return type: `void` or any type.
    pub fn parse_return_type(&mut self) -> Result<TypeExpr<'ast>, ParseError> {
        if let Some(token) = self.eat(TokenKind::Void) {
            return Ok(TypeExpr::new(TypeKind::Void, token.span));
        }
        self.parse_type()
    }

    /// Parse a named type and its type arguments, without suffixes.
    pub(super) fn parse_type_base(&mut self) -> Result<TypeExpr<'ast>, ParseError> {
        let start = self.peek().span;

        let global = if self.check_contextual("global")
            && self.peek_nth(1).kind == TokenKind::ColonColon
        {
            self.advance();
            self.advance();
            true
        } else {
            false
        };

        if !self.check(TokenKind::Identifier) {
            let token = *self.peek();
            return Err(ParseError::expected_type(token.span, &token.describe()));
        }

        let mut path = BVec::new_in(self.arena);
        let first = self.advance();
        path.push(Ident::new(first.lexeme, first.span));
        while self.check(TokenKind::Dot) && self.peek_nth(1).kind == TokenKind::Identifier {
            self.advance();
            let segment = self.advance();
            path.push(Ident::new(segment.lexeme, segment.span));
        }

        let args: &'ast [TypeExpr<'ast>] = if self.check(TokenKind::Less) {
            self.parse_type_args()?
        } else {
            &[]
        };

        Ok(TypeExpr::new(
            TypeKind::Named {
                global,
                path: path.into_bump_slice(),
                args,
            },
            start.to(self.previous_span()),
        ))
    }

    fn parse_type_args(&mut self) -> Result<&'ast [TypeExpr<'ast>], ParseError> {
        self.expect(TokenKind::Less)?;
        let mut args = BVec::new_in(self.arena);
        loop {
            args.push(self.parse_type()?);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::Greater)?;
        Ok(args.into_bump_slice())
    }

    /// Speculatively parse a type, rewinding if it fails. Errors are discarded.
    pub(super) fn try_parse_type(&mut self) -> Option<TypeExpr<'ast>> {
        let saved = self.position;
        match self.parse_type() {
            Ok(ty) => Some(ty),
            Err(_) => {
                self.position = saved;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Parser;
    use crate::ast::types::TypeKind;
    use bumpalo::Bump;

    fn render(source: &str) -> String {
        let arena = Bump::new();
        Parser::type_expr(source, &arena).unwrap().to_string()
    }

    #[test]
    fn simple_and_qualified() {
        assert_eq!(render("int"), "int");
        assert_eq!(render("System.Int32"), "System.Int32");
        assert_eq!(render("global::System.String"), "global::System.String");
    }

    #[test]
    fn suffixes() {
        assert_eq!(render("int?"), "int?");
        assert_eq!(render("int[]"), "int[]");
        assert_eq!(render("int[,]"), "int[,]");
        assert_eq!(render("int?[]"), "int?[]");
    }

    #[test]
    fn generic_arguments() {
        assert_eq!(render("List<int>"), "List<int>");
        assert_eq!(render("Dictionary<string,List<int>>"), "Dictionary<string, List<int>>");
    }

    #[test]
    fn array_rank_is_recorded() {
        let arena = Bump::new();
        let ty = Parser::type_expr("double[,,]", &arena).unwrap();
        assert!(matches!(ty.kind, TypeKind::Array { rank: 3, .. }));
    }

    #[test]
    fn unclosed_type_arguments_fail() {
        let arena = Bump::new();
        assert!(Parser::type_expr("List<int", &arena).is_err());
        assert!(Parser::type_expr("", &arena).is_err());
    }
}

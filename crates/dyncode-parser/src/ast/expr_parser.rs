//! Expression parsing using Pratt parsing (precedence climbing).

use super::parser::Parser;
use crate::ast::expr::*;
use crate::ast::types::{TypeExpr, TypeKind};
use crate::ast::{AssignOp, BinaryOp, Ident, ParseError, ParseErrorKind, PostfixOp, UnaryOp};
use crate::lexer::{TokenKind, decode_literal};
use bumpalo::collections::Vec as BVec;
use dyncode_core::type_name;

/// Binding power of the conditional operator.
const TERNARY_BP: u8 = 3;

impl<'ast> Parser<'ast> {
    /// Parse an expression whose operators all bind at least as tightly as
    /// `min_bp`. Call with 0 for a full expression.
    pub fn parse_expr(&mut self, min_bp: u8) -> Result<&'ast Expr<'ast>, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let kind = self.peek().kind;

            if let Some(op) = PostfixOp::from_token(kind) {
                if PostfixOp::binding_power() < min_bp {
                    break;
                }
                let token = self.advance();
                let span = lhs.span().to(token.span);
                lhs = self.alloc(Expr::Postfix(self.arena.alloc(PostfixExpr {
                    operand: lhs,
                    op,
                    span,
                })));
                continue;
            }

            match kind {
                TokenKind::Dot | TokenKind::LeftParen | TokenKind::LeftBracket => {
                    if PostfixOp::binding_power() < min_bp {
                        break;
                    }
                    lhs = match kind {
                        TokenKind::Dot => self.parse_member_access(lhs)?,
                        TokenKind::LeftParen => self.parse_call(lhs)?,
                        _ => self.parse_index(lhs)?,
                    };
                    continue;
                }
                TokenKind::Question => {
                    if TERNARY_BP < min_bp {
                        break;
                    }
                    lhs = self.parse_ternary(lhs)?;
                    continue;
                }
                _ => {}
            }

            if let Some(op) = AssignOp::from_token(kind) {
                let (l_bp, r_bp) = AssignOp::binding_power();
                if l_bp < min_bp {
                    break;
                }
                self.advance();
                let value = self.parse_expr(r_bp)?;
                let span = lhs.span().to(value.span());
                lhs = self.alloc(Expr::Assign(self.arena.alloc(AssignExpr {
                    target: lhs,
                    op,
                    value,
                    span,
                })));
                continue;
            }

            if let Some(op) = BinaryOp::from_token(kind) {
                let (l_bp, r_bp) = op.binding_power();
                if l_bp < min_bp {
                    break;
                }
                self.advance();
                let right = self.parse_expr(r_bp)?;
                let span = lhs.span().to(right.span());
                lhs = self.alloc(Expr::Binary(self.arena.alloc(BinaryExpr {
                    left: lhs,
                    op,
                    right,
                    span,
                })));
                continue;
            }

            break;
        }

        Ok(lhs)
    }

    /// Parse the start of an expression: literals, names, prefix operators,
    /// parentheses, casts and array creation.
    fn parse_prefix(&mut self) -> Result<&'ast Expr<'ast>, ParseError> {
        let token = *self.peek();

        if let Some(op) = UnaryOp::from_token(token.kind) {
            self.advance();
            let operand = self.parse_expr(UnaryOp::binding_power())?;
            let span = token.span.to(operand.span());
            return Ok(self.alloc(Expr::Unary(self.arena.alloc(UnaryExpr { op, operand, span }))));
        }

        match token.kind {
            TokenKind::IntLiteral
            | TokenKind::DoubleLiteral
            | TokenKind::FloatLiteral
            | TokenKind::StringLiteral
            | TokenKind::CharLiteral
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null => {
                self.advance();
                let kind = self.parse_literal(token.kind, token.lexeme, token.span)?;
                Ok(self.alloc(Expr::Literal(LiteralExpr {
                    kind,
                    span: token.span,
                })))
            }
            TokenKind::Identifier => {
                // `global::Name` in expressions resolves like `Name`.
                if token.lexeme == "global" && self.peek_nth(1).kind == TokenKind::ColonColon {
                    self.advance();
                    self.advance();
                    let ident = self.expect_identifier()?;
                    return Ok(self.alloc(Expr::Ident(ident)));
                }
                self.advance();
                Ok(self.alloc(Expr::Ident(Ident::new(token.lexeme, token.span))))
            }
            TokenKind::This => {
                self.advance();
                Ok(self.alloc(Expr::This(token.span)))
            }
            TokenKind::LeftParen => {
                if let Some(cast) = self.try_parse_cast()? {
                    return Ok(cast);
                }
                self.advance();
                let expr = self.parse_expr(0)?;
                let end = self.expect(TokenKind::RightParen)?;
                Ok(self.alloc(Expr::Paren(self.arena.alloc(ParenExpr {
                    expr,
                    span: token.span.to(end.span),
                }))))
            }
            TokenKind::New => self.parse_new_array(),
            TokenKind::Eof => Err(ParseError::new(
                ParseErrorKind::UnexpectedEof,
                token.span,
                "expected expression, found end of file",
            )),
            _ => Err(ParseError::expected_expression(
                token.span,
                &token.describe(),
            )),
        }
    }

    fn parse_literal(
        &mut self,
        kind: TokenKind,
        lexeme: &'ast str,
        span: dyncode_core::Span,
    ) -> Result<LiteralKind<'ast>, ParseError> {
        let invalid = |detail: &str| {
            ParseError::new(
                ParseErrorKind::InvalidLiteral,
                span,
                format!("{detail}: {lexeme}"),
            )
        };

        Ok(match kind {
            TokenKind::True => LiteralKind::Bool(true),
            TokenKind::False => LiteralKind::Bool(false),
            TokenKind::Null => LiteralKind::Null,
            TokenKind::IntLiteral => {
                let is_long = lexeme.contains(['l', 'L']);
                let is_unsigned = lexeme.contains(['u', 'U']);
                let digits: String = lexeme
                    .trim_end_matches(['l', 'L', 'u', 'U'])
                    .chars()
                    .filter(|c| *c != '_')
                    .collect();
                let value = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => digits.parse::<u64>(),
                }
                .map_err(|_| invalid("integer literal is too large"))?;

                if is_unsigned {
                    return Err(invalid("unsigned integer literals are not supported"));
                }
                match i32::try_from(value) {
                    Ok(small) if !is_long => LiteralKind::Int(small),
                    _ => LiteralKind::Long(
                        i64::try_from(value).map_err(|_| invalid("integer literal is too large"))?,
                    ),
                }
            }
            TokenKind::FloatLiteral => {
                let digits: String = lexeme
                    .trim_end_matches(['f', 'F'])
                    .chars()
                    .filter(|c| *c != '_')
                    .collect();
                LiteralKind::Float(digits.parse().map_err(|_| invalid("invalid float literal"))?)
            }
            TokenKind::DoubleLiteral => {
                if lexeme.ends_with(['m', 'M']) {
                    return Err(invalid("decimal literals are not supported"));
                }
                let digits: String = lexeme
                    .trim_end_matches(['d', 'D'])
                    .chars()
                    .filter(|c| *c != '_')
                    .collect();
                LiteralKind::Double(digits.parse().map_err(|_| invalid("invalid double literal"))?)
            }
            TokenKind::StringLiteral => {
                let text = decode_literal(lexeme).ok_or_else(|| invalid("invalid string literal"))?;
                LiteralKind::String(self.arena.alloc_str(&text))
            }
            TokenKind::CharLiteral => {
                let text = decode_literal(lexeme).ok_or_else(|| invalid("invalid character literal"))?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => LiteralKind::Char(ch),
                    _ => return Err(invalid("character literal must hold one character")),
                }
            }
            _ => return Err(invalid("invalid literal")),
        })
    }

    /// `(T)expr`, recognized when the parenthesized text is a type and the
    /// token after `)` can only start an operand. For keyword types such as
    /// `(int)-x` a leading sign is accepted too.
    fn try_parse_cast(&mut self) -> Result<Option<&'ast Expr<'ast>>, ParseError> {
        let saved = self.position;
        let open = self.advance();

        let Some(target) = self.try_parse_type() else {
            self.position = saved;
            return Ok(None);
        };
        if !self.check(TokenKind::RightParen) {
            self.position = saved;
            return Ok(None);
        }

        let follow = self.peek_nth(1).kind;
        let operand_start = matches!(
            follow,
            TokenKind::Identifier
                | TokenKind::IntLiteral
                | TokenKind::DoubleLiteral
                | TokenKind::FloatLiteral
                | TokenKind::StringLiteral
                | TokenKind::CharLiteral
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::This
                | TokenKind::New
                | TokenKind::LeftParen
                | TokenKind::Bang
        );
        let signed_operand = matches!(
            follow,
            TokenKind::Minus | TokenKind::Plus | TokenKind::PlusPlus | TokenKind::MinusMinus
        ) && is_keyword_type(&target);

        if !(operand_start || signed_operand) {
            self.position = saved;
            return Ok(None);
        }

        self.advance();
        let expr = self.parse_expr(UnaryOp::binding_power())?;
        let span = open.span.to(expr.span());
        Ok(Some(self.alloc(Expr::Cast(self.arena.alloc(CastExpr {
            target,
            expr,
            span,
        })))))
    }

    /// `new T[n]`, `new T[] { ... }`, `new T[n] { ... }`.
    fn parse_new_array(&mut self) -> Result<&'ast Expr<'ast>, ParseError> {
        let start = self.expect(TokenKind::New)?.span;
        let mut element = self.parse_type_base()?;
        while self.check(TokenKind::Question) {
            self.advance();
            let span = element.span.to(self.previous_span());
            element = TypeExpr::new(TypeKind::Nullable(self.arena.alloc(element)), span);
        }

        if !self.check(TokenKind::LeftBracket) {
            let token = *self.peek();
            return Err(ParseError::new(
                ParseErrorKind::ExpectedToken,
                token.span,
                format!(
                    "expected '[' after 'new {element}', found {}; only array creation is supported",
                    token.describe()
                ),
            ));
        }
        self.advance();
        let size = if self.check(TokenKind::RightBracket) {
            None
        } else {
            Some(self.parse_expr(0)?)
        };
        self.expect(TokenKind::RightBracket)?;

        let initializer = if self.check(TokenKind::LeftBrace) {
            Some(self.parse_initializer()?)
        } else {
            None
        };

        if size.is_none() && initializer.is_none() {
            let token = *self.peek();
            return Err(ParseError::new(
                ParseErrorKind::ExpectedToken,
                token.span,
                "array creation must have an array size or an array initializer",
            ));
        }

        Ok(self.alloc(Expr::NewArray(self.arena.alloc(NewArrayExpr {
            element,
            size,
            initializer,
            span: start.to(self.previous_span()),
        }))))
    }

    /// `{ a, b, c }` with an optional trailing comma.
    fn parse_initializer(&mut self) -> Result<&'ast [&'ast Expr<'ast>], ParseError> {
        self.expect(TokenKind::LeftBrace)?;
        let mut items = BVec::new_in(self.arena);
        while !self.check(TokenKind::RightBrace) {
            items.push(self.parse_expr(0)?);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RightBrace)?;
        Ok(items.into_bump_slice())
    }

    fn parse_member_access(&mut self, object: &'ast Expr<'ast>) -> Result<&'ast Expr<'ast>, ParseError> {
        self.expect(TokenKind::Dot)?;
        let member = self.expect_identifier()?;
        let span = object.span().to(member.span);
        Ok(self.alloc(Expr::Member(self.arena.alloc(MemberExpr {
            object,
            member,
            span,
        }))))
    }

    fn parse_call(&mut self, callee: &'ast Expr<'ast>) -> Result<&'ast Expr<'ast>, ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let mut args = BVec::new_in(self.arena);
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.parse_expr(0)?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RightParen)?;
        Ok(self.alloc(Expr::Call(self.arena.alloc(CallExpr {
            callee,
            args: args.into_bump_slice(),
            span: callee.span().to(end.span),
        }))))
    }

    fn parse_index(&mut self, object: &'ast Expr<'ast>) -> Result<&'ast Expr<'ast>, ParseError> {
        self.expect(TokenKind::LeftBracket)?;
        let index = self.parse_expr(0)?;
        let end = self.expect(TokenKind::RightBracket)?;
        Ok(self.alloc(Expr::Index(self.arena.alloc(IndexExpr {
            object,
            index,
            span: object.span().to(end.span),
        }))))
    }

    fn parse_ternary(&mut self, condition: &'ast Expr<'ast>) -> Result<&'ast Expr<'ast>, ParseError> {
        self.expect(TokenKind::Question)?;
        let then_expr = self.parse_expr(0)?;
        self.expect(TokenKind::Colon)?;
        let else_expr = self.parse_expr(TERNARY_BP)?;
        let span = condition.span().to(else_expr.span());
        Ok(self.alloc(Expr::Ternary(self.arena.alloc(TernaryExpr {
            condition,
            then_expr,
            else_expr,
            span,
        }))))
    }

    pub(super) fn expect_identifier(&mut self) -> Result<Ident<'ast>, ParseError> {
        let token = *self.peek();
        if token.kind == TokenKind::Identifier {
            self.advance();
            Ok(Ident::new(token.lexeme, token.span))
        } else {
            Err(ParseError::expected_identifier(token.span, &token.describe()))
        }
    }

    #[inline]
    fn alloc(&self, expr: Expr<'ast>) -> &'ast Expr<'ast> {
        self.arena.alloc(expr)
    }
}

/// Whether a type is spelled with a built-in keyword such as `int`.
fn is_keyword_type(ty: &TypeExpr<'_>) -> bool {
    match ty.kind {
        TypeKind::Named { path, args, global } if !global && path.len() == 1 && args.is_empty() => {
            type_name::alias(path[0].name).is_some()
        }
        TypeKind::Nullable(inner) => is_keyword_type(inner),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::Parser;
    use crate::ast::*;
    use bumpalo::Bump;

    fn parse<'a>(source: &str, arena: &'a Bump) -> &'a Expr<'a> {
        Parser::expression(source, arena).unwrap()
    }

    #[test]
    fn int_literal() {
        let arena = Bump::new();
        let expr = parse("42", &arena);
        assert!(matches!(
            expr,
            Expr::Literal(LiteralExpr { kind: LiteralKind::Int(42), .. })
        ));
    }

    #[test]
    fn numeric_literal_kinds() {
        let arena = Bump::new();
        let kind = |src: &str| match parse(src, &arena) {
            Expr::Literal(lit) => lit.kind,
            other => panic!("not a literal: {other:?}"),
        };
        assert_eq!(kind("42L"), LiteralKind::Long(42));
        assert_eq!(kind("3000000000"), LiteralKind::Long(3_000_000_000));
        assert_eq!(kind("0xFF"), LiteralKind::Int(255));
        assert_eq!(kind("1.5"), LiteralKind::Double(1.5));
        assert_eq!(kind("2.5f"), LiteralKind::Float(2.5));
        assert_eq!(kind("'a'"), LiteralKind::Char('a'));
        assert_eq!(kind("1_000"), LiteralKind::Int(1000));
    }

    #[test]
    fn decimal_literal_is_rejected() {
        let arena = Bump::new();
        let errors = Parser::expression("1.5m", &arena).unwrap_err();
        assert_eq!(errors.first().unwrap().kind, ParseErrorKind::InvalidLiteral);
    }

    #[test]
    fn string_literal_is_decoded() {
        let arena = Bump::new();
        match parse(r#""a\"b""#, &arena) {
            Expr::Literal(LiteralExpr { kind: LiteralKind::String(s), .. }) => assert_eq!(*s, "a\"b"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let arena = Bump::new();
        match parse("1 + 2 * 3", &arena) {
            Expr::Binary(bin) => {
                assert_eq!(bin.op, BinaryOp::Add);
                assert!(matches!(bin.right, Expr::Binary(b) if b.op == BinaryOp::Mul));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn subtraction_is_left_associative() {
        let arena = Bump::new();
        match parse("a - b - c", &arena) {
            Expr::Binary(bin) => assert!(matches!(bin.left, Expr::Binary(_))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        let arena = Bump::new();
        match parse("a = b += 1", &arena) {
            Expr::Assign(assign) => {
                assert_eq!(assign.op, AssignOp::Assign);
                assert!(matches!(assign.value, Expr::Assign(inner) if inner.op == AssignOp::AddAssign));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn coalesce_and_ternary() {
        let arena = Bump::new();
        match parse("a ?? b ? c : d", &arena) {
            Expr::Ternary(t) => assert!(matches!(t.condition, Expr::Binary(b) if b.op == BinaryOp::Coalesce)),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse("a ? b : c ? d : e", &arena), Expr::Ternary(t) if matches!(t.else_expr, Expr::Ternary(_))));
    }

    #[test]
    fn member_call_and_index_chain() {
        let arena = Bump::new();
        match parse("Math.Max(a, b)", &arena) {
            Expr::Call(call) => {
                assert_eq!(call.args.len(), 2);
                assert_eq!(call.callee.as_path(), Some(vec!["Math", "Max"]));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse("items[i].Length", &arena), Expr::Member(_)));
    }

    #[test]
    fn casts_are_distinguished_from_parentheses() {
        let arena = Bump::new();
        assert!(matches!(parse("(double)x", &arena), Expr::Cast(_)));
        assert!(matches!(parse("(int)-x", &arena), Expr::Cast(_)));
        assert!(matches!(parse("(long)(a + b)", &arena), Expr::Cast(_)));
        assert!(matches!(parse("(x) - y", &arena), Expr::Binary(_)));
        assert!(matches!(parse("(a + b)", &arena), Expr::Paren(_)));
    }

    #[test]
    fn array_creation() {
        let arena = Bump::new();
        match parse("new int[] { 1, 2, 3, }", &arena) {
            Expr::NewArray(array) => {
                assert!(array.size.is_none());
                assert_eq!(array.initializer.map(|items| items.len()), Some(3));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse("new string[n + 1]", &arena), Expr::NewArray(_)));
        assert!(Parser::expression("new Foo()", &arena).is_err());
        assert!(Parser::expression("new int[]", &arena).is_err());
    }

    #[test]
    fn prefix_and_postfix_increments() {
        let arena = Bump::new();
        assert!(matches!(parse("++i", &arena), Expr::Unary(u) if u.op == UnaryOp::PreInc));
        assert!(matches!(parse("i--", &arena), Expr::Postfix(p) if p.op == PostfixOp::PostDec));
    }

    #[test]
    fn trailing_dot_fails() {
        let arena = Bump::new();
        assert!(Parser::expression("a.b.", &arena).is_err());
    }
}

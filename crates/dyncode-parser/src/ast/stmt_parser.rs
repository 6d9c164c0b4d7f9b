//! Statement parsing.

use super::parser::Parser;
use crate::ast::expr::Expr;
use crate::ast::stmt::*;
use crate::ast::types::TypeExpr;
use crate::ast::ParseError;
use crate::lexer::TokenKind;
use bumpalo::collections::Vec as BVec;

impl<'ast> Parser<'ast> {
    /// Parse a statement, dispatching on the current token.
    pub fn parse_statement(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let kind = self.peek().kind;
        match kind {
            TokenKind::LeftBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => {
                let start = self.advance().span;
                let end = self.expect(TokenKind::Semicolon)?.span;
                Ok(Stmt::Break(start.to(end)))
            }
            TokenKind::Continue => {
                let start = self.advance().span;
                let end = self.expect(TokenKind::Semicolon)?.span;
                Ok(Stmt::Continue(start.to(end)))
            }
            _ if self.is_var_decl() => {
                let decl = self.parse_var_decl()?;
                let end = self.expect(TokenKind::Semicolon)?.span;
                Ok(Stmt::VarDecl(VarDeclStmt {
                    span: decl.span.to(end),
                    ..decl
                }))
            }
            _ => self.parse_expr_stmt(),
        }
    }

    /// Parse `{ stmt* }`. A broken statement is recorded and skipped so the
    /// rest of the block still parses.
    pub fn parse_block(&mut self) -> Result<Block<'ast>, ParseError> {
        let start = self.expect(TokenKind::LeftBrace)?.span;
        let mut stmts = BVec::new_in(self.arena);

        while !self.check(TokenKind::RightBrace) && !self.is_eof() {
            let stmt_start = self.position;
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(error) => {
                    self.record(error);
                    self.synchronize_statement(stmt_start);
                }
            }
        }

        let end = self.expect(TokenKind::RightBrace)?.span;
        Ok(Block {
            stmts: stmts.into_bump_slice(),
            span: start.to(end),
        })
    }

    /// Expression statement, or the empty statement `;`.
    fn parse_expr_stmt(&mut self) -> Result<Stmt<'ast>, ParseError> {
        if let Some(token) = self.eat(TokenKind::Semicolon) {
            return Ok(Stmt::Expr(ExprStmt {
                expr: None,
                span: token.span,
            }));
        }
        let expr = self.parse_expr(0)?;
        let end = self.expect(TokenKind::Semicolon)?.span;
        Ok(Stmt::Expr(ExprStmt {
            expr: Some(expr),
            span: expr.span().to(end),
        }))
    }

    /// Whether the upcoming tokens read as `TYPE NAME (= | ; | ,)` or `var NAME`.
    fn is_var_decl(&mut self) -> bool {
        if self.check(TokenKind::Var) {
            return self.peek_nth(1).kind == TokenKind::Identifier;
        }
        let saved = self.position;
        let result = self.try_parse_type().is_some()
            && self.check(TokenKind::Identifier)
            && matches!(
                self.peek_nth(1).kind,
                TokenKind::Equal | TokenKind::Semicolon | TokenKind::Comma
            );
        self.position = saved;
        result
    }

    /// Parse a declaration up to, but not including, the terminating `;`.
    ///
    /// Grammar: `(TYPE | 'var') NAME ('=' EXPR)? (',' NAME ('=' EXPR)?)*`
    fn parse_var_decl(&mut self) -> Result<VarDeclStmt<'ast>, ParseError> {
        let start = self.peek().span;
        let ty: Option<TypeExpr<'ast>> = if self.eat(TokenKind::Var).is_some() {
            None
        } else {
            Some(self.parse_type()?)
        };

        let mut vars = BVec::new_in(self.arena);
        loop {
            let name = self.expect_identifier()?;
            let init = if self.eat(TokenKind::Equal).is_some() {
                Some(self.parse_expr(0)?)
            } else {
                None
            };
            let span = match init {
                Some(expr) => name.span.to(expr.span()),
                None => name.span,
            };
            vars.push(VarDeclarator { name, init, span });
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }

        Ok(VarDeclStmt {
            ty,
            vars: vars.into_bump_slice(),
            span: start.to(self.previous_span()),
        })
    }

    fn parse_return(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::Return)?.span;
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr(0)?)
        };
        let end = self.expect(TokenKind::Semicolon)?.span;
        Ok(Stmt::Return(ReturnStmt {
            value,
            span: start.to(end),
        }))
    }

    /// Parse the body of a control-flow statement into the arena.
    fn parse_nested_statement(&mut self) -> Result<&'ast Stmt<'ast>, ParseError> {
        let stmt = self.parse_statement()?;
        Ok(self.arena.alloc(stmt))
    }

    fn parse_condition(&mut self) -> Result<&'ast Expr<'ast>, ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let condition = self.parse_expr(0)?;
        self.expect(TokenKind::RightParen)?;
        Ok(condition)
    }

    fn parse_if(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::If)?.span;
        let condition = self.parse_condition()?;
        let then_stmt: &'ast Stmt<'ast> = self.parse_nested_statement()?;
        let else_stmt = if self.eat(TokenKind::Else).is_some() {
            Some(self.parse_nested_statement()?)
        } else {
            None
        };
        Ok(Stmt::If(self.arena.alloc(IfStmt {
            condition,
            then_stmt,
            else_stmt,
            span: start.to(self.previous_span()),
        })))
    }

    fn parse_while(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::While)?.span;
        let condition = self.parse_condition()?;
        let body = self.parse_nested_statement()?;
        Ok(Stmt::While(self.arena.alloc(WhileStmt {
            condition,
            body,
            span: start.to(self.previous_span()),
        })))
    }

    fn parse_do_while(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::Do)?.span;
        let body = self.parse_nested_statement()?;
        self.expect(TokenKind::While)?;
        let condition = self.parse_condition()?;
        let end = self.expect(TokenKind::Semicolon)?.span;
        Ok(Stmt::DoWhile(self.arena.alloc(DoWhileStmt {
            body,
            condition,
            span: start.to(end),
        })))
    }

    /// Grammar: `'for' '(' INIT? ';' EXPR? ';' (EXPR (',' EXPR)*)? ')' STMT`
    fn parse_for(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let start = self.expect(TokenKind::For)?.span;
        self.expect(TokenKind::LeftParen)?;

        let init = if self.check(TokenKind::Semicolon) {
            None
        } else if self.is_var_decl() {
            Some(ForInit::VarDecl(self.parse_var_decl()?))
        } else {
            Some(ForInit::Exprs(self.parse_expr_list(TokenKind::Semicolon)?))
        };
        self.expect(TokenKind::Semicolon)?;

        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr(0)?)
        };
        self.expect(TokenKind::Semicolon)?;

        let update = self.parse_expr_list(TokenKind::RightParen)?;
        self.expect(TokenKind::RightParen)?;

        let body = self.parse_nested_statement()?;
        Ok(Stmt::For(self.arena.alloc(ForStmt {
            init,
            condition,
            update,
            body,
            span: start.to(self.previous_span()),
        })))
    }

    /// Comma-separated expressions up to (not including) `terminator`.
    fn parse_expr_list(&mut self, terminator: TokenKind) -> Result<&'ast [&'ast Expr<'ast>], ParseError> {
        let mut exprs = BVec::new_in(self.arena);
        if !self.check(terminator) {
            loop {
                exprs.push(self.parse_expr(0)?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        Ok(exprs.into_bump_slice())
    }
}

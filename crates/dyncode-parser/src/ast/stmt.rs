//! Statement nodes.

use dyncode_core::Span;

use crate::ast::Ident;
use crate::ast::expr::Expr;
use crate::ast::types::TypeExpr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stmt<'ast> {
    Block(Block<'ast>),
    VarDecl(VarDeclStmt<'ast>),
    Expr(ExprStmt<'ast>),
    Return(ReturnStmt<'ast>),
    If(&'ast IfStmt<'ast>),
    While(&'ast WhileStmt<'ast>),
    DoWhile(&'ast DoWhileStmt<'ast>),
    For(&'ast ForStmt<'ast>),
    Break(Span),
    Continue(Span),
}

impl<'ast> Stmt<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Self::Block(s) => s.span,
            Self::VarDecl(s) => s.span,
            Self::Expr(s) => s.span,
            Self::Return(s) => s.span,
            Self::If(s) => s.span,
            Self::While(s) => s.span,
            Self::DoWhile(s) => s.span,
            Self::For(s) => s.span,
            Self::Break(span) | Self::Continue(span) => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'ast> {
    pub stmts: &'ast [Stmt<'ast>],
    pub span: Span,
}

/// `T a = 1, b;` or `var a = 1;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarDeclStmt<'ast> {
    /// `None` for `var`.
    pub ty: Option<TypeExpr<'ast>>,
    pub vars: &'ast [VarDeclarator<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarDeclarator<'ast> {
    pub name: Ident<'ast>,
    pub init: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

/// An expression statement; `expr` is `None` for a lone `;`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprStmt<'ast> {
    pub expr: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnStmt<'ast> {
    pub value: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfStmt<'ast> {
    pub condition: &'ast Expr<'ast>,
    pub then_stmt: &'ast Stmt<'ast>,
    pub else_stmt: Option<&'ast Stmt<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhileStmt<'ast> {
    pub condition: &'ast Expr<'ast>,
    pub body: &'ast Stmt<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoWhileStmt<'ast> {
    pub body: &'ast Stmt<'ast>,
    pub condition: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForStmt<'ast> {
    pub init: Option<ForInit<'ast>>,
    pub condition: Option<&'ast Expr<'ast>>,
    pub update: &'ast [&'ast Expr<'ast>],
    pub body: &'ast Stmt<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ForInit<'ast> {
    VarDecl(VarDeclStmt<'ast>),
    Exprs(&'ast [&'ast Expr<'ast>]),
}

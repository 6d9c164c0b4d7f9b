//! Expression nodes.
//!
//! Precedence, loosest first:
//! 1. Assignment (`=`, `+=`, ...), right associative
//! 2. Conditional (`?:`), right associative
//! 3. Null coalescing (`??`), right associative
//! 4. `||`
//! 5. `&&`
//! 6. Equality (`==`, `!=`)
//! 7. Relational (`<`, `<=`, `>`, `>=`)
//! 8. Additive (`+`, `-`)
//! 9. Multiplicative (`*`, `/`, `%`)
//! 10. Prefix unary (`-`, `+`, `!`, `++`, `--`) and casts
//! 11. Postfix (call, index, member access, `++`, `--`)

use dyncode_core::Span;

use crate::ast::types::TypeExpr;
use crate::ast::{AssignOp, BinaryOp, Ident, PostfixOp, UnaryOp};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'ast> {
    Literal(LiteralExpr<'ast>),
    Ident(Ident<'ast>),
    This(Span),
    Binary(&'ast BinaryExpr<'ast>),
    Unary(&'ast UnaryExpr<'ast>),
    Postfix(&'ast PostfixExpr<'ast>),
    Assign(&'ast AssignExpr<'ast>),
    Ternary(&'ast TernaryExpr<'ast>),
    Call(&'ast CallExpr<'ast>),
    Index(&'ast IndexExpr<'ast>),
    Member(&'ast MemberExpr<'ast>),
    Cast(&'ast CastExpr<'ast>),
    NewArray(&'ast NewArrayExpr<'ast>),
    Paren(&'ast ParenExpr<'ast>),
}

impl<'ast> Expr<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(e) => e.span,
            Self::Ident(e) => e.span,
            Self::This(span) => *span,
            Self::Binary(e) => e.span,
            Self::Unary(e) => e.span,
            Self::Postfix(e) => e.span,
            Self::Assign(e) => e.span,
            Self::Ternary(e) => e.span,
            Self::Call(e) => e.span,
            Self::Index(e) => e.span,
            Self::Member(e) => e.span,
            Self::Cast(e) => e.span,
            Self::NewArray(e) => e.span,
            Self::Paren(e) => e.span,
        }
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparenthesized(&self) -> &Expr<'ast> {
        let mut expr = self;
        while let Expr::Paren(paren) = expr {
            expr = paren.expr;
        }
        expr
    }

    /// The dotted path of a name or member chain (`Math.Max`), if this is one.
    pub fn as_path(&self) -> Option<Vec<&'ast str>> {
        match self {
            Expr::Ident(ident) => Some(vec![ident.name]),
            Expr::Member(member) => {
                let mut path = member.object.as_path()?;
                path.push(member.member.name);
                Some(path)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralExpr<'ast> {
    pub kind: LiteralKind<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralKind<'ast> {
    Int(i32),
    /// `42L`, or an integer too large for `int`.
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Char(char),
    /// Escapes already decoded.
    String(&'ast str),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryExpr<'ast> {
    pub left: &'ast Expr<'ast>,
    pub op: BinaryOp,
    pub right: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnaryExpr<'ast> {
    pub op: UnaryOp,
    pub operand: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostfixExpr<'ast> {
    pub operand: &'ast Expr<'ast>,
    pub op: PostfixOp,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignExpr<'ast> {
    pub target: &'ast Expr<'ast>,
    pub op: AssignOp,
    pub value: &'ast Expr<'ast>,
    pub span: Span,
}

/// `condition ? then_expr : else_expr`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TernaryExpr<'ast> {
    pub condition: &'ast Expr<'ast>,
    pub then_expr: &'ast Expr<'ast>,
    pub else_expr: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallExpr<'ast> {
    pub callee: &'ast Expr<'ast>,
    pub args: &'ast [&'ast Expr<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexExpr<'ast> {
    pub object: &'ast Expr<'ast>,
    pub index: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberExpr<'ast> {
    pub object: &'ast Expr<'ast>,
    pub member: Ident<'ast>,
    pub span: Span,
}

/// `(T)expr`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastExpr<'ast> {
    pub target: TypeExpr<'ast>,
    pub expr: &'ast Expr<'ast>,
    pub span: Span,
}

/// `new T[n]`, `new T[] { a, b }` or `new T[n] { a, b }`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewArrayExpr<'ast> {
    pub element: TypeExpr<'ast>,
    pub size: Option<&'ast Expr<'ast>>,
    pub initializer: Option<&'ast [&'ast Expr<'ast>]>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParenExpr<'ast> {
    pub expr: &'ast Expr<'ast>,
    pub span: Span,
}

//! Reachability of the end of a method body.
//!
//! A non-void method must not be able to run off the end of its body. The
//! analysis follows the usual rules for structured code: a `return` ends a
//! path, `if` needs both branches to end, and a loop only ends every path
//! when its condition is the constant `true` and nothing breaks out of it.

use dyncode_parser::ast::{Block, Expr, LiteralKind, Stmt};

/// Whether every path through `block` ends in a `return`.
pub fn block_always_returns(block: &Block<'_>) -> bool {
    block.stmts.iter().any(always_returns)
}

pub fn always_returns(stmt: &Stmt<'_>) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::Block(block) => block_always_returns(block),
        Stmt::If(s) => match s.else_stmt {
            Some(else_stmt) => always_returns(s.then_stmt) && always_returns(else_stmt),
            None => false,
        },
        Stmt::While(s) => is_constant_true(Some(s.condition)) && !breaks_out(s.body),
        Stmt::DoWhile(s) => {
            (always_returns(s.body) && !breaks_out(s.body))
                || (is_constant_true(Some(s.condition)) && !breaks_out(s.body))
        }
        Stmt::For(s) => is_constant_true(s.condition) && !breaks_out(s.body),
        Stmt::VarDecl(_) | Stmt::Expr(_) | Stmt::Break(_) | Stmt::Continue(_) => false,
    }
}

/// An absent `for` condition counts as `true`.
fn is_constant_true(condition: Option<&Expr<'_>>) -> bool {
    match condition.map(Expr::unparenthesized) {
        None => true,
        Some(Expr::Literal(literal)) => literal.kind == LiteralKind::Bool(true),
        Some(_) => false,
    }
}

/// Whether `stmt` contains a `break` bound to the loop it is the body of.
fn breaks_out(stmt: &Stmt<'_>) -> bool {
    match stmt {
        Stmt::Break(_) => true,
        Stmt::Block(block) => block.stmts.iter().any(breaks_out),
        Stmt::If(s) => breaks_out(s.then_stmt) || s.else_stmt.is_some_and(breaks_out),
        // A nested loop owns the breaks inside it.
        Stmt::While(_) | Stmt::DoWhile(_) | Stmt::For(_) => false,
        Stmt::VarDecl(_) | Stmt::Expr(_) | Stmt::Return(_) | Stmt::Continue(_) => false,
    }
}

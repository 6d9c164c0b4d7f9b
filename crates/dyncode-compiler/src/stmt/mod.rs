//! Statement compiler.
//!
//! [`StmtCompiler`] compiles statements of one method body. A statement
//! that fails to compile is reported to the context and the enclosing block
//! carries on with the next one, so one pass finds every independent error.

mod block;
mod do_while_stmt;
mod for_stmt;
mod if_stmt;
mod return_stmt;
mod var_decl;
mod while_stmt;

use dyncode_core::{RuntimeType, Span};
use dyncode_parser::ast::{ExprStmt, Stmt};

use crate::context::CompilationContext;
use crate::emit::BytecodeEmitter;
use crate::error::{AtSpan, CompilationError};
use crate::expr::ExprCompiler;

type Result<T> = std::result::Result<T, CompilationError>;

pub struct StmtCompiler<'a, 'c, 'ast, 'pool> {
    ctx: &'a mut CompilationContext<'c, 'ast>,
    emitter: &'a mut BytecodeEmitter<'pool>,
    /// Declared return type of the method.
    return_type: RuntimeType,
}

impl<'a, 'c, 'ast, 'pool> StmtCompiler<'a, 'c, 'ast, 'pool> {
    pub fn new(
        ctx: &'a mut CompilationContext<'c, 'ast>,
        emitter: &'a mut BytecodeEmitter<'pool>,
    ) -> Self {
        let return_type = ctx.method().return_type.clone();
        Self {
            ctx,
            emitter,
            return_type,
        }
    }

    pub fn compile(&mut self, stmt: &Stmt<'_>) -> Result<()> {
        self.emitter.set_line(stmt.span().line);

        match stmt {
            Stmt::Block(block) => self.compile_block(block),
            Stmt::VarDecl(decl) => self.compile_var_decl(decl),
            Stmt::Expr(expr) => self.compile_expr_stmt(expr),
            Stmt::Return(ret) => self.compile_return(ret),
            Stmt::If(if_stmt) => self.compile_if(if_stmt),
            Stmt::While(while_stmt) => self.compile_while(while_stmt),
            Stmt::DoWhile(do_while) => self.compile_do_while(do_while),
            Stmt::For(for_stmt) => self.compile_for(for_stmt),
            Stmt::Break(span) => self.emitter.emit_break().at(*span),
            Stmt::Continue(span) => self.emitter.emit_continue().at(*span),
        }
    }

    fn compile_expr_stmt(&mut self, stmt: &ExprStmt<'_>) -> Result<()> {
        // A lone `;`.
        let Some(expr) = stmt.expr else {
            return Ok(());
        };
        self.expr_compiler().compile_statement_expr(expr)
    }

    fn expr_compiler(&mut self) -> ExprCompiler<'_, 'c, 'ast, 'pool> {
        ExprCompiler::new(self.ctx, self.emitter)
    }

    /// Compile a `bool` condition.
    fn compile_condition(&mut self, condition: &dyncode_parser::ast::Expr<'_>) -> Result<()> {
        self.expr_compiler()
            .check(condition, &RuntimeType::Boolean)
            .map(|_| ())
    }

    /// Leave a loop whose body compiled with `result`, patching its breaks
    /// either way so the jump bookkeeping stays balanced.
    fn finish_loop(&mut self, result: Result<()>, span: Span) -> Result<()> {
        let exited = self.emitter.exit_loop().at(span);
        result.and(exited)
    }
}

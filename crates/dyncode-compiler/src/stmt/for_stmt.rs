//! `for` loops.

use dyncode_parser::ast::{ForInit, ForStmt};

use super::{Result, StmtCompiler};
use crate::bytecode::OpCode;
use crate::emit::JumpLabel;
use crate::error::AtSpan;

impl StmtCompiler<'_, '_, '_, '_> {
    /// Compile a for loop. Variables declared in the initializer are scoped
    /// to the loop; `continue` jumps forward to the update expressions.
    ///
    /// Bytecode layout:
    /// ```text
    ///     [init]
    /// START:
    ///     [condition]       (if present)
    ///     JumpIfFalse EXIT  (if present)
    ///     [body]
    /// CONTINUE:
    ///     [update]
    ///     Loop START
    /// EXIT:
    /// ```
    pub fn compile_for(&mut self, stmt: &ForStmt<'_>) -> Result<()> {
        self.ctx.push_scope();
        let result = self.compile_for_scoped(stmt);
        self.ctx.pop_scope();
        result
    }

    fn compile_for_scoped(&mut self, stmt: &ForStmt<'_>) -> Result<()> {
        match &stmt.init {
            Some(ForInit::VarDecl(decl)) => self.compile_var_decl(decl)?,
            Some(ForInit::Exprs(exprs)) => {
                for expr in exprs.iter() {
                    self.expr_compiler().compile_statement_expr(expr)?;
                }
            }
            None => {}
        }

        let start = self.emitter.current_offset();
        self.emitter.enter_loop(None);
        let result = self.compile_for_loop(stmt, start);
        self.finish_loop(result, stmt.span)
    }

    fn compile_for_loop(&mut self, stmt: &ForStmt<'_>, start: usize) -> Result<()> {
        let exit: Option<JumpLabel> = match stmt.condition {
            Some(condition) => {
                self.compile_condition(condition)?;
                Some(self.emitter.emit_jump(OpCode::JumpIfFalse))
            }
            None => None,
        };

        self.compile_branch(stmt.body);

        self.emitter.set_continue_target().at(stmt.span)?;
        for update in stmt.update {
            self.expr_compiler().compile_statement_expr(update)?;
        }
        self.emitter.emit_loop(start).at(stmt.span)?;

        if let Some(exit) = exit {
            self.emitter.patch_jump(exit).at(stmt.span)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::function_compiler::tests::{compile_method, compile_method_err};

    #[test]
    fn counting_loop() {
        let chunk = compile_method(
            "static int M(int n) { int s = 0; for (int i = 0; i < n; i++) s += i; return s; }",
        );
        chunk.assert_opcodes(&[
            // int s = 0
            OpCode::PushZero,
            OpCode::SetLocal,
            // int i = 0
            OpCode::PushZero,
            OpCode::SetLocal,
            // i < n
            OpCode::GetLocal,
            OpCode::GetLocal,
            OpCode::Less,
            OpCode::JumpIfFalse,
            // s += i
            OpCode::GetLocal,
            OpCode::GetLocal,
            OpCode::AddI32,
            OpCode::SetLocal,
            // i++
            OpCode::GetLocal,
            OpCode::PushOne,
            OpCode::AddI32,
            OpCode::SetLocal,
            OpCode::Loop,
            // return s
            OpCode::GetLocal,
            OpCode::Return,
        ]);
    }

    #[test]
    fn loop_variable_is_scoped_to_the_loop() {
        let errors =
            compile_method_err("static int M() { for (int i = 0; i < 3; i++) { } return i; }");
        assert!(errors[0].contains("'i' does not exist"), "{errors:?}");
    }

    #[test]
    fn infinite_loop_without_condition() {
        let chunk = compile_method("static int M() { for (;;) { return 1; } }");
        chunk.assert_opcodes(&[OpCode::PushOne, OpCode::Return, OpCode::Loop]);
    }
}

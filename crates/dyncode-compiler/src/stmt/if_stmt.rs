//! `if` / `else`.

use dyncode_parser::ast::IfStmt;

use super::{Result, StmtCompiler};
use crate::bytecode::OpCode;
use crate::error::AtSpan;

impl StmtCompiler<'_, '_, '_, '_> {
    /// Compile an if statement.
    ///
    /// Bytecode layout:
    /// ```text
    ///     [condition]
    ///     JumpIfFalse ELSE
    ///     [then]
    ///     Jump END          (only with an else branch)
    /// ELSE:
    ///     [else]
    /// END:
    /// ```
    pub fn compile_if(&mut self, stmt: &IfStmt<'_>) -> Result<()> {
        self.compile_condition(stmt.condition)?;
        let to_else = self.emitter.emit_jump(OpCode::JumpIfFalse);

        self.compile_branch(stmt.then_stmt);

        match stmt.else_stmt {
            Some(else_stmt) => {
                let to_end = self.emitter.emit_jump(OpCode::Jump);
                self.emitter.patch_jump(to_else).at(stmt.span)?;
                self.compile_branch(else_stmt);
                self.emitter.patch_jump(to_end).at(stmt.span)
            }
            None => self.emitter.patch_jump(to_else).at(stmt.span),
        }
    }

    /// A branch body in its own scope, so `if (c) int x = 1;` does not leak `x`.
    pub(crate) fn compile_branch(&mut self, body: &dyncode_parser::ast::Stmt<'_>) {
        self.ctx.push_scope();
        if let Err(error) = self.compile(body) {
            self.ctx.report(error);
        }
        self.ctx.pop_scope();
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::function_compiler::tests::{compile_method, compile_method_err};

    #[test]
    fn if_without_else() {
        let chunk = compile_method("static void M(bool c) { if (c) Helper(); } static void Helper() { }");
        chunk.assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::JumpIfFalse,
            OpCode::Call,
            OpCode::ReturnVoid,
        ]);
    }

    #[test]
    fn if_with_else() {
        let chunk = compile_method("static int M(bool c) { if (c) return 1; else return 0; }");
        chunk.assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::JumpIfFalse,
            OpCode::PushOne,
            OpCode::Return,
            OpCode::Jump,
            OpCode::PushZero,
            OpCode::Return,
        ]);
    }

    #[test]
    fn condition_must_be_bool() {
        let errors = compile_method_err("static void M(int a) { if (a) { } }");
        assert!(
            errors[0].contains("cannot implicitly convert type 'int' to 'bool'"),
            "{errors:?}"
        );
    }
}

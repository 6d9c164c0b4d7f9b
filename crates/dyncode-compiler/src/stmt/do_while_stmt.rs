//! `do` / `while` loops.

use dyncode_parser::ast::DoWhileStmt;

use super::{Result, StmtCompiler};
use crate::bytecode::OpCode;
use crate::error::AtSpan;

impl StmtCompiler<'_, '_, '_, '_> {
    /// Compile a do-while loop. `continue` jumps forward to the condition.
    ///
    /// Bytecode layout:
    /// ```text
    /// START:
    ///     [body]
    /// CONTINUE:
    ///     [condition]
    ///     JumpIfFalse EXIT
    ///     Loop START
    /// EXIT:
    /// ```
    pub fn compile_do_while(&mut self, stmt: &DoWhileStmt<'_>) -> Result<()> {
        let start = self.emitter.current_offset();
        self.emitter.enter_loop(None);
        let result = self.compile_do_while_parts(stmt, start);
        self.finish_loop(result, stmt.span)
    }

    fn compile_do_while_parts(&mut self, stmt: &DoWhileStmt<'_>, start: usize) -> Result<()> {
        self.compile_branch(stmt.body);
        self.emitter.set_continue_target().at(stmt.span)?;
        self.compile_condition(stmt.condition)?;
        let exit = self.emitter.emit_jump(OpCode::JumpIfFalse);
        self.emitter.emit_loop(start).at(stmt.span)?;
        self.emitter.patch_jump(exit).at(stmt.span)
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::function_compiler::tests::compile_method;

    #[test]
    fn body_runs_before_condition() {
        let chunk = compile_method("static void M(int n) { do { n--; } while (n > 0); }");
        chunk.assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::PushOne,
            OpCode::SubI32,
            OpCode::SetLocal,
            OpCode::GetLocal,
            OpCode::PushZero,
            OpCode::Greater,
            OpCode::JumpIfFalse,
            OpCode::Loop,
            OpCode::ReturnVoid,
        ]);
    }

    #[test]
    fn continue_goes_to_condition() {
        let chunk = compile_method("static void M(bool c) { do { continue; } while (c); }");
        chunk.assert_opcodes(&[
            OpCode::Jump,
            OpCode::GetLocal,
            OpCode::JumpIfFalse,
            OpCode::Loop,
            OpCode::ReturnVoid,
        ]);
    }
}

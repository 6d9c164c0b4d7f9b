//! `while` loops.

use dyncode_parser::ast::WhileStmt;

use super::{Result, StmtCompiler};
use crate::bytecode::OpCode;
use crate::error::AtSpan;

impl StmtCompiler<'_, '_, '_, '_> {
    /// Compile a while loop. `continue` jumps back to the condition.
    ///
    /// Bytecode layout:
    /// ```text
    /// START:
    ///     [condition]
    ///     JumpIfFalse EXIT
    ///     [body]
    ///     Loop START
    /// EXIT:
    /// ```
    pub fn compile_while(&mut self, stmt: &WhileStmt<'_>) -> Result<()> {
        let start = self.emitter.current_offset();
        self.emitter.enter_loop(Some(start));
        let result = self.compile_while_parts(stmt, start);
        self.finish_loop(result, stmt.span)
    }

    fn compile_while_parts(&mut self, stmt: &WhileStmt<'_>, start: usize) -> Result<()> {
        self.compile_condition(stmt.condition)?;
        let exit = self.emitter.emit_jump(OpCode::JumpIfFalse);
        self.compile_branch(stmt.body);
        self.emitter.emit_loop(start).at(stmt.span)?;
        self.emitter.patch_jump(exit).at(stmt.span)
    }
}

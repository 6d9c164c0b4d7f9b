//! Blocks `{ ... }`.

use dyncode_parser::ast::Block;

use super::{Result, StmtCompiler};

impl StmtCompiler<'_, '_, '_, '_> {
    /// Compile a block in its own scope. Failing statements are reported and
    /// skipped.
    pub fn compile_block(&mut self, block: &Block<'_>) -> Result<()> {
        self.ctx.push_scope();
        for stmt in block.stmts {
            if let Err(error) = self.compile(stmt) {
                self.ctx.report(error);
            }
        }
        self.ctx.pop_scope();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::function_compiler::tests::{compile_method, compile_method_err};

    #[test]
    fn sibling_blocks_may_reuse_names() {
        let chunk = compile_method("static void M() { { int a = 1; } { int a = 2; } }");
        chunk.assert_opcodes(&[
            OpCode::PushOne,
            OpCode::SetLocal,
            OpCode::Constant,
            OpCode::SetLocal,
            OpCode::ReturnVoid,
        ]);
    }

    #[test]
    fn block_locals_are_not_visible_after_it() {
        let errors = compile_method_err("static int M() { { int a = 1; } return a; }");
        assert!(errors[0].contains("'a' does not exist"), "{errors:?}");
    }

    #[test]
    fn inner_block_may_not_shadow() {
        let errors = compile_method_err("static void M(int a) { { int a = 1; } }");
        assert!(errors[0].contains("already defined"), "{errors:?}");
    }
}

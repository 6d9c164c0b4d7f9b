//! `return` statements.

use dyncode_parser::ast::ReturnStmt;

use super::{Result, StmtCompiler};
use crate::error::CompilationError;

impl StmtCompiler<'_, '_, '_, '_> {
    /// Compile a return, converting the value to the declared return type.
    pub fn compile_return(&mut self, ret: &ReturnStmt<'_>) -> Result<()> {
        match (ret.value, self.return_type.is_void()) {
            (Some(value), true) => Err(CompilationError::ReturnValueInVoid {
                name: self.ctx.method().name().to_string(),
                span: value.span(),
            }),
            (None, false) => Err(CompilationError::MissingReturnValue {
                expected: self.return_type.clone(),
                span: ret.span,
            }),
            (Some(value), false) => {
                let return_type = self.return_type.clone();
                self.expr_compiler().check(value, &return_type)?;
                self.emitter.emit_return();
                Ok(())
            }
            (None, true) => {
                self.emitter.emit_return_void();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::function_compiler::tests::{compile_method, compile_method_err};

    #[test]
    fn return_widens_to_declared_type() {
        let chunk = compile_method("static double M(int a) { return a; }");
        chunk.assert_opcodes(&[OpCode::GetLocal, OpCode::I32ToF64, OpCode::Return]);
    }

    #[test]
    fn return_lifts_into_nullable() {
        let chunk = compile_method("static int? M() { return 1; }");
        chunk.assert_opcodes(&[OpCode::PushOne, OpCode::Return]);
    }

    #[test]
    fn value_in_void_method() {
        let errors = compile_method_err("static void M() { return 1; }");
        assert!(errors[0].contains("since 'M' returns void"), "{errors:?}");
    }

    #[test]
    fn missing_value() {
        let errors = compile_method_err("static int M() { return; }");
        assert!(errors[0].contains("convertible to 'int'"), "{errors:?}");
    }
}

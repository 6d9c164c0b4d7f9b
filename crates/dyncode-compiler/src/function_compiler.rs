//! Compiles one method body to bytecode.
//!
//! [`FunctionCompiler`] declares the parameters as the first local slots,
//! compiles the body, checks that every path of a non-void method returns a
//! value, and appends the implicit `ReturnVoid` of void methods.

use dyncode_parser::ast::{Expr, MethodBody};

use crate::bytecode::{BytecodeChunk, ConstantPool};
use crate::context::CompilationContext;
use crate::emit::BytecodeEmitter;
use crate::error::CompilationError;
use crate::expr::ExprCompiler;
use crate::host::ImportTable;
use crate::registry::{Registry, ScriptMethod};
use crate::return_checker::block_always_returns;
use crate::stmt::StmtCompiler;

/// Bytecode and frame layout of a compiled method.
#[derive(Debug)]
pub struct CompiledMethod {
    pub chunk: BytecodeChunk,
    /// Local slots needed, parameters included.
    pub frame_size: u16,
}

pub struct FunctionCompiler<'a, 'ast, 'pool> {
    ctx: CompilationContext<'a, 'ast>,
    emitter: BytecodeEmitter<'pool>,
    method: &'a ScriptMethod<'ast>,
}

impl<'a, 'ast, 'pool> FunctionCompiler<'a, 'ast, 'pool> {
    pub fn new(
        registry: &'a Registry<'ast>,
        imports: &'a mut ImportTable,
        constants: &'pool mut ConstantPool,
        method: &'a ScriptMethod<'ast>,
    ) -> Self {
        Self {
            ctx: CompilationContext::new(registry, imports, method),
            emitter: BytecodeEmitter::new(constants),
            method,
        }
    }

    /// Compile the method, returning every error found in its body.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(mut self) -> Result<CompiledMethod, Vec<CompilationError>> {
        self.setup_parameters();

        let decl = self.method.decl;
        self.emitter.set_line(decl.span.line);
        match decl.body {
            Some(MethodBody::Block(block)) => {
                let always_returns = block_always_returns(&block);
                let mut stmts = StmtCompiler::new(&mut self.ctx, &mut self.emitter);
                if let Err(error) = stmts.compile_block(&block) {
                    self.ctx.report(error);
                }
                if self.method.return_type.is_void() {
                    if !always_returns {
                        self.emitter.emit_return_void();
                    }
                } else if !always_returns {
                    self.ctx.report(CompilationError::MissingReturn {
                        name: self.method.name().to_string(),
                        span: decl.name.span,
                    });
                }
            }
            Some(MethodBody::Expr(expr)) => {
                if let Err(error) = self.compile_expression_body(expr) {
                    self.ctx.report(error);
                }
            }
            None => self.ctx.report(CompilationError::MissingBody {
                name: self.method.name().to_string(),
                span: decl.name.span,
            }),
        }

        let errors = self.ctx.take_errors();
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(CompiledMethod {
            frame_size: self.ctx.frame_size(),
            chunk: self.emitter.finish(),
        })
    }

    fn setup_parameters(&mut self) {
        for (param, ty) in self.method.decl.params.iter().zip(&self.method.params) {
            if let Err(error) = self.ctx.declare_local(param.name.name, ty.clone(), param.name.span) {
                self.ctx.report(error);
            }
        }
    }

    /// `=> expr;` is a return of `expr`, or an expression statement in a
    /// void method.
    fn compile_expression_body(&mut self, expr: &Expr<'_>) -> Result<(), CompilationError> {
        let return_type = &self.method.return_type;
        let mut compiler = ExprCompiler::new(&mut self.ctx, &mut self.emitter);
        if return_type.is_void() {
            compiler.compile_statement_expr(expr)?;
            self.emitter.emit_return_void();
        } else {
            compiler.check(expr, return_type)?;
            self.emitter.emit_return();
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use bumpalo::Bump;
    use dyncode_core::RuntimeType;
    use dyncode_parser::Parser;

    use super::*;
    use crate::bytecode::OpCode;
    use crate::host::HostSignature;

    /// Host functions available to test sources.
    pub(crate) fn test_host() -> Vec<HostSignature> {
        use RuntimeType::*;
        vec![
            HostSignature::new("System", "Math", "Max", vec![Int32, Int32], Int32),
            HostSignature::new("System", "Math", "Max", vec![Double, Double], Double),
            HostSignature::new("System", "Math", "Abs", vec![Int32], Int32),
            HostSignature::new("System", "String", "Concat", vec![String, String], String),
        ]
    }

    /// Compile method `M` of `class C { <members> }`.
    fn compile_members(members: &str) -> Result<CompiledMethod, Vec<String>> {
        let source = format!("using System;\nclass C {{ {members} }}");
        let arena = Bump::new();
        let unit = Parser::parse(&source, &arena).expect("test source parses");
        let host = test_host();
        let (registry, errors) = Registry::build(&unit, &host);
        if !errors.is_empty() {
            return Err(errors.iter().map(ToString::to_string).collect());
        }
        let method = registry
            .methods()
            .iter()
            .find(|method| method.name() == "M")
            .expect("test source declares M");
        let mut imports = ImportTable::new();
        let mut constants = ConstantPool::new();
        FunctionCompiler::new(&registry, &mut imports, &mut constants, method)
            .compile()
            .map_err(|errors| errors.iter().map(ToString::to_string).collect())
    }

    #[track_caller]
    pub(crate) fn compile_method(members: &str) -> BytecodeChunk {
        match compile_members(members) {
            Ok(compiled) => compiled.chunk,
            Err(errors) => panic!("unexpected errors: {errors:?}"),
        }
    }

    #[track_caller]
    pub(crate) fn compile_method_err(members: &str) -> Vec<String> {
        match compile_members(members) {
            Ok(compiled) => panic!("expected errors, got:\n{}", compiled.chunk.disassemble()),
            Err(errors) => errors,
        }
    }

    #[test]
    fn parameters_take_the_first_slots() {
        let compiled = compile_members("static int M(int a, int b) { int c = a; return b; }").unwrap();
        assert_eq!(compiled.frame_size, 3);
        compiled.chunk.assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::SetLocal,
            OpCode::GetLocal,
            OpCode::Return,
        ]);
        // GetLocal a, SetLocal c, GetLocal b
        assert_eq!(compiled.chunk.read_byte(1), Some(0));
        assert_eq!(compiled.chunk.read_byte(3), Some(2));
        assert_eq!(compiled.chunk.read_byte(5), Some(1));
    }

    #[test]
    fn void_methods_get_an_implicit_return() {
        compile_method("static void M() { }").assert_opcodes(&[OpCode::ReturnVoid]);
    }

    #[test]
    fn explicit_final_return_is_not_doubled() {
        compile_method("static void M() { return; }").assert_opcodes(&[OpCode::ReturnVoid]);
    }

    #[test]
    fn expression_bodies() {
        compile_method("static int M(int a) => a;").assert_opcodes(&[OpCode::GetLocal, OpCode::Return]);
        compile_method("static void M() => N(); static void N() { }")
            .assert_opcodes(&[OpCode::Call, OpCode::ReturnVoid]);
    }

    #[test]
    fn missing_return() {
        let errors = compile_method_err("static int M(bool c) { if (c) return 1; }");
        assert_eq!(errors, vec!["'M': not all code paths return a value".to_string()]);
    }

    #[test]
    fn duplicate_parameter_names() {
        let errors = compile_method_err("static int M(int a, int a) => a;");
        assert!(errors[0].contains("'a' is already defined"), "{errors:?}");
    }
}

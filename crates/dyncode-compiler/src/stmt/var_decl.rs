//! Local declarations: `T a = e, b;` and `var a = e;`.

use dyncode_core::RuntimeType;
use dyncode_parser::ast::{VarDeclStmt, VarDeclarator};

use super::{Result, StmtCompiler};
use crate::error::CompilationError;
use crate::expr_info::ExprType;

impl StmtCompiler<'_, '_, '_, '_> {
    /// Compile a local declaration. Each initializer is compiled before its
    /// variable comes into scope; a declarator without one gets the type's
    /// default value.
    pub fn compile_var_decl(&mut self, decl: &VarDeclStmt<'_>) -> Result<()> {
        let Some(ty) = decl.ty else {
            return self.compile_implicit_var(decl);
        };
        let ty = self.ctx.registry().resolver().resolve(&ty)?;
        for var in decl.vars {
            match var.init {
                Some(init) => {
                    self.expr_compiler().check(init, &ty)?;
                }
                None => self.expr_compiler().emit_default(&ty, var.span)?,
            }
            self.bind(var, ty.clone())?;
        }
        Ok(())
    }

    /// `var x = e;` takes the type of its initializer.
    fn compile_implicit_var(&mut self, decl: &VarDeclStmt<'_>) -> Result<()> {
        let [var] = decl.vars else {
            return Err(CompilationError::unsupported(
                "implicitly-typed variables with multiple declarators",
                decl.span,
            ));
        };
        let Some(init) = var.init else {
            return Err(CompilationError::CannotInferType {
                name: var.name.name.to_string(),
                init: "no initializer".into(),
                span: var.span,
            });
        };
        let info = self.expr_compiler().infer(init)?;
        let ty = match info.ty {
            ExprType::Value(ty) if !ty.is_void() => ty,
            other => {
                return Err(CompilationError::CannotInferType {
                    name: var.name.name.to_string(),
                    init: other.to_string(),
                    span: var.span,
                });
            }
        };
        self.bind(var, ty)
    }

    /// Declare `var` and store the value on the stack into it.
    fn bind(&mut self, var: &VarDeclarator<'_>, ty: RuntimeType) -> Result<()> {
        let slot = self.ctx.declare_local(var.name.name, ty, var.name.span)?;
        self.emitter.emit_set_local(slot);
        Ok(())
    }
}

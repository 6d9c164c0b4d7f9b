//! Simple names: locals, parameters and constants.

use dyncode_parser::ast::Ident;

use super::{ExprCompiler, Result};
use crate::error::CompilationError;
use crate::expr_info::ExprInfo;

/// Locals shadow constants of the enclosing types.
pub fn compile_ident(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    ident: &Ident<'_>,
) -> Result<ExprInfo> {
    let name = ident.name;
    if let Some(local) = compiler.ctx().lookup_local(name) {
        let (slot, ty) = (local.slot, local.ty.clone());
        compiler.emitter().emit_get_local(slot);
        return Ok(ExprInfo::value(ty));
    }

    let registry = compiler.ctx().registry();
    let from = compiler.ctx().current_type();
    if let Some(constant) = registry.simple_constant(name, from) {
        compiler.emit_value(&constant.value, ident.span)?;
        return Ok(ExprInfo::value(constant.ty.clone()));
    }
    if registry.simple_callees(name, from).is_some() {
        return Err(CompilationError::unsupported(
            format!("method group '{name}' used as a value"),
            ident.span,
        ));
    }
    Err(CompilationError::UnknownName {
        name: name.to_string(),
        span: ident.span,
    })
}

//! Explicit casts `(T)expr`.

use dyncode_parser::ast::CastExpr;

use super::{ExprCompiler, Result};
use crate::conversion;
use crate::error::CompilationError;
use crate::expr_info::ExprInfo;

pub fn compile_cast(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    cast: &CastExpr<'_>,
) -> Result<ExprInfo> {
    let target = compiler.ctx().registry().resolver().resolve(&cast.target)?;
    let operand = compiler.infer(cast.expr)?;
    let conversion =
        conversion::explicit(&operand.ty, &target).ok_or_else(|| CompilationError::InvalidCast {
            from: operand.ty.to_string(),
            to: target.clone(),
            span: cast.span,
        })?;
    compiler.emit_ops(&conversion.ops);
    Ok(ExprInfo::value(target))
}

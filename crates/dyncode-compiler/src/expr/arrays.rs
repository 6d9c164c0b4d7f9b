//! Array creation: `new T[n]`, `new T[] { a, b }` and `new T[2] { a, b }`.

use dyncode_core::RuntimeType;
use dyncode_parser::ast::{Expr, LiteralKind, NewArrayExpr};

use super::{ExprCompiler, Result, array_element};
use crate::error::CompilationError;
use crate::expr_info::ExprInfo;

pub fn compile_new_array(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    new: &NewArrayExpr<'_>,
) -> Result<ExprInfo> {
    let element = compiler.ctx().registry().resolver().resolve(&new.element)?;
    let array = RuntimeType::Array(Box::new(element.clone()));

    match (new.size, new.initializer) {
        (Some(size), None) => {
            compiler.compile_index_operand(size)?;
            compiler.emitter().emit_new_array(array_element(&element));
        }
        (size, Some(items)) => {
            if let Some(size) = size
                && !matches!(size.unparenthesized(), Expr::Literal(lit) if lit.kind == LiteralKind::Int(items.len() as i32))
            {
                return Err(CompilationError::unsupported(
                    "an array size that differs from its initializer",
                    size.span(),
                ));
            }
            let count = u16::try_from(items.len()).map_err(|_| {
                CompilationError::unsupported("array initializers with more than 65535 items", new.span)
            })?;
            for item in items {
                compiler.check(item, &element)?;
            }
            compiler.emitter().emit_array_literal(count);
        }
        (None, None) => {
            return Err(CompilationError::unsupported(
                "an array creation without a size or initializer",
                new.span,
            ));
        }
    }
    Ok(ExprInfo::value(array))
}

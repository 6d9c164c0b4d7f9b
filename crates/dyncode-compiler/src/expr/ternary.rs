//! The conditional operator `c ? a : b`.

use dyncode_core::RuntimeType;
use dyncode_parser::ast::TernaryExpr;

use super::{ExprCompiler, Result};
use crate::bytecode::OpCode;
use crate::conversion::{self, Conversion};
use crate::error::{AtSpan, CompilationError};
use crate::expr_info::{ExprInfo, ExprType};

/// Bytecode layout:
/// ```text
///     condition
///     JumpIfFalse ELSE
///     then, converted
///     Jump END
/// ELSE:
///     else, converted
/// END:
/// ```
pub fn compile_ternary(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    ternary: &TernaryExpr<'_>,
) -> Result<ExprInfo> {
    compiler.check(ternary.condition, &RuntimeType::Boolean)?;

    let (then_info, then_code) = compiler.infer_fragment(ternary.then_expr)?;
    let (else_info, else_code) = compiler.infer_fragment(ternary.else_expr)?;
    let (ty, then_conv, else_conv) =
        unify(&then_info.ty, &else_info.ty).ok_or_else(|| CompilationError::InvalidBinaryOperands {
            op: "?:".into(),
            left: then_info.ty.to_string(),
            right: else_info.ty.to_string(),
            span: ternary.span,
        })?;

    let to_else = compiler.emitter().emit_jump(OpCode::JumpIfFalse);
    compiler.emitter().append_fragment(then_code);
    compiler.emit_ops(&then_conv.ops);
    let to_end = compiler.emitter().emit_jump(OpCode::Jump);
    compiler.emitter().patch_jump(to_else).at(ternary.span)?;
    compiler.emitter().append_fragment(else_code);
    compiler.emit_ops(&else_conv.ops);
    compiler.emitter().patch_jump(to_end).at(ternary.span)?;

    Ok(ExprInfo::value(ty))
}

/// The branch type: whichever branch the other converts to implicitly.
fn unify(then_ty: &ExprType, else_ty: &ExprType) -> Option<(RuntimeType, Conversion, Conversion)> {
    if let Some(then_rt) = then_ty.runtime().filter(|ty| !ty.is_void())
        && let Some(conv) = conversion::implicit(else_ty, then_rt)
    {
        let identity = conversion::implicit(then_ty, then_rt)?;
        return Some((then_rt.clone(), identity, conv));
    }
    if let Some(else_rt) = else_ty.runtime().filter(|ty| !ty.is_void())
        && let Some(conv) = conversion::implicit(then_ty, else_rt)
    {
        let identity = conversion::implicit(else_ty, else_rt)?;
        return Some((else_rt.clone(), conv, identity));
    }
    // `flag ? 1 : null` is an `int?`.
    let lifted = match (then_ty, else_ty) {
        (ExprType::Null, ExprType::Value(ty)) | (ExprType::Value(ty), ExprType::Null)
            if !ty.is_void() && !ty.accepts_null() =>
        {
            RuntimeType::Nullable(Box::new(ty.clone()))
        }
        _ => return None,
    };
    Some((
        lifted.clone(),
        conversion::implicit(then_ty, &lifted)?,
        conversion::implicit(else_ty, &lifted)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(ty: RuntimeType) -> ExprType {
        ExprType::Value(ty)
    }

    #[test]
    fn widens_towards_the_wider_branch() {
        let (ty, then_conv, else_conv) =
            unify(&value(RuntimeType::Int32), &value(RuntimeType::Double)).unwrap();
        assert_eq!(ty, RuntimeType::Double);
        assert_eq!(then_conv.ops, vec![OpCode::I32ToF64]);
        assert!(else_conv.ops.is_empty());
    }

    #[test]
    fn null_branch_lifts_value_types() {
        let (ty, _, _) = unify(&value(RuntimeType::Int32), &ExprType::Null).unwrap();
        assert_eq!(ty, RuntimeType::Nullable(Box::new(RuntimeType::Int32)));

        let (ty, _, _) = unify(&ExprType::Null, &value(RuntimeType::String)).unwrap();
        assert_eq!(ty, RuntimeType::String);
    }

    #[test]
    fn unrelated_branches_do_not_unify() {
        assert!(unify(&value(RuntimeType::Boolean), &value(RuntimeType::String)).is_none());
        assert!(unify(&ExprType::Null, &ExprType::Null).is_none());
    }
}

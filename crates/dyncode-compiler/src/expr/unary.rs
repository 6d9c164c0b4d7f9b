//! Prefix operators `-`, `+` and `!`.
//!
//! `++` and `--` are assignments and live in the assignment module.

use dyncode_core::RuntimeType;
use dyncode_parser::ast::{Expr, LiteralKind, UnaryExpr, UnaryOp};

use super::binary::{negate_opcode, strip_nullable};
use super::{ExprCompiler, Result, assignment};
use crate::bytecode::OpCode;
use crate::conversion::{self, promote};
use crate::error::{AtSpan, CompilationError};
use crate::expr_info::{ExprInfo, ExprType};

pub fn compile_unary(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    expr: &UnaryExpr<'_>,
) -> Result<ExprInfo> {
    match expr.op {
        UnaryOp::PreInc | UnaryOp::PreDec => assignment::compile_increment(
            compiler,
            expr.operand,
            expr.op == UnaryOp::PreInc,
            true,
            true,
            expr.span,
        ),
        UnaryOp::Not => {
            let operand = compiler.infer(expr.operand)?;
            match operand.ty.runtime() {
                Some(RuntimeType::Boolean) => {}
                Some(RuntimeType::Nullable(inner)) if **inner == RuntimeType::Boolean => {}
                _ => return Err(invalid_operand(expr, &operand.ty)),
            }
            compiler.emitter().emit(OpCode::Not);
            Ok(operand)
        }
        UnaryOp::Neg | UnaryOp::Plus => {
            if expr.op == UnaryOp::Neg
                && let Expr::Literal(lit) = expr.operand
                && lit.kind == LiteralKind::Long(i64::from(i32::MAX) + 1)
            {
                // `-2147483648` is the only way to spell int.MinValue as a literal.
                compiler.emitter().emit_int(i32::MIN).at(expr.span)?;
                return Ok(ExprInfo::value(RuntimeType::Int32));
            }

            let operand = compiler.infer(expr.operand)?;
            let (inner, lifted) =
                strip_nullable(&operand.ty).ok_or_else(|| invalid_operand(expr, &operand.ty))?;
            let promoted = promote(&inner, &inner).ok_or_else(|| invalid_operand(expr, &operand.ty))?;
            let widening = conversion::implicit(&ExprType::Value(inner), &promoted)
                .ok_or_else(|| invalid_operand(expr, &operand.ty))?;
            compiler.emit_ops(&widening.ops);
            if expr.op == UnaryOp::Neg {
                let op = negate_opcode(&promoted).ok_or_else(|| invalid_operand(expr, &operand.ty))?;
                compiler.emitter().emit(op);
            }
            Ok(ExprInfo::value(if lifted {
                RuntimeType::Nullable(Box::new(promoted))
            } else {
                promoted
            }))
        }
    }
}

fn invalid_operand(expr: &UnaryExpr<'_>, operand: &ExprType) -> CompilationError {
    CompilationError::InvalidUnaryOperand {
        op: expr.op.to_string(),
        operand: operand.to_string(),
        span: expr.span,
    }
}

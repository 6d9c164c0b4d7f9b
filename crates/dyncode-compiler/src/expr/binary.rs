//! Binary operators.
//!
//! Arithmetic and relational operators promote both operands to a common
//! numeric type (at least `int`) and lift over nullables: if either operand
//! is nullable the result is too, and a null operand yields null (or `false`
//! for comparisons). `+` with a string operand concatenates. `&&` and `||`
//! short-circuit; `??` evaluates its right side only when the left is null.

use dyncode_core::{RuntimeType, Span};
use dyncode_parser::ast::{BinaryExpr, BinaryOp, Expr};

use super::{ExprCompiler, Result};
use crate::bytecode::OpCode;
use crate::conversion::{self, promote};
use crate::error::{AtSpan, CompilationError};
use crate::expr_info::{ExprInfo, ExprType};

pub fn compile_binary(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    expr: &BinaryExpr<'_>,
) -> Result<ExprInfo> {
    match expr.op {
        BinaryOp::LogicalAnd | BinaryOp::LogicalOr => compile_logical(compiler, expr),
        BinaryOp::Coalesce => compile_coalesce(compiler, expr),
        op => {
            let left = compiler.infer(expr.left)?;
            let (result, _) = compile_operator(compiler, op, &left.ty, expr.right, expr.span)?;
            Ok(result)
        }
    }
}

/// Apply `op` to a left operand already on the stack and `right`.
///
/// Returns the result and the type of the right operand.
pub(super) fn compile_operator(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    op: BinaryOp,
    left: &ExprType,
    right: &Expr<'_>,
    span: Span,
) -> Result<(ExprInfo, ExprType)> {
    let (right_info, fragment) = compiler.infer_fragment(right)?;
    let plan = plan_operator(op, left, &right_info.ty).ok_or_else(|| {
        CompilationError::InvalidBinaryOperands {
            op: op.to_string(),
            left: left.to_string(),
            right: right_info.ty.to_string(),
            span,
        }
    })?;
    compiler.emit_ops(&plan.left);
    compiler.emitter().append_fragment(fragment);
    compiler.emit_ops(&plan.right);
    compiler.emitter().emit(plan.op);
    Ok((ExprInfo::value(plan.result), right_info.ty))
}

/// Conversions for each operand, the operation, and its result type.
#[derive(Debug, PartialEq)]
struct OperatorPlan {
    left: Vec<OpCode>,
    right: Vec<OpCode>,
    op: OpCode,
    result: RuntimeType,
}

fn plan_operator(op: BinaryOp, left: &ExprType, right: &ExprType) -> Option<OperatorPlan> {
    match op {
        BinaryOp::Add if left.is(&RuntimeType::String) || right.is(&RuntimeType::String) => {
            if left.is_void() || right.is_void() {
                return None;
            }
            Some(OperatorPlan {
                left: Vec::new(),
                right: Vec::new(),
                op: OpCode::Concat,
                result: RuntimeType::String,
            })
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let numeric = plan_numeric(left, right)?;
            let lifted = numeric.lifted;
            Some(OperatorPlan {
                op: arithmetic_opcode(op, &numeric.operand)?,
                result: if lifted {
                    RuntimeType::Nullable(Box::new(numeric.operand))
                } else {
                    numeric.operand
                },
                left: numeric.left,
                right: numeric.right,
            })
        }
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
            let numeric = plan_numeric(left, right)?;
            Some(OperatorPlan {
                left: numeric.left,
                right: numeric.right,
                op: comparison_opcode(op)?,
                result: RuntimeType::Boolean,
            })
        }
        BinaryOp::Equal | BinaryOp::NotEqual => plan_equality(op, left, right),
        BinaryOp::LogicalAnd | BinaryOp::LogicalOr | BinaryOp::Coalesce => None,
    }
}

struct NumericPlan {
    left: Vec<OpCode>,
    right: Vec<OpCode>,
    operand: RuntimeType,
    lifted: bool,
}

fn plan_numeric(left: &ExprType, right: &ExprType) -> Option<NumericPlan> {
    let (left, left_lifted) = strip_nullable(left)?;
    let (right, right_lifted) = strip_nullable(right)?;
    let operand = promote(&left, &right)?;
    Some(NumericPlan {
        left: conversion::implicit(&ExprType::Value(left), &operand)?.ops,
        right: conversion::implicit(&ExprType::Value(right), &operand)?.ops,
        operand,
        lifted: left_lifted || right_lifted,
    })
}

fn plan_equality(op: BinaryOp, left: &ExprType, right: &ExprType) -> Option<OperatorPlan> {
    let opcode = comparison_opcode(op)?;
    let plain = |left, right| OperatorPlan {
        left,
        right,
        op: opcode,
        result: RuntimeType::Boolean,
    };

    match (left, right) {
        (ExprType::Null, ExprType::Null) => Some(plain(Vec::new(), Vec::new())),
        (ExprType::Null, other) | (other, ExprType::Null) => {
            (!other.is_void()).then(|| plain(Vec::new(), Vec::new()))
        }
        _ => {
            if let Some(numeric) = plan_numeric(left, right) {
                return Some(plain(numeric.left, numeric.right));
            }
            let (l, _) = strip_nullable(left)?;
            let (r, _) = strip_nullable(right)?;
            let comparable = match (&l, &r) {
                (RuntimeType::Boolean, RuntimeType::Boolean)
                | (RuntimeType::String, RuntimeType::String) => true,
                (RuntimeType::Array(a), RuntimeType::Array(b)) => a == b,
                _ => false,
            };
            comparable.then(|| plain(Vec::new(), Vec::new()))
        }
    }
}

/// `T?` becomes `(T, true)`, `T` becomes `(T, false)`; `null` has no type.
pub(super) fn strip_nullable(ty: &ExprType) -> Option<(RuntimeType, bool)> {
    match ty.runtime()? {
        RuntimeType::Nullable(inner) => Some((inner.as_ref().clone(), true)),
        other => Some((other.clone(), false)),
    }
}

pub(super) fn arithmetic_opcode(op: BinaryOp, ty: &RuntimeType) -> Option<OpCode> {
    use OpCode::*;
    Some(match (ty, op) {
        (RuntimeType::Int32, BinaryOp::Add) => AddI32,
        (RuntimeType::Int32, BinaryOp::Sub) => SubI32,
        (RuntimeType::Int32, BinaryOp::Mul) => MulI32,
        (RuntimeType::Int32, BinaryOp::Div) => DivI32,
        (RuntimeType::Int32, BinaryOp::Mod) => ModI32,
        (RuntimeType::Int64, BinaryOp::Add) => AddI64,
        (RuntimeType::Int64, BinaryOp::Sub) => SubI64,
        (RuntimeType::Int64, BinaryOp::Mul) => MulI64,
        (RuntimeType::Int64, BinaryOp::Div) => DivI64,
        (RuntimeType::Int64, BinaryOp::Mod) => ModI64,
        (RuntimeType::Single, BinaryOp::Add) => AddF32,
        (RuntimeType::Single, BinaryOp::Sub) => SubF32,
        (RuntimeType::Single, BinaryOp::Mul) => MulF32,
        (RuntimeType::Single, BinaryOp::Div) => DivF32,
        (RuntimeType::Single, BinaryOp::Mod) => ModF32,
        (RuntimeType::Double, BinaryOp::Add) => AddF64,
        (RuntimeType::Double, BinaryOp::Sub) => SubF64,
        (RuntimeType::Double, BinaryOp::Mul) => MulF64,
        (RuntimeType::Double, BinaryOp::Div) => DivF64,
        (RuntimeType::Double, BinaryOp::Mod) => ModF64,
        _ => return None,
    })
}

pub(super) fn negate_opcode(ty: &RuntimeType) -> Option<OpCode> {
    Some(match ty {
        RuntimeType::Int32 => OpCode::NegI32,
        RuntimeType::Int64 => OpCode::NegI64,
        RuntimeType::Single => OpCode::NegF32,
        RuntimeType::Double => OpCode::NegF64,
        _ => return None,
    })
}

fn comparison_opcode(op: BinaryOp) -> Option<OpCode> {
    Some(match op {
        BinaryOp::Equal => OpCode::Equal,
        BinaryOp::NotEqual => OpCode::NotEqual,
        BinaryOp::Less => OpCode::Less,
        BinaryOp::LessEqual => OpCode::LessEqual,
        BinaryOp::Greater => OpCode::Greater,
        BinaryOp::GreaterEqual => OpCode::GreaterEqual,
        _ => return None,
    })
}

/// `&&` and `||`.
///
/// ```text
/// a && b:  [a] JumpIfFalse F; [b]; Jump E; F: PushFalse; E:
/// a || b:  [a] JumpIfFalse R; PushTrue; Jump E; R: [b]; E:
/// ```
fn compile_logical(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    expr: &BinaryExpr<'_>,
) -> Result<ExprInfo> {
    let boolean = RuntimeType::Boolean;
    compiler.check(expr.left, &boolean)?;
    let short = compiler.emitter().emit_jump(OpCode::JumpIfFalse);
    if expr.op == BinaryOp::LogicalAnd {
        compiler.check(expr.right, &boolean)?;
        let end = compiler.emitter().emit_jump(OpCode::Jump);
        compiler.emitter().patch_jump(short).at(expr.span)?;
        compiler.emitter().emit_bool(false);
        compiler.emitter().patch_jump(end).at(expr.span)?;
    } else {
        compiler.emitter().emit_bool(true);
        let end = compiler.emitter().emit_jump(OpCode::Jump);
        compiler.emitter().patch_jump(short).at(expr.span)?;
        compiler.check(expr.right, &boolean)?;
        compiler.emitter().patch_jump(end).at(expr.span)?;
    }
    Ok(ExprInfo::value(boolean))
}

/// `a ?? b`.
///
/// ```text
/// [a] Dup IsNull JumpIfFalse L; Pop; [b] [convert b]; Jump E; L: [convert a]; E:
/// ```
///
/// The jump to `E` and the left conversion are omitted when the left value
/// needs no conversion.
fn compile_coalesce(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    expr: &BinaryExpr<'_>,
) -> Result<ExprInfo> {
    let left = compiler.infer(expr.left)?;
    let (right, fragment) = compiler.infer_fragment(expr.right)?;
    let plan = plan_coalesce(&left.ty, &right.ty).ok_or_else(|| {
        CompilationError::InvalidBinaryOperands {
            op: BinaryOp::Coalesce.to_string(),
            left: left.ty.to_string(),
            right: right.ty.to_string(),
            span: expr.span,
        }
    })?;

    let emitter = compiler.emitter();
    emitter.emit_dup();
    emitter.emit(OpCode::IsNull);
    let keep_left = emitter.emit_jump(OpCode::JumpIfFalse);
    emitter.emit_pop();
    emitter.append_fragment(fragment);
    compiler.emit_ops(&plan.right);
    if plan.left.is_empty() {
        compiler.emitter().patch_jump(keep_left).at(expr.span)?;
    } else {
        let end = compiler.emitter().emit_jump(OpCode::Jump);
        compiler.emitter().patch_jump(keep_left).at(expr.span)?;
        compiler.emit_ops(&plan.left);
        compiler.emitter().patch_jump(end).at(expr.span)?;
    }
    Ok(ExprInfo::value(plan.result))
}

struct CoalescePlan {
    left: Vec<OpCode>,
    right: Vec<OpCode>,
    result: RuntimeType,
}

fn plan_coalesce(left: &ExprType, right: &ExprType) -> Option<CoalescePlan> {
    let plan = |left, right, result| CoalescePlan {
        left,
        right,
        result,
    };
    let left = match left {
        ExprType::Null => {
            let result = right.runtime().filter(|ty| !ty.is_void())?.clone();
            return Some(plan(Vec::new(), Vec::new(), result));
        }
        ExprType::Value(ty) if ty.accepts_null() => ty,
        ExprType::Value(_) => return None,
    };

    // `int? ?? int` unwraps to `int`; the non-null left value is already one.
    if let RuntimeType::Nullable(inner) = left
        && let Some(conversion) = conversion::implicit(right, inner)
    {
        return Some(plan(Vec::new(), conversion.ops, inner.as_ref().clone()));
    }
    if let Some(conversion) = conversion::implicit(right, left) {
        return Some(plan(Vec::new(), conversion.ops, left.clone()));
    }
    let right = right.runtime().filter(|ty| !ty.is_void())?;
    let underlying = match left {
        RuntimeType::Nullable(inner) => inner.as_ref(),
        other => other,
    };
    let conversion = conversion::implicit(&ExprType::Value(underlying.clone()), right)?;
    Some(plan(conversion.ops, Vec::new(), right.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(ty: RuntimeType) -> ExprType {
        ExprType::Value(ty)
    }

    fn nullable(ty: RuntimeType) -> RuntimeType {
        RuntimeType::Nullable(Box::new(ty))
    }

    #[test]
    fn arithmetic_promotes_to_the_wider_operand() {
        let plan = plan_operator(
            BinaryOp::Add,
            &value(RuntimeType::Int32),
            &value(RuntimeType::Double),
        )
        .unwrap();
        assert_eq!(plan.left, vec![OpCode::I32ToF64]);
        assert!(plan.right.is_empty());
        assert_eq!(plan.op, OpCode::AddF64);
        assert_eq!(plan.result, RuntimeType::Double);

        let chars = plan_operator(BinaryOp::Sub, &value(RuntimeType::Char), &value(RuntimeType::Char)).unwrap();
        assert_eq!(chars.op, OpCode::SubI32);
        assert_eq!(chars.left, vec![OpCode::CharToI32]);
    }

    #[test]
    fn nullable_arithmetic_is_lifted() {
        let plan = plan_operator(
            BinaryOp::Mul,
            &value(nullable(RuntimeType::Int32)),
            &value(RuntimeType::Int64),
        )
        .unwrap();
        assert_eq!(plan.result, nullable(RuntimeType::Int64));
        assert_eq!(plan.op, OpCode::MulI64);
    }

    #[test]
    fn string_concatenation() {
        let plan = plan_operator(BinaryOp::Add, &value(RuntimeType::String), &value(RuntimeType::Int32)).unwrap();
        assert_eq!(plan.op, OpCode::Concat);
        assert!(plan_operator(BinaryOp::Add, &ExprType::Null, &value(RuntimeType::String)).is_some());
        assert!(plan_operator(BinaryOp::Sub, &value(RuntimeType::String), &value(RuntimeType::Int32)).is_none());
    }

    #[test]
    fn equality_rules() {
        let eq = |l, r| plan_operator(BinaryOp::Equal, &l, &r).is_some();
        assert!(eq(value(RuntimeType::String), ExprType::Null));
        assert!(eq(value(RuntimeType::Boolean), value(nullable(RuntimeType::Boolean))));
        assert!(eq(value(RuntimeType::Int32), value(RuntimeType::Double)));
        assert!(!eq(value(RuntimeType::Int32), value(RuntimeType::String)));
        assert!(!eq(value(RuntimeType::Boolean), value(RuntimeType::Int32)));
        let ints = RuntimeType::Array(Box::new(RuntimeType::Int32));
        assert!(eq(value(ints.clone()), value(ints)));
    }

    #[test]
    fn relational_needs_numbers() {
        assert!(plan_operator(BinaryOp::Less, &value(RuntimeType::Char), &value(RuntimeType::Int32)).is_some());
        assert!(plan_operator(BinaryOp::Less, &value(RuntimeType::String), &value(RuntimeType::String)).is_none());
        assert!(plan_operator(BinaryOp::Less, &value(RuntimeType::Boolean), &value(RuntimeType::Boolean)).is_none());
    }

    #[test]
    fn coalesce_result_types() {
        let unwrap = plan_coalesce(&value(nullable(RuntimeType::Int32)), &value(RuntimeType::Int32)).unwrap();
        assert_eq!(unwrap.result, RuntimeType::Int32);

        let widen = plan_coalesce(&value(nullable(RuntimeType::Int32)), &value(RuntimeType::Double)).unwrap();
        assert_eq!(widen.result, RuntimeType::Double);
        assert_eq!(widen.left, vec![OpCode::I32ToF64]);

        let text = plan_coalesce(&value(RuntimeType::String), &value(RuntimeType::String)).unwrap();
        assert_eq!(text.result, RuntimeType::String);

        assert!(plan_coalesce(&value(RuntimeType::Int32), &value(RuntimeType::Int32)).is_none());
        assert!(plan_coalesce(&value(RuntimeType::String), &value(RuntimeType::Int32)).is_none());
    }
}

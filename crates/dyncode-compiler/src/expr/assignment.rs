//! Assignment, compound assignment, and increment/decrement.
//!
//! Targets are locals (parameters included) and array elements. An element
//! target whose old value is read again (`a[i] += v`, `a[i]++`) keeps the
//! array and index in temporaries so each is evaluated once.

use dyncode_core::{RuntimeType, Span};
use dyncode_parser::ast::{AssignExpr, Expr};

use super::binary::compile_operator;
use super::{ExprCompiler, Result};
use crate::bytecode::OpCode;
use crate::conversion;
use crate::error::{AtSpan, CompilationError};
use crate::expr_info::{ExprInfo, ExprType};

/// Something that can be stored to.
enum Target {
    Local { slot: u8, ty: RuntimeType },
    /// The array and index have been pushed.
    Element { ty: RuntimeType },
}

impl Target {
    fn ty(&self) -> &RuntimeType {
        match self {
            Target::Local { ty, .. } | Target::Element { ty } => ty,
        }
    }
}

/// Resolve an assignment target, pushing the array and index of an element.
fn compile_target(compiler: &mut ExprCompiler<'_, '_, '_, '_>, target: &Expr<'_>) -> Result<Target> {
    match target.unparenthesized() {
        Expr::Ident(ident) => {
            if let Some(local) = compiler.ctx().lookup_local(ident.name) {
                return Ok(Target::Local {
                    slot: local.slot,
                    ty: local.ty.clone(),
                });
            }
            let registry = compiler.ctx().registry();
            let from = compiler.ctx().current_type();
            if registry.simple_constant(ident.name, from).is_some() {
                return Err(CompilationError::NotAssignable { span: ident.span });
            }
            Err(CompilationError::UnknownName {
                name: ident.name.to_string(),
                span: ident.span,
            })
        }
        Expr::Index(index) => {
            let object = compiler.infer(index.object)?;
            let ty = match object.ty.runtime() {
                Some(RuntimeType::Array(element)) => element.as_ref().clone(),
                Some(RuntimeType::String) => {
                    return Err(CompilationError::unsupported(
                        "assigning to a character of a string",
                        index.span,
                    ));
                }
                _ => {
                    return Err(CompilationError::InvalidUnaryOperand {
                        op: "[]".into(),
                        operand: object.ty.to_string(),
                        span: index.span,
                    });
                }
            };
            compiler.compile_index_operand(index.index)?;
            Ok(Target::Element { ty })
        }
        other => Err(CompilationError::NotAssignable { span: other.span() }),
    }
}

/// Copy the pushed array and index into temporaries and push them again,
/// so the element can be read and then written.
fn stash_element(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    span: Span,
) -> Result<(u8, u8)> {
    // Temp types only size the frame.
    let array = compiler.ctx().declare_temp(RuntimeType::Void, span)?;
    let index = compiler.ctx().declare_temp(RuntimeType::Void, span)?;
    let emitter = compiler.emitter();
    emitter.emit_set_local(index);
    emitter.emit_set_local(array);
    emitter.emit_get_local(array);
    emitter.emit_get_local(index);
    Ok((array, index))
}

/// Store the value on top of the stack into `target`, leaving a copy
/// behind when `want_value` is set.
fn store(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    target: &Target,
    want_value: bool,
    span: Span,
) -> Result<()> {
    match target {
        Target::Local { slot, .. } => {
            if want_value {
                compiler.emitter().emit_dup();
            }
            compiler.emitter().emit_set_local(*slot);
        }
        Target::Element { ty } => {
            if want_value {
                let temp = compiler.ctx().declare_temp(ty.clone(), span)?;
                let emitter = compiler.emitter();
                emitter.emit_dup();
                emitter.emit_set_local(temp);
                emitter.emit(OpCode::SetIndex);
                emitter.emit_get_local(temp);
            } else {
                compiler.emitter().emit(OpCode::SetIndex);
            }
        }
    }
    Ok(())
}

/// `target = value` or `target op= value`. The result is the stored value.
pub fn compile_assign(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    assign: &AssignExpr<'_>,
    want_value: bool,
) -> Result<ExprInfo> {
    let target = compile_target(compiler, assign.target)?;
    let ty = target.ty().clone();

    match assign.op.binary_op() {
        None => {
            compiler.check(assign.value, &ty)?;
        }
        Some(op) => {
            load_current(compiler, &target, assign.span)?;
            let (result, right) =
                compile_operator(compiler, op, &ExprType::Value(ty.clone()), assign.value, assign.span)?;
            convert_compound_result(compiler, &result.ty, &right, &ty, assign.value.span())?;
        }
    }

    store(compiler, &target, want_value, assign.span)?;
    Ok(if want_value {
        ExprInfo::value(ty)
    } else {
        ExprInfo::void()
    })
}

/// Push the current value of a target for a compound update.
fn load_current(compiler: &mut ExprCompiler<'_, '_, '_, '_>, target: &Target, span: Span) -> Result<()> {
    match target {
        Target::Local { slot, .. } => compiler.emitter().emit_get_local(*slot),
        Target::Element { .. } => {
            let (array, index) = stash_element(compiler, span)?;
            let emitter = compiler.emitter();
            emitter.emit_get_local(array);
            emitter.emit_get_local(index);
            emitter.emit(OpCode::GetIndex);
        }
    }
    Ok(())
}

/// `x op= y` stores `(T)(x op y)`, which is allowed when the result converts
/// implicitly, or when it converts explicitly and `y` alone converts
/// implicitly to `T`.
fn convert_compound_result(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    result: &ExprType,
    right: &ExprType,
    target: &RuntimeType,
    span: Span,
) -> Result<()> {
    if let Some(implicit) = conversion::implicit(result, target) {
        compiler.emit_ops(&implicit.ops);
        return Ok(());
    }
    if conversion::implicit(right, target).is_some()
        && let Some(explicit) = conversion::explicit(result, target)
    {
        compiler.emit_ops(&explicit.ops);
        return Ok(());
    }
    Err(CompilationError::TypeMismatch {
        from: result.to_string(),
        to: target.clone(),
        span,
    })
}

/// `++x`, `x++`, `--x` and `x--` on numeric and `char` targets.
pub fn compile_increment(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    operand: &Expr<'_>,
    increment: bool,
    prefix: bool,
    want_value: bool,
    span: Span,
) -> Result<ExprInfo> {
    let target = compile_target(compiler, operand)?;
    let ty = target.ty().clone();
    let step = step_ops(&ty, increment).ok_or_else(|| CompilationError::InvalidUnaryOperand {
        op: if increment { "++" } else { "--" }.into(),
        operand: ty.to_string(),
        span,
    })?;

    load_current(compiler, &target, span)?;
    if want_value && !prefix {
        // The old value stays under the store.
        match &target {
            Target::Local { .. } => compiler.emitter().emit_dup(),
            Target::Element { .. } => {
                let old = compiler.ctx().declare_temp(ty.clone(), span)?;
                compiler.emitter().emit_dup();
                compiler.emitter().emit_set_local(old);
                apply_step(compiler, &step, span)?;
                compiler.emitter().emit(OpCode::SetIndex);
                compiler.emitter().emit_get_local(old);
                return Ok(ExprInfo::value(ty));
            }
        }
    }
    apply_step(compiler, &step, span)?;
    store(compiler, &target, want_value && prefix, span)?;
    Ok(if want_value {
        ExprInfo::value(ty)
    } else {
        ExprInfo::void()
    })
}

/// How to add or subtract one for a type.
struct Step {
    /// Conversions applied before the arithmetic.
    widen: &'static [OpCode],
    one: RuntimeType,
    op: OpCode,
    /// Conversions applied after the arithmetic.
    narrow: &'static [OpCode],
}

fn step_ops(ty: &RuntimeType, increment: bool) -> Option<Step> {
    let pick = |add, sub| if increment { add } else { sub };
    Some(match ty {
        RuntimeType::Char => Step {
            widen: &[OpCode::CharToI32],
            one: RuntimeType::Int32,
            op: pick(OpCode::AddI32, OpCode::SubI32),
            narrow: &[OpCode::I32ToChar],
        },
        RuntimeType::Int32 => Step {
            widen: &[],
            one: RuntimeType::Int32,
            op: pick(OpCode::AddI32, OpCode::SubI32),
            narrow: &[],
        },
        RuntimeType::Int64 => Step {
            widen: &[],
            one: RuntimeType::Int64,
            op: pick(OpCode::AddI64, OpCode::SubI64),
            narrow: &[],
        },
        RuntimeType::Single => Step {
            widen: &[],
            one: RuntimeType::Single,
            op: pick(OpCode::AddF32, OpCode::SubF32),
            narrow: &[],
        },
        RuntimeType::Double => Step {
            widen: &[],
            one: RuntimeType::Double,
            op: pick(OpCode::AddF64, OpCode::SubF64),
            narrow: &[],
        },
        _ => return None,
    })
}

fn apply_step(compiler: &mut ExprCompiler<'_, '_, '_, '_>, step: &Step, span: Span) -> Result<()> {
    compiler.emit_ops(step.widen);
    let emitter = compiler.emitter();
    match step.one {
        RuntimeType::Int64 => emitter.emit_long(1).at(span)?,
        RuntimeType::Single => emitter.emit_f32(1.0).at(span)?,
        RuntimeType::Double => emitter.emit_f64(1.0).at(span)?,
        _ => emitter.emit_int(1).at(span)?,
    }
    emitter.emit(step.op);
    compiler.emit_ops(step.narrow);
    Ok(())
}

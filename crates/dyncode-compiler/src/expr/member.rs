//! Member access and indexing.
//!
//! A member access is static when its object is a path naming a type
//! (`Limits.Max`, `int.MaxValue`, `string.Empty`); otherwise the object is
//! compiled as a value and the member is one of the built-in properties
//! `Length`, `HasValue` and `Value`.

use dyncode_core::{RuntimeType, Value};
use dyncode_parser::ast::{Expr, IndexExpr, MemberExpr};

use super::{ExprCompiler, Result};
use crate::bytecode::OpCode;
use crate::error::CompilationError;
use crate::expr_info::{ExprInfo, ExprType};
use crate::registry::{Registry, TypeRef};

pub fn compile_member(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    member: &MemberExpr<'_>,
) -> Result<ExprInfo> {
    if let Some(target) = static_target(compiler, member.object) {
        return compile_static_member(compiler, &target, member);
    }
    let object = compiler.infer(member.object)?;
    compile_instance_member(compiler, &object.ty, member)
}

/// The type named by `object`, unless a local or constant of the same name
/// shadows it.
pub(super) fn static_target(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    object: &Expr<'_>,
) -> Option<TypeRef> {
    let path = object.as_path()?;
    let ctx = compiler.ctx();
    let registry = ctx.registry();
    let from = ctx.current_type();
    if ctx.lookup_local(path[0]).is_some() || registry.simple_constant(path[0], from).is_some() {
        return None;
    }
    registry.resolve_type_path(&path, from)
}

/// Display name of a type reference for diagnostics.
pub(super) fn type_ref_name(registry: &Registry<'_>, target: &TypeRef) -> String {
    match target {
        TypeRef::Script(index) => registry.ty(*index).qualified_name.clone(),
        TypeRef::Primitive(ty) => ty.to_string(),
        TypeRef::Host(name) => name.clone(),
    }
}

fn compile_static_member(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    target: &TypeRef,
    member: &MemberExpr<'_>,
) -> Result<ExprInfo> {
    let name = member.member.name;
    let span = member.member.span;
    let registry = compiler.ctx().registry();
    let from = compiler.ctx().current_type();

    let constant = match target {
        TypeRef::Script(owner) => match registry.ty(*owner).constants.get(name) {
            Some(constant) => {
                if !registry.is_accessible(*owner, constant.modifiers, from) {
                    return Err(CompilationError::Inaccessible {
                        name: format!("{}.{name}", registry.ty(*owner).qualified_name),
                        span,
                    });
                }
                Some((constant.value.clone(), constant.ty.clone()))
            }
            None if !registry.script_methods(*owner, name).is_empty() => {
                return Err(CompilationError::unsupported(
                    format!("method group '{name}' used as a value"),
                    span,
                ));
            }
            None => None,
        },
        TypeRef::Primitive(ty) => primitive_constant(ty, name).map(|value| (value, ty.clone())),
        TypeRef::Host(_) => None,
    };

    match constant {
        Some((value, ty)) => {
            compiler.emit_value(&value, span)?;
            Ok(ExprInfo::value(ty))
        }
        None => Err(CompilationError::UnknownMember {
            owner: type_ref_name(registry, target),
            member: name.to_string(),
            span,
        }),
    }
}

fn compile_instance_member(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    object: &ExprType,
    member: &MemberExpr<'_>,
) -> Result<ExprInfo> {
    let name = member.member.name;
    let ty = match (object.runtime(), name) {
        (Some(RuntimeType::String | RuntimeType::Array(_)), "Length") => {
            compiler.emitter().emit(OpCode::Length);
            RuntimeType::Int32
        }
        (Some(RuntimeType::Nullable(_)), "HasValue") => {
            compiler.emitter().emit(OpCode::IsNull);
            compiler.emitter().emit(OpCode::Not);
            RuntimeType::Boolean
        }
        (Some(RuntimeType::Nullable(inner)), "Value") => {
            compiler.emitter().emit(OpCode::Unwrap);
            inner.as_ref().clone()
        }
        (None, _) => {
            return Err(CompilationError::InvalidUnaryOperand {
                op: ".".into(),
                operand: object.to_string(),
                span: member.span,
            });
        }
        (Some(_), _) => {
            return Err(CompilationError::UnknownMember {
                owner: object.to_string(),
                member: name.to_string(),
                span: member.member.span,
            });
        }
    };
    Ok(ExprInfo::value(ty))
}

/// `array[index]` or `text[index]`.
pub fn compile_index(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    index: &IndexExpr<'_>,
) -> Result<ExprInfo> {
    let object = compiler.infer(index.object)?;
    let element = match object.ty.runtime() {
        Some(RuntimeType::Array(element)) => element.as_ref().clone(),
        Some(RuntimeType::String) => RuntimeType::Char,
        _ => {
            return Err(CompilationError::InvalidUnaryOperand {
                op: "[]".into(),
                operand: object.ty.to_string(),
                span: index.span,
            });
        }
    };
    compiler.compile_index_operand(index.index)?;
    compiler.emitter().emit(OpCode::GetIndex);
    Ok(ExprInfo::value(element))
}

/// Built-in constants of the primitive types.
fn primitive_constant(ty: &RuntimeType, name: &str) -> Option<Value> {
    Some(match (ty, name) {
        (RuntimeType::Int32, "MaxValue") => Value::Int32(i32::MAX),
        (RuntimeType::Int32, "MinValue") => Value::Int32(i32::MIN),
        (RuntimeType::Int64, "MaxValue") => Value::Int64(i64::MAX),
        (RuntimeType::Int64, "MinValue") => Value::Int64(i64::MIN),
        (RuntimeType::Char, "MaxValue") => Value::Char('\u{FFFF}'),
        (RuntimeType::Char, "MinValue") => Value::Char('\0'),
        (RuntimeType::Single, "MaxValue") => Value::Single(f32::MAX),
        (RuntimeType::Single, "MinValue") => Value::Single(f32::MIN),
        (RuntimeType::Single, "Epsilon") => Value::Single(f32::from_bits(1)),
        (RuntimeType::Single, "NaN") => Value::Single(f32::NAN),
        (RuntimeType::Single, "PositiveInfinity") => Value::Single(f32::INFINITY),
        (RuntimeType::Single, "NegativeInfinity") => Value::Single(f32::NEG_INFINITY),
        (RuntimeType::Double, "MaxValue") => Value::Double(f64::MAX),
        (RuntimeType::Double, "MinValue") => Value::Double(f64::MIN),
        (RuntimeType::Double, "Epsilon") => Value::Double(f64::from_bits(1)),
        (RuntimeType::Double, "NaN") => Value::Double(f64::NAN),
        (RuntimeType::Double, "PositiveInfinity") => Value::Double(f64::INFINITY),
        (RuntimeType::Double, "NegativeInfinity") => Value::Double(f64::NEG_INFINITY),
        (RuntimeType::String, "Empty") => Value::string(""),
        _ => return None,
    })
}

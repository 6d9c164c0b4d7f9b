//! Method calls.
//!
//! A call binds by name to script methods (`Helper(x)`, `Other.Helper(x)`)
//! or static host functions (`Math.Max(a, b)`, `string.Concat(a, b)`), then
//! by overload resolution over the argument types. The only instance method
//! is the built-in `ToString()`.

use dyncode_core::{RuntimeType, Span};
use dyncode_parser::ast::{CallExpr, Expr, MemberExpr};

use super::member::{static_target, type_ref_name};
use super::{ExprCompiler, Result};
use crate::bytecode::{BytecodeChunk, OpCode};
use crate::error::CompilationError;
use crate::expr_info::{ExprInfo, ExprType};
use crate::overload::{self, OverloadError};
use crate::registry::{Callees, Registry, TypeRef};

/// The methods a callee names, and how it named them.
struct Target {
    callees: Callees,
    /// Display name for diagnostics.
    name: String,
    /// Called through a type name rather than a bare name.
    via_type: bool,
}

pub fn compile_call(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    call: &CallExpr<'_>,
) -> Result<ExprInfo> {
    let target = match call.callee.unparenthesized() {
        Expr::Ident(ident) => {
            let registry = compiler.ctx().registry();
            let from = compiler.ctx().current_type();
            if compiler.ctx().lookup_local(ident.name).is_some() {
                return Err(CompilationError::unsupported(
                    format!("invoking the local '{}'", ident.name),
                    ident.span,
                ));
            }
            let callees = registry.simple_callees(ident.name, from).ok_or_else(|| {
                CompilationError::UnknownName {
                    name: ident.name.to_string(),
                    span: ident.span,
                }
            })?;
            Target {
                callees,
                name: ident.name.to_string(),
                via_type: false,
            }
        }
        Expr::Member(member) => match static_target(compiler, member.object) {
            Some(owner) => member_target(compiler.ctx().registry(), &owner, member)?,
            None => return compile_instance_call(compiler, member, call),
        },
        other => {
            return Err(CompilationError::unsupported(
                "calling the result of an expression",
                other.span(),
            ));
        }
    };

    let mut args: Vec<(ExprType, BytecodeChunk)> = Vec::with_capacity(call.args.len());
    for arg in call.args {
        let (info, code) = compiler.infer_fragment(arg)?;
        args.push((info.ty, code));
    }
    let arg_count = u8::try_from(args.len())
        .map_err(|_| CompilationError::unsupported("calls with more than 255 arguments", call.span))?;
    let arg_types: Vec<ExprType> = args.iter().map(|(ty, _)| ty.clone()).collect();

    let registry = compiler.ctx().registry();
    let selection = match &target.callees {
        Callees::Script(methods) => overload::select(
            methods.iter().map(|&index| registry.method(index).params.as_slice()),
            &arg_types,
        ),
        Callees::Host(functions) => overload::select(
            functions.iter().map(|&index| registry.host(index).params.as_slice()),
            &arg_types,
        ),
    }
    .map_err(|error| match error {
        OverloadError::NoMatch => CompilationError::NoMatchingOverload {
            name: target.name.clone(),
            args: overload::describe_args(&arg_types),
            span: call.span,
        },
        OverloadError::Ambiguous => CompilationError::AmbiguousCall {
            name: target.name.clone(),
            span: call.span,
        },
    })?;

    let (return_type, emit_call) = match &target.callees {
        Callees::Script(methods) => {
            let index = methods[selection.candidate];
            check_script_callee(compiler, index, target.via_type, call.callee.span())?;
            (registry.method(index).return_type.clone(), CallKind::Script(index))
        }
        Callees::Host(functions) => {
            let host_index = functions[selection.candidate];
            let import = compiler.ctx().import(host_index, call.span)?;
            (registry.host(host_index).return_type.clone(), CallKind::Host(import))
        }
    };

    for ((_, code), conversion) in args.into_iter().zip(&selection.conversions) {
        compiler.emitter().append_fragment(code);
        compiler.emit_ops(&conversion.ops);
    }
    match emit_call {
        CallKind::Script(index) => compiler.emitter().emit_call(index, arg_count),
        CallKind::Host(import) => compiler.emitter().emit_call_host(import, arg_count),
    }

    Ok(if return_type.is_void() {
        ExprInfo::void()
    } else {
        ExprInfo::value(return_type)
    })
}

enum CallKind {
    Script(u16),
    Host(u16),
}

/// `Type.Name(...)`: methods of a script type, or host functions of a
/// primitive or host type.
fn member_target(registry: &Registry<'_>, owner: &TypeRef, member: &MemberExpr<'_>) -> Result<Target> {
    let name = member.member.name;
    let callees = match owner {
        TypeRef::Script(index) => Callees::Script(registry.script_methods(*index, name)),
        TypeRef::Primitive(ty) => Callees::Host(
            Registry::primitive_host_type(ty)
                .map(|host| registry.host_functions(&host, name))
                .unwrap_or_default(),
        ),
        TypeRef::Host(host) => Callees::Host(registry.host_functions(host, name)),
    };
    let empty = match &callees {
        Callees::Script(methods) => methods.is_empty(),
        Callees::Host(functions) => functions.is_empty(),
    };
    let owner_name = type_ref_name(registry, owner);
    if empty {
        return Err(CompilationError::UnknownMember {
            owner: owner_name,
            member: name.to_string(),
            span: member.member.span,
        });
    }
    Ok(Target {
        callees,
        name: format!("{owner_name}.{name}"),
        via_type: true,
    })
}

/// Accessibility, and instance methods called without an instance.
fn check_script_callee(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    index: u16,
    via_type: bool,
    span: Span,
) -> Result<()> {
    let ctx = compiler.ctx();
    let registry = ctx.registry();
    let method = registry.method(index);
    let from = ctx.current_type();
    let qualified = || format!("{}.{}", registry.ty(method.owner).qualified_name, method.name());

    if !registry.is_accessible(method.owner, method.decl.modifiers, from) {
        return Err(CompilationError::Inaccessible {
            name: qualified(),
            span,
        });
    }
    if !method.is_static() && (via_type || ctx.is_static() || method.owner != from) {
        return Err(CompilationError::InstanceMethodFromStatic {
            name: qualified(),
            span,
        });
    }
    Ok(())
}

/// `value.ToString()`; no other instance methods exist.
fn compile_instance_call(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    member: &MemberExpr<'_>,
    call: &CallExpr<'_>,
) -> Result<ExprInfo> {
    let object = compiler.infer(member.object)?;
    let callable = member.member.name == "ToString"
        && call.args.is_empty()
        && object.ty.runtime().is_some_and(|ty| !ty.is_void());
    if !callable {
        return Err(CompilationError::UnknownMember {
            owner: object.ty.to_string(),
            member: member.member.name.to_string(),
            span: member.member.span,
        });
    }
    compiler.emitter().emit(OpCode::ToString);
    Ok(ExprInfo::value(RuntimeType::String))
}

//! Literal expressions.

use dyncode_core::RuntimeType;
use dyncode_parser::ast::{LiteralExpr, LiteralKind};

use super::{ExprCompiler, Result};
use crate::error::AtSpan;
use crate::expr_info::ExprInfo;

pub fn compile_literal(
    compiler: &mut ExprCompiler<'_, '_, '_, '_>,
    lit: &LiteralExpr<'_>,
) -> Result<ExprInfo> {
    let span = lit.span;
    let emitter = compiler.emitter();
    let ty = match lit.kind {
        LiteralKind::Int(v) => {
            emitter.emit_int(v).at(span)?;
            RuntimeType::Int32
        }
        LiteralKind::Long(v) => {
            emitter.emit_long(v).at(span)?;
            RuntimeType::Int64
        }
        LiteralKind::Float(v) => {
            emitter.emit_f32(v).at(span)?;
            RuntimeType::Single
        }
        LiteralKind::Double(v) => {
            emitter.emit_f64(v).at(span)?;
            RuntimeType::Double
        }
        LiteralKind::Bool(v) => {
            emitter.emit_bool(v);
            RuntimeType::Boolean
        }
        LiteralKind::Char(v) => {
            emitter.emit_char(v).at(span)?;
            RuntimeType::Char
        }
        LiteralKind::String(v) => {
            emitter.emit_string(v).at(span)?;
            RuntimeType::String
        }
        LiteralKind::Null => {
            emitter.emit_null();
            return Ok(ExprInfo::null());
        }
    };
    Ok(ExprInfo::value(ty))
}

//! Expression compiler.
//!
//! [`ExprCompiler`] type-checks an expression and emits the code that leaves
//! its value on the stack:
//! - `infer()` synthesizes the type from the expression itself
//! - `check()` additionally converts the result to an expected type
//!
//! Operands whose conversion depends on a later operand's type (binary
//! operators, call arguments, the branches of `?:`) are compiled into
//! detached fragments and re-appended once every type is known.

mod arrays;
mod assignment;
mod binary;
mod calls;
mod cast;
mod identifiers;
mod literals;
mod member;
mod ternary;
mod unary;

use dyncode_core::{RuntimeType, Span, Value};
use dyncode_parser::ast::{Expr, PostfixOp, UnaryOp};

use crate::bytecode::{ArrayElement, BytecodeChunk, OpCode};
use crate::context::CompilationContext;
use crate::conversion;
use crate::emit::BytecodeEmitter;
use crate::error::{AtSpan, CompilationError};
use crate::expr_info::{ExprInfo, ExprType};

type Result<T> = std::result::Result<T, CompilationError>;

pub struct ExprCompiler<'a, 'c, 'ast, 'pool> {
    ctx: &'a mut CompilationContext<'c, 'ast>,
    emitter: &'a mut BytecodeEmitter<'pool>,
}

impl<'a, 'c, 'ast, 'pool> ExprCompiler<'a, 'c, 'ast, 'pool> {
    pub fn new(
        ctx: &'a mut CompilationContext<'c, 'ast>,
        emitter: &'a mut BytecodeEmitter<'pool>,
    ) -> Self {
        Self { ctx, emitter }
    }

    pub fn ctx(&mut self) -> &mut CompilationContext<'c, 'ast> {
        self.ctx
    }

    pub fn emitter(&mut self) -> &mut BytecodeEmitter<'pool> {
        self.emitter
    }

    /// Compile `expr` and synthesize its type.
    pub fn infer(&mut self, expr: &Expr<'_>) -> Result<ExprInfo> {
        match expr {
            Expr::Literal(lit) => literals::compile_literal(self, lit),
            Expr::Ident(ident) => identifiers::compile_ident(self, ident),
            Expr::This(span) => Err(CompilationError::unsupported(
                "'this' (instance state)",
                *span,
            )),
            Expr::Binary(bin) => binary::compile_binary(self, bin),
            Expr::Unary(un) => unary::compile_unary(self, un),
            Expr::Postfix(post) => assignment::compile_increment(
                self,
                post.operand,
                post.op == PostfixOp::PostInc,
                false,
                true,
                post.span,
            ),
            Expr::Assign(assign) => assignment::compile_assign(self, assign, true),
            Expr::Ternary(ternary) => ternary::compile_ternary(self, ternary),
            Expr::Call(call) => calls::compile_call(self, call),
            Expr::Index(index) => member::compile_index(self, index),
            Expr::Member(member) => member::compile_member(self, member),
            Expr::Cast(cast) => cast::compile_cast(self, cast),
            Expr::NewArray(new) => arrays::compile_new_array(self, new),
            Expr::Paren(paren) => self.infer(paren.expr),
        }
    }

    /// Compile `expr` and convert it implicitly to `expected`.
    pub fn check(&mut self, expr: &Expr<'_>, expected: &RuntimeType) -> Result<ExprInfo> {
        let info = self.infer(expr)?;
        self.convert(&info.ty, expected, expr.span())?;
        Ok(ExprInfo::value(expected.clone()))
    }

    /// Compile an expression whose value is discarded: an assignment, call,
    /// increment or decrement.
    pub fn compile_statement_expr(&mut self, expr: &Expr<'_>) -> Result<()> {
        let info = match expr {
            Expr::Assign(assign) => assignment::compile_assign(self, assign, false)?,
            Expr::Postfix(post) => assignment::compile_increment(
                self,
                post.operand,
                post.op == PostfixOp::PostInc,
                false,
                false,
                post.span,
            )?,
            Expr::Unary(un) if matches!(un.op, UnaryOp::PreInc | UnaryOp::PreDec) => {
                assignment::compile_increment(
                    self,
                    un.operand,
                    un.op == UnaryOp::PreInc,
                    true,
                    false,
                    un.span,
                )?
            }
            Expr::Call(call) => calls::compile_call(self, call)?,
            other => {
                return Err(CompilationError::NotAStatement { span: other.span() });
            }
        };
        if !info.ty.is_void() {
            self.emitter.emit_pop();
        }
        Ok(())
    }

    /// Compile `expr` into a detached fragment, returning its type and code.
    pub(crate) fn infer_fragment(&mut self, expr: &Expr<'_>) -> Result<(ExprInfo, BytecodeChunk)> {
        let start = self.emitter.current_offset();
        let info = self.infer(expr)?;
        Ok((info, self.emitter.take_fragment(start)))
    }

    /// Emit the implicit conversion `from -> to`, or fail with a type mismatch.
    pub(crate) fn convert(&mut self, from: &ExprType, to: &RuntimeType, span: Span) -> Result<()> {
        match conversion::implicit(from, to) {
            Some(conversion) => {
                self.emit_ops(&conversion.ops);
                Ok(())
            }
            None => Err(CompilationError::TypeMismatch {
                from: from.to_string(),
                to: to.clone(),
                span,
            }),
        }
    }

    pub(crate) fn emit_ops(&mut self, ops: &[OpCode]) {
        for &op in ops {
            self.emitter.emit(op);
        }
    }

    /// Compile an array or string index: `int`, `char` or `long`.
    pub(crate) fn compile_index_operand(&mut self, expr: &Expr<'_>) -> Result<()> {
        let info = self.infer(expr)?;
        if info.ty.is(&RuntimeType::Int64) {
            return Ok(());
        }
        self.convert(&info.ty, &RuntimeType::Int32, expr.span())
    }

    /// Push a compile-time constant.
    pub(crate) fn emit_value(&mut self, value: &Value, span: Span) -> Result<()> {
        let emitter = &mut *self.emitter;
        match value {
            Value::Null => emitter.emit_null(),
            Value::Bool(v) => emitter.emit_bool(*v),
            Value::Char(v) => emitter.emit_char(*v).at(span)?,
            Value::Int32(v) => emitter.emit_int(*v).at(span)?,
            Value::Int64(v) => emitter.emit_long(*v).at(span)?,
            Value::Single(v) => emitter.emit_f32(*v).at(span)?,
            Value::Double(v) => emitter.emit_f64(*v).at(span)?,
            Value::String(v) => emitter.emit_string(v).at(span)?,
            Value::Array(_) => {
                return Err(CompilationError::unsupported("array constants", span));
            }
        }
        Ok(())
    }

    /// Push the default value of `ty`: zero, `false`, `'\0'` or null.
    pub(crate) fn emit_default(&mut self, ty: &RuntimeType, span: Span) -> Result<()> {
        let value = match ty {
            RuntimeType::Boolean => Value::Bool(false),
            RuntimeType::Char => Value::Char('\0'),
            RuntimeType::Int32 => Value::Int32(0),
            RuntimeType::Int64 => Value::Int64(0),
            RuntimeType::Single => Value::Single(0.0),
            RuntimeType::Double => Value::Double(0.0),
            _ => Value::Null,
        };
        self.emit_value(&value, span)
    }
}

/// The `NewArray` fill class for an element type.
pub(crate) fn array_element(ty: &RuntimeType) -> ArrayElement {
    match ty {
        RuntimeType::Boolean => ArrayElement::Bool,
        RuntimeType::Char => ArrayElement::Char,
        RuntimeType::Int32 => ArrayElement::Int32,
        RuntimeType::Int64 => ArrayElement::Int64,
        RuntimeType::Single => ArrayElement::Single,
        RuntimeType::Double => ArrayElement::Double,
        _ => ArrayElement::Reference,
    }
}

#[cfg(test)]
mod tests;

//! Semantic errors found while compiling method bodies.
//!
//! Every error carries the span it was found at and converts into a
//! [`Diagnostic`] for the caller.

use dyncode_core::{Diagnostic, RuntimeType, Span};
use thiserror::Error;

use crate::emit::EmitError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    #[error("the type or namespace name '{name}' could not be found")]
    UnknownType { name: String, span: Span },

    #[error("type '{name}' is not supported here")]
    UnsupportedType { name: String, span: Span },

    #[error("the name '{name}' does not exist in the current context")]
    UnknownName { name: String, span: Span },

    #[error("'{owner}' does not contain a definition for '{member}'")]
    UnknownMember {
        owner: String,
        member: String,
        span: Span,
    },

    #[error("no overload for method '{name}' takes arguments ({args})")]
    NoMatchingOverload {
        name: String,
        args: String,
        span: Span,
    },

    #[error("the call is ambiguous between overloads of '{name}'")]
    AmbiguousCall { name: String, span: Span },

    #[error("'{name}' is inaccessible due to its protection level")]
    Inaccessible { name: String, span: Span },

    #[error("an object reference is required for the non-static method '{name}'")]
    InstanceMethodFromStatic { name: String, span: Span },

    #[error("cannot implicitly convert type '{from}' to '{to}'")]
    TypeMismatch {
        from: String,
        to: RuntimeType,
        span: Span,
    },

    #[error("cannot convert type '{from}' to '{to}'")]
    InvalidCast {
        from: String,
        to: RuntimeType,
        span: Span,
    },

    #[error("operator '{op}' cannot be applied to operands of type '{left}' and '{right}'")]
    InvalidBinaryOperands {
        op: String,
        left: String,
        right: String,
        span: Span,
    },

    #[error("operator '{op}' cannot be applied to operand of type '{operand}'")]
    InvalidUnaryOperand {
        op: String,
        operand: String,
        span: Span,
    },

    #[error("the left-hand side of an assignment must be a variable or array element")]
    NotAssignable { span: Span },

    #[error("only assignment, call, increment and decrement expressions can be used as a statement")]
    NotAStatement { span: Span },

    #[error("a local variable named '{name}' is already defined in this scope")]
    DuplicateLocal { name: String, span: Span },

    #[error("type '{owner}' already defines a member called '{name}' with the same parameter types")]
    DuplicateMethod {
        owner: String,
        name: String,
        span: Span,
    },

    #[error("cannot infer the type of '{name}' from '{init}'")]
    CannotInferType {
        name: String,
        init: String,
        span: Span,
    },

    #[error("'{name}': not all code paths return a value")]
    MissingReturn { name: String, span: Span },

    #[error("an object of a type convertible to '{expected}' is required")]
    MissingReturnValue { expected: RuntimeType, span: Span },

    #[error("since '{name}' returns void, a return keyword must not be followed by an expression")]
    ReturnValueInVoid { name: String, span: Span },

    #[error("'{name}' must declare a body because it is not marked abstract")]
    MissingBody { name: String, span: Span },

    #[error("the expression being assigned to '{name}' must be constant")]
    NotConstant { name: String, span: Span },

    #[error("{feature} is not supported")]
    Unsupported { feature: String, span: Span },

    #[error("{source}")]
    Emit { source: EmitError, span: Span },
}

impl CompilationError {
    pub fn span(&self) -> Span {
        match self {
            CompilationError::UnknownType { span, .. }
            | CompilationError::UnsupportedType { span, .. }
            | CompilationError::UnknownName { span, .. }
            | CompilationError::UnknownMember { span, .. }
            | CompilationError::NoMatchingOverload { span, .. }
            | CompilationError::AmbiguousCall { span, .. }
            | CompilationError::Inaccessible { span, .. }
            | CompilationError::InstanceMethodFromStatic { span, .. }
            | CompilationError::TypeMismatch { span, .. }
            | CompilationError::InvalidCast { span, .. }
            | CompilationError::InvalidBinaryOperands { span, .. }
            | CompilationError::InvalidUnaryOperand { span, .. }
            | CompilationError::NotAssignable { span }
            | CompilationError::NotAStatement { span }
            | CompilationError::DuplicateLocal { span, .. }
            | CompilationError::DuplicateMethod { span, .. }
            | CompilationError::CannotInferType { span, .. }
            | CompilationError::MissingReturn { span, .. }
            | CompilationError::MissingReturnValue { span, .. }
            | CompilationError::ReturnValueInVoid { span, .. }
            | CompilationError::MissingBody { span, .. }
            | CompilationError::NotConstant { span, .. }
            | CompilationError::Unsupported { span, .. }
            | CompilationError::Emit { span, .. } => *span,
        }
    }

    pub fn unsupported(feature: impl Into<String>, span: Span) -> Self {
        CompilationError::Unsupported {
            feature: feature.into(),
            span,
        }
    }

    pub fn emit(source: impl Into<EmitError>, span: Span) -> Self {
        CompilationError::Emit {
            source: source.into(),
            span,
        }
    }
}

/// Attach a source location to an emitter failure.
pub(crate) trait AtSpan<T> {
    fn at(self, span: Span) -> Result<T, CompilationError>;
}

impl<T, E: Into<EmitError>> AtSpan<T> for Result<T, E> {
    fn at(self, span: Span) -> Result<T, CompilationError> {
        self.map_err(|error| CompilationError::emit(error, span))
    }
}

impl From<CompilationError> for Diagnostic {
    fn from(error: CompilationError) -> Self {
        Diagnostic::error(error.span(), error.to_string())
    }
}

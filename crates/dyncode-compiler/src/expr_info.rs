//! Result of type-checking an expression.

use std::fmt;

use dyncode_core::RuntimeType;

/// Static type of a compiled expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprType {
    /// The `null` literal, which has no type of its own.
    Null,
    Value(RuntimeType),
}

impl ExprType {
    pub fn runtime(&self) -> Option<&RuntimeType> {
        match self {
            ExprType::Null => None,
            ExprType::Value(ty) => Some(ty),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, ExprType::Value(RuntimeType::Void))
    }

    pub fn is(&self, ty: &RuntimeType) -> bool {
        self.runtime() == Some(ty)
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprType::Null => f.write_str("<null>"),
            ExprType::Value(ty) => write!(f, "{ty}"),
        }
    }
}

/// Type information for a compiled expression whose value is on the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprInfo {
    pub ty: ExprType,
}

impl ExprInfo {
    pub fn value(ty: RuntimeType) -> Self {
        Self {
            ty: ExprType::Value(ty),
        }
    }

    pub fn null() -> Self {
        Self { ty: ExprType::Null }
    }

    pub fn void() -> Self {
        Self::value(RuntimeType::Void)
    }
}

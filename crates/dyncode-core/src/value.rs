//! Runtime values.
//!
//! [`Value`] is what the VM keeps on its operand stack and in local slots, and
//! what crosses the boundary between host code and compiled members. Nullable
//! values are not boxed: a `T?` slot holds either a plain `T` value or
//! [`Value::Null`].

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::RuntimeType;

/// Shared, mutable array storage. Arrays have reference semantics.
#[derive(Clone, Default)]
pub struct ArrayRef(Arc<RwLock<Vec<Value>>>);

impl ArrayRef {
    pub fn new(items: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    /// Read access. A poisoned lock still yields the data; values are plain data.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<Value>> {
        self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<Value>> {
        self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether two handles point at the same storage.
    pub fn same(&self, other: &ArrayRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.read().iter()).finish()
    }
}

/// A value held by the runtime.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    String(Arc<str>),
    Array(ArrayRef),
}

impl Value {
    /// Build a string value.
    pub fn string(text: impl AsRef<str>) -> Self {
        Value::String(Arc::from(text.as_ref()))
    }

    /// Build an array value from its elements.
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(ArrayRef::new(items))
    }

    /// Human-readable kind name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::Int32(_) => "int",
            Value::Int64(_) => "long",
            Value::Single(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Array(_) => "array",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value can be stored in a slot of type `ty`.
    pub fn fits(&self, ty: &RuntimeType) -> bool {
        match (self, ty) {
            (Value::Null, ty) => ty.accepts_null(),
            (value, RuntimeType::Nullable(inner)) => value.fits(inner),
            (Value::Bool(_), RuntimeType::Boolean)
            | (Value::Char(_), RuntimeType::Char)
            | (Value::Int32(_), RuntimeType::Int32)
            | (Value::Int64(_), RuntimeType::Int64)
            | (Value::Single(_), RuntimeType::Single)
            | (Value::Double(_), RuntimeType::Double)
            | (Value::String(_), RuntimeType::String) => true,
            (Value::Array(items), RuntimeType::Array(element)) => {
                items.read().iter().all(|item| item.fits(element))
            }
            _ => false,
        }
    }

    /// The text `ToString()` produces for this value.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Char(c) => c.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Single(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::String(s) => s.to_string(),
            Value::Array(_) => "Array".to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Single(a), Value::Single(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.same(b) || *a.read() == *b.read(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_fits_reference_and_nullable_types() {
        assert!(Value::Null.fits(&RuntimeType::String));
        assert!(Value::Null.fits(&RuntimeType::Nullable(Box::new(RuntimeType::Int32))));
        assert!(!Value::Null.fits(&RuntimeType::Int32));
    }

    #[test]
    fn values_fit_their_own_kind_only() {
        assert!(Value::Int32(1).fits(&RuntimeType::Int32));
        assert!(!Value::Int32(1).fits(&RuntimeType::Int64));
        assert!(Value::Int32(1).fits(&RuntimeType::Nullable(Box::new(RuntimeType::Int32))));
        let arr = Value::array(vec![Value::Int32(1), Value::Int32(2)]);
        assert!(arr.fits(&RuntimeType::Array(Box::new(RuntimeType::Int32))));
        assert!(!arr.fits(&RuntimeType::Array(Box::new(RuntimeType::String))));
    }

    #[test]
    fn arrays_share_storage() {
        let a = ArrayRef::new(vec![Value::Int32(1)]);
        let b = a.clone();
        b.write()[0] = Value::Int32(9);
        assert_eq!(a.read()[0], Value::Int32(9));
        assert!(a.same(&b));
    }

    #[test]
    fn display_matches_to_string_conventions() {
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Double(2.0).to_string(), "2");
        assert_eq!(Value::Double(1.5).to_string(), "1.5");
        assert_eq!(Value::Null.to_string(), "");
    }
}

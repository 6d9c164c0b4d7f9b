//! Conversions between Rust values and runtime [`Value`]s.
//!
//! - [`FromValue`]: extract a Rust value from a [`Value`]
//! - [`IntoValue`]: wrap a Rust value as a [`Value`]
//!
//! Conversions are exact: an `Int32` value only converts to `i32`, never to
//! `i64`. Widening happens inside compiled code, not at the host boundary, so
//! a typed callable with the wrong Rust types fails loudly instead of silently
//! reinterpreting its arguments.

use crate::Value;
use crate::error::ConversionError;

/// Extract a Rust value from a runtime value.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

/// Convert a Rust value into a runtime value.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

macro_rules! impl_value_conversions {
    ($($ty:ty => $variant:ident, $expected:literal);* $(;)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(ConversionError::TypeMismatch {
                            expected: $expected,
                            actual: other.type_name(),
                        }),
                    }
                }
            }

            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }
        )*
    };
}

impl_value_conversions!(
    bool => Bool, "bool";
    char => Char, "char";
    i32 => Int32, "int";
    i64 => Int64, "long";
    f32 => Single, "float";
    f64 => Double, "double";
);

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(s) => Ok(s.to_string()),
            Value::Null => Err(ConversionError::UnexpectedNull { expected: "string" }),
            other => Err(ConversionError::TypeMismatch {
                expected: "string",
                actual: other.type_name(),
            }),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::string(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::string(self)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Array(items) => items
                .read()
                .iter()
                .cloned()
                .map(T::from_value)
                .collect(),
            Value::Null => Err(ConversionError::UnexpectedNull { expected: "array" }),
            other => Err(ConversionError::TypeMismatch {
                expected: "array",
                actual: other.type_name(),
            }),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::array(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_primitive_conversions() {
        assert_eq!(i32::from_value(Value::Int32(12)), Ok(12));
        assert_eq!(
            i64::from_value(Value::Int32(12)),
            Err(ConversionError::TypeMismatch {
                expected: "long",
                actual: "int"
            })
        );
    }

    #[test]
    fn strings_and_null() {
        assert_eq!(String::from_value(Value::string("hi")), Ok("hi".to_string()));
        assert!(matches!(
            String::from_value(Value::Null),
            Err(ConversionError::UnexpectedNull { .. })
        ));
        assert_eq!(Option::<String>::from_value(Value::Null), Ok(None));
    }

    #[test]
    fn vectors_convert_element_wise() {
        let value = vec![1, 2, 3].into_value();
        assert_eq!(Vec::<i32>::from_value(value), Ok(vec![1, 2, 3]));
        let mixed = Value::array(vec![Value::Int32(1), Value::Bool(true)]);
        assert!(Vec::<i32>::from_value(mixed).is_err());
    }
}

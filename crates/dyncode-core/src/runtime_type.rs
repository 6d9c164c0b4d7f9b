//! Types understood by the bytecode runtime.
//!
//! [`RuntimeType`] is the resolved, semantic form of a type inside compiled
//! code, as opposed to the textual names the parser sees. Every runtime type
//! maps back to a [`TypeDescriptor`] so bound members can be checked against a
//! caller's contract.

use std::fmt;

use crate::TypeDescriptor;

/// A type the runtime can store and pass around.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuntimeType {
    Void,
    Boolean,
    Char,
    Int32,
    Int64,
    Single,
    Double,
    String,
    /// Single-dimensional array of an element type.
    Array(Box<RuntimeType>),
    /// Value that may also be null.
    Nullable(Box<RuntimeType>),
}

impl RuntimeType {
    /// Canonical short name of a primitive kind, or `None` for composites.
    pub fn primitive_name(&self) -> Option<&'static str> {
        Some(match self {
            RuntimeType::Void => "Void",
            RuntimeType::Boolean => "Boolean",
            RuntimeType::Char => "Char",
            RuntimeType::Int32 => "Int32",
            RuntimeType::Int64 => "Int64",
            RuntimeType::Single => "Single",
            RuntimeType::Double => "Double",
            RuntimeType::String => "String",
            RuntimeType::Array(_) | RuntimeType::Nullable(_) => return None,
        })
    }

    /// Resolve a canonical short name (`Int32`, `String`, ...) to a primitive.
    pub fn from_primitive_name(name: &str) -> Option<Self> {
        Some(match name {
            "Void" => RuntimeType::Void,
            "Boolean" => RuntimeType::Boolean,
            "Char" => RuntimeType::Char,
            "Int32" => RuntimeType::Int32,
            "Int64" => RuntimeType::Int64,
            "Single" => RuntimeType::Single,
            "Double" => RuntimeType::Double,
            "String" => RuntimeType::String,
            _ => return None,
        })
    }

    /// The descriptor a caller would use for this type.
    pub fn descriptor(&self) -> TypeDescriptor {
        match self {
            RuntimeType::Array(element) => element.descriptor().array_of(),
            RuntimeType::Nullable(inner) => inner.descriptor().nullable_of(),
            primitive => TypeDescriptor::named(primitive.primitive_name().unwrap_or("Void")),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, RuntimeType::Void)
    }

    /// Integral or floating point.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            RuntimeType::Int32 | RuntimeType::Int64 | RuntimeType::Single | RuntimeType::Double
        )
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, RuntimeType::Int32 | RuntimeType::Int64)
    }

    /// Whether `null` is a valid value of this type.
    pub fn accepts_null(&self) -> bool {
        matches!(
            self,
            RuntimeType::String | RuntimeType::Array(_) | RuntimeType::Nullable(_)
        )
    }

    /// Rank used for implicit numeric widening; higher ranks absorb lower ones.
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            RuntimeType::Char => Some(0),
            RuntimeType::Int32 => Some(1),
            RuntimeType::Int64 => Some(2),
            RuntimeType::Single => Some(3),
            RuntimeType::Double => Some(4),
            _ => None,
        }
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeType::Void => f.write_str("void"),
            RuntimeType::Boolean => f.write_str("bool"),
            RuntimeType::Char => f.write_str("char"),
            RuntimeType::Int32 => f.write_str("int"),
            RuntimeType::Int64 => f.write_str("long"),
            RuntimeType::Single => f.write_str("float"),
            RuntimeType::Double => f.write_str("double"),
            RuntimeType::String => f.write_str("string"),
            RuntimeType::Array(element) => write!(f, "{element}[]"),
            RuntimeType::Nullable(inner) => write!(f, "{inner}?"),
        }
    }
}

//! Shared building blocks for dyncode.
//!
//! - [`Span`] and [`Diagnostic`]s for source locations and compiler messages
//! - [`type_name::normalize`] and [`TypeDescriptor`] for canonical type identity
//! - [`RuntimeType`] and [`Value`] for the bytecode runtime
//! - [`FromValue`] / [`IntoValue`] for crossing the host boundary
//! - the phase error types in [`error`]

pub mod convert;
pub mod diagnostic;
pub mod error;
pub mod runtime_type;
pub mod span;
pub mod type_desc;
pub mod type_name;
pub mod value;

pub use convert::{FromValue, IntoValue};
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use error::{ConversionError, LexError, ParseError, ParseErrorKind, ParseErrors, RuntimeError};
pub use runtime_type::RuntimeType;
pub use span::Span;
pub use type_desc::{HostType, TypeDescriptor};
pub use value::{ArrayRef, Value};

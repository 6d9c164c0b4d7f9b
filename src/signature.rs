//! Rust-side callable shapes.
//!
//! [`HostArgs`] is implemented for tuples of up to eight argument types and
//! [`HostReturn`] for every supported result type, so a contract and a typed
//! call can be derived from a Rust signature such as `(i32, i32) -> i32`.

use dyncode_core::{ConversionError, FromValue, HostType, IntoValue, TypeDescriptor, Value};

/// An argument tuple.
pub trait HostArgs {
    /// Descriptors of the arguments, in order.
    fn descriptors() -> Vec<TypeDescriptor>;

    fn into_values(self) -> Vec<Value>;
}

macro_rules! impl_host_args {
    ($($name:ident),*) => {
        impl<$($name: HostType + IntoValue),*> HostArgs for ($($name,)*) {
            fn descriptors() -> Vec<TypeDescriptor> {
                vec![$($name::descriptor()),*]
            }

            #[allow(non_snake_case)]
            fn into_values(self) -> Vec<Value> {
                let ($($name,)*) = self;
                vec![$($name.into_value()),*]
            }
        }
    };
}

impl_host_args!();
impl_host_args!(A);
impl_host_args!(A, B);
impl_host_args!(A, B, C);
impl_host_args!(A, B, C, D);
impl_host_args!(A, B, C, D, E);
impl_host_args!(A, B, C, D, E, F);
impl_host_args!(A, B, C, D, E, F, G);
impl_host_args!(A, B, C, D, E, F, G, H);

/// A result type; `()` stands for "no value".
pub trait HostReturn: Sized {
    /// `None` for procedures.
    fn descriptor() -> Option<TypeDescriptor>;

    /// Convert what a callable returned.
    fn from_return(value: Option<Value>) -> Result<Self, ConversionError>;
}

impl HostReturn for () {
    fn descriptor() -> Option<TypeDescriptor> {
        None
    }

    fn from_return(_value: Option<Value>) -> Result<Self, ConversionError> {
        Ok(())
    }
}

fn returned_value<T: FromValue>(value: Option<Value>) -> Result<T, ConversionError> {
    match value {
        Some(value) => T::from_value(value),
        None => Err(ConversionError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            actual: "void",
        }),
    }
}

macro_rules! impl_host_return {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HostReturn for $ty {
                fn descriptor() -> Option<TypeDescriptor> {
                    Some(<$ty as HostType>::descriptor())
                }

                fn from_return(value: Option<Value>) -> Result<Self, ConversionError> {
                    returned_value(value)
                }
            }
        )*
    };
}

impl_host_return!(bool, char, i32, i64, f32, f64, String);

impl<T: HostType + FromValue> HostReturn for Vec<T> {
    fn descriptor() -> Option<TypeDescriptor> {
        Some(<Vec<T> as HostType>::descriptor())
    }

    fn from_return(value: Option<Value>) -> Result<Self, ConversionError> {
        returned_value(value)
    }
}

impl<T: HostType + FromValue> HostReturn for Option<T> {
    fn descriptor() -> Option<TypeDescriptor> {
        Some(<Option<T> as HostType>::descriptor())
    }

    fn from_return(value: Option<Value>) -> Result<Self, ConversionError> {
        returned_value(value)
    }
}

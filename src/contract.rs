//! Callable contracts and their builder.
//!
//! A [`CallableContract`] is the shape a caller wants to bind: an ordered
//! list of input types plus an optional output type. A contract with an
//! output is a *function*, one without is a *procedure*.
//!
//! ```
//! use dyncode::{CallableContract, ContractBuilder};
//!
//! let add = ContractBuilder::new().input("int").input("int").output("int").build_function()?;
//! assert_eq!(add.to_string(), "(Int32, Int32) -> Int32");
//! assert_eq!(add, CallableContract::for_signature::<(i32, i32), i32>()?);
//! # Ok::<(), dyncode::ContractError>(())
//! ```

use std::fmt;

use dyncode_core::TypeDescriptor;
use thiserror::Error;

use crate::signature::{HostArgs, HostReturn};

/// Whether a contract produces a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallableKind {
    Function,
    Procedure,
}

impl CallableKind {
    /// Inclusive range of supported input counts.
    pub fn input_range(&self) -> (usize, usize) {
        match self {
            CallableKind::Function => (0, 7),
            CallableKind::Procedure => (1, 8),
        }
    }
}

impl fmt::Display for CallableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CallableKind::Function => "function",
            CallableKind::Procedure => "procedure",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("a function contract needs an output type")]
    MissingOutput,

    #[error("a procedure contract cannot have an output type")]
    UnexpectedOutput,

    #[error(
        "{kind} contracts take {} to {} inputs, got {inputs}",
        .kind.input_range().0,
        .kind.input_range().1
    )]
    UnsupportedArity { kind: CallableKind, inputs: usize },
}

/// The shape of a callable: ordered inputs and an optional output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallableContract {
    inputs: Vec<TypeDescriptor>,
    output: Option<TypeDescriptor>,
}

impl CallableContract {
    /// A function contract from `inputs` and `output`. A `void` output
    /// gives a procedure.
    pub fn function<I, T>(inputs: I, output: impl Into<TypeDescriptor>) -> Result<Self, ContractError>
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeDescriptor>,
    {
        let builder = ContractBuilder::new().inputs(inputs).output(output);
        if builder.output.is_some() {
            builder.build_function()
        } else {
            builder.build_procedure()
        }
    }

    /// A procedure contract from `inputs`.
    pub fn procedure<I, T>(inputs: I) -> Result<Self, ContractError>
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeDescriptor>,
    {
        ContractBuilder::new().inputs(inputs).build_procedure()
    }

    /// The contract of a Rust signature `Args -> R`; `R = ()` gives a
    /// procedure.
    pub fn for_signature<Args: HostArgs, R: HostReturn>() -> Result<Self, ContractError> {
        let builder = ContractBuilder::new().inputs(Args::descriptors());
        match R::descriptor() {
            Some(output) => builder.output(output).build_function(),
            None => builder.build_procedure(),
        }
    }

    pub fn inputs(&self) -> &[TypeDescriptor] {
        &self.inputs
    }

    /// `None` for procedures.
    pub fn output(&self) -> Option<&TypeDescriptor> {
        self.output.as_ref()
    }

    pub fn kind(&self) -> CallableKind {
        if self.output.is_some() {
            CallableKind::Function
        } else {
            CallableKind::Procedure
        }
    }

    pub fn arity(&self) -> usize {
        self.inputs.len()
    }
}

impl fmt::Display for CallableContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, input) in self.inputs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{input}")?;
        }
        f.write_str(")")?;
        match &self.output {
            Some(output) => write!(f, " -> {output}"),
            None => f.write_str(" -> Void"),
        }
    }
}

/// Builds a [`CallableContract`] one type at a time.
///
/// The builder is consumed by `build_function` or `build_procedure`; start a
/// new one for every contract.
#[derive(Debug, Clone, Default)]
pub struct ContractBuilder {
    inputs: Vec<TypeDescriptor>,
    output: Option<TypeDescriptor>,
}

impl ContractBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an input type.
    pub fn input(mut self, ty: impl Into<TypeDescriptor>) -> Self {
        self.inputs.push(ty.into());
        self
    }

    /// Append several input types.
    pub fn inputs<I, T>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeDescriptor>,
    {
        self.inputs.extend(types.into_iter().map(Into::into));
        self
    }

    /// Set the output type. `void` counts as no output.
    pub fn output(mut self, ty: impl Into<TypeDescriptor>) -> Self {
        let ty = ty.into();
        self.output = (!ty.is_void()).then_some(ty);
        self
    }

    pub fn build_function(self) -> Result<CallableContract, ContractError> {
        let output = self.output.ok_or(ContractError::MissingOutput)?;
        check_arity(CallableKind::Function, self.inputs.len())?;
        Ok(CallableContract {
            inputs: self.inputs,
            output: Some(output),
        })
    }

    pub fn build_procedure(self) -> Result<CallableContract, ContractError> {
        if self.output.is_some() {
            return Err(ContractError::UnexpectedOutput);
        }
        check_arity(CallableKind::Procedure, self.inputs.len())?;
        Ok(CallableContract {
            inputs: self.inputs,
            output: None,
        })
    }
}

fn check_arity(kind: CallableKind, inputs: usize) -> Result<(), ContractError> {
    let (min, max) = kind.input_range();
    if (min..=max).contains(&inputs) {
        Ok(())
    } else {
        Err(ContractError::UnsupportedArity { kind, inputs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_inputs(count: usize) -> ContractBuilder {
        (0..count).fold(ContractBuilder::new(), |builder, _| builder.input("int"))
    }

    #[test]
    fn function_arity_bounds() {
        assert!(with_inputs(0).output("int").build_function().is_ok());
        assert!(with_inputs(7).output("int").build_function().is_ok());
        assert_eq!(
            with_inputs(8).output("int").build_function(),
            Err(ContractError::UnsupportedArity {
                kind: CallableKind::Function,
                inputs: 8
            })
        );
    }

    #[test]
    fn procedure_arity_bounds() {
        assert!(with_inputs(1).build_procedure().is_ok());
        assert!(with_inputs(8).build_procedure().is_ok());
        assert!(matches!(
            with_inputs(0).build_procedure(),
            Err(ContractError::UnsupportedArity { inputs: 0, .. })
        ));
        assert!(matches!(
            with_inputs(9).build_procedure(),
            Err(ContractError::UnsupportedArity { inputs: 9, .. })
        ));
    }

    #[test]
    fn output_presence_is_checked_before_arity() {
        assert_eq!(with_inputs(9).build_function(), Err(ContractError::MissingOutput));
        assert_eq!(
            with_inputs(0).output("string").build_procedure(),
            Err(ContractError::UnexpectedOutput)
        );
    }

    #[test]
    fn void_output_makes_a_procedure() {
        let contract = with_inputs(1).output("void").build_procedure().unwrap();
        assert_eq!(contract.kind(), CallableKind::Procedure);
        assert_eq!(contract.to_string(), "(Int32) -> Void");

        for spelling in ["Void", "System.Void"] {
            assert_eq!(with_inputs(1).output(spelling).build_procedure(), Ok(contract.clone()));
        }
    }

    #[test]
    fn function_with_void_output_is_a_procedure() {
        let contract = CallableContract::function(["string"], "void").unwrap();
        assert_eq!(contract.kind(), CallableKind::Procedure);
        assert_eq!(contract.output(), None);
        assert_eq!(contract, CallableContract::procedure(["string"]).unwrap());
        assert!(matches!(
            CallableContract::function(Vec::<&str>::new(), "void"),
            Err(ContractError::UnsupportedArity { kind: CallableKind::Procedure, inputs: 0 })
        ));
    }

    #[test]
    fn spellings_of_one_type_build_equal_contracts() {
        let a = CallableContract::function(["int", "System.Int32"], "string").unwrap();
        let b = CallableContract::for_signature::<(i32, i32), String>().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.arity(), 2);
        assert_eq!(a.output().map(TypeDescriptor::full_name).as_deref(), Some("System.String"));
    }

    #[test]
    fn unit_return_derives_a_procedure() {
        let contract = CallableContract::for_signature::<(String,), ()>().unwrap();
        assert_eq!(contract, CallableContract::procedure(["string"]).unwrap());
        assert!(CallableContract::for_signature::<(), ()>().is_err());
    }

    #[test]
    fn arity_message_names_the_range() {
        let error = with_inputs(0).build_procedure().unwrap_err();
        assert_eq!(error.to_string(), "procedure contracts take 1 to 8 inputs, got 0");
    }
}

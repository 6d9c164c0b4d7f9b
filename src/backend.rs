//! Compiler and loader seams.
//!
//! The orchestrator reaches its compiler and loader only through
//! [`SourceCompiler`] and [`ModuleLoader`], so either can be replaced. The
//! defaults are [`BytecodeCompiler`] and [`VmLoader`](crate::vm::VmLoader).

use std::sync::Arc;

use dyncode_compiler::{BytecodeCompiler, HostSignature, ImageError};
use dyncode_core::{Diagnostics, TypeDescriptor};
use thiserror::Error;

use crate::callable::CompiledCallable;
use crate::contract::CallableContract;
use crate::module::{LoadedModule, MemberHandle};
use crate::references::ReferenceSet;

/// Turns source text into a loadable module image.
pub trait SourceCompiler: Send + Sync {
    fn compile_to_bytes(&self, source: &str, references: &ReferenceSet) -> Result<Vec<u8>, Diagnostics>;
}

/// Turns a module image into something members can be bound from.
pub trait ModuleLoader: Send + Sync {
    fn load_module(&self, bytes: &[u8], references: &ReferenceSet) -> Result<Arc<LoadedModule>, LoadError>;
}

impl SourceCompiler for BytecodeCompiler {
    fn compile_to_bytes(&self, source: &str, references: &ReferenceSet) -> Result<Vec<u8>, Diagnostics> {
        self.compile(source, &references.signatures())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("no reference provides {signature}")]
    UnresolvedImport { signature: HostSignature },

    #[error("invalid code in '{method}' at offset {offset}: {detail}")]
    InvalidCode {
        method: String,
        offset: usize,
        detail: String,
    },
}

/// A compiled member's types disagree with the requested contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("'{member}' takes {actual} parameters, the contract has {expected} inputs")]
    ArityMismatch {
        member: String,
        expected: usize,
        actual: usize,
    },

    #[error("parameter {index} of '{member}' is {actual}, the contract expects {expected}")]
    ParameterMismatch {
        member: String,
        index: usize,
        expected: TypeDescriptor,
        actual: TypeDescriptor,
    },

    #[error("'{member}' returns {actual}, the contract expects {}", display_output(.expected))]
    ReturnMismatch {
        member: String,
        expected: Option<TypeDescriptor>,
        actual: TypeDescriptor,
    },
}

fn display_output(output: &Option<TypeDescriptor>) -> String {
    match output {
        Some(output) => output.to_string(),
        None => "no value".to_string(),
    }
}

/// Bind `member` to `contract`, comparing fully qualified type names.
pub fn bind_callable(member: &MemberHandle, contract: &CallableContract) -> Result<CompiledCallable, BindingError> {
    check_binding(member, contract)?;
    Ok(CompiledCallable::new(member.module().clone(), member.index(), contract.clone()))
}

pub(crate) fn check_binding(member: &MemberHandle, contract: &CallableContract) -> Result<(), BindingError> {
    let params = member.params();
    if params.len() != contract.arity() {
        return Err(BindingError::ArityMismatch {
            member: member.qualified_name(),
            expected: contract.arity(),
            actual: params.len(),
        });
    }

    for (index, (param, input)) in params.iter().zip(contract.inputs()).enumerate() {
        let actual = param.descriptor();
        if actual != *input {
            return Err(BindingError::ParameterMismatch {
                member: member.qualified_name(),
                index,
                expected: input.clone(),
                actual,
            });
        }
    }

    let returns = member.return_type();
    let agrees = match contract.output() {
        Some(output) => returns.descriptor() == *output,
        None => returns.is_void(),
    };
    if !agrees {
        return Err(BindingError::ReturnMismatch {
            member: member.qualified_name(),
            expected: contract.output().cloned(),
            actual: returns.descriptor(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::VmLoader;

    fn member(source: &str, name: &str) -> MemberHandle {
        let references = ReferenceSet::standard();
        let bytes = BytecodeCompiler::new().compile_to_bytes(source, &references).unwrap();
        let module = VmLoader::new().load_module(&bytes, &references).unwrap();
        module
            .resolve_type("C")
            .and_then(|ty| ty.resolve_member(name, crate::Visibility::all()))
            .unwrap()
    }

    #[test]
    fn binds_matching_members() {
        let add = member("class C { static int Add(int a, int b) => a + b; }", "Add");
        let contract = CallableContract::for_signature::<(i32, i32), i32>().unwrap();
        assert!(bind_callable(&add, &contract).is_ok());
    }

    #[test]
    fn full_names_must_agree() {
        let add = member("class C { static int Add(int a, int b) => a + b; }", "Add");
        let contract = CallableContract::function(["Custom.Int32", "int"], "int").unwrap();
        assert!(matches!(
            bind_callable(&add, &contract),
            Err(BindingError::ParameterMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn arity_and_return_are_checked() {
        let log = member("class C { static void Log(string s) { } }", "Log");
        let two = CallableContract::procedure(["string", "string"]).unwrap();
        assert!(matches!(bind_callable(&log, &two), Err(BindingError::ArityMismatch { .. })));

        let function = CallableContract::function(["string"], "string").unwrap();
        let error = bind_callable(&log, &function).unwrap_err();
        assert_eq!(error.to_string(), "'C.Log' returns Void, the contract expects String");
    }
}

//! Bound, invocable members.
//!
//! A [`CompiledCallable`] pairs a loaded module with one of its methods and
//! the contract it was bound to. Each invocation runs on a fresh [`Vm`], so a
//! callable can be shared across threads and called concurrently.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use dyncode_core::{ConversionError, RuntimeError, TypeDescriptor, Value};
use thiserror::Error;

use crate::backend::BindingError;
use crate::contract::CallableContract;
use crate::module::LoadedModule;
use crate::options::DEFAULT_MAX_CALL_DEPTH;
use crate::signature::{HostArgs, HostReturn};
use crate::vm::Vm;

/// Failures of a single invocation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvokeError {
    #[error("expected {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("argument {index} must be {expected}, got {actual}")]
    ArgumentType {
        index: usize,
        expected: String,
        actual: &'static str,
    },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("cannot convert the result: {0}")]
    Conversion(#[from] ConversionError),
}

/// A compiled member bound to a [`CallableContract`].
#[derive(Clone)]
pub struct CompiledCallable {
    module: Arc<LoadedModule>,
    method: usize,
    contract: CallableContract,
    max_call_depth: usize,
}

impl CompiledCallable {
    pub(crate) fn new(module: Arc<LoadedModule>, method: usize, contract: CallableContract) -> Self {
        Self {
            module,
            method,
            contract,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    /// Limit how deep calls between compiled methods may nest.
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn contract(&self) -> &CallableContract {
        &self.contract
    }

    /// `Type.Member` of the bound method.
    pub fn name(&self) -> String {
        self.module.method_name(self.method)
    }

    pub fn module(&self) -> &Arc<LoadedModule> {
        &self.module
    }

    /// Run the member. Procedures return `None`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn invoke(&self, args: &[Value]) -> Result<Option<Value>, InvokeError> {
        let method = self.module.method(self.method);
        if args.len() != method.params.len() {
            return Err(InvokeError::ArgumentCount {
                expected: method.params.len(),
                actual: args.len(),
            });
        }
        for (index, (arg, param)) in args.iter().zip(&method.params).enumerate() {
            if !arg.fits(param) {
                return Err(InvokeError::ArgumentType {
                    index,
                    expected: param.to_string(),
                    actual: arg.type_name(),
                });
            }
        }

        let mut vm = Vm::new(&self.module, self.max_call_depth);
        Ok(vm.run(self.method, args.to_vec())?)
    }

    /// A statically typed view. `Args` and `R` must describe exactly the
    /// contract this callable was bound to. Errors carry the bound contract
    /// as `expected` and the Rust signature as `actual`.
    pub fn typed<Args: HostArgs, R: HostReturn>(&self) -> Result<TypedCallable<Args, R>, BindingError> {
        let member = self.name();
        let inputs = Args::descriptors();
        if inputs.len() != self.contract.arity() {
            return Err(BindingError::ArityMismatch {
                member,
                expected: self.contract.arity(),
                actual: inputs.len(),
            });
        }
        if let Some((index, (expected, actual))) = self
            .contract
            .inputs()
            .iter()
            .zip(inputs)
            .enumerate()
            .find(|(_, (expected, actual))| *expected != actual)
        {
            return Err(BindingError::ParameterMismatch {
                member,
                index,
                expected: expected.clone(),
                actual,
            });
        }
        let output = R::descriptor();
        if output.as_ref() != self.contract.output() {
            return Err(BindingError::ReturnMismatch {
                member,
                expected: self.contract.output().cloned(),
                actual: output.unwrap_or_else(TypeDescriptor::void),
            });
        }

        Ok(TypedCallable {
            inner: self.clone(),
            _signature: PhantomData,
        })
    }
}

impl fmt::Debug for CompiledCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledCallable")
            .field("member", &self.name())
            .field("contract", &self.contract.to_string())
            .field("max_call_depth", &self.max_call_depth)
            .finish()
    }
}

/// A [`CompiledCallable`] called with Rust values.
pub struct TypedCallable<Args, R> {
    inner: CompiledCallable,
    _signature: PhantomData<fn(Args) -> R>,
}

impl<Args: HostArgs, R: HostReturn> TypedCallable<Args, R> {
    pub fn call(&self, args: Args) -> Result<R, InvokeError> {
        let result = self.inner.invoke(&args.into_values())?;
        Ok(R::from_return(result)?)
    }

    pub fn untyped(&self) -> &CompiledCallable {
        &self.inner
    }
}

impl<Args, R> Clone for TypedCallable<Args, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _signature: PhantomData,
        }
    }
}

impl<Args, R> fmt::Debug for TypedCallable<Args, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedCallable").field(&self.inner).finish()
    }
}

#[cfg(test)]
mod tests {
    use dyncode_compiler::BytecodeCompiler;

    use super::*;
    use crate::backend::{ModuleLoader, SourceCompiler, bind_callable};
    use crate::references::ReferenceSet;
    use crate::vm::VmLoader;
    use crate::Visibility;

    fn bind(source: &str, name: &str, contract: CallableContract) -> CompiledCallable {
        let references = ReferenceSet::standard();
        let bytes = BytecodeCompiler::new().compile_to_bytes(source, &references).unwrap();
        let module = VmLoader::new().load_module(&bytes, &references).unwrap();
        let member = module
            .resolve_type("C")
            .and_then(|ty| ty.resolve_member(name, Visibility::all()))
            .unwrap();
        bind_callable(&member, &contract).unwrap()
    }

    fn add() -> CompiledCallable {
        let contract = CallableContract::function(["int", "int"], "int").unwrap();
        bind("class C { public static int Add(int a, int b) => a + b; }", "Add", contract)
    }

    #[test]
    fn invoke_checks_arguments() {
        let add = add();
        assert_eq!(add.invoke(&[Value::Int32(7), Value::Int32(5)]), Ok(Some(Value::Int32(12))));
        assert_eq!(
            add.invoke(&[Value::Int32(7)]),
            Err(InvokeError::ArgumentCount { expected: 2, actual: 1 })
        );
        assert_eq!(
            add.invoke(&[Value::Int32(7), Value::string("5")]),
            Err(InvokeError::ArgumentType {
                index: 1,
                expected: "int".into(),
                actual: "string"
            })
        );
    }

    #[test]
    fn typed_calls() {
        let add = add().typed::<(i32, i32), i32>().unwrap();
        assert_eq!(add.call((40, 2)), Ok(42));
        assert_eq!(
            add.untyped().typed::<(i32, i64), i32>().err(),
            Some(BindingError::ParameterMismatch {
                member: "C.Add".into(),
                index: 1,
                expected: TypeDescriptor::of::<i32>(),
                actual: TypeDescriptor::of::<i64>(),
            })
        );
        assert_eq!(
            add.untyped().typed::<(i32, i32), ()>().err(),
            Some(BindingError::ReturnMismatch {
                member: "C.Add".into(),
                expected: Some(TypeDescriptor::of::<i32>()),
                actual: TypeDescriptor::void(),
            })
        );
        let arity = add.untyped().typed::<(i32,), i32>().err();
        assert_eq!(
            arity,
            Some(BindingError::ArityMismatch {
                member: "C.Add".into(),
                expected: 2,
                actual: 1,
            })
        );
        assert_eq!(
            arity.map(|error| error.to_string()).as_deref(),
            Some("'C.Add' takes 1 parameters, the contract has 2 inputs")
        );
    }

    #[test]
    fn runtime_errors_surface() {
        let contract = CallableContract::function(["int", "int"], "int").unwrap();
        let div = bind("class C { static int Div(int a, int b) => a / b; }", "Div", contract);
        assert_eq!(
            div.invoke(&[Value::Int32(1), Value::Int32(0)]),
            Err(InvokeError::Runtime(RuntimeError::DivideByZero))
        );
    }

    #[test]
    fn call_depth_is_configurable() {
        let contract = CallableContract::function(["int"], "int").unwrap();
        let deep = bind("class C { static int D(int n) => n == 0 ? 0 : 1 + D(n - 1); }", "D", contract);
        assert_eq!(deep.invoke(&[Value::Int32(100)]), Ok(Some(Value::Int32(100))));
        let shallow = deep.with_max_call_depth(10);
        assert_eq!(
            shallow.invoke(&[Value::Int32(100)]),
            Err(InvokeError::Runtime(RuntimeError::StackOverflow { limit: 10 }))
        );
    }

    #[test]
    fn callables_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledCallable>();
        assert_send_sync::<TypedCallable<(i32, i32), i32>>();
    }
}

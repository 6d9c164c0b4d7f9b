//! Compile C#-like source text at run time and bind one of its members to a
//! typed callable.
//!
//! The caller describes the shape it wants as a [`CallableContract`]: input
//! types and an optional output type. [`DynamicCompiler::compile`] finds the
//! one class the source declares, picks the first method whose declared
//! signature matches the contract, compiles the source to bytecode, loads it
//! and returns a [`CompiledCallable`].
//!
//! ```
//! use dyncode::DynamicCompiler;
//!
//! let source = r#"
//!     using System;
//!     public class Greeter {
//!         public static string Greet(string name, int times) {
//!             string result = "";
//!             for (int i = 0; i < times; i++) result = result + "hi " + name + ";";
//!             return result;
//!         }
//!     }
//! "#;
//! let greet = DynamicCompiler::new().compile_typed::<(String, i32), String>(source)?;
//! assert_eq!(greet.call(("bob".to_string(), 2))?, "hi bob;hi bob;");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Crates
//!
//! - `dyncode-core`: diagnostics, type names, runtime values
//! - `dyncode-parser`: lexer and arena-allocated AST
//! - `dyncode-compiler`: type checking, bytecode and the module image format
//!
//! The compiler and loader are reached through the traits in [`backend`], so
//! either can be swapped with [`DynamicCompiler::with_backend`].

mod analyzer;
pub mod backend;
mod callable;
mod compiler;
mod contract;
mod error;
mod matcher;
mod module;
mod options;
mod references;
mod signature;
mod vm;

pub use analyzer::{Accessibility, AnalysisError, MemberSignature, Parameter, ParsedUnit, analyze};
pub use backend::{BindingError, LoadError, ModuleLoader, SourceCompiler, bind_callable};
pub use callable::{CompiledCallable, InvokeError, TypedCallable};
pub use compiler::DynamicCompiler;
pub use contract::{CallableContract, CallableKind, ContractBuilder, ContractError};
pub use error::{CompileError, ErrorCategory};
pub use matcher::{MatchError, match_signature};
pub use module::{LoadedModule, MemberHandle, TypeHandle};
pub use options::{CompilerOptions, DEFAULT_MAX_CALL_DEPTH, Visibility};
pub use references::{HostFunction, HostTypeDef, ModuleReference, ReferenceSet};
pub use signature::{HostArgs, HostReturn};
pub use vm::VmLoader;

pub use dyncode_compiler::{BytecodeCompiler, HostSignature};
pub use dyncode_core::type_name::normalize;
pub use dyncode_core::{
    ConversionError, Diagnostic, Diagnostics, FromValue, HostType, IntoValue, RuntimeError, RuntimeType, Severity,
    Span, TypeDescriptor, Value,
};

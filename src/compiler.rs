//! The compilation orchestrator.
//!
//! [`DynamicCompiler::compile`] takes source text and a [`CallableContract`]
//! through every phase:
//!
//! 1. analyze the source for its single declared class
//! 2. pick the first method whose declared signature matches the contract
//! 3. compile the source to a module image
//! 4. load the image, linking host imports
//! 5. resolve the type and member in the loaded module
//! 6. bind the member, checking fully qualified types
//!
//! The first failing phase ends the call; nothing is retried.

use std::fmt;
use std::sync::Arc;

use dyncode_compiler::BytecodeCompiler;
use dyncode_core::Diagnostics;

use crate::analyzer::{MemberSignature, analyze_with_syntax};
use crate::backend::{ModuleLoader, SourceCompiler, check_binding};
use crate::callable::{CompiledCallable, TypedCallable};
use crate::contract::CallableContract;
use crate::error::CompileError;
use crate::matcher::match_signature;
use crate::options::CompilerOptions;
use crate::references::ReferenceSet;
use crate::signature::{HostArgs, HostReturn};
use crate::vm::VmLoader;

/// Compiles source text into callables.
///
/// ```
/// use dyncode::{CallableContract, DynamicCompiler, Value};
///
/// let compiler = DynamicCompiler::new();
/// let contract = CallableContract::function(["int", "int"], "int")?;
/// let add = compiler.compile(
///     "public class Calc { public static int Add(int a, int b) => a + b; }",
///     &contract,
/// )?;
/// assert_eq!(add.invoke(&[Value::Int32(7), Value::Int32(5)])?, Some(Value::Int32(12)));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct DynamicCompiler {
    options: CompilerOptions,
    references: ReferenceSet,
    /// `None` compiles with a [`BytecodeCompiler`] named after the options.
    source_compiler: Option<Arc<dyn SourceCompiler>>,
    loader: Arc<dyn ModuleLoader>,
}

impl Default for DynamicCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicCompiler {
    /// A compiler with default options, the standard references and the
    /// bytecode backend.
    pub fn new() -> Self {
        Self {
            options: CompilerOptions::default(),
            references: ReferenceSet::standard(),
            source_compiler: None,
            loader: Arc::new(VmLoader::new()),
        }
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the host references compiled code may call.
    pub fn with_references(mut self, references: ReferenceSet) -> Self {
        self.references = references;
        self
    }

    /// Replace the compiler and loader.
    pub fn with_backend(mut self, compiler: impl SourceCompiler + 'static, loader: impl ModuleLoader + 'static) -> Self {
        self.source_compiler = Some(Arc::new(compiler));
        self.loader = Arc::new(loader);
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn references(&self) -> &ReferenceSet {
        &self.references
    }

    /// Compile `source` and bind the member that implements `contract`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&self, source: &str, contract: &CallableContract) -> Result<CompiledCallable, CompileError> {
        let (analysis, syntax) = analyze_with_syntax(source);
        let unit = analysis.map_err(|error| syntax_failure(&syntax, error.into()))?;
        tracing::debug!(
            type_name = %unit.qualified_name,
            members = unit.members.len(),
            "analyzed source"
        );

        let matched =
            match_signature(contract, &unit.members).map_err(|error| syntax_failure(&syntax, error.into()))?;
        let ordinal = overload_ordinal(&unit.members, matched);
        tracing::debug!(member = %matched.name, ordinal, %contract, "matched member");

        let bytes = self.compile_to_bytes(source).map_err(|diagnostics| {
            tracing::debug!(errors = diagnostics.error_count(), "compilation failed");
            CompileError::CompilationFailed { diagnostics }
        })?;
        tracing::trace!(bytes = bytes.len(), "compiled module image");

        let module = self.loader.load_module(&bytes, &self.references)?;

        let member_not_found = || CompileError::MemberNotFound {
            type_name: unit.qualified_name.clone(),
            member: matched.name.clone(),
        };
        let member = module
            .resolve_type(&unit.qualified_name)
            .and_then(|ty| ty.overload(&matched.name, ordinal, self.options.visibility))
            .ok_or_else(member_not_found)?;

        if let Err(error) = check_binding(&member, contract) {
            tracing::warn!(%error, "matched member does not bind");
            return Err(CompileError::BindingMismatch(error));
        }
        tracing::debug!(member = %member.qualified_name(), "bound member");
        Ok(CompiledCallable::new(Arc::clone(&module), member.index(), contract.clone())
            .with_max_call_depth(self.options.max_call_depth))
    }

    /// Compile with a contract derived from Rust types.
    pub fn compile_typed<Args: HostArgs, R: HostReturn>(
        &self,
        source: &str,
    ) -> Result<TypedCallable<Args, R>, CompileError> {
        let contract = CallableContract::for_signature::<Args, R>()?;
        let callable = self.compile(source, &contract)?;
        Ok(callable.typed::<Args, R>()?)
    }

    fn compile_to_bytes(&self, source: &str) -> Result<Vec<u8>, Diagnostics> {
        match &self.source_compiler {
            Some(compiler) => compiler.compile_to_bytes(source, &self.references),
            None => BytecodeCompiler::new()
                .with_module_name(self.options.module_name.clone())
                .compile_to_bytes(source, &self.references),
        }
    }
}

/// A failed analysis or match on source with syntax errors is reported as the
/// syntax errors.
fn syntax_failure(syntax: &Diagnostics, error: CompileError) -> CompileError {
    if syntax.has_errors() {
        tracing::debug!(errors = syntax.error_count(), %error, "source has syntax errors");
        CompileError::CompilationFailed {
            diagnostics: syntax.clone(),
        }
    } else {
        error
    }
}

/// Position of `matched` among the members sharing its name.
fn overload_ordinal(members: &[MemberSignature], matched: &MemberSignature) -> usize {
    members
        .iter()
        .take_while(|member| !std::ptr::eq(*member, matched))
        .filter(|member| member.name == matched.name)
        .count()
}

impl fmt::Debug for DynamicCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicCompiler")
            .field("options", &self.options)
            .field("references", &self.references)
            .field("custom_compiler", &self.source_compiler.is_some())
            .finish_non_exhaustive()
    }
}

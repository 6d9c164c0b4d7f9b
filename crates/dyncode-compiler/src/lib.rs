//! Bytecode compiler for the dyncode source language.
//!
//! ## Architecture
//!
//! - **Pass 1 (Registration)**: [`registry::Registry`] collects every type,
//!   method signature and constant so bodies can call forward.
//! - **Pass 2 (Compilation)**: [`function_compiler::FunctionCompiler`] type
//!   checks each body and emits bytecode.
//! - **Encoding**: the methods, constant pool and host imports are written
//!   as a checksummed [`image::ModuleImage`].
//!
//! ## Modules
//!
//! - [`bytecode`]: instruction set, chunks and the constant pool
//! - [`emit`]: high-level emitter with jump and loop management
//! - [`expr`] / [`stmt`]: expression and statement compilers
//! - [`conversion`] / [`overload`]: implicit conversions and overload selection
//! - [`image`]: the binary module format shared with the loader
//!
//! # Example
//!
//! ```
//! use dyncode_compiler::BytecodeCompiler;
//! use dyncode_compiler::image::ModuleImage;
//!
//! let source = "public class Calc { public static int Add(int a, int b) => a + b; }";
//! let bytes = BytecodeCompiler::new().compile(source, &[]).unwrap();
//! let image = ModuleImage::decode(&bytes).unwrap();
//! assert_eq!(image.types[0].name, "Calc");
//! ```

pub mod bytecode;
pub mod context;
pub mod conversion;
pub mod emit;
pub mod error;
pub mod expr;
mod expr_info;
pub mod function_compiler;
pub mod host;
pub mod image;
pub mod overload;
pub mod registry;
mod return_checker;
pub mod scope;
pub mod stmt;
pub mod type_resolver;

pub use bytecode::{BytecodeChunk, Constant, ConstantPool, OpCode};
pub use error::CompilationError;
pub use expr_info::{ExprInfo, ExprType};
pub use host::HostSignature;
pub use image::{ImageError, MethodFlags, MethodImage, ModuleImage, TypeImage};

use bumpalo::Bump;
use dyncode_core::{Diagnostic, Diagnostics, ParseErrors, Span};
use dyncode_parser::Parser;

use crate::function_compiler::FunctionCompiler;
use crate::host::ImportTable;
use crate::registry::Registry;

/// Module name used when the caller does not pick one.
pub const DEFAULT_MODULE_NAME: &str = "DynamicModule";

/// Compiles source text into an encoded [`ModuleImage`].
#[derive(Debug, Clone)]
pub struct BytecodeCompiler {
    module_name: String,
}

impl Default for BytecodeCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl BytecodeCompiler {
    pub fn new() -> Self {
        Self {
            module_name: DEFAULT_MODULE_NAME.to_string(),
        }
    }

    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Compile `source` and encode the result.
    ///
    /// `host` lists the host functions the source may call.
    pub fn compile(&self, source: &str, host: &[HostSignature]) -> Result<Vec<u8>, Diagnostics> {
        let image = self.compile_image(source, host)?;
        image.encode().map_err(|error| {
            Diagnostics::from(vec![Diagnostic::error(Span::default(), error.to_string())])
        })
    }

    /// Compile `source` without encoding it.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile_image(&self, source: &str, host: &[HostSignature]) -> Result<ModuleImage, Diagnostics> {
        let arena = Bump::new();
        let unit = Parser::parse(source, &arena).map_err(parse_diagnostics)?;

        let (registry, errors) = Registry::build(&unit, host);
        let mut diagnostics: Diagnostics = errors.into_iter().map(Diagnostic::from).collect();

        let mut imports = ImportTable::new();
        let mut constants = ConstantPool::new();
        let mut compiled = Vec::with_capacity(registry.methods().len());
        for method in registry.methods() {
            match FunctionCompiler::new(&registry, &mut imports, &mut constants, method).compile() {
                Ok(result) => compiled.push(Some(result)),
                Err(errors) => {
                    compiled.push(None);
                    for error in errors {
                        diagnostics.push(error.into());
                    }
                }
            }
        }

        if diagnostics.has_errors() {
            tracing::debug!(
                module = %self.module_name,
                errors = diagnostics.error_count(),
                "compilation failed"
            );
            return Err(diagnostics);
        }

        let mut compiled = compiled.into_iter();
        let mut types = Vec::new();
        for ty in registry.types().iter().filter(|ty| ty.has_code()) {
            let mut methods = Vec::with_capacity(ty.methods.len());
            for &index in &ty.methods {
                let method = registry.method(index);
                // Every method compiled, or diagnostics would hold an error.
                let Some(Some(body)) = compiled.next() else {
                    continue;
                };
                methods.push(MethodImage {
                    name: method.name().to_string(),
                    flags: MethodFlags::from_modifiers(method.decl.modifiers),
                    params: method.params.clone(),
                    return_type: method.return_type.clone(),
                    frame_size: body.frame_size,
                    code: body.chunk.into_code(),
                });
            }
            types.push(TypeImage {
                name: ty.qualified_name.clone(),
                methods,
            });
        }

        let image = ModuleImage {
            name: self.module_name.clone(),
            constants: constants.into_constants(),
            imports: imports.into_imports(),
            types,
        };
        tracing::debug!(
            module = %image.name,
            types = image.types.len(),
            methods = image.methods().count(),
            imports = image.imports.len(),
            "compiled module"
        );
        Ok(image)
    }
}

fn parse_diagnostics(errors: ParseErrors) -> Diagnostics {
    errors
        .into_iter()
        .map(|error| Diagnostic::error(error.span, error.message))
        .collect()
}

//! The bytecode virtual machine and its module loader.
//!
//! - [`VmLoader`]: decodes an image, links host imports, verifies code
//! - `verify`: static checks so the interpreter can trust operands
//! - `interpreter`: the stack machine itself
//! - `arith`: typed arithmetic, comparison and conversion helpers

mod arith;
mod interpreter;
mod verify;

use std::sync::Arc;

use dyncode_compiler::ModuleImage;

use crate::backend::{LoadError, ModuleLoader};
use crate::module::LoadedModule;
use crate::references::ReferenceSet;

pub(crate) use interpreter::Vm;

/// Loads module images produced by [`BytecodeCompiler`](dyncode_compiler::BytecodeCompiler).
#[derive(Debug, Clone, Copy, Default)]
pub struct VmLoader;

impl VmLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleLoader for VmLoader {
    #[cfg_attr(feature = "profiling", profiling::function)]
    fn load_module(&self, bytes: &[u8], references: &ReferenceSet) -> Result<Arc<LoadedModule>, LoadError> {
        let image = ModuleImage::decode(bytes)?;
        let module = LoadedModule::from_image(image, references)?;
        verify::verify_module(&module)?;
        tracing::debug!(
            module = %module.name(),
            bytes = bytes.len(),
            methods = module.methods.len(),
            imports = module.imports.len(),
            "loaded module"
        );
        Ok(Arc::new(module))
    }
}

#[cfg(test)]
mod tests {
    use dyncode_compiler::{BytecodeCompiler, ImageError};

    use super::*;

    #[test]
    fn loads_compiled_modules() {
        let references = ReferenceSet::standard();
        let bytes = BytecodeCompiler::new()
            .compile("using System; class C { static int M(int a) => Math.Abs(a); }", &references.signatures())
            .unwrap();
        let module = VmLoader::new().load_module(&bytes, &references).unwrap();
        assert_eq!(module.imports.len(), 1);
        assert!(module.resolve_type("C").is_some());
    }

    #[test]
    fn rejects_foreign_bytes() {
        let error = VmLoader::new().load_module(b"not a module", &ReferenceSet::new()).unwrap_err();
        assert_eq!(error, LoadError::Image(ImageError::BadMagic));
    }

    #[test]
    fn missing_references_fail_to_link() {
        let bytes = BytecodeCompiler::new()
            .compile("using System; class C { static int M(int a) => Math.Abs(a); }", &ReferenceSet::standard().signatures())
            .unwrap();
        let error = VmLoader::new().load_module(&bytes, &ReferenceSet::new()).unwrap_err();
        assert!(matches!(error, LoadError::UnresolvedImport { signature } if signature.name == "Abs"));
    }
}

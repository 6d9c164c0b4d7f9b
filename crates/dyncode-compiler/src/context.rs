//! Per-method compilation state shared by the expression and statement
//! compilers.

use dyncode_core::{RuntimeType, Span};

use crate::error::{AtSpan, CompilationError};
use crate::host::ImportTable;
use crate::registry::{Registry, ScriptMethod};
use crate::scope::{LocalScope, LocalVar};

pub struct CompilationContext<'a, 'ast> {
    registry: &'a Registry<'ast>,
    imports: &'a mut ImportTable,
    method: &'a ScriptMethod<'ast>,
    scope: LocalScope,
    /// Errors from statements that failed; compilation of the method carries
    /// on with the next statement.
    errors: Vec<CompilationError>,
}

impl<'a, 'ast> CompilationContext<'a, 'ast> {
    pub fn new(
        registry: &'a Registry<'ast>,
        imports: &'a mut ImportTable,
        method: &'a ScriptMethod<'ast>,
    ) -> Self {
        Self {
            registry,
            imports,
            method,
            scope: LocalScope::new(),
            errors: Vec::new(),
        }
    }

    pub fn registry(&self) -> &'a Registry<'ast> {
        self.registry
    }

    pub fn method(&self) -> &'a ScriptMethod<'ast> {
        self.method
    }

    /// Index of the type whose method is being compiled.
    pub fn current_type(&self) -> usize {
        self.method.owner
    }

    pub fn is_static(&self) -> bool {
        self.method.is_static()
    }

    // =========================================================================
    // Locals
    // =========================================================================

    pub fn push_scope(&mut self) {
        self.scope.push_scope();
    }

    pub fn pop_scope(&mut self) {
        self.scope.pop_scope();
    }

    pub fn declare_local(&mut self, name: &str, ty: RuntimeType, span: Span) -> Result<u8, CompilationError> {
        self.scope.declare(name, ty, span)
    }

    pub fn declare_temp(&mut self, ty: RuntimeType, span: Span) -> Result<u8, CompilationError> {
        self.scope.declare_temp(ty, span)
    }

    pub fn lookup_local(&self, name: &str) -> Option<&LocalVar> {
        self.scope.lookup(name)
    }

    pub fn frame_size(&self) -> u16 {
        self.scope.frame_size()
    }

    // =========================================================================
    // Host imports
    // =========================================================================

    /// Import index of a host function, recording the import on first use.
    pub fn import(&mut self, host_index: usize, span: Span) -> Result<u16, CompilationError> {
        let signature = self.registry.host(host_index);
        self.imports.import(host_index, signature).at(span)
    }

    // =========================================================================
    // Errors
    // =========================================================================

    pub fn report(&mut self, error: CompilationError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<CompilationError> {
        std::mem::take(&mut self.errors)
    }
}

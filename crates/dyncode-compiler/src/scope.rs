//! Local variable scopes for method compilation.
//!
//! Parameters occupy the first slots, then locals in declaration order. A slot
//! is released when its block ends and may be reused by a later sibling
//! block; every declaration initializes its slot, so reuse never exposes a
//! stale value.

use dyncode_core::{RuntimeType, Span};

use crate::bytecode::BytecodeError;
use crate::error::CompilationError;

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVar {
    pub name: String,
    pub ty: RuntimeType,
    pub slot: u8,
    /// Block depth the variable was declared at; 0 for parameters.
    pub depth: u32,
}

#[derive(Debug, Default)]
pub struct LocalScope {
    /// Innermost last.
    vars: Vec<LocalVar>,
    depth: u32,
    next_slot: u16,
    max_slots: u16,
    temp_counter: u32,
}

impl LocalScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Drop every variable declared in the innermost block.
    pub fn pop_scope(&mut self) {
        let depth = self.depth;
        self.vars.retain(|var| var.depth < depth);
        self.depth = depth.saturating_sub(1);
        self.next_slot = self.vars.iter().map(|var| var.slot as u16 + 1).max().unwrap_or(0);
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Declare a variable in the innermost block.
    ///
    /// A name may not repeat any variable that is still visible, including
    /// those of enclosing blocks and the parameters.
    pub fn declare(&mut self, name: &str, ty: RuntimeType, span: Span) -> Result<u8, CompilationError> {
        if self.lookup(name).is_some() {
            return Err(CompilationError::DuplicateLocal {
                name: name.to_string(),
                span,
            });
        }
        self.allocate(name.to_string(), ty, span)
    }

    /// Reserve an anonymous slot that lives until the current block ends.
    pub fn declare_temp(&mut self, ty: RuntimeType, span: Span) -> Result<u8, CompilationError> {
        // '$' cannot start an identifier, so temps never collide with user names.
        let name = format!("${}", self.temp_counter);
        self.temp_counter += 1;
        self.allocate(name, ty, span)
    }

    fn allocate(&mut self, name: String, ty: RuntimeType, span: Span) -> Result<u8, CompilationError> {
        let slot = u8::try_from(self.next_slot)
            .map_err(|_| CompilationError::emit(BytecodeError::TooManyLocals, span))?;
        self.vars.push(LocalVar {
            name,
            ty,
            slot,
            depth: self.depth,
        });
        self.next_slot += 1;
        self.max_slots = self.max_slots.max(self.next_slot);
        Ok(slot)
    }

    /// The innermost visible variable called `name`.
    pub fn lookup(&self, name: &str) -> Option<&LocalVar> {
        self.vars.iter().rev().find(|var| var.name == name)
    }

    /// Frame size the method needs, parameters included.
    pub fn frame_size(&self) -> u16 {
        self.max_slots
    }
}

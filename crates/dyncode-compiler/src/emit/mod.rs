//! Bytecode emitter.
//!
//! [`BytecodeEmitter`] wraps a [`BytecodeChunk`] with a higher-level API for
//! constants, locals, calls, jumps and loop control flow.
//!
//! # Example
//!
//! ```
//! use dyncode_compiler::bytecode::{ConstantPool, OpCode};
//! use dyncode_compiler::emit::BytecodeEmitter;
//!
//! let mut constants = ConstantPool::new();
//! let mut emitter = BytecodeEmitter::new(&mut constants);
//!
//! emitter.set_line(1);
//! emitter.emit_int(42).unwrap();
//! emitter.emit_int(10).unwrap();
//! emitter.emit(OpCode::AddI32);
//!
//! let chunk = emitter.finish();
//! chunk.assert_opcodes(&[OpCode::Constant, OpCode::Constant, OpCode::AddI32]);
//! ```

mod jumps;

use thiserror::Error;

use crate::bytecode::{ArrayElement, BytecodeChunk, BytecodeError, Constant, ConstantPool, OpCode};
pub use jumps::{ContinueTarget, JumpManager};

/// Failure while emitting a method body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error("no enclosing loop out of which to break or continue")]
    NotInLoop,

    #[error(transparent)]
    Bytecode(#[from] BytecodeError),
}

/// Emits bytecode for a single method.
///
/// Constants go to the module-level pool shared by every method.
pub struct BytecodeEmitter<'pool> {
    chunk: BytecodeChunk,
    constants: &'pool mut ConstantPool,
    jumps: JumpManager,
    current_line: u32,
}

impl<'pool> BytecodeEmitter<'pool> {
    pub fn new(constants: &'pool mut ConstantPool) -> Self {
        Self {
            chunk: BytecodeChunk::new(),
            constants,
            jumps: JumpManager::new(),
            current_line: 1,
        }
    }

    /// Source line recorded for subsequent instructions.
    pub fn set_line(&mut self, line: u32) {
        self.current_line = line;
    }

    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    // ==========================================================================
    // Basic emission
    // ==========================================================================

    pub fn emit(&mut self, op: OpCode) {
        self.chunk.write_op(op, self.current_line);
    }

    pub fn emit_byte(&mut self, op: OpCode, byte: u8) {
        self.chunk.write_op(op, self.current_line);
        self.chunk.write_byte(byte, self.current_line);
    }

    pub fn emit_u16(&mut self, op: OpCode, value: u16) {
        self.chunk.write_op(op, self.current_line);
        self.chunk.write_u16(value, self.current_line);
    }

    /// Emit a constant load, narrow or wide depending on the pool index.
    pub fn emit_constant(&mut self, constant: Constant) -> Result<(), EmitError> {
        let index = self.constants.add(constant)?;
        match u8::try_from(index) {
            Ok(narrow) => self.emit_byte(OpCode::Constant, narrow),
            Err(_) => self.emit_u16(OpCode::ConstantWide, index),
        }
        Ok(())
    }

    // ==========================================================================
    // Literals
    // ==========================================================================

    /// Emit an `Int32`; 0 and 1 have dedicated opcodes.
    pub fn emit_int(&mut self, value: i32) -> Result<(), EmitError> {
        match value {
            0 => self.emit(OpCode::PushZero),
            1 => self.emit(OpCode::PushOne),
            _ => self.emit_constant(Constant::Int32(value))?,
        }
        Ok(())
    }

    pub fn emit_long(&mut self, value: i64) -> Result<(), EmitError> {
        self.emit_constant(Constant::Int64(value))
    }

    pub fn emit_f32(&mut self, value: f32) -> Result<(), EmitError> {
        self.emit_constant(Constant::Float32(value))
    }

    pub fn emit_f64(&mut self, value: f64) -> Result<(), EmitError> {
        self.emit_constant(Constant::Float64(value))
    }

    pub fn emit_char(&mut self, value: char) -> Result<(), EmitError> {
        self.emit_constant(Constant::Char(value))
    }

    pub fn emit_string(&mut self, value: &str) -> Result<(), EmitError> {
        self.emit_constant(Constant::String(value.to_string()))
    }

    pub fn emit_bool(&mut self, value: bool) {
        self.emit(if value { OpCode::PushTrue } else { OpCode::PushFalse });
    }

    pub fn emit_null(&mut self) {
        self.emit(OpCode::PushNull);
    }

    // ==========================================================================
    // Locals, arrays and calls
    // ==========================================================================

    pub fn emit_get_local(&mut self, slot: u8) {
        self.emit_byte(OpCode::GetLocal, slot);
    }

    pub fn emit_set_local(&mut self, slot: u8) {
        self.emit_byte(OpCode::SetLocal, slot);
    }

    pub fn emit_new_array(&mut self, element: ArrayElement) {
        self.emit_byte(OpCode::NewArray, element.into());
    }

    pub fn emit_array_literal(&mut self, count: u16) {
        self.emit_u16(OpCode::ArrayLiteral, count);
    }

    /// Call a method of the module being compiled.
    pub fn emit_call(&mut self, method: u16, arg_count: u8) {
        self.emit_u16(OpCode::Call, method);
        self.chunk.write_byte(arg_count, self.current_line);
    }

    /// Call a host function through the module's import table.
    pub fn emit_call_host(&mut self, import: u16, arg_count: u8) {
        self.emit_u16(OpCode::CallHost, import);
        self.chunk.write_byte(arg_count, self.current_line);
    }

    pub fn emit_return(&mut self) {
        self.emit(OpCode::Return);
    }

    pub fn emit_return_void(&mut self) {
        self.emit(OpCode::ReturnVoid);
    }

    pub fn emit_pop(&mut self) {
        self.emit(OpCode::Pop);
    }

    pub fn emit_dup(&mut self) {
        self.emit(OpCode::Dup);
    }

    // ==========================================================================
    // Jumps
    // ==========================================================================

    /// Emit a forward jump; patch it later with [`patch_jump`](Self::patch_jump).
    pub fn emit_jump(&mut self, op: OpCode) -> JumpLabel {
        JumpLabel(self.chunk.emit_jump(op, self.current_line))
    }

    /// Point a forward jump at the current position.
    pub fn patch_jump(&mut self, label: JumpLabel) -> Result<(), EmitError> {
        self.chunk.patch_jump(label.0)?;
        Ok(())
    }

    /// Emit a backward jump to `target`.
    pub fn emit_loop(&mut self, target: usize) -> Result<(), EmitError> {
        self.chunk.emit_loop(target, self.current_line)?;
        Ok(())
    }

    pub fn current_offset(&self) -> usize {
        self.chunk.current_offset()
    }

    /// Cut out the code emitted since `start` so it can be re-emitted later,
    /// after code whose shape depends on it.
    pub fn take_fragment(&mut self, start: usize) -> BytecodeChunk {
        self.chunk.split_off(start)
    }

    pub fn append_fragment(&mut self, fragment: BytecodeChunk) {
        self.chunk.append(fragment);
    }

    // ==========================================================================
    // Loop control
    // ==========================================================================

    /// Enter a loop. `continue_target` is `None` when the target comes after
    /// the body; set it with [`set_continue_target`](Self::set_continue_target).
    pub fn enter_loop(&mut self, continue_target: Option<usize>) {
        self.jumps.enter_loop(continue_target);
    }

    /// Mark the current position as the continue target and patch any
    /// `continue` jumps emitted before it.
    pub fn set_continue_target(&mut self) -> Result<(), EmitError> {
        let target = self.current_offset();
        for label in self.jumps.set_continue_target(target) {
            self.patch_jump(label)?;
        }
        Ok(())
    }

    /// Leave a loop, patching its breaks to the current position.
    pub fn exit_loop(&mut self) -> Result<(), EmitError> {
        for label in self.jumps.exit_loop() {
            self.patch_jump(label)?;
        }
        Ok(())
    }

    pub fn emit_break(&mut self) -> Result<(), EmitError> {
        if !self.jumps.in_loop() {
            return Err(EmitError::NotInLoop);
        }
        let label = self.emit_jump(OpCode::Jump);
        self.jumps.add_break(label);
        Ok(())
    }

    pub fn emit_continue(&mut self) -> Result<(), EmitError> {
        match self.jumps.continue_target() {
            None => Err(EmitError::NotInLoop),
            Some(ContinueTarget::Backward(target)) => self.emit_loop(target),
            Some(ContinueTarget::Forward) => {
                let label = self.emit_jump(OpCode::Jump);
                self.jumps.add_continue(label);
                Ok(())
            }
        }
    }

    pub fn in_loop(&self) -> bool {
        self.jumps.in_loop()
    }

    pub fn finish(self) -> BytecodeChunk {
        self.chunk
    }

    pub fn code_size(&self) -> usize {
        self.chunk.len()
    }
}

/// A forward jump waiting to be patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpLabel(pub(crate) usize);

impl JumpLabel {
    /// Offset of the jump operand.
    pub fn offset(&self) -> usize {
        self.0
    }
}

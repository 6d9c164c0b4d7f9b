//! Bytecode types.
//!
//! - [`OpCode`] - the instruction set
//! - [`BytecodeChunk`] - compiled code for one method
//! - [`Constant`] and [`ConstantPool`] - module-level constant storage

mod chunk;
mod constant;
mod opcode;

use thiserror::Error;

pub use chunk::BytecodeChunk;
pub use constant::{Constant, ConstantPool};
pub use opcode::{ArrayElement, OpCode};

/// A method or module outgrew an operand width.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BytecodeError {
    #[error("jump distance {0} exceeds the 16-bit operand limit")]
    JumpTooFar(usize),

    #[error("more than {} constants in one module", u16::MAX)]
    TooManyConstants,

    #[error("more than {} local variables in one method", u8::MAX)]
    TooManyLocals,

    #[error("more than {} methods or host imports in one module", u16::MAX)]
    TooManyFunctions,
}

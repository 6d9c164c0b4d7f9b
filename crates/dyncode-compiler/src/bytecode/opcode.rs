//! Bytecode operation codes.
//!
//! Each opcode is a single byte with its operands following inline,
//! big-endian. Arithmetic is typed: the compiler has already converted both
//! operands to the same numeric type, so the VM never promotes at run time.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Bytecode operation codes.
///
/// The VM is a stack machine. Most operations pop their operands and push
/// the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Constants
    // =========================================================================
    /// Push constant from pool.
    /// Operand: u8 constant index
    Constant = 0,
    /// Push constant from pool.
    /// Operand: u16 constant index
    ConstantWide,
    PushNull,
    PushTrue,
    PushFalse,
    /// Push `Int32` 0.
    PushZero,
    /// Push `Int32` 1.
    PushOne,

    // =========================================================================
    // Stack and locals
    // =========================================================================
    Pop,
    Dup,
    /// Operand: u8 slot
    GetLocal,
    /// Pop into a local.
    /// Operand: u8 slot
    SetLocal,

    // =========================================================================
    // Arithmetic
    // =========================================================================
    AddI32,
    SubI32,
    MulI32,
    DivI32,
    ModI32,
    NegI32,

    AddI64,
    SubI64,
    MulI64,
    DivI64,
    ModI64,
    NegI64,

    AddF32,
    SubF32,
    MulF32,
    DivF32,
    ModF32,
    NegF32,

    AddF64,
    SubF64,
    MulF64,
    DivF64,
    ModF64,
    NegF64,

    /// Pop two values, push their display strings joined. Null joins as "".
    Concat,

    // =========================================================================
    // Comparison and logic
    // =========================================================================
    /// Both operands have the same runtime kind, or one is null.
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Not,

    // =========================================================================
    // Conversions
    // =========================================================================
    I32ToI64,
    I32ToF32,
    I32ToF64,
    I32ToChar,
    I64ToI32,
    I64ToF32,
    I64ToF64,
    F32ToI32,
    F32ToI64,
    F32ToF64,
    F64ToI32,
    F64ToI64,
    F64ToF32,
    CharToI32,
    /// Replace the top value with its display string.
    ToString,

    // =========================================================================
    // Nullables
    // =========================================================================
    /// Pop a value, push whether it was null.
    IsNull,
    /// Fail with `NullableHasNoValue` if the top value is null.
    Unwrap,

    // =========================================================================
    // Arrays and strings
    // =========================================================================
    /// Pop a length, push an array filled with the element default.
    /// Operand: u8 [`ArrayElement`]
    NewArray,
    /// Pop `count` values (first pushed is element 0), push an array.
    /// Operand: u16 count
    ArrayLiteral,
    /// Pop index and array (or string), push the element.
    GetIndex,
    /// Pop value, index and array; store the element.
    SetIndex,
    /// Pop an array or string, push its length as `Int32`.
    Length,

    // =========================================================================
    // Calls
    // =========================================================================
    /// Call a method of this module.
    /// Operands: u16 method index, u8 argument count
    Call,
    /// Call a linked host function.
    /// Operands: u16 import index, u8 argument count
    CallHost,

    // =========================================================================
    // Control flow
    // =========================================================================
    /// Operand: u16 forward distance
    Jump,
    /// Pop a bool; jump forward when false.
    /// Operand: u16 forward distance
    JumpIfFalse,
    /// Operand: u16 backward distance
    Loop,
    /// Pop the return value and leave the frame.
    Return,
    ReturnVoid,
}

impl OpCode {
    /// Decode a byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Size of the operands in bytes, not counting the opcode itself.
    pub fn operand_size(&self) -> usize {
        match self {
            OpCode::Constant | OpCode::GetLocal | OpCode::SetLocal | OpCode::NewArray => 1,
            OpCode::ConstantWide
            | OpCode::ArrayLiteral
            | OpCode::Jump
            | OpCode::JumpIfFalse
            | OpCode::Loop => 2,
            OpCode::Call | OpCode::CallHost => 3,
            _ => 0,
        }
    }

    /// Mnemonic used in disassembly and test failures.
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::ConstantWide => "CONSTANT_WIDE",
            OpCode::PushNull => "PUSH_NULL",
            OpCode::PushTrue => "PUSH_TRUE",
            OpCode::PushFalse => "PUSH_FALSE",
            OpCode::PushZero => "PUSH_ZERO",
            OpCode::PushOne => "PUSH_ONE",
            OpCode::Pop => "POP",
            OpCode::Dup => "DUP",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::SetLocal => "SET_LOCAL",
            OpCode::AddI32 => "ADD_I32",
            OpCode::SubI32 => "SUB_I32",
            OpCode::MulI32 => "MUL_I32",
            OpCode::DivI32 => "DIV_I32",
            OpCode::ModI32 => "MOD_I32",
            OpCode::NegI32 => "NEG_I32",
            OpCode::AddI64 => "ADD_I64",
            OpCode::SubI64 => "SUB_I64",
            OpCode::MulI64 => "MUL_I64",
            OpCode::DivI64 => "DIV_I64",
            OpCode::ModI64 => "MOD_I64",
            OpCode::NegI64 => "NEG_I64",
            OpCode::AddF32 => "ADD_F32",
            OpCode::SubF32 => "SUB_F32",
            OpCode::MulF32 => "MUL_F32",
            OpCode::DivF32 => "DIV_F32",
            OpCode::ModF32 => "MOD_F32",
            OpCode::NegF32 => "NEG_F32",
            OpCode::AddF64 => "ADD_F64",
            OpCode::SubF64 => "SUB_F64",
            OpCode::MulF64 => "MUL_F64",
            OpCode::DivF64 => "DIV_F64",
            OpCode::ModF64 => "MOD_F64",
            OpCode::NegF64 => "NEG_F64",
            OpCode::Concat => "CONCAT",
            OpCode::Equal => "EQUAL",
            OpCode::NotEqual => "NOT_EQUAL",
            OpCode::Less => "LESS",
            OpCode::LessEqual => "LESS_EQUAL",
            OpCode::Greater => "GREATER",
            OpCode::GreaterEqual => "GREATER_EQUAL",
            OpCode::Not => "NOT",
            OpCode::I32ToI64 => "I32_TO_I64",
            OpCode::I32ToF32 => "I32_TO_F32",
            OpCode::I32ToF64 => "I32_TO_F64",
            OpCode::I32ToChar => "I32_TO_CHAR",
            OpCode::I64ToI32 => "I64_TO_I32",
            OpCode::I64ToF32 => "I64_TO_F32",
            OpCode::I64ToF64 => "I64_TO_F64",
            OpCode::F32ToI32 => "F32_TO_I32",
            OpCode::F32ToI64 => "F32_TO_I64",
            OpCode::F32ToF64 => "F32_TO_F64",
            OpCode::F64ToI32 => "F64_TO_I32",
            OpCode::F64ToI64 => "F64_TO_I64",
            OpCode::F64ToF32 => "F64_TO_F32",
            OpCode::CharToI32 => "CHAR_TO_I32",
            OpCode::ToString => "TO_STRING",
            OpCode::IsNull => "IS_NULL",
            OpCode::Unwrap => "UNWRAP",
            OpCode::NewArray => "NEW_ARRAY",
            OpCode::ArrayLiteral => "ARRAY_LITERAL",
            OpCode::GetIndex => "GET_INDEX",
            OpCode::SetIndex => "SET_INDEX",
            OpCode::Length => "LENGTH",
            OpCode::Call => "CALL",
            OpCode::CallHost => "CALL_HOST",
            OpCode::Jump => "JUMP",
            OpCode::JumpIfFalse => "JUMP_IF_FALSE",
            OpCode::Loop => "LOOP",
            OpCode::Return => "RETURN",
            OpCode::ReturnVoid => "RETURN_VOID",
        }
    }
}

/// Default-value class of a `NewArray` element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ArrayElement {
    /// Strings, arrays and nullables start out null.
    Reference = 0,
    Bool,
    Char,
    Int32,
    Int64,
    Single,
    Double,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip() {
        for op in [OpCode::Constant, OpCode::AddF64, OpCode::CallHost, OpCode::ReturnVoid] {
            assert_eq!(OpCode::from_u8(op.into()), Some(op));
        }
        assert_eq!(OpCode::from_u8(0xFF), None);
    }

    #[test]
    fn operand_sizes() {
        assert_eq!(OpCode::Pop.operand_size(), 0);
        assert_eq!(OpCode::AddI32.operand_size(), 0);
        assert_eq!(OpCode::Return.operand_size(), 0);

        assert_eq!(OpCode::Constant.operand_size(), 1);
        assert_eq!(OpCode::GetLocal.operand_size(), 1);
        assert_eq!(OpCode::NewArray.operand_size(), 1);

        assert_eq!(OpCode::ConstantWide.operand_size(), 2);
        assert_eq!(OpCode::JumpIfFalse.operand_size(), 2);
        assert_eq!(OpCode::Loop.operand_size(), 2);

        assert_eq!(OpCode::Call.operand_size(), 3);
        assert_eq!(OpCode::CallHost.operand_size(), 3);
    }

    #[test]
    fn names() {
        assert_eq!(OpCode::JumpIfFalse.name(), "JUMP_IF_FALSE");
        assert_eq!(OpCode::I32ToF64.name(), "I32_TO_F64");
    }

    #[test]
    fn array_element_tags() {
        assert_eq!(ArrayElement::try_from(4u8).ok(), Some(ArrayElement::Int64));
        assert!(ArrayElement::try_from(42u8).is_err());
    }
}

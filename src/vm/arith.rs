//! Typed arithmetic, comparison and conversion.
//!
//! The compiler has already converted both operands to the type the opcode
//! names, so a mismatch here means the code is broken, not the program.
//! Null operands propagate: a lifted `int? + int` is null when either side is.
//! Integer arithmetic wraps except for division, which checks.

use std::cmp::Ordering;

use dyncode_compiler::OpCode;
use dyncode_core::{RuntimeError, Value};

fn mismatch(op: OpCode, operands: &[&Value], offset: usize) -> RuntimeError {
    let kinds: Vec<&str> = operands.iter().map(|value| value.type_name()).collect();
    RuntimeError::InvalidBytecode {
        offset,
        detail: format!("{} on {}", op.name(), kinds.join(" and ")),
    }
}

/// `a op b` for the typed arithmetic opcodes.
pub(super) fn binary(op: OpCode, a: Value, b: Value, offset: usize) -> Result<Value, RuntimeError> {
    use OpCode::*;

    if a.is_null() || b.is_null() {
        return Ok(Value::Null);
    }
    Ok(match (op, &a, &b) {
        (AddI32, Value::Int32(x), Value::Int32(y)) => Value::Int32(x.wrapping_add(*y)),
        (SubI32, Value::Int32(x), Value::Int32(y)) => Value::Int32(x.wrapping_sub(*y)),
        (MulI32, Value::Int32(x), Value::Int32(y)) => Value::Int32(x.wrapping_mul(*y)),
        (DivI32, Value::Int32(x), Value::Int32(y)) => Value::Int32(checked(*y == 0, x.checked_div(*y))?),
        (ModI32, Value::Int32(x), Value::Int32(y)) => Value::Int32(checked(*y == 0, x.checked_rem(*y))?),

        (AddI64, Value::Int64(x), Value::Int64(y)) => Value::Int64(x.wrapping_add(*y)),
        (SubI64, Value::Int64(x), Value::Int64(y)) => Value::Int64(x.wrapping_sub(*y)),
        (MulI64, Value::Int64(x), Value::Int64(y)) => Value::Int64(x.wrapping_mul(*y)),
        (DivI64, Value::Int64(x), Value::Int64(y)) => Value::Int64(checked(*y == 0, x.checked_div(*y))?),
        (ModI64, Value::Int64(x), Value::Int64(y)) => Value::Int64(checked(*y == 0, x.checked_rem(*y))?),

        (AddF32, Value::Single(x), Value::Single(y)) => Value::Single(x + y),
        (SubF32, Value::Single(x), Value::Single(y)) => Value::Single(x - y),
        (MulF32, Value::Single(x), Value::Single(y)) => Value::Single(x * y),
        (DivF32, Value::Single(x), Value::Single(y)) => Value::Single(x / y),
        (ModF32, Value::Single(x), Value::Single(y)) => Value::Single(x % y),

        (AddF64, Value::Double(x), Value::Double(y)) => Value::Double(x + y),
        (SubF64, Value::Double(x), Value::Double(y)) => Value::Double(x - y),
        (MulF64, Value::Double(x), Value::Double(y)) => Value::Double(x * y),
        (DivF64, Value::Double(x), Value::Double(y)) => Value::Double(x / y),
        (ModF64, Value::Double(x), Value::Double(y)) => Value::Double(x % y),

        _ => return Err(mismatch(op, &[&a, &b], offset)),
    })
}

/// Division by zero, or the one overflowing quotient `MIN / -1`.
fn checked<T>(divisor_is_zero: bool, result: Option<T>) -> Result<T, RuntimeError> {
    if divisor_is_zero {
        return Err(RuntimeError::DivideByZero);
    }
    result.ok_or(RuntimeError::Overflow)
}

pub(super) fn negate(op: OpCode, value: Value, offset: usize) -> Result<Value, RuntimeError> {
    Ok(match (op, &value) {
        (_, Value::Null) => Value::Null,
        (OpCode::NegI32, Value::Int32(v)) => Value::Int32(v.wrapping_neg()),
        (OpCode::NegI64, Value::Int64(v)) => Value::Int64(v.wrapping_neg()),
        (OpCode::NegF32, Value::Single(v)) => Value::Single(-v),
        (OpCode::NegF64, Value::Double(v)) => Value::Double(-v),
        _ => return Err(mismatch(op, &[&value], offset)),
    })
}

/// Numeric conversions. Narrowing integer casts wrap; float to integer
/// casts saturate, and NaN becomes zero.
pub(super) fn convert(op: OpCode, value: Value, offset: usize) -> Result<Value, RuntimeError> {
    use OpCode::*;

    Ok(match (op, &value) {
        (_, Value::Null) => Value::Null,
        (I32ToI64, Value::Int32(v)) => Value::Int64(i64::from(*v)),
        (I32ToF32, Value::Int32(v)) => Value::Single(*v as f32),
        (I32ToF64, Value::Int32(v)) => Value::Double(f64::from(*v)),
        (I32ToChar, Value::Int32(v)) => {
            Value::Char(char::from_u32(u32::from(*v as u16)).unwrap_or(char::REPLACEMENT_CHARACTER))
        }
        (I64ToI32, Value::Int64(v)) => Value::Int32(*v as i32),
        (I64ToF32, Value::Int64(v)) => Value::Single(*v as f32),
        (I64ToF64, Value::Int64(v)) => Value::Double(*v as f64),
        (F32ToI32, Value::Single(v)) => Value::Int32(*v as i32),
        (F32ToI64, Value::Single(v)) => Value::Int64(*v as i64),
        (F32ToF64, Value::Single(v)) => Value::Double(f64::from(*v)),
        (F64ToI32, Value::Double(v)) => Value::Int32(*v as i32),
        (F64ToI64, Value::Double(v)) => Value::Int64(*v as i64),
        (F64ToF32, Value::Double(v)) => Value::Single(*v as f32),
        (CharToI32, Value::Char(c)) => Value::Int32(u32::from(*c) as i32),
        _ => return Err(mismatch(op, &[&value], offset)),
    })
}

/// `==`: null equals only null, arrays compare by identity.
pub(super) fn equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => x.same(y),
        _ => a == b,
    }
}

/// `<`, `<=`, `>`, `>=`. Any null operand makes the comparison false, as
/// does NaN.
pub(super) fn compare(op: OpCode, a: &Value, b: &Value, offset: usize) -> Result<bool, RuntimeError> {
    let ordering = match (a, b) {
        (Value::Null, _) | (_, Value::Null) => return Ok(false),
        (Value::Int32(x), Value::Int32(y)) => Some(x.cmp(y)),
        (Value::Int64(x), Value::Int64(y)) => Some(x.cmp(y)),
        (Value::Single(x), Value::Single(y)) => x.partial_cmp(y),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y),
        (Value::Char(x), Value::Char(y)) => Some(x.cmp(y)),
        _ => return Err(mismatch(op, &[a, b], offset)),
    };
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        OpCode::Less => ordering == Ordering::Less,
        OpCode::LessEqual => ordering != Ordering::Greater,
        OpCode::Greater => ordering == Ordering::Greater,
        OpCode::GreaterEqual => ordering != Ordering::Less,
        _ => return Err(mismatch(op, &[a, b], offset)),
    })
}

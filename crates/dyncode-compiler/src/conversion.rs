//! Implicit and explicit conversions between runtime types.
//!
//! A [`Conversion`] lists the opcodes that perform it and a cost used to
//! rank overloads: identity is free, numeric widening costs the distance
//! between the two types in the chain `char < int < long < float < double`,
//! and lifting into a nullable or passing `null` costs one more.

use dyncode_core::RuntimeType;

use crate::bytecode::OpCode;
use crate::expr_info::ExprType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub ops: Vec<OpCode>,
    pub cost: u32,
}

impl Conversion {
    fn identity() -> Self {
        Self {
            ops: Vec::new(),
            cost: 0,
        }
    }

    fn with_cost(mut self, extra: u32) -> Self {
        self.cost += extra;
        self
    }

    pub fn is_identity(&self) -> bool {
        self.cost == 0
    }
}

/// The conversion applied without a cast, if one exists.
pub fn implicit(from: &ExprType, to: &RuntimeType) -> Option<Conversion> {
    let from = match from {
        ExprType::Null => {
            return to.accepts_null().then(|| Conversion::identity().with_cost(1));
        }
        ExprType::Value(from) => from,
    };
    if from == to {
        return Some(Conversion::identity());
    }
    match (from, to) {
        (RuntimeType::Nullable(from), RuntimeType::Nullable(to)) => widening(from, to),
        (from, RuntimeType::Nullable(to)) => {
            if from == to.as_ref() {
                Some(Conversion::identity().with_cost(1))
            } else {
                widening(from, to).map(|c| c.with_cost(1))
            }
        }
        (from, to) => widening(from, to),
    }
}

/// The conversion a cast `(to)expr` performs, if the cast is legal.
pub fn explicit(from: &ExprType, to: &RuntimeType) -> Option<Conversion> {
    if let Some(conversion) = implicit(from, to) {
        return Some(conversion);
    }
    let ExprType::Value(from) = from else {
        return None;
    };
    match (from, to) {
        (RuntimeType::Nullable(from), RuntimeType::Nullable(to)) => numeric(from, to),
        (RuntimeType::Nullable(from), to) => {
            let mut ops = vec![OpCode::Unwrap];
            if from.as_ref() != to {
                ops.extend(numeric(from, to)?.ops);
            }
            Some(Conversion { ops, cost: 1 })
        }
        (from, RuntimeType::Nullable(to)) => numeric(from, to),
        (from, to) => numeric(from, to),
    }
}

/// Implicit numeric widening.
fn widening(from: &RuntimeType, to: &RuntimeType) -> Option<Conversion> {
    let (from_rank, to_rank) = (from.numeric_rank()?, to.numeric_rank()?);
    if from_rank >= to_rank {
        return None;
    }
    let mut conversion = numeric(from, to)?;
    conversion.cost = u32::from(to_rank - from_rank);
    Some(conversion)
}

/// Any conversion between two numeric types (`char` included).
fn numeric(from: &RuntimeType, to: &RuntimeType) -> Option<Conversion> {
    use OpCode::*;
    use RuntimeType as T;

    let ops: &[OpCode] = match (from, to) {
        (a, b) if a == b && a.numeric_rank().is_some() => &[],
        (T::Char, T::Int32) => &[CharToI32],
        (T::Char, T::Int64) => &[CharToI32, I32ToI64],
        (T::Char, T::Single) => &[CharToI32, I32ToF32],
        (T::Char, T::Double) => &[CharToI32, I32ToF64],
        (T::Int32, T::Char) => &[I32ToChar],
        (T::Int32, T::Int64) => &[I32ToI64],
        (T::Int32, T::Single) => &[I32ToF32],
        (T::Int32, T::Double) => &[I32ToF64],
        (T::Int64, T::Char) => &[I64ToI32, I32ToChar],
        (T::Int64, T::Int32) => &[I64ToI32],
        (T::Int64, T::Single) => &[I64ToF32],
        (T::Int64, T::Double) => &[I64ToF64],
        (T::Single, T::Char) => &[F32ToI32, I32ToChar],
        (T::Single, T::Int32) => &[F32ToI32],
        (T::Single, T::Int64) => &[F32ToI64],
        (T::Single, T::Double) => &[F32ToF64],
        (T::Double, T::Char) => &[F64ToI32, I32ToChar],
        (T::Double, T::Int32) => &[F64ToI32],
        (T::Double, T::Int64) => &[F64ToI64],
        (T::Double, T::Single) => &[F64ToF32],
        _ => return None,
    };
    Some(Conversion {
        ops: ops.to_vec(),
        cost: 1,
    })
}

/// The type both operands of a numeric binary operator are promoted to:
/// at least `int`, otherwise the wider of the two.
pub fn promote(left: &RuntimeType, right: &RuntimeType) -> Option<RuntimeType> {
    let rank = left.numeric_rank()?.max(right.numeric_rank()?);
    Some(match rank {
        0 | 1 => RuntimeType::Int32,
        2 => RuntimeType::Int64,
        3 => RuntimeType::Single,
        _ => RuntimeType::Double,
    })
}

//! Constant pool for compiled modules.
//!
//! Literals referenced by `Constant`/`ConstantWide` instructions. The pool is
//! shared by every method of a module and deduplicates identical values.

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

use super::BytecodeError;

/// Values stored in the constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Char(char),
    String(String),
}

/// Hashable mirror of [`Constant`]; floats compare by total order so `NaN`
/// literals still deduplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstantKey {
    Int32(i32),
    Int64(i64),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),
    Char(char),
    String(String),
}

impl From<&Constant> for ConstantKey {
    fn from(constant: &Constant) -> Self {
        match constant {
            Constant::Int32(v) => ConstantKey::Int32(*v),
            Constant::Int64(v) => ConstantKey::Int64(*v),
            Constant::Float32(v) => ConstantKey::Float32(OrderedFloat(*v)),
            Constant::Float64(v) => ConstantKey::Float64(OrderedFloat(*v)),
            Constant::Char(v) => ConstantKey::Char(*v),
            Constant::String(v) => ConstantKey::String(v.clone()),
        }
    }
}

/// Module-level constant pool with deduplication.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    index: FxHashMap<ConstantKey, u16>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constant, or return the index of an identical one.
    pub fn add(&mut self, constant: Constant) -> Result<u16, BytecodeError> {
        let key = ConstantKey::from(&constant);
        if let Some(&idx) = self.index.get(&key) {
            return Ok(idx);
        }

        let idx = u16::try_from(self.constants.len()).map_err(|_| BytecodeError::TooManyConstants)?;
        self.constants.push(constant);
        self.index.insert(key, idx);
        Ok(idx)
    }

    pub fn add_string(&mut self, value: impl Into<String>) -> Result<u16, BytecodeError> {
        self.add(Constant::String(value.into()))
    }

    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn into_constants(self) -> Vec<Constant> {
        self.constants
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplicates_identical_values() {
        let mut pool = ConstantPool::new();
        let a = pool.add(Constant::Int32(42)).unwrap();
        let b = pool.add(Constant::Int32(42)).unwrap();
        let c = pool.add(Constant::Int64(42)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn floats_deduplicate_by_value() {
        let mut pool = ConstantPool::new();
        let a = pool.add(Constant::Float64(1.5)).unwrap();
        let b = pool.add(Constant::Float64(1.5)).unwrap();
        let nan = pool.add(Constant::Float64(f64::NAN)).unwrap();
        let nan_again = pool.add(Constant::Float64(f64::NAN)).unwrap();
        assert_eq!(a, b);
        assert_eq!(nan, nan_again);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn strings() {
        let mut pool = ConstantPool::new();
        let idx = pool.add_string("hello").unwrap();
        assert_eq!(pool.add_string("hello").unwrap(), idx);
        assert_eq!(pool.get(idx), Some(&Constant::String("hello".into())));
        assert_eq!(pool.get(99), None);
    }
}

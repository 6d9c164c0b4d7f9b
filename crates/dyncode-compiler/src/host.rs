//! Host function signatures visible to compiled code.
//!
//! The compiler only needs the shape of each host function; the callable
//! itself is linked by the loader when the module is instantiated.

use std::fmt;

use dyncode_core::RuntimeType;
use rustc_hash::FxHashMap;

use crate::bytecode::BytecodeError;

/// A static host function, e.g. `System.Math.Max(Int32, Int32) -> Int32`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostSignature {
    /// Empty for types outside any namespace.
    pub namespace: String,
    pub type_name: String,
    pub name: String,
    pub params: Vec<RuntimeType>,
    pub return_type: RuntimeType,
}

impl HostSignature {
    pub fn new(
        namespace: impl Into<String>,
        type_name: impl Into<String>,
        name: impl Into<String>,
        params: Vec<RuntimeType>,
        return_type: RuntimeType,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            type_name: type_name.into(),
            name: name.into(),
            params,
            return_type,
        }
    }

    /// `Namespace.Type`, or just `Type` outside a namespace.
    pub fn qualified_type(&self) -> String {
        if self.namespace.is_empty() {
            self.type_name.clone()
        } else {
            format!("{}.{}", self.namespace, self.type_name)
        }
    }
}

impl fmt::Display for HostSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.qualified_type(), self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

/// Host functions a module actually calls, in first-use order.
#[derive(Debug, Default)]
pub struct ImportTable {
    imports: Vec<HostSignature>,
    /// Host catalog index -> import index.
    index: FxHashMap<usize, u16>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import index for the host function at `host_index`, adding it on first use.
    pub fn import(&mut self, host_index: usize, signature: &HostSignature) -> Result<u16, BytecodeError> {
        if let Some(&idx) = self.index.get(&host_index) {
            return Ok(idx);
        }
        let idx = u16::try_from(self.imports.len()).map_err(|_| BytecodeError::TooManyFunctions)?;
        self.imports.push(signature.clone());
        self.index.insert(host_index, idx);
        Ok(idx)
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }

    pub fn into_imports(self) -> Vec<HostSignature> {
        self.imports
    }
}

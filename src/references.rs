//! Host references.
//!
//! A [`ReferenceSet`] is the explicit list of host modules compiled code may
//! call into. The compiler sees only their signatures; the loader links each
//! imported signature to the matching [`HostFunction`].
//!
//! ```
//! use dyncode::{HostFunction, HostTypeDef, ModuleReference, ReferenceSet, RuntimeType, Value};
//!
//! let clock = HostTypeDef::new("Demo", "Clock").with(HostFunction::new(
//!     "Now",
//!     vec![],
//!     RuntimeType::Int64,
//!     |_| Ok(Value::Int64(42)),
//! ));
//! let references = ReferenceSet::standard().with(ModuleReference::new("Demo").with(clock));
//! assert!(references.signatures().iter().any(|sig| sig.name == "Now"));
//! ```

use std::fmt;
use std::sync::Arc;

use dyncode_compiler::HostSignature;
use dyncode_core::{FromValue, IntoValue, RuntimeError, RuntimeType, Value};

type HostFn = dyn Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync;

/// A static function implemented by the host.
#[derive(Clone)]
pub struct HostFunction {
    name: String,
    params: Vec<RuntimeType>,
    return_type: RuntimeType,
    func: Arc<HostFn>,
}

impl HostFunction {
    /// `func` receives arguments already converted to `params`; a `void`
    /// function returns [`Value::Null`].
    pub fn new<F>(name: impl Into<String>, params: Vec<RuntimeType>, return_type: RuntimeType, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params,
            return_type,
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[RuntimeType] {
        &self.params
    }

    pub fn return_type(&self) -> &RuntimeType {
        &self.return_type
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.func)(args)
    }

    fn matches(&self, signature: &HostSignature) -> bool {
        self.name == signature.name
            && self.params == signature.params
            && self.return_type == signature.return_type
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

/// A host type grouping static functions, e.g. `System.Math`.
#[derive(Debug, Clone)]
pub struct HostTypeDef {
    namespace: String,
    name: String,
    functions: Vec<HostFunction>,
}

impl HostTypeDef {
    /// An empty `namespace` puts the type at the top level.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            functions: Vec::new(),
        }
    }

    pub fn with(mut self, function: HostFunction) -> Self {
        self.functions.push(function);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn functions(&self) -> &[HostFunction] {
        &self.functions
    }

    fn signature(&self, function: &HostFunction) -> HostSignature {
        HostSignature::new(
            self.namespace.clone(),
            self.name.clone(),
            function.name.clone(),
            function.params.clone(),
            function.return_type.clone(),
        )
    }
}

/// A named bundle of host types.
#[derive(Debug, Clone)]
pub struct ModuleReference {
    name: String,
    types: Vec<HostTypeDef>,
}

impl ModuleReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
        }
    }

    pub fn with(mut self, ty: HostTypeDef) -> Self {
        self.types.push(ty);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn types(&self) -> &[HostTypeDef] {
        &self.types
    }
}

/// Host modules visible to compiled code.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    modules: Vec<ModuleReference>,
}

impl ReferenceSet {
    /// No references at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// `System.Math` and `System.String`.
    pub fn standard() -> Self {
        Self::new().with(system_module())
    }

    pub fn with(mut self, module: ModuleReference) -> Self {
        self.add(module);
        self
    }

    pub fn add(&mut self, module: ModuleReference) {
        self.modules.push(module);
    }

    pub fn modules(&self) -> &[ModuleReference] {
        &self.modules
    }

    /// Signatures of every host function, in registration order.
    pub fn signatures(&self) -> Vec<HostSignature> {
        self.types()
            .flat_map(|ty| ty.functions.iter().map(move |function| ty.signature(function)))
            .collect()
    }

    /// The host function implementing `signature`, if any.
    pub fn find(&self, signature: &HostSignature) -> Option<&HostFunction> {
        self.types()
            .filter(|ty| ty.namespace == signature.namespace && ty.name == signature.type_name)
            .flat_map(|ty| ty.functions.iter())
            .find(|function| function.matches(signature))
    }

    fn types(&self) -> impl Iterator<Item = &HostTypeDef> {
        self.modules.iter().flat_map(|module| module.types.iter())
    }
}

// ============================================================================
// System module
// ============================================================================

fn system_module() -> ModuleReference {
    ModuleReference::new("System").with(math_type()).with(string_type())
}

fn math_type() -> HostTypeDef {
    use RuntimeType::{Double, Int32, Int64};

    HostTypeDef::new("System", "Math")
        .with(unary("Abs", Int32, Int32, |v: i32| v.checked_abs().ok_or(RuntimeError::Overflow)))
        .with(unary("Abs", Int64, Int64, |v: i64| v.checked_abs().ok_or(RuntimeError::Overflow)))
        .with(unary("Abs", Double, Double, |v: f64| Ok(v.abs())))
        .with(binary("Max", [Int32, Int32], Int32, |a: i32, b: i32| Ok(a.max(b))))
        .with(binary("Max", [Int64, Int64], Int64, |a: i64, b: i64| Ok(a.max(b))))
        .with(binary("Max", [Double, Double], Double, |a: f64, b: f64| Ok(max_f64(a, b))))
        .with(binary("Min", [Int32, Int32], Int32, |a: i32, b: i32| Ok(a.min(b))))
        .with(binary("Min", [Int64, Int64], Int64, |a: i64, b: i64| Ok(a.min(b))))
        .with(binary("Min", [Double, Double], Double, |a: f64, b: f64| Ok(min_f64(a, b))))
        .with(binary("Pow", [Double, Double], Double, |a: f64, b: f64| Ok(a.powf(b))))
        .with(unary("Sqrt", Double, Double, |v: f64| Ok(v.sqrt())))
        .with(unary("Floor", Double, Double, |v: f64| Ok(v.floor())))
        .with(unary("Ceiling", Double, Double, |v: f64| Ok(v.ceil())))
}

fn string_type() -> HostTypeDef {
    use RuntimeType::{Boolean, String};

    HostTypeDef::new("System", "String")
        .with(binary(
            "Concat",
            [String, String],
            String,
            |a: Option<std::string::String>, b: Option<std::string::String>| {
                Ok(a.unwrap_or_default() + b.as_deref().unwrap_or_default())
            },
        ))
        .with(unary("IsNullOrEmpty", String, Boolean, |s: Option<std::string::String>| {
            Ok(s.is_none_or(|s| s.is_empty()))
        }))
}

// Either operand NaN gives NaN.
fn max_f64(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }
}

fn min_f64(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }
}

fn unary<A, R>(
    name: &'static str,
    param: RuntimeType,
    return_type: RuntimeType,
    f: fn(A) -> Result<R, RuntimeError>,
) -> HostFunction
where
    A: FromValue + 'static,
    R: IntoValue + 'static,
{
    HostFunction::new(name, vec![param], return_type, move |args| {
        let [a] = args else {
            return Err(arity_error(name, 1, args.len()));
        };
        f(argument(name, a)?).map(IntoValue::into_value)
    })
}

fn binary<A, B, R>(
    name: &'static str,
    params: [RuntimeType; 2],
    return_type: RuntimeType,
    f: fn(A, B) -> Result<R, RuntimeError>,
) -> HostFunction
where
    A: FromValue + 'static,
    B: FromValue + 'static,
    R: IntoValue + 'static,
{
    HostFunction::new(name, params.to_vec(), return_type, move |args| {
        let [a, b] = args else {
            return Err(arity_error(name, 2, args.len()));
        };
        f(argument(name, a)?, argument(name, b)?).map(IntoValue::into_value)
    })
}

fn argument<T: FromValue>(function: &str, value: &Value) -> Result<T, RuntimeError> {
    T::from_value(value.clone()).map_err(|error| RuntimeError::Host {
        function: function.to_string(),
        message: error.to_string(),
    })
}

fn arity_error(function: &str, expected: usize, actual: usize) -> RuntimeError {
    RuntimeError::Host {
        function: function.to_string(),
        message: format!("expected {expected} arguments, got {actual}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(references: &ReferenceSet, ty: &str, name: &str, params: Vec<RuntimeType>, ret: RuntimeType) -> HostFunction {
        references
            .find(&HostSignature::new("System", ty, name, params, ret))
            .cloned()
            .unwrap()
    }

    #[test]
    fn standard_math() {
        let references = ReferenceSet::standard();
        let abs = lookup(&references, "Math", "Abs", vec![RuntimeType::Int32], RuntimeType::Int32);
        assert_eq!(abs.call(&[Value::Int32(-4)]), Ok(Value::Int32(4)));
        assert_eq!(abs.call(&[Value::Int32(i32::MIN)]), Err(RuntimeError::Overflow));

        let max = lookup(
            &references,
            "Math",
            "Max",
            vec![RuntimeType::Double, RuntimeType::Double],
            RuntimeType::Double,
        );
        assert_eq!(max.call(&[Value::Double(1.5), Value::Double(-2.0)]), Ok(Value::Double(1.5)));
    }

    #[test]
    fn standard_strings_accept_null() {
        let references = ReferenceSet::standard();
        let concat = lookup(
            &references,
            "String",
            "Concat",
            vec![RuntimeType::String, RuntimeType::String],
            RuntimeType::String,
        );
        assert_eq!(concat.call(&[Value::string("a"), Value::Null]), Ok(Value::string("a")));

        let empty = lookup(&references, "String", "IsNullOrEmpty", vec![RuntimeType::String], RuntimeType::Boolean);
        assert_eq!(empty.call(&[Value::Null]), Ok(Value::Bool(true)));
        assert_eq!(empty.call(&[Value::string("x")]), Ok(Value::Bool(false)));
    }

    #[test]
    fn lookup_needs_the_exact_signature() {
        let references = ReferenceSet::standard();
        let wrong_return = HostSignature::new("System", "Math", "Abs", vec![RuntimeType::Int32], RuntimeType::Int64);
        assert!(references.find(&wrong_return).is_none());
        assert!(ReferenceSet::new().signatures().is_empty());
    }

    #[test]
    fn wrong_arguments_fail_inside_the_host() {
        let references = ReferenceSet::standard();
        let sqrt = lookup(&references, "Math", "Sqrt", vec![RuntimeType::Double], RuntimeType::Double);
        assert!(matches!(sqrt.call(&[]), Err(RuntimeError::Host { .. })));
        assert!(matches!(sqrt.call(&[Value::Int32(4)]), Err(RuntimeError::Host { .. })));
    }

    #[test]
    fn custom_modules_are_listed_after_standard_ones() {
        let references = ReferenceSet::standard().with(
            ModuleReference::new("Sinks").with(HostTypeDef::new("", "Log").with(HostFunction::new(
                "Write",
                vec![RuntimeType::String],
                RuntimeType::Void,
                |_| Ok(Value::Null),
            ))),
        );
        let last = references.signatures().pop().unwrap();
        assert_eq!(last.to_string(), "Log.Write(string) -> void");
        assert!(references.find(&last).is_some());
    }
}

//! Declarations visible to method bodies.
//!
//! The registry is built in one pass over the compilation unit before any
//! body is compiled, so calls can refer to methods declared later in the
//! source. It records:
//!
//! - every declared type, with its enclosing type and namespace
//! - method signatures, numbered in the order they appear in the image
//! - `const` fields, already evaluated
//! - `using` directives and the host functions supplied by the caller

use dyncode_core::{RuntimeType, Value};
use dyncode_parser::CompilationUnit;
use dyncode_parser::ast::{
    Expr, FieldDecl, LiteralKind, Member, MethodDecl, Modifiers, TypeDecl, TypeDeclKind, UnaryOp,
    join_path,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::bytecode::BytecodeError;
use crate::conversion;
use crate::error::CompilationError;
use crate::expr_info::ExprType;
use crate::host::HostSignature;
use crate::type_resolver::{TypeResolver, primitive_from_path};

/// A type declared in the source.
#[derive(Debug)]
pub struct ScriptType<'ast> {
    pub qualified_name: String,
    /// Empty outside any namespace.
    pub namespace: String,
    pub decl: &'ast TypeDecl<'ast>,
    /// The enclosing type of a nested type.
    pub parent: Option<usize>,
    /// Indices into [`Registry::methods`].
    pub methods: Vec<u16>,
    pub constants: FxHashMap<&'ast str, ScriptConstant>,
}

impl ScriptType<'_> {
    /// Whether the type carries methods into the compiled image.
    pub fn has_code(&self) -> bool {
        matches!(
            self.decl.kind,
            TypeDeclKind::Class | TypeDeclKind::Struct | TypeDeclKind::Record
        )
    }
}

/// A method with a resolved signature.
#[derive(Debug)]
pub struct ScriptMethod<'ast> {
    /// Position in the module's flattened method table.
    pub index: u16,
    pub owner: usize,
    pub decl: &'ast MethodDecl<'ast>,
    pub params: Vec<RuntimeType>,
    pub return_type: RuntimeType,
}

impl<'ast> ScriptMethod<'ast> {
    pub fn name(&self) -> &'ast str {
        self.decl.name.name
    }

    pub fn is_static(&self) -> bool {
        self.decl.modifiers.is_static()
    }
}

/// An evaluated `const` field.
#[derive(Debug, Clone)]
pub struct ScriptConstant {
    pub ty: RuntimeType,
    pub value: Value,
    pub modifiers: Modifiers,
}

/// What a dotted path names when used as a type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Script(usize),
    Primitive(RuntimeType),
    /// A host type, by qualified name.
    Host(String),
}

/// Methods a call expression may bind to, all with the same name.
#[derive(Debug, Clone, PartialEq)]
pub enum Callees {
    Script(Vec<u16>),
    /// Indices into the host catalog.
    Host(Vec<usize>),
}

#[derive(Debug, Default)]
struct Usings {
    namespaces: Vec<String>,
    static_types: Vec<String>,
    aliases: FxHashMap<String, String>,
}

pub struct Registry<'ast> {
    types: Vec<ScriptType<'ast>>,
    by_name: FxHashMap<String, usize>,
    methods: Vec<ScriptMethod<'ast>>,
    host: Vec<HostSignature>,
    host_types: FxHashSet<String>,
    usings: Usings,
    resolver: TypeResolver,
}

impl<'ast> Registry<'ast> {
    /// Collect every declaration in `unit`. Signatures that fail to resolve
    /// are reported and left out; the rest of the unit is still registered.
    pub fn build(
        unit: &CompilationUnit<'ast>,
        host: &[HostSignature],
    ) -> (Self, Vec<CompilationError>) {
        let declared = unit.declared_types();
        let mut names = Vec::with_capacity(declared.len() * 2);
        for ty in &declared {
            names.push(ty.name().to_string());
            names.push(ty.qualified_name());
        }

        let mut registry = Registry {
            types: Vec::with_capacity(declared.len()),
            by_name: FxHashMap::default(),
            methods: Vec::new(),
            host: host.to_vec(),
            host_types: host.iter().map(HostSignature::qualified_type).collect(),
            usings: Usings::default(),
            resolver: TypeResolver::new(names),
        };
        let mut errors = Vec::new();

        for using in unit.usings() {
            let path = join_path(using.path);
            match (using.alias, using.is_static) {
                (Some(alias), _) => {
                    registry.usings.aliases.insert(alias.name.to_string(), path);
                }
                (None, true) => registry.usings.static_types.push(path),
                (None, false) => registry.usings.namespaces.push(path),
            }
        }

        for ty in &declared {
            let qualified_name = ty.qualified_name();
            let parent = if ty.enclosing.is_empty() {
                None
            } else {
                qualified_name
                    .rsplit_once('.')
                    .and_then(|(outer, _)| registry.by_name.get(outer).copied())
            };
            let index = registry.types.len();
            registry.by_name.insert(qualified_name.clone(), index);
            registry.types.push(ScriptType {
                qualified_name,
                namespace: ty.namespace.clone().unwrap_or_default(),
                decl: ty.decl,
                parent,
                methods: Vec::new(),
                constants: FxHashMap::default(),
            });
        }

        for index in 0..registry.types.len() {
            registry.register_members(index, &mut errors);
        }

        (registry, errors)
    }

    fn register_members(&mut self, owner: usize, errors: &mut Vec<CompilationError>) {
        let decl = self.types[owner].decl;
        let has_code = self.types[owner].has_code();

        for member in decl.members {
            match member {
                Member::Method(method) if has_code => {
                    if let Err(error) = self.register_method(owner, method) {
                        errors.push(error);
                    }
                }
                Member::Field(field) => match self.evaluate_constant(field) {
                    Ok(constant) => {
                        self.types[owner].constants.insert(field.name.name, constant);
                    }
                    Err(error) => errors.push(error),
                },
                Member::Property(property) => errors.push(CompilationError::unsupported(
                    format!("property '{}'", property.name.name),
                    property.span,
                )),
                // Interface members, enumerators, constructors and nested
                // types carry no code of their own.
                _ => {}
            }
        }
    }

    fn register_method(
        &mut self,
        owner: usize,
        method: &'ast MethodDecl<'ast>,
    ) -> Result<(), CompilationError> {
        let name = method.name.name;
        if method.body.is_none() {
            if method.modifiers.contains(Modifiers::ABSTRACT) {
                return Ok(());
            }
            return Err(CompilationError::MissingBody {
                name: format!("{}.{}", self.types[owner].qualified_name, name),
                span: method.name.span,
            });
        }

        let return_type = self.resolver.resolve_return(&method.return_type)?;
        let params = method
            .params
            .iter()
            .map(|param| self.resolver.resolve(&param.ty))
            .collect::<Result<Vec<_>, _>>()?;

        let duplicate = self.types[owner].methods.iter().any(|&existing| {
            let existing = &self.methods[usize::from(existing)];
            existing.name() == name && existing.params == params
        });
        if duplicate {
            return Err(CompilationError::DuplicateMethod {
                owner: self.types[owner].qualified_name.clone(),
                name: name.to_string(),
                span: method.name.span,
            });
        }

        let index = u16::try_from(self.methods.len())
            .map_err(|_| CompilationError::emit(BytecodeError::TooManyFunctions, method.span))?;
        self.methods.push(ScriptMethod {
            index,
            owner,
            decl: method,
            params,
            return_type,
        });
        self.types[owner].methods.push(index);
        Ok(())
    }

    fn evaluate_constant(&self, field: &FieldDecl<'ast>) -> Result<ScriptConstant, CompilationError> {
        if !field.modifiers.contains(Modifiers::CONST) {
            return Err(CompilationError::unsupported(
                format!("instance or static field '{}'", field.name.name),
                field.span,
            ));
        }
        let ty = self.resolver.resolve(&field.ty)?;
        let not_constant = || CompilationError::NotConstant {
            name: field.name.name.to_string(),
            span: field.span,
        };
        let init = field.init.ok_or_else(not_constant)?;
        let (from, value) = constant_value(init).ok_or_else(not_constant)?;
        let value = convert_constant(value, &from, &ty).ok_or_else(|| {
            CompilationError::TypeMismatch {
                from: from.to_string(),
                to: ty.clone(),
                span: init.span(),
            }
        })?;
        Ok(ScriptConstant {
            ty,
            value,
            modifiers: field.modifiers,
        })
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn types(&self) -> &[ScriptType<'ast>] {
        &self.types
    }

    pub fn ty(&self, index: usize) -> &ScriptType<'ast> {
        &self.types[index]
    }

    pub fn methods(&self) -> &[ScriptMethod<'ast>] {
        &self.methods
    }

    pub fn method(&self, index: u16) -> &ScriptMethod<'ast> {
        &self.methods[usize::from(index)]
    }

    pub fn host(&self, index: usize) -> &HostSignature {
        &self.host[index]
    }

    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    /// The type `from` and its enclosing types, innermost first.
    fn scopes(&self, from: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(Some(from), |&index| self.types[index].parent)
    }

    /// Resolve a dotted path used as a type inside type `from`.
    pub fn resolve_type_path(&self, path: &[&str], from: usize) -> Option<TypeRef> {
        let expanded = self.expand_alias(path);
        let aliased: Vec<&str>;
        let path = match &expanded {
            Some(full) => {
                aliased = full.iter().map(String::as_str).collect();
                &aliased[..]
            }
            None => path,
        };
        if let Some(index) = self.find_script_type(path, from) {
            return Some(TypeRef::Script(index));
        }
        if let Some(primitive) = primitive_from_path(path) {
            return Some(TypeRef::Primitive(primitive));
        }
        self.find_host_type(path, from).map(TypeRef::Host)
    }

    fn expand_alias(&self, path: &[&str]) -> Option<Vec<String>> {
        let (first, rest) = path.split_first()?;
        let target = self.usings.aliases.get(*first)?;
        let mut expanded: Vec<String> = target.split('.').map(str::to_string).collect();
        expanded.extend(rest.iter().map(|segment| segment.to_string()));
        Some(expanded)
    }

    fn find_script_type(&self, path: &[&str], from: usize) -> Option<usize> {
        let name = path.join(".");
        for scope in self.scopes(from) {
            let candidate = format!("{}.{}", self.types[scope].qualified_name, name);
            if let Some(&index) = self.by_name.get(&candidate) {
                return Some(index);
            }
        }
        let mut namespace = self.types[from].namespace.as_str();
        while !namespace.is_empty() {
            if let Some(&index) = self.by_name.get(&format!("{namespace}.{name}")) {
                return Some(index);
            }
            namespace = namespace.rsplit_once('.').map_or("", |(outer, _)| outer);
        }
        if let Some(&index) = self.by_name.get(&name) {
            return Some(index);
        }
        self.usings
            .namespaces
            .iter()
            .find_map(|ns| self.by_name.get(&format!("{ns}.{name}")).copied())
    }

    fn find_host_type(&self, path: &[&str], from: usize) -> Option<String> {
        let name = path.join(".");
        if self.host_types.contains(&name) {
            return Some(name);
        }
        let mut namespace = self.types[from].namespace.as_str();
        while !namespace.is_empty() {
            let candidate = format!("{namespace}.{name}");
            if self.host_types.contains(&candidate) {
                return Some(candidate);
            }
            namespace = namespace.rsplit_once('.').map_or("", |(outer, _)| outer);
        }
        self.usings
            .namespaces
            .iter()
            .map(|ns| format!("{ns}.{name}"))
            .find(|candidate| self.host_types.contains(candidate))
    }

    /// The host type a primitive's static members live on, e.g. `System.String`.
    pub fn primitive_host_type(ty: &RuntimeType) -> Option<String> {
        ty.primitive_name().map(|name| format!("System.{name}"))
    }

    /// Methods named `name` declared directly on a script type.
    pub fn script_methods(&self, owner: usize, name: &str) -> Vec<u16> {
        self.types[owner]
            .methods
            .iter()
            .copied()
            .filter(|&index| self.method(index).name() == name)
            .collect()
    }

    /// Host functions named `name` on the host type `qualified_type`.
    pub fn host_functions(&self, qualified_type: &str, name: &str) -> Vec<usize> {
        self.host
            .iter()
            .enumerate()
            .filter(|(_, sig)| sig.name == name && sig.qualified_type() == qualified_type)
            .map(|(index, _)| index)
            .collect()
    }

    /// Methods a bare call `name(...)` inside type `from` may bind to.
    ///
    /// The declaring type and its enclosing types are searched first, then
    /// the types imported with `using static`.
    pub fn simple_callees(&self, name: &str, from: usize) -> Option<Callees> {
        for scope in self.scopes(from) {
            let methods = self.script_methods(scope, name);
            if !methods.is_empty() {
                return Some(Callees::Script(methods));
            }
        }
        for imported in &self.usings.static_types {
            let path: Vec<&str> = imported.split('.').collect();
            if let Some(index) = self.find_script_type(&path, from) {
                let methods = self.script_methods(index, name);
                if !methods.is_empty() {
                    return Some(Callees::Script(methods));
                }
            } else if self.host_types.contains(imported) {
                let functions = self.host_functions(imported, name);
                if !functions.is_empty() {
                    return Some(Callees::Host(functions));
                }
            }
        }
        None
    }

    /// A `const` visible by simple name inside type `from`.
    pub fn simple_constant(&self, name: &str, from: usize) -> Option<&ScriptConstant> {
        self.scopes(from)
            .find_map(|scope| self.types[scope].constants.get(name))
    }

    /// Whether code in type `from` may use a member of `owner` declared
    /// with `modifiers`. Non-public members are visible inside the
    /// declaring type and the types nested in it.
    pub fn is_accessible(&self, owner: usize, modifiers: Modifiers, from: usize) -> bool {
        let access = modifiers.access();
        if access.intersects(Modifiers::PUBLIC | Modifiers::INTERNAL) {
            return true;
        }
        self.scopes(from).any(|scope| scope == owner)
    }
}

/// The value of a constant initializer: a literal, optionally negated.
fn constant_value(expr: &Expr<'_>) -> Option<(ExprType, Value)> {
    match expr.unparenthesized() {
        Expr::Literal(literal) => Some(match literal.kind {
            LiteralKind::Int(v) => (ExprType::Value(RuntimeType::Int32), Value::Int32(v)),
            LiteralKind::Long(v) => (ExprType::Value(RuntimeType::Int64), Value::Int64(v)),
            LiteralKind::Float(v) => (ExprType::Value(RuntimeType::Single), Value::Single(v)),
            LiteralKind::Double(v) => (ExprType::Value(RuntimeType::Double), Value::Double(v)),
            LiteralKind::Bool(v) => (ExprType::Value(RuntimeType::Boolean), Value::Bool(v)),
            LiteralKind::Char(v) => (ExprType::Value(RuntimeType::Char), Value::Char(v)),
            LiteralKind::String(v) => (ExprType::Value(RuntimeType::String), Value::string(v)),
            LiteralKind::Null => (ExprType::Null, Value::Null),
        }),
        Expr::Unary(unary) => {
            let (ty, value) = constant_value(unary.operand)?;
            match unary.op {
                UnaryOp::Plus if ty.runtime().is_some_and(RuntimeType::is_numeric) => {
                    Some((ty, value))
                }
                UnaryOp::Neg => negate_constant(value),
                UnaryOp::Not => match value {
                    Value::Bool(v) => Some((ty, Value::Bool(!v))),
                    _ => None,
                },
                _ => None,
            }
        }
        _ => None,
    }
}

/// `-2147483648` is lexed as a long literal but names an `int`.
pub(crate) fn negate_constant(value: Value) -> Option<(ExprType, Value)> {
    Some(match value {
        Value::Int32(v) => (ExprType::Value(RuntimeType::Int32), Value::Int32(v.wrapping_neg())),
        Value::Int64(v) if v == i64::from(i32::MAX) + 1 => {
            (ExprType::Value(RuntimeType::Int32), Value::Int32(i32::MIN))
        }
        Value::Int64(v) => (ExprType::Value(RuntimeType::Int64), Value::Int64(v.wrapping_neg())),
        Value::Single(v) => (ExprType::Value(RuntimeType::Single), Value::Single(-v)),
        Value::Double(v) => (ExprType::Value(RuntimeType::Double), Value::Double(-v)),
        _ => return None,
    })
}

/// Apply an implicit conversion to a constant value at compile time.
fn convert_constant(value: Value, from: &ExprType, to: &RuntimeType) -> Option<Value> {
    conversion::implicit(from, to)?;
    let target = match to {
        RuntimeType::Nullable(inner) => inner.as_ref(),
        other => other,
    };
    Some(match (value, target) {
        (Value::Null, _) => Value::Null,
        (Value::Char(c), RuntimeType::Int32) => Value::Int32(c as i32),
        (Value::Char(c), RuntimeType::Int64) => Value::Int64(i64::from(u32::from(c))),
        (Value::Char(c), RuntimeType::Single) => Value::Single(u32::from(c) as f32),
        (Value::Char(c), RuntimeType::Double) => Value::Double(f64::from(u32::from(c))),
        (Value::Int32(v), RuntimeType::Int64) => Value::Int64(i64::from(v)),
        (Value::Int32(v), RuntimeType::Single) => Value::Single(v as f32),
        (Value::Int32(v), RuntimeType::Double) => Value::Double(f64::from(v)),
        (Value::Int64(v), RuntimeType::Single) => Value::Single(v as f32),
        (Value::Int64(v), RuntimeType::Double) => Value::Double(v as f64),
        (Value::Single(v), RuntimeType::Double) => Value::Double(f64::from(v)),
        (value, _) => value,
    })
}

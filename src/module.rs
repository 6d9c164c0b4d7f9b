//! Loaded modules.
//!
//! A [`LoadedModule`] is a decoded, linked and verified module image. Types
//! and members are looked up through cheap [`TypeHandle`] and
//! [`MemberHandle`] values that keep the module alive.

use std::ops::Range;
use std::sync::Arc;

use dyncode_compiler::{Constant, MethodFlags, ModuleImage};
use dyncode_core::{RuntimeType, Value};
use rustc_hash::FxHashMap;

use crate::backend::LoadError;
use crate::options::Visibility;
use crate::references::{HostFunction, ReferenceSet};

#[derive(Debug)]
pub(crate) struct LoadedMethod {
    pub(crate) name: String,
    pub(crate) flags: MethodFlags,
    pub(crate) params: Vec<RuntimeType>,
    pub(crate) return_type: RuntimeType,
    pub(crate) frame_size: usize,
    pub(crate) code: Vec<u8>,
    pub(crate) declaring_type: usize,
}

#[derive(Debug)]
struct LoadedType {
    name: String,
    methods: Range<usize>,
}

/// A module ready to run.
#[derive(Debug)]
pub struct LoadedModule {
    name: String,
    pub(crate) constants: Vec<Value>,
    pub(crate) imports: Vec<HostFunction>,
    pub(crate) methods: Vec<LoadedMethod>,
    types: Vec<LoadedType>,
    type_index: FxHashMap<String, usize>,
}

impl LoadedModule {
    /// Link `image` against `references`. The code is not verified here.
    pub(crate) fn from_image(image: ModuleImage, references: &ReferenceSet) -> Result<Self, LoadError> {
        let imports = image
            .imports
            .into_iter()
            .map(|signature| {
                references
                    .find(&signature)
                    .cloned()
                    .ok_or(LoadError::UnresolvedImport { signature })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut methods = Vec::new();
        let mut types = Vec::with_capacity(image.types.len());
        let mut type_index = FxHashMap::default();
        for (declaring_type, ty) in image.types.into_iter().enumerate() {
            let start = methods.len();
            methods.extend(ty.methods.into_iter().map(|method| LoadedMethod {
                name: method.name,
                flags: method.flags,
                params: method.params,
                return_type: method.return_type,
                frame_size: usize::from(method.frame_size),
                code: method.code,
                declaring_type,
            }));
            type_index.insert(ty.name.clone(), declaring_type);
            types.push(LoadedType {
                name: ty.name,
                methods: start..methods.len(),
            });
        }

        Ok(Self {
            name: image.name,
            constants: image.constants.into_iter().map(constant_value).collect(),
            imports,
            methods,
            types,
            type_index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified names of the module's types, in image order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|ty| ty.name.as_str())
    }

    /// Find a type by its qualified name, e.g. `Demo.Calculator`.
    pub fn resolve_type(self: &Arc<Self>, name: &str) -> Option<TypeHandle> {
        self.type_index.get(name).map(|&index| TypeHandle {
            module: Arc::clone(self),
            index,
        })
    }

    pub(crate) fn method(&self, index: usize) -> &LoadedMethod {
        &self.methods[index]
    }

    pub(crate) fn method_name(&self, index: usize) -> String {
        let method = &self.methods[index];
        format!("{}.{}", self.types[method.declaring_type].name, method.name)
    }
}

fn constant_value(constant: Constant) -> Value {
    match constant {
        Constant::Int32(v) => Value::Int32(v),
        Constant::Int64(v) => Value::Int64(v),
        Constant::Float32(v) => Value::Single(v),
        Constant::Float64(v) => Value::Double(v),
        Constant::Char(v) => Value::Char(v),
        Constant::String(v) => Value::string(v),
    }
}

/// A type inside a [`LoadedModule`].
#[derive(Debug, Clone)]
pub struct TypeHandle {
    module: Arc<LoadedModule>,
    index: usize,
}

impl TypeHandle {
    pub fn name(&self) -> &str {
        &self.module.types[self.index].name
    }

    /// Every overload named `name` that `visibility` admits, in declaration
    /// order.
    pub fn members<'a>(&'a self, name: &'a str, visibility: Visibility) -> impl Iterator<Item = MemberHandle> + 'a {
        self.module.types[self.index]
            .methods
            .clone()
            .filter(move |&index| {
                let method = self.module.method(index);
                method.name == name && visibility.admits(method.flags)
            })
            .map(|index| MemberHandle {
                module: Arc::clone(&self.module),
                index,
            })
    }

    /// The first overload named `name` that `visibility` admits.
    pub fn resolve_member(&self, name: &str, visibility: Visibility) -> Option<MemberHandle> {
        self.members(name, visibility).next()
    }

    /// The `ordinal`-th method named `name` in declaration order, counting
    /// hidden overloads too. `None` when there is no such method or
    /// `visibility` does not admit it.
    pub fn overload(&self, name: &str, ordinal: usize, visibility: Visibility) -> Option<MemberHandle> {
        self.members(name, Visibility::all())
            .nth(ordinal)
            .filter(|member| visibility.admits(member.flags()))
    }
}

/// A method inside a [`LoadedModule`].
#[derive(Debug, Clone)]
pub struct MemberHandle {
    module: Arc<LoadedModule>,
    index: usize,
}

impl MemberHandle {
    pub fn name(&self) -> &str {
        &self.module.method(self.index).name
    }

    /// `Type.Member`.
    pub fn qualified_name(&self) -> String {
        self.module.method_name(self.index)
    }

    pub fn params(&self) -> &[RuntimeType] {
        &self.module.method(self.index).params
    }

    pub fn return_type(&self) -> &RuntimeType {
        &self.module.method(self.index).return_type
    }

    pub fn flags(&self) -> MethodFlags {
        self.module.method(self.index).flags
    }

    pub(crate) fn module(&self) -> &Arc<LoadedModule> {
        &self.module
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use dyncode_compiler::{BytecodeCompiler, HostSignature};

    use super::*;

    fn load(source: &str) -> Arc<LoadedModule> {
        let references = ReferenceSet::standard();
        let image = BytecodeCompiler::new()
            .compile_image(source, &references.signatures())
            .unwrap();
        Arc::new(LoadedModule::from_image(image, &references).unwrap())
    }

    #[test]
    fn types_resolve_by_qualified_name() {
        let module = load("namespace Demo { class Outer { class Inner { static int M() => 1; } } }");
        assert!(module.resolve_type("Demo.Outer.Inner").is_some());
        assert!(module.resolve_type("Inner").is_none());
        assert_eq!(module.name(), "DynamicModule");
    }

    #[test]
    fn members_honor_visibility() {
        let module = load("class C { public static int A() => 1; static int B() => 2; public int D() => 3; }");
        let ty = module.resolve_type("C").unwrap();
        assert!(ty.resolve_member("A", Visibility::default()).is_some());
        assert!(ty.resolve_member("B", Visibility::default()).is_none());
        assert!(ty.resolve_member("B", Visibility::all()).is_some());
        assert!(ty.resolve_member("D", Visibility::PUBLIC | Visibility::STATIC).is_none());

        let a = ty.resolve_member("A", Visibility::default()).unwrap();
        assert_eq!(a.qualified_name(), "C.A");
        assert_eq!(a.return_type(), &RuntimeType::Int32);
        assert!(a.flags().is_static());
    }

    #[test]
    fn overloads_are_listed_in_order() {
        let module = load("class C { public static int F(int a) => a; public static long F(long a) => a; }");
        let ty = module.resolve_type("C").unwrap();
        let params: Vec<_> = ty
            .members("F", Visibility::default())
            .map(|member| member.params().to_vec())
            .collect();
        assert_eq!(params, vec![vec![RuntimeType::Int32], vec![RuntimeType::Int64]]);
    }

    #[test]
    fn overload_ordinals_count_hidden_members() {
        let module = load("class C { static int F(int a) => a; public static long F(long a) => a; }");
        let ty = module.resolve_type("C").unwrap();
        assert!(ty.overload("F", 0, Visibility::default()).is_none());
        assert_eq!(ty.overload("F", 0, Visibility::all()).unwrap().params(), &[RuntimeType::Int32]);
        assert_eq!(ty.overload("F", 1, Visibility::default()).unwrap().params(), &[RuntimeType::Int64]);
        assert!(ty.overload("F", 2, Visibility::all()).is_none());
    }

    #[test]
    fn imports_link_against_references() {
        let image = ModuleImage {
            name: "M".into(),
            constants: vec![Constant::String("s".into())],
            imports: vec![HostSignature::new("Nowhere", "X", "Y", vec![], RuntimeType::Void)],
            types: vec![],
        };
        assert!(matches!(
            LoadedModule::from_image(image, &ReferenceSet::standard()),
            Err(LoadError::UnresolvedImport { .. })
        ));
    }
}

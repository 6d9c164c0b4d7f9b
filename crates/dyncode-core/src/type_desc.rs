//! Type descriptors.
//!
//! A [`TypeDescriptor`] names a type by its canonical spelling. Descriptors are
//! created either from text ([`TypeDescriptor::named`]) or from a Rust host
//! type that implements [`HostType`] ([`TypeDescriptor::of`]). Both paths go
//! through the normalizer, so `named("int")`, `named("System.Int32")` and
//! `of::<i32>()` are the same descriptor.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::type_name::{PRIMITIVE_NAMESPACE, is_primitive_name, normalize};

/// Canonical identity of a type.
///
/// Equality and hashing use [`full_name`](Self::full_name) only.
#[derive(Clone)]
pub struct TypeDescriptor {
    namespace: Option<String>,
    name: String,
}

impl TypeDescriptor {
    /// Describe a type by its textual name.
    ///
    /// The text is normalized, then split into namespace and short name at the
    /// last `.` outside any type-argument list. Bare primitive names pick up the
    /// `System` namespace. The `void` keyword names `System.Void`.
    pub fn named(text: &str) -> Self {
        let text = text.trim();
        if text == "void" {
            return Self::void();
        }
        let canonical = normalize(text);
        let base_end = canonical.find('<').unwrap_or(canonical.len());
        match canonical[..base_end].rfind('.') {
            Some(dot) => Self {
                namespace: Some(canonical[..dot].to_string()),
                name: canonical[dot + 1..].to_string(),
            },
            None => {
                let namespace = is_primitive_name(leaf_name(&canonical))
                    .then(|| PRIMITIVE_NAMESPACE.to_string());
                Self {
                    namespace,
                    name: canonical,
                }
            }
        }
    }

    /// The `void` pseudo-type.
    pub fn void() -> Self {
        Self {
            namespace: Some(PRIMITIVE_NAMESPACE.to_string()),
            name: "Void".to_string(),
        }
    }

    /// Describe the script-side type of a Rust host type.
    pub fn of<T: HostType + ?Sized>() -> Self {
        T::descriptor()
    }

    /// Short name without namespace, e.g. `Int32` or `Int32[]`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enclosing namespace, e.g. `System`.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Fully qualified canonical name, e.g. `System.Int32`.
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Whether the normalized textual name refers to this type, by short or
    /// fully qualified spelling.
    pub fn matches_text(&self, normalized: &str) -> bool {
        if normalized == self.name {
            return true;
        }
        match &self.namespace {
            Some(ns) => normalized
                .strip_prefix(ns.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .is_some_and(|rest| rest == self.name),
            None => false,
        }
    }

    /// Whether this descriptor names the `void` pseudo-type.
    pub fn is_void(&self) -> bool {
        self.name == "Void" && self.namespace.as_deref() == Some(PRIMITIVE_NAMESPACE)
    }

    /// Descriptor for an array of this type.
    pub fn array_of(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: format!("{}[]", self.name),
        }
    }

    /// Descriptor for the nullable form of this type.
    pub fn nullable_of(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: format!("{}?", self.name),
        }
    }
}

/// Strip nullable, array and type-argument decorations from a name.
fn leaf_name(name: &str) -> &str {
    let mut leaf = name;
    loop {
        if let Some(inner) = leaf.strip_suffix('?') {
            leaf = inner;
        } else if let Some(inner) = leaf.strip_suffix("[]") {
            leaf = inner;
        } else {
            break;
        }
    }
    match leaf.find('<') {
        Some(open) => &leaf[..open],
        None => leaf,
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.name == other.name
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_name().hash(state);
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDescriptor({})", self.full_name())
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for TypeDescriptor {
    fn from(text: &str) -> Self {
        Self::named(text)
    }
}

/// A Rust type with a script-side counterpart.
pub trait HostType {
    /// The descriptor of the script-side type.
    fn descriptor() -> TypeDescriptor;
}

macro_rules! impl_host_primitive {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl HostType for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::named($name)
                }
            }
        )*
    };
}

impl_host_primitive!(
    bool => "Boolean",
    char => "Char",
    i8 => "SByte",
    u8 => "Byte",
    i16 => "Int16",
    u16 => "UInt16",
    i32 => "Int32",
    u32 => "UInt32",
    i64 => "Int64",
    u64 => "UInt64",
    f32 => "Single",
    f64 => "Double",
    String => "String",
    str => "String",
    () => "Void",
);

impl<T: HostType> HostType for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        T::descriptor().array_of()
    }
}

impl<T: HostType> HostType for Option<T> {
    fn descriptor() -> TypeDescriptor {
        T::descriptor().nullable_of()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_and_qualified_names_are_equal() {
        let a = TypeDescriptor::named("int");
        let b = TypeDescriptor::named("System.Int32");
        let c = TypeDescriptor::of::<i32>();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.name(), "Int32");
        assert_eq!(a.namespace(), Some("System"));
        assert_eq!(a.full_name(), "System.Int32");
    }

    #[test]
    fn user_types_have_no_implicit_namespace() {
        let widget = TypeDescriptor::named("Widget");
        assert_eq!(widget.namespace(), None);
        assert_eq!(widget.full_name(), "Widget");
        assert_ne!(widget, TypeDescriptor::named("Shop.Widget"));
    }

    #[test]
    fn qualified_generic_splits_before_arguments() {
        let list = TypeDescriptor::named("System.Collections.Generic.List<int>");
        assert_eq!(list.namespace(), Some("System.Collections.Generic"));
        assert_eq!(list.name(), "List<Int32>");
    }

    #[test]
    fn matches_short_and_full_spelling() {
        let d = TypeDescriptor::of::<String>();
        assert!(d.matches_text("String"));
        assert!(d.matches_text("System.String"));
        assert!(!d.matches_text("Text.String"));
        assert!(!d.matches_text("string"));
    }

    #[test]
    fn composite_host_types() {
        assert_eq!(TypeDescriptor::of::<Vec<i32>>().full_name(), "System.Int32[]");
        assert_eq!(TypeDescriptor::of::<Option<i64>>().full_name(), "System.Int64?");
        assert_eq!(TypeDescriptor::of::<Vec<i32>>(), TypeDescriptor::named("int[]"));
        assert!(TypeDescriptor::of::<()>().is_void());
    }

    #[test]
    fn void_keyword_names_system_void() {
        for text in ["void", " void ", "Void", "System.Void"] {
            let d = TypeDescriptor::named(text);
            assert!(d.is_void(), "{text:?}");
            assert_eq!(d, TypeDescriptor::of::<()>());
        }
        assert!(!TypeDescriptor::named("Voidable").is_void());
        assert!(!TypeDescriptor::named("Custom.Void").is_void());
    }
}

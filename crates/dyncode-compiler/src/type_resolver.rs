//! Type resolution from syntax to [`RuntimeType`].
//!
//! Keyword aliases (`int`), short names (`Int32`) and `System`-qualified
//! names (`System.Int32`, `global::System.Int32`) all resolve to the same
//! primitive. Names of types declared in the source, and known framework
//! primitives the runtime does not model (`decimal`, `object`, ...), resolve
//! to an "unsupported" error rather than "unknown".

use dyncode_core::{RuntimeType, type_name};
use dyncode_parser::ast::{TypeExpr, TypeKind};
use rustc_hash::FxHashSet;

use crate::error::CompilationError;

pub struct TypeResolver {
    /// Simple and qualified names of types declared in the source.
    declared: FxHashSet<String>,
}

impl TypeResolver {
    pub fn new(declared: impl IntoIterator<Item = String>) -> Self {
        Self {
            declared: declared.into_iter().collect(),
        }
    }

    /// Resolve a value type: anything but `void`.
    pub fn resolve(&self, ty: &TypeExpr<'_>) -> Result<RuntimeType, CompilationError> {
        match ty.kind {
            TypeKind::Void => Err(CompilationError::unsupported(
                "'void' as a value type",
                ty.span,
            )),
            TypeKind::Named { path, args, .. } => {
                let segments: Vec<&str> = path.iter().map(|segment| segment.name).collect();
                let name = segments.join(".");
                if !args.is_empty() {
                    return Err(CompilationError::UnsupportedType {
                        name: ty.to_string(),
                        span: ty.span,
                    });
                }
                if let Some(primitive) = primitive_from_path(&segments) {
                    return Ok(primitive);
                }
                let canonical = canonical_name(&segments);
                if type_name::is_primitive_name(canonical) || self.declared.contains(&name) {
                    Err(CompilationError::UnsupportedType { name, span: ty.span })
                } else {
                    Err(CompilationError::UnknownType { name, span: ty.span })
                }
            }
            TypeKind::Array { element, rank } => {
                if rank > 1 {
                    return Err(CompilationError::unsupported(
                        "multi-dimensional arrays",
                        ty.span,
                    ));
                }
                Ok(RuntimeType::Array(Box::new(self.resolve(element)?)))
            }
            TypeKind::Nullable(inner) => {
                let inner = self.resolve(inner)?;
                // `string?` and `T[]?` are annotations on types that already accept null.
                if inner.accepts_null() {
                    Ok(inner)
                } else {
                    Ok(RuntimeType::Nullable(Box::new(inner)))
                }
            }
        }
    }

    /// Resolve a method return type, where `void` is allowed.
    pub fn resolve_return(&self, ty: &TypeExpr<'_>) -> Result<RuntimeType, CompilationError> {
        if ty.is_void() {
            Ok(RuntimeType::Void)
        } else {
            self.resolve(ty)
        }
    }
}

/// `["System", "Int32"]` and `["int"]` both become `"Int32"`.
fn canonical_name<'a>(segments: &[&'a str]) -> &'a str {
    match *segments {
        [single] => type_name::alias(single).unwrap_or(single),
        [namespace, name] if namespace == type_name::PRIMITIVE_NAMESPACE => name,
        _ => "",
    }
}

/// A runtime primitive named by a dotted path, if any.
pub fn primitive_from_path(segments: &[&str]) -> Option<RuntimeType> {
    let name = canonical_name(segments);
    if name == "Void" {
        return None;
    }
    RuntimeType::from_primitive_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use dyncode_parser::Parser;

    fn resolve(source: &str) -> Result<RuntimeType, CompilationError> {
        let arena = Bump::new();
        let ty = Parser::type_expr(source, &arena).unwrap();
        TypeResolver::new(["Calculator".to_string()]).resolve(&ty)
    }

    #[test]
    fn spellings_of_primitives_agree() {
        for source in ["int", "Int32", "System.Int32", "global::System.Int32"] {
            assert_eq!(resolve(source).unwrap(), RuntimeType::Int32, "{source}");
        }
        assert_eq!(resolve("string").unwrap(), RuntimeType::String);
        assert_eq!(resolve("float").unwrap(), RuntimeType::Single);
    }

    #[test]
    fn composites() {
        assert_eq!(
            resolve("int[]").unwrap(),
            RuntimeType::Array(Box::new(RuntimeType::Int32))
        );
        assert_eq!(
            resolve("double?").unwrap(),
            RuntimeType::Nullable(Box::new(RuntimeType::Double))
        );
        assert_eq!(resolve("string?").unwrap(), RuntimeType::String);
    }

    #[test]
    fn unsupported_and_unknown() {
        assert!(matches!(resolve("decimal"), Err(CompilationError::UnsupportedType { .. })));
        assert!(matches!(resolve("Calculator"), Err(CompilationError::UnsupportedType { .. })));
        assert!(matches!(resolve("List<int>"), Err(CompilationError::UnsupportedType { .. })));
        assert!(matches!(resolve("int[,]"), Err(CompilationError::Unsupported { .. })));
        assert!(matches!(resolve("Widget"), Err(CompilationError::UnknownType { .. })));
        assert!(matches!(resolve("Void"), Err(CompilationError::UnsupportedType { .. })));
    }

    #[test]
    fn paths_name_primitives() {
        assert_eq!(primitive_from_path(&["int"]), Some(RuntimeType::Int32));
        assert_eq!(primitive_from_path(&["System", "String"]), Some(RuntimeType::String));
        assert_eq!(primitive_from_path(&["Math"]), None);
    }
}

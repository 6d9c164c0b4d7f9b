//! Type expressions.
//!
//! `Display` renders a type in canonical source form (`Name<A, B>`, `T[]`,
//! `T[,]`, `T?`), which is the text the signature matcher normalizes.

use std::fmt;

use dyncode_core::Span;

use crate::ast::Ident;

/// A type as written in source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeExpr<'ast> {
    pub kind: TypeKind<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeKind<'ast> {
    /// `void`, only valid as a method return type.
    Void,
    /// `System.Int32`, `int`, `global::System.String`, `List<int>`.
    Named {
        /// Written with a `global::` prefix.
        global: bool,
        path: &'ast [Ident<'ast>],
        args: &'ast [TypeExpr<'ast>],
    },
    /// `T[]` has rank 1, `T[,]` rank 2.
    Array {
        element: &'ast TypeExpr<'ast>,
        rank: u32,
    },
    /// `T?`
    Nullable(&'ast TypeExpr<'ast>),
}

impl<'ast> TypeExpr<'ast> {
    pub fn new(kind: TypeKind<'ast>, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    /// The dotted name of a simple named type without type arguments.
    pub fn simple_name(&self) -> Option<String> {
        match self.kind {
            TypeKind::Named { path, args, .. } if args.is_empty() => Some(
                path.iter()
                    .map(|segment| segment.name)
                    .collect::<Vec<_>>()
                    .join("."),
            ),
            _ => None,
        }
    }
}

impl fmt::Display for TypeExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TypeKind::Void => f.write_str("void"),
            TypeKind::Named { global, path, args } => {
                if global {
                    f.write_str("global::")?;
                }
                for (i, segment) in path.iter().enumerate() {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(segment.name)?;
                }
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeKind::Array { element, rank } => {
                write!(f, "{element}[")?;
                for _ in 1..rank {
                    f.write_str(",")?;
                }
                f.write_str("]")
            }
            TypeKind::Nullable(inner) => write!(f, "{inner}?"),
        }
    }
}

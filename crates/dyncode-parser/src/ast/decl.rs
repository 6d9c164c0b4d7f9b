//! Declaration nodes: namespaces, type declarations and their members.

use bitflags::bitflags;
use dyncode_core::Span;

use crate::ast::Ident;
use crate::ast::expr::Expr;
use crate::ast::stmt::Block;
use crate::ast::types::TypeExpr;
use crate::lexer::TokenKind;

/// A top-level or namespace-level item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Item<'ast> {
    Using(UsingDecl<'ast>),
    Namespace(NamespaceDecl<'ast>),
    Type(&'ast TypeDecl<'ast>),
}

impl<'ast> Item<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Self::Using(d) => d.span,
            Self::Namespace(d) => d.span,
            Self::Type(d) => d.span,
        }
    }
}

/// `using System;`, `using static System.Math;` or `using Alias = Some.Namespace;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsingDecl<'ast> {
    pub is_static: bool,
    pub alias: Option<Ident<'ast>>,
    pub path: &'ast [Ident<'ast>],
    pub span: Span,
}

/// `namespace A.B { ... }` or the file-scoped `namespace A.B;`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamespaceDecl<'ast> {
    pub path: &'ast [Ident<'ast>],
    pub items: &'ast [Item<'ast>],
    pub file_scoped: bool,
    pub span: Span,
}

impl NamespaceDecl<'_> {
    /// The dotted namespace name.
    pub fn name(&self) -> String {
        join_path(self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeDeclKind {
    Class,
    Struct,
    Interface,
    Enum,
    Record,
}

impl TypeDeclKind {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Class => TypeDeclKind::Class,
            TokenKind::Struct => TypeDeclKind::Struct,
            TokenKind::Interface => TypeDeclKind::Interface,
            TokenKind::Enum => TypeDeclKind::Enum,
            TokenKind::Record => TypeDeclKind::Record,
            _ => return None,
        })
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            TypeDeclKind::Class => "class",
            TypeDeclKind::Struct => "struct",
            TypeDeclKind::Interface => "interface",
            TypeDeclKind::Enum => "enum",
            TypeDeclKind::Record => "record",
        }
    }
}

/// A `class`, `struct`, `interface`, `enum` or `record` declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeDecl<'ast> {
    pub kind: TypeDeclKind,
    pub modifiers: Modifiers,
    pub name: Ident<'ast>,
    /// Records only: `record Point(int X, int Y);`
    pub primary_params: &'ast [Param<'ast>],
    pub bases: &'ast [TypeExpr<'ast>],
    pub members: &'ast [Member<'ast>],
    pub span: Span,
}

impl<'ast> TypeDecl<'ast> {
    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl<'ast>> {
        self.members.iter().filter_map(|member| match member {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn nested_types(&self) -> impl Iterator<Item = &'ast TypeDecl<'ast>> {
        self.members.iter().filter_map(|member| match member {
            Member::Type(decl) => Some(*decl),
            _ => None,
        })
    }
}

/// A member of a type body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Member<'ast> {
    Method(MethodDecl<'ast>),
    Constructor(MethodDecl<'ast>),
    Field(FieldDecl<'ast>),
    /// Accessor bodies are skipped.
    Property(PropertyDecl<'ast>),
    Enumerator(EnumeratorDecl<'ast>),
    Type(&'ast TypeDecl<'ast>),
}

impl<'ast> Member<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Self::Method(m) | Self::Constructor(m) => m.span,
            Self::Field(f) => f.span,
            Self::Property(p) => p.span,
            Self::Enumerator(e) => e.span,
            Self::Type(t) => t.span,
        }
    }
}

/// A method. Constructors reuse this shape with a `void` return type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodDecl<'ast> {
    pub modifiers: Modifiers,
    pub return_type: TypeExpr<'ast>,
    pub name: Ident<'ast>,
    pub params: &'ast [Param<'ast>],
    /// `None` for abstract and interface methods.
    pub body: Option<MethodBody<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MethodBody<'ast> {
    Block(Block<'ast>),
    /// `=> expr;`
    Expr(&'ast Expr<'ast>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param<'ast> {
    pub ty: TypeExpr<'ast>,
    pub name: Ident<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDecl<'ast> {
    pub modifiers: Modifiers,
    pub ty: TypeExpr<'ast>,
    pub name: Ident<'ast>,
    pub init: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyDecl<'ast> {
    pub modifiers: Modifiers,
    pub ty: TypeExpr<'ast>,
    pub name: Ident<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnumeratorDecl<'ast> {
    pub name: Ident<'ast>,
    pub value: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

bitflags! {
    /// Declaration modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const PUBLIC    = 1 << 0;
        const PRIVATE   = 1 << 1;
        const PROTECTED = 1 << 2;
        const INTERNAL  = 1 << 3;
        const STATIC    = 1 << 4;
        const SEALED    = 1 << 5;
        const ABSTRACT  = 1 << 6;
        const READONLY  = 1 << 7;
        const PARTIAL   = 1 << 8;
        const CONST     = 1 << 9;
        const VIRTUAL   = 1 << 10;
        const OVERRIDE  = 1 << 11;

        const ACCESS = Self::PUBLIC.bits()
            | Self::PRIVATE.bits()
            | Self::PROTECTED.bits()
            | Self::INTERNAL.bits();
    }
}

impl Modifiers {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Public => Modifiers::PUBLIC,
            TokenKind::Private => Modifiers::PRIVATE,
            TokenKind::Protected => Modifiers::PROTECTED,
            TokenKind::Internal => Modifiers::INTERNAL,
            TokenKind::Static => Modifiers::STATIC,
            TokenKind::Sealed => Modifiers::SEALED,
            TokenKind::Abstract => Modifiers::ABSTRACT,
            TokenKind::Readonly => Modifiers::READONLY,
            TokenKind::Partial => Modifiers::PARTIAL,
            TokenKind::Const => Modifiers::CONST,
            TokenKind::Virtual => Modifiers::VIRTUAL,
            TokenKind::Override => Modifiers::OVERRIDE,
            _ => return None,
        })
    }

    pub fn is_static(&self) -> bool {
        self.contains(Modifiers::STATIC)
    }

    /// The declared access keywords, or `private` when none were written.
    ///
    /// `protected internal` and `private protected` keep both bits.
    pub fn access(&self) -> Modifiers {
        let access = self.intersection(Modifiers::ACCESS);
        if access.is_empty() {
            Modifiers::PRIVATE
        } else {
            access
        }
    }
}

/// Join identifier segments with `.`.
pub fn join_path(path: &[Ident<'_>]) -> String {
    path.iter()
        .map(|ident| ident.name)
        .collect::<Vec<_>>()
        .join(".")
}

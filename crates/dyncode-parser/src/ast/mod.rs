//! Abstract syntax tree for the dyncode source language.
//!
//! All nodes are allocated in a caller-provided [`bumpalo::Bump`] and remain
//! valid for the arena's lifetime.
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use dyncode_parser::Parser;
//!
//! let arena = Bump::new();
//! let source = r#"
//!     namespace Demo {
//!         public class Calculator {
//!             public static int Add(int a, int b) { return a + b; }
//!         }
//!     }
//! "#;
//!
//! let unit = Parser::parse(source, &arena).unwrap();
//! let types = unit.declared_types();
//! assert_eq!(types[0].qualified_name(), "Demo.Calculator");
//! ```

pub mod decl;
pub mod expr;
pub mod ops;
pub mod stmt;
pub mod types;

mod decl_parser;
mod expr_parser;
mod parser;
mod stmt_parser;
mod type_parser;

pub use dyncode_core::{ParseError, ParseErrorKind, ParseErrors};

pub use decl::*;
pub use expr::*;
pub use ops::*;
pub use parser::Parser;
pub use stmt::*;
pub use types::*;

use dyncode_core::Span;

/// An identifier with its location. Verbatim identifiers keep their `@`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ident<'ast> {
    pub name: &'ast str,
    pub span: Span,
}

impl<'ast> Ident<'ast> {
    pub fn new(name: &'ast str, span: Span) -> Self {
        Self { name, span }
    }
}

/// One parsed source text.
#[derive(Debug, Clone, Copy)]
pub struct CompilationUnit<'ast> {
    items: &'ast [Item<'ast>],
    span: Span,
}

impl<'ast> CompilationUnit<'ast> {
    pub(crate) fn new(items: &'ast [Item<'ast>], span: Span) -> Self {
        Self { items, span }
    }

    pub fn items(&self) -> &'ast [Item<'ast>] {
        self.items
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Every type declaration in the unit in source order, including types
    /// inside namespaces and types nested in other types.
    pub fn declared_types(&self) -> Vec<DeclaredType<'ast>> {
        let mut out = Vec::new();
        collect_items(self.items, None, &mut out);
        out
    }

    /// Every `using` directive, at file level or inside namespaces.
    pub fn usings(&self) -> Vec<&'ast UsingDecl<'ast>> {
        let mut out = Vec::new();
        collect_usings(self.items, &mut out);
        out
    }
}

fn collect_usings<'ast>(items: &'ast [Item<'ast>], out: &mut Vec<&'ast UsingDecl<'ast>>) {
    for item in items {
        match item {
            Item::Using(using) => out.push(using),
            Item::Namespace(ns) => collect_usings(ns.items, out),
            Item::Type(_) => {}
        }
    }
}

/// A type declaration together with where it was declared.
#[derive(Debug, Clone)]
pub struct DeclaredType<'ast> {
    pub namespace: Option<String>,
    /// Names of enclosing types, outermost first.
    pub enclosing: Vec<&'ast str>,
    pub decl: &'ast TypeDecl<'ast>,
}

impl<'ast> DeclaredType<'ast> {
    pub fn name(&self) -> &'ast str {
        self.decl.name.name
    }

    /// `Namespace.Outer.Name`, omitting absent parts.
    pub fn qualified_name(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(self.enclosing.len() + 2);
        if let Some(ns) = &self.namespace {
            parts.push(ns);
        }
        parts.extend(self.enclosing.iter().copied());
        parts.push(self.decl.name.name);
        parts.join(".")
    }
}

fn collect_items<'ast>(
    items: &'ast [Item<'ast>],
    namespace: Option<&str>,
    out: &mut Vec<DeclaredType<'ast>>,
) {
    for item in items {
        match item {
            Item::Using(_) => {}
            Item::Namespace(ns) => {
                let name = match namespace {
                    Some(outer) => format!("{outer}.{}", ns.name()),
                    None => ns.name(),
                };
                collect_items(ns.items, Some(&name), out);
            }
            Item::Type(decl) => collect_type(decl, namespace, Vec::new(), out),
        }
    }
}

fn collect_type<'ast>(
    decl: &'ast TypeDecl<'ast>,
    namespace: Option<&str>,
    enclosing: Vec<&'ast str>,
    out: &mut Vec<DeclaredType<'ast>>,
) {
    out.push(DeclaredType {
        namespace: namespace.map(str::to_string),
        enclosing: enclosing.clone(),
        decl,
    });
    for nested in decl.nested_types() {
        let mut inner = enclosing.clone();
        inner.push(decl.name.name);
        collect_type(nested, namespace, inner, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;

    #[test]
    fn parse_simple_class() {
        let arena = Bump::new();
        let unit = Parser::parse("class Foo { }", &arena).unwrap();
        assert_eq!(unit.items().len(), 1);
    }

    #[test]
    fn parse_class_with_members() {
        let arena = Bump::new();
        let source = r#"
            public class Player {
                private int health = 100;
                public int Health { get; set; }
                public Player(int hp) { health = hp; }
                public void TakeDamage(int amount) {
                    health -= amount;
                }
            }
        "#;
        let unit = Parser::parse(source, &arena).unwrap();
        let types = unit.declared_types();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].decl.members.len(), 4);
        assert_eq!(types[0].decl.methods().count(), 1);
    }

    #[test]
    fn parse_with_errors() {
        let arena = Bump::new();
        let result = Parser::parse("class A { int F() { return ; ; x = ; } }", &arena);
        assert!(result.is_err());
    }

    #[test]
    fn lenient_parse_keeps_method_signature() {
        let arena = Bump::new();
        let source = r#"
            public class Calculator {
                public static int Add(int a, int b) { return a + ; }
            }
        "#;
        let (unit, errors) = Parser::parse_lenient(source, &arena);
        assert!(!errors.is_empty());

        let types = unit.declared_types();
        let method = types[0].decl.methods().next().unwrap();
        assert_eq!(method.name.name, "Add");
        assert_eq!(method.params.len(), 2);
        assert_eq!(method.return_type.to_string(), "int");
    }

    #[test]
    fn lenient_parse_recovers_across_members() {
        let arena = Bump::new();
        let source = r#"
            class C {
                int Broken( { }
                int Fine(int x) { return x; }
            }
        "#;
        let (unit, errors) = Parser::parse_lenient(source, &arena);
        assert!(!errors.is_empty());
        let types = unit.declared_types();
        assert!(types[0].decl.methods().any(|m| m.name.name == "Fine"));
    }

    #[test]
    fn lenient_parse_no_errors() {
        let arena = Bump::new();
        let (unit, errors) = Parser::parse_lenient("class A { }", &arena);
        assert!(errors.is_empty());
        assert_eq!(unit.items().len(), 1);
    }

    #[test]
    fn declared_types_include_namespaces_and_nesting() {
        let arena = Bump::new();
        let source = r#"
            using System;
            namespace Outer {
                namespace Inner {
                    class A { class B { } }
                }
                struct S { }
            }
            class Top { }
        "#;
        let unit = Parser::parse(source, &arena).unwrap();
        let names: Vec<String> = unit
            .declared_types()
            .iter()
            .map(DeclaredType::qualified_name)
            .collect();
        assert_eq!(names, vec!["Outer.Inner.A", "Outer.Inner.A.B", "Outer.S", "Top"]);
    }

    #[test]
    fn file_scoped_namespace() {
        let arena = Bump::new();
        let source = "namespace Scripts.Math;\nclass Calc { }";
        let unit = Parser::parse(source, &arena).unwrap();
        assert_eq!(unit.declared_types()[0].qualified_name(), "Scripts.Math.Calc");
    }

    #[test]
    fn parse_other_type_kinds() {
        let arena = Bump::new();
        let source = r#"
            interface IShape { double Area(); }
            enum Color { Red, Green = 1, Blue = 2 }
            record Point(int X, int Y);
            abstract class Base { public abstract int Value(); }
        "#;
        let unit = Parser::parse(source, &arena).unwrap();
        let kinds: Vec<TypeDeclKind> = unit.declared_types().iter().map(|t| t.decl.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TypeDeclKind::Interface,
                TypeDeclKind::Enum,
                TypeDeclKind::Record,
                TypeDeclKind::Class
            ]
        );
    }

    #[test]
    fn parse_expression_bodied_method() {
        let arena = Bump::new();
        let unit = Parser::parse("class A { static int Twice(int x) => x * 2; }", &arena).unwrap();
        let types = unit.declared_types();
        let method = types[0].decl.methods().next().unwrap();
        assert!(matches!(method.body, Some(MethodBody::Expr(_))));
        assert!(method.modifiers.is_static());
    }

    #[test]
    fn parse_expression_entry_point() {
        let arena = Bump::new();
        assert!(Parser::expression("a.b(1)[0] + 2", &arena).is_ok());
        assert!(Parser::expression("1 +", &arena).is_err());
    }

    #[test]
    fn parse_statement_entry_point() {
        let arena = Bump::new();
        assert!(Parser::statement("for (int i = 0; i < 10; i++) { }", &arena).is_ok());
        assert!(Parser::statement("int x = 42", &arena).is_err());
    }

    #[test]
    fn parse_type_entry_point() {
        let arena = Bump::new();
        let ty = Parser::type_expr("Dictionary<string, List<int?>>[]", &arena).unwrap();
        assert_eq!(ty.to_string(), "Dictionary<string, List<int?>>[]");
        assert!(Parser::type_expr("123", &arena).is_err());
    }

    #[test]
    fn lexer_errors_are_reported() {
        let arena = Bump::new();
        let (_, errors) = Parser::parse_lenient("class A { string s = \"open; }", &arena);
        assert!(errors.iter().any(|e| e.kind == ParseErrorKind::Lexical));
    }
}

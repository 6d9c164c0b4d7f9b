//! Source analysis.
//!
//! Finds the single class a source declares and lists its methods with
//! their declared types as written. Nothing here resolves types; the
//! [`matcher`](crate::matcher) normalizes the text.

use bumpalo::Bump;
use dyncode_core::{Diagnostic, Diagnostics, Span};
use dyncode_parser::Parser;
use dyncode_parser::ast::{MethodDecl, Modifiers, TypeDeclKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("the source declares no class")]
    NoDeclaredType,

    #[error("the source declares more than one class: {}", names.join(", "))]
    MultipleDeclaredTypes { names: Vec<String> },
}

/// Declared accessibility of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accessibility {
    Public,
    Private,
    Protected,
    Internal,
    ProtectedInternal,
    PrivateProtected,
}

impl Accessibility {
    fn from_modifiers(modifiers: Modifiers) -> Self {
        let access = modifiers.access();
        if access == Modifiers::PROTECTED | Modifiers::INTERNAL {
            Accessibility::ProtectedInternal
        } else if access == Modifiers::PRIVATE | Modifiers::PROTECTED {
            Accessibility::PrivateProtected
        } else if access.contains(Modifiers::PUBLIC) {
            Accessibility::Public
        } else if access.contains(Modifiers::PROTECTED) {
            Accessibility::Protected
        } else if access.contains(Modifiers::INTERNAL) {
            Accessibility::Internal
        } else {
            Accessibility::Private
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    /// Declared type, as written.
    pub type_text: String,
}

/// A method as declared in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSignature {
    pub name: String,
    pub parameters: Vec<Parameter>,
    /// Declared return type, as written; `void` for procedures.
    pub return_type: String,
    pub visibility: Accessibility,
    pub is_static: bool,
    pub span: Span,
}

impl MemberSignature {
    fn from_decl(method: &MethodDecl<'_>) -> Self {
        Self {
            name: method.name.name.to_string(),
            parameters: method
                .params
                .iter()
                .map(|param| Parameter {
                    name: param.name.name.to_string(),
                    type_text: param.ty.to_string(),
                })
                .collect(),
            return_type: method.return_type.to_string(),
            visibility: Accessibility::from_modifiers(method.modifiers),
            is_static: method.modifiers.is_static(),
            span: method.span,
        }
    }
}

/// The declared class of a source and its methods in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUnit {
    pub type_name: String,
    pub namespace: Option<String>,
    /// Name the compiled module knows the type by, e.g. `Demo.Outer.Calc`.
    pub qualified_name: String,
    pub members: Vec<MemberSignature>,
}

/// Find the one class `source` declares.
///
/// Syntax errors do not stop the analysis; whatever declarations parsed are
/// inspected and the compiler reports the errors later.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn analyze(source: &str) -> Result<ParsedUnit, AnalysisError> {
    analyze_with_syntax(source).0
}

/// Like [`analyze`], also returning the syntax errors the parse recovered
/// from.
pub(crate) fn analyze_with_syntax(source: &str) -> (Result<ParsedUnit, AnalysisError>, Diagnostics) {
    let arena = Bump::new();
    let (unit, errors) = Parser::parse_lenient(source, &arena);
    if !errors.is_empty() {
        tracing::trace!(errors = errors.len(), "analyzing source with syntax errors");
    }
    let syntax: Diagnostics = errors
        .into_iter()
        .map(|error| Diagnostic::error(error.span, error.message))
        .collect();

    let mut classes: Vec<_> = unit
        .declared_types()
        .into_iter()
        .filter(|declared| declared.decl.kind == TypeDeclKind::Class)
        .collect();

    let analysis = match classes.len() {
        0 => Err(AnalysisError::NoDeclaredType),
        1 => match classes.pop() {
            Some(class) => Ok(ParsedUnit {
                type_name: class.name().to_string(),
                namespace: class.namespace.clone(),
                qualified_name: class.qualified_name(),
                members: class.decl.methods().map(MemberSignature::from_decl).collect(),
            }),
            None => Err(AnalysisError::NoDeclaredType),
        },
        _ => Err(AnalysisError::MultipleDeclaredTypes {
            names: classes.iter().map(|class| class.qualified_name()).collect(),
        }),
    };
    (analysis, syntax)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_class_with_members() {
        let unit = analyze(
            "namespace Demo { public class Calc {
                public static int Add(int a, System.Int32 b) => a + b;
                void Log(string[] lines, int? code) { }
            } }",
        )
        .unwrap();
        assert_eq!(unit.type_name, "Calc");
        assert_eq!(unit.namespace.as_deref(), Some("Demo"));
        assert_eq!(unit.qualified_name, "Demo.Calc");
        assert_eq!(unit.members.len(), 2);

        let add = &unit.members[0];
        assert_eq!(add.name, "Add");
        assert_eq!(add.return_type, "int");
        assert_eq!(add.parameters[1].type_text, "System.Int32");
        assert_eq!(add.visibility, Accessibility::Public);
        assert!(add.is_static);

        let log = &unit.members[1];
        assert_eq!(log.return_type, "void");
        assert_eq!(log.parameters[0].type_text, "string[]");
        assert_eq!(log.parameters[1].type_text, "int?");
        assert_eq!(log.visibility, Accessibility::Private);
        assert!(!log.is_static);
    }

    #[test]
    fn other_type_kinds_do_not_count() {
        let unit = analyze(
            "struct Point { } interface IShape { } enum Color { Red } class Only { }",
        )
        .unwrap();
        assert_eq!(unit.type_name, "Only");
        assert!(unit.members.is_empty());
    }

    #[test]
    fn no_class() {
        assert_eq!(analyze(""), Err(AnalysisError::NoDeclaredType));
        assert_eq!(analyze("struct S { }"), Err(AnalysisError::NoDeclaredType));
    }

    #[test]
    fn nested_classes_count() {
        let error = analyze("class Outer { class Inner { } }").unwrap_err();
        assert_eq!(
            error,
            AnalysisError::MultipleDeclaredTypes {
                names: vec!["Outer".into(), "Outer.Inner".into()]
            }
        );
    }

    #[test]
    fn body_errors_keep_the_declaration() {
        let unit = analyze("class C { public int M(int a) { return a + ; } }").unwrap();
        assert_eq!(unit.members[0].name, "M");
    }

    #[test]
    fn recovered_syntax_errors_are_returned() {
        let (analysis, syntax) = analyze_with_syntax("class C { int M(int a) => a; }");
        assert!(analysis.is_ok());
        assert!(syntax.is_empty());

        let (analysis, syntax) = analyze_with_syntax("class C public static int M(int a) => a; }");
        assert!(analysis.is_err());
        assert!(syntax.has_errors());
    }

    #[test]
    fn combined_access_modifiers() {
        let unit = analyze(
            "class C { protected internal void A() { } private protected void B() { } internal void D() { } }",
        )
        .unwrap();
        let access: Vec<_> = unit.members.iter().map(|m| m.visibility).collect();
        assert_eq!(
            access,
            [
                Accessibility::ProtectedInternal,
                Accessibility::PrivateProtected,
                Accessibility::Internal
            ]
        );
    }
}

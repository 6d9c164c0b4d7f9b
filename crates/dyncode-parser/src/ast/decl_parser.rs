//! Declaration parsing: compilation units, namespaces, type declarations and
//! type members.

use super::parser::Parser;
use crate::ast::decl::*;
use crate::ast::types::{TypeExpr, TypeKind};
use crate::ast::{CompilationUnit, Ident, ParseError, ParseErrorKind};
use crate::lexer::TokenKind;
use bumpalo::collections::Vec as BVec;

/// Parameter modifiers that are recognized but not supported.
const PARAMETER_MODIFIERS: &[&str] = &["ref", "out", "in", "params"];

impl<'ast> Parser<'ast> {
    /// Parse the whole token stream.
    pub(super) fn parse_compilation_unit(&mut self) -> CompilationUnit<'ast> {
        let start = self.peek().span;
        let items = self.parse_items(false);
        CompilationUnit::new(items, start.to(self.previous_span()))
    }

    /// Parse items until end of input, or until the closing `}` of a
    /// namespace body when `braced`.
    fn parse_items(&mut self, braced: bool) -> &'ast [Item<'ast>] {
        let mut items = BVec::new_in(self.arena);
        loop {
            if self.is_eof() || (braced && self.check(TokenKind::RightBrace)) {
                break;
            }
            if self.check(TokenKind::RightBrace) {
                let token = self.advance();
                self.record(ParseError::new(
                    ParseErrorKind::UnexpectedToken,
                    token.span,
                    "unexpected '}'",
                ));
                continue;
            }

            let start = self.position;
            match self.parse_item() {
                Ok(item) => items.push(item),
                Err(error) => {
                    self.record(error);
                    self.synchronize_declaration(start);
                }
            }
        }
        items.into_bump_slice()
    }

    fn parse_item(&mut self) -> Result<Item<'ast>, ParseError> {
        match self.peek().kind {
            TokenKind::Using => self.parse_using().map(Item::Using),
            TokenKind::Namespace => self.parse_namespace().map(Item::Namespace),
            _ => {
                let start = self.peek().span;
                let modifiers = self.parse_modifiers();
                if !self.peek().kind.is_type_declaration() {
                    let token = *self.peek();
                    return Err(ParseError::new(
                        ParseErrorKind::ExpectedDeclaration,
                        token.span,
                        format!(
                            "expected a type declaration, found {}",
                            token.describe()
                        ),
                    ));
                }
                let decl = self.parse_type_decl(modifiers, start)?;
                Ok(Item::Type(self.arena.alloc(decl)))
            }
        }
    }

    /// `using A.B;`, `using static A.B;` or `using Alias = A.B;`
    fn parse_using(&mut self) -> Result<UsingDecl<'ast>, ParseError> {
        let start = self.expect(TokenKind::Using)?.span;
        let is_static = self.eat(TokenKind::Static).is_some();
        let alias = if self.check(TokenKind::Identifier) && self.peek_nth(1).kind == TokenKind::Equal {
            let alias = self.expect_identifier()?;
            self.advance();
            Some(alias)
        } else {
            None
        };
        let path = self.parse_dotted_path()?;
        let end = self.expect(TokenKind::Semicolon)?.span;
        Ok(UsingDecl {
            is_static,
            alias,
            path,
            span: start.to(end),
        })
    }

    fn parse_namespace(&mut self) -> Result<NamespaceDecl<'ast>, ParseError> {
        let start = self.expect(TokenKind::Namespace)?.span;
        let path = self.parse_dotted_path()?;

        if self.eat(TokenKind::Semicolon).is_some() {
            let items = self.parse_items(false);
            return Ok(NamespaceDecl {
                path,
                items,
                file_scoped: true,
                span: start.to(self.previous_span()),
            });
        }

        self.expect(TokenKind::LeftBrace)?;
        let items = self.parse_items(true);
        let end = self.expect(TokenKind::RightBrace)?.span;
        Ok(NamespaceDecl {
            path,
            items,
            file_scoped: false,
            span: start.to(end),
        })
    }

    fn parse_dotted_path(&mut self) -> Result<&'ast [Ident<'ast>], ParseError> {
        if self.check_contextual("global") && self.peek_nth(1).kind == TokenKind::ColonColon {
            self.advance();
            self.advance();
        }
        let mut path = BVec::new_in(self.arena);
        path.push(self.expect_identifier()?);
        while self.eat(TokenKind::Dot).is_some() {
            path.push(self.expect_identifier()?);
        }
        Ok(path.into_bump_slice())
    }

    /// Consume declaration modifiers. Duplicates are recorded but do not
    /// stop parsing.
    fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::empty();
        while let Some(modifier) = Modifiers::from_token(self.peek().kind) {
            let token = self.advance();
            if modifiers.contains(modifier) {
                self.record(ParseError::new(
                    ParseErrorKind::InvalidModifier,
                    token.span,
                    format!("duplicate '{}' modifier", token.lexeme),
                ));
            }
            modifiers |= modifier;
        }
        modifiers
    }

    // =========================================
    // Type declarations
    // =========================================

    fn parse_type_decl(
        &mut self,
        modifiers: Modifiers,
        start: dyncode_core::Span,
    ) -> Result<TypeDecl<'ast>, ParseError> {
        let keyword = self.advance();
        let kind = TypeDeclKind::from_token(keyword.kind).ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::ExpectedDeclaration,
                keyword.span,
                format!("expected a type declaration, found {}", keyword.describe()),
            )
        })?;
        // `record class` / `record struct`
        if kind == TypeDeclKind::Record && self.eat(TokenKind::Class).is_none() {
            self.eat(TokenKind::Struct);
        }

        let name = self.expect_identifier()?;
        self.skip_type_parameters()?;

        let primary_params: &'ast [Param<'ast>] = if self.check(TokenKind::LeftParen) {
            self.parse_params()?
        } else {
            &[]
        };

        let mut bases = BVec::new_in(self.arena);
        if self.eat(TokenKind::Colon).is_some() {
            loop {
                bases.push(self.parse_type()?);
                // Record base calls: `record B(int X) : A(X);`
                if self.check(TokenKind::LeftParen) {
                    self.skip_balanced(TokenKind::LeftParen, TokenKind::RightParen)?;
                }
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        while self.check_contextual("where") {
            self.skip_constraint_clause();
        }

        let members: &'ast [Member<'ast>] = if self.eat(TokenKind::Semicolon).is_some() {
            &[]
        } else if kind == TypeDeclKind::Enum {
            self.parse_enum_body()?
        } else {
            self.parse_type_body(name.name)?
        };
        self.eat(TokenKind::Semicolon);

        Ok(TypeDecl {
            kind,
            modifiers,
            name,
            primary_params,
            bases: bases.into_bump_slice(),
            members,
            span: start.to(self.previous_span()),
        })
    }

    /// `{ member* }` with member-level recovery.
    fn parse_type_body(&mut self, type_name: &str) -> Result<&'ast [Member<'ast>], ParseError> {
        self.expect(TokenKind::LeftBrace)?;
        let mut members = BVec::new_in(self.arena);
        while !self.check(TokenKind::RightBrace) && !self.is_eof() {
            let start = self.position;
            match self.parse_member(type_name) {
                Ok(member) => members.push(member),
                Err(error) => {
                    self.record(error);
                    self.synchronize_member(start);
                }
            }
        }
        self.expect(TokenKind::RightBrace)?;
        Ok(members.into_bump_slice())
    }

    fn parse_enum_body(&mut self) -> Result<&'ast [Member<'ast>], ParseError> {
        self.expect(TokenKind::LeftBrace)?;
        let mut members = BVec::new_in(self.arena);
        while !self.check(TokenKind::RightBrace) {
            let name = self.expect_identifier()?;
            let value = if self.eat(TokenKind::Equal).is_some() {
                Some(self.parse_expr(0)?)
            } else {
                None
            };
            members.push(Member::Enumerator(EnumeratorDecl {
                name,
                value,
                span: name.span.to(self.previous_span()),
            }));
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RightBrace)?;
        Ok(members.into_bump_slice())
    }

    // =========================================
    // Members
    // =========================================

    fn parse_member(&mut self, type_name: &str) -> Result<Member<'ast>, ParseError> {
        let start = self.peek().span;
        let modifiers = self.parse_modifiers();

        if self.peek().kind.is_type_declaration() {
            let decl = self.parse_type_decl(modifiers, start)?;
            return Ok(Member::Type(self.arena.alloc(decl)));
        }

        if self.check(TokenKind::Identifier)
            && self.peek().lexeme == type_name
            && self.peek_nth(1).kind == TokenKind::LeftParen
        {
            return self.parse_constructor(modifiers, start);
        }

        let ty = self.parse_return_type()?;
        let name = self.expect_identifier()?;

        if self.check(TokenKind::LeftParen) || self.check(TokenKind::Less) {
            self.skip_type_parameters()?;
            let params = self.parse_params()?;
            while self.check_contextual("where") {
                self.skip_constraint_clause();
            }
            let body = self.parse_method_body()?;
            return Ok(Member::Method(MethodDecl {
                modifiers,
                return_type: ty,
                name,
                params,
                body,
                span: start.to(self.previous_span()),
            }));
        }

        if ty.is_void() {
            let token = *self.peek();
            return Err(ParseError::expected_token(token.span, "'('", &token.describe()));
        }

        if self.check(TokenKind::LeftBrace) || self.check(TokenKind::Arrow) {
            self.skip_property_body()?;
            return Ok(Member::Property(PropertyDecl {
                modifiers,
                ty,
                name,
                span: start.to(self.previous_span()),
            }));
        }

        let init = if self.eat(TokenKind::Equal).is_some() {
            Some(self.parse_expr(0)?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(Member::Field(FieldDecl {
            modifiers,
            ty,
            name,
            init,
            span: start.to(self.previous_span()),
        }))
    }

    fn parse_constructor(
        &mut self,
        modifiers: Modifiers,
        start: dyncode_core::Span,
    ) -> Result<Member<'ast>, ParseError> {
        let name = self.expect_identifier()?;
        let params = self.parse_params()?;
        // `: base(...)` / `: this(...)`
        if self.eat(TokenKind::Colon).is_some() {
            self.advance();
            self.skip_balanced(TokenKind::LeftParen, TokenKind::RightParen)?;
        }
        let body = self.parse_method_body()?;
        Ok(Member::Constructor(MethodDecl {
            modifiers,
            return_type: TypeExpr::new(TypeKind::Void, name.span),
            name,
            params,
            body,
            span: start.to(self.previous_span()),
        }))
    }

    /// `{ ... }`, `=> expr;` or `;`.
    fn parse_method_body(&mut self) -> Result<Option<MethodBody<'ast>>, ParseError> {
        if self.eat(TokenKind::Semicolon).is_some() {
            return Ok(None);
        }
        if self.eat(TokenKind::Arrow).is_some() {
            let expr = self.parse_expr(0)?;
            self.expect(TokenKind::Semicolon)?;
            return Ok(Some(MethodBody::Expr(expr)));
        }
        Ok(Some(MethodBody::Block(self.parse_block()?)))
    }

    /// `(T a, U b)`
    fn parse_params(&mut self) -> Result<&'ast [Param<'ast>], ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let mut params = BVec::new_in(self.arena);
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.parse_param()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;
        Ok(params.into_bump_slice())
    }

    fn parse_param(&mut self) -> Result<Param<'ast>, ParseError> {
        let start = self.peek().span;

        let token = *self.peek();
        let is_modifier = token.kind == TokenKind::This
            || (token.kind == TokenKind::Identifier
                && PARAMETER_MODIFIERS.contains(&token.lexeme)
                && self.peek_nth(1).kind == TokenKind::Identifier
                && matches!(
                    self.peek_nth(2).kind,
                    TokenKind::Identifier
                        | TokenKind::Less
                        | TokenKind::Dot
                        | TokenKind::LeftBracket
                        | TokenKind::Question
                ));
        if is_modifier {
            self.advance();
            self.record(ParseError::new(
                ParseErrorKind::InvalidModifier,
                token.span,
                format!("parameter modifier '{}' is not supported", token.lexeme),
            ));
        }

        let ty = self.parse_type()?;
        let name = self.expect_identifier()?;

        if let Some(equal) = self.eat(TokenKind::Equal) {
            self.parse_expr(0)?;
            self.record(ParseError::new(
                ParseErrorKind::UnexpectedToken,
                equal.span,
                format!("default value for parameter '{}' is not supported", name.name),
            ));
        }

        Ok(Param {
            ty,
            name,
            span: start.to(self.previous_span()),
        })
    }

    // =========================================
    // Skipped constructs
    // =========================================

    /// Skip `<T, U>` after a type or method name.
    fn skip_type_parameters(&mut self) -> Result<(), ParseError> {
        if self.check(TokenKind::Less) {
            self.skip_balanced(TokenKind::Less, TokenKind::Greater)?;
        }
        Ok(())
    }

    /// Skip `where T : constraint, ...` up to the body.
    fn skip_constraint_clause(&mut self) {
        while !self.is_eof()
            && !matches!(
                self.peek().kind,
                TokenKind::LeftBrace | TokenKind::Semicolon | TokenKind::Arrow
            )
        {
            self.advance();
        }
    }

    /// Skip `{ get; set; }`, `{ get => x; } = init;` or `=> expr;`.
    fn skip_property_body(&mut self) -> Result<(), ParseError> {
        if self.eat(TokenKind::Arrow).is_some() {
            self.parse_expr(0)?;
            self.expect(TokenKind::Semicolon)?;
            return Ok(());
        }
        self.skip_balanced(TokenKind::LeftBrace, TokenKind::RightBrace)?;
        if self.eat(TokenKind::Equal).is_some() {
            self.parse_expr(0)?;
            self.expect(TokenKind::Semicolon)?;
        }
        Ok(())
    }

    /// Skip from an `open` token through its matching `close`.
    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) -> Result<(), ParseError> {
        let start = self.expect(open)?.span;
        let mut depth = 1usize;
        while depth > 0 {
            let token = self.advance();
            match token.kind {
                kind if kind == open => depth += 1,
                kind if kind == close => depth -= 1,
                TokenKind::Eof => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedEof,
                        start,
                        "unbalanced delimiters",
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::Parser;
    use crate::ast::*;
    use bumpalo::Bump;

    fn single_type<'a>(source: &str, arena: &'a Bump) -> &'a TypeDecl<'a> {
        let unit = Parser::parse(source, arena).unwrap();
        unit.declared_types()[0].decl
    }

    #[test]
    fn method_signature_and_modifiers() {
        let arena = Bump::new();
        let decl = single_type(
            "public class Calc { public static int Add(int a, int b) { return a + b; } }",
            &arena,
        );
        let method = decl.methods().next().unwrap();
        assert_eq!(method.name.name, "Add");
        assert!(method.modifiers.is_static());
        assert_eq!(method.modifiers.access(), Modifiers::PUBLIC);
        assert_eq!(method.params[0].ty.to_string(), "int");
        assert_eq!(method.params[1].name.name, "b");
    }

    #[test]
    fn using_directives() {
        let arena = Bump::new();
        let source = "using System;\nusing static System.Math;\nusing M = System.Math;\nnamespace N { using X; class C { } }";
        let unit = Parser::parse(source, &arena).unwrap();
        let usings = unit.usings();
        assert_eq!(usings.len(), 4);
        assert!(!usings[0].is_static);
        assert!(usings[1].is_static);
        assert_eq!(usings[2].alias.unwrap().name, "M");
        assert_eq!(join_path(usings[2].path), "System.Math");
        assert_eq!(join_path(usings[3].path), "X");
    }

    #[test]
    fn default_access_is_private() {
        let arena = Bump::new();
        let decl = single_type("class C { int F() => 1; }", &arena);
        assert_eq!(decl.methods().next().unwrap().modifiers.access(), Modifiers::PRIVATE);
    }

    #[test]
    fn void_methods_and_constructors() {
        let arena = Bump::new();
        let decl = single_type("class C { C() { } public void Run() { } }", &arena);
        assert!(matches!(decl.members[0], Member::Constructor(_)));
        let run = decl.methods().next().unwrap();
        assert!(run.return_type.is_void());
    }

    #[test]
    fn generic_parameter_types() {
        let arena = Bump::new();
        let decl = single_type(
            "class C { Dictionary<string, int> Build(List<int?> xs, int[] ys) { return null; } }",
            &arena,
        );
        let method = decl.methods().next().unwrap();
        assert_eq!(method.return_type.to_string(), "Dictionary<string, int>");
        assert_eq!(method.params[0].ty.to_string(), "List<int?>");
        assert_eq!(method.params[1].ty.to_string(), "int[]");
    }

    #[test]
    fn fields_and_properties() {
        let arena = Bump::new();
        let decl = single_type(
            "class C { const int Max = 10; string Name { get; set; } = \"x\"; int Twice => Max * 2; }",
            &arena,
        );
        assert!(matches!(decl.members[0], Member::Field(f) if f.init.is_some()));
        assert!(matches!(decl.members[1], Member::Property(_)));
        assert!(matches!(decl.members[2], Member::Property(_)));
    }

    #[test]
    fn bases_and_constraints() {
        let arena = Bump::new();
        let decl = single_type("class Box<T> : Base, IThing where T : class { }", &arena);
        assert_eq!(decl.bases.len(), 2);
    }

    #[test]
    fn ref_parameters_are_reported() {
        let arena = Bump::new();
        let (unit, errors) = Parser::parse_lenient("class C { void F(ref int x) { } }", &arena);
        assert_eq!(errors.first().unwrap().kind, ParseErrorKind::InvalidModifier);
        let types = unit.declared_types();
        assert_eq!(types[0].decl.methods().next().unwrap().params[0].ty.to_string(), "int");
    }

    #[test]
    fn duplicate_modifier_is_reported() {
        let arena = Bump::new();
        let errors = Parser::parse("public public class C { }", &arena).unwrap_err();
        assert_eq!(errors.first().unwrap().kind, ParseErrorKind::InvalidModifier);
    }

    #[test]
    fn top_level_statements_are_rejected() {
        let arena = Bump::new();
        let (unit, errors) = Parser::parse_lenient("int x = 5;\nclass C { }", &arena);
        assert_eq!(errors.first().unwrap().kind, ParseErrorKind::ExpectedDeclaration);
        assert_eq!(unit.declared_types().len(), 1);
    }

    #[test]
    fn unclosed_class_is_an_error() {
        let arena = Bump::new();
        assert!(Parser::parse("class C { int F() { return 1; }", &arena).is_err());
    }
}

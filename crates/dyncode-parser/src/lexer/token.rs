//! Token definitions.

use dyncode_core::Span;
use std::fmt;

/// A token from the source text.
///
/// The lexeme is copied into the parse arena, so tokens outlive the source
/// string they were scanned from.
#[derive(Clone, Copy, PartialEq)]
pub struct Token<'ast> {
    pub kind: TokenKind,
    pub lexeme: &'ast str,
    pub span: Span,
}

impl<'ast> Token<'ast> {
    #[inline]
    pub fn new(kind: TokenKind, lexeme: &'ast str, span: Span) -> Self {
        Self { kind, lexeme, span }
    }

    /// Text used when the token is named in an error message.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Identifier => format!("identifier '{}'", self.lexeme),
            _ => format!("'{}'", self.lexeme),
        }
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {})", self.kind, self.lexeme, self.span)
    }
}

/// Every kind of token the lexer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // =========================================
    // Literals
    // =========================================
    /// `42`, `0x2A`, `42L`
    IntLiteral,
    /// `3.5`, `1e3`, `2.5d`
    DoubleLiteral,
    /// `3.5f`
    FloatLiteral,
    /// `"text"`, `@"verbatim"`
    StringLiteral,
    /// `'c'`
    CharLiteral,

    Identifier,

    // =========================================
    // Keywords - Declarations
    // =========================================
    Class,
    Struct,
    Interface,
    Enum,
    Record,
    Namespace,
    Using,

    // =========================================
    // Keywords - Modifiers
    // =========================================
    Public,
    Private,
    Protected,
    Internal,
    Static,
    Sealed,
    Abstract,
    Readonly,
    Partial,
    Const,
    Virtual,
    Override,

    // =========================================
    // Keywords - Types
    // =========================================
    Void,
    Var,

    // =========================================
    // Keywords - Statements and values
    // =========================================
    Return,
    If,
    Else,
    While,
    Do,
    For,
    Break,
    Continue,
    New,
    True,
    False,
    Null,
    This,

    // =========================================
    // Punctuation
    // =========================================
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Comma,
    Dot,
    Colon,
    ColonColon,
    Question,
    QuestionQuestion,
    /// `=>`
    Arrow,

    // =========================================
    // Operators
    // =========================================
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Bang,
    AmpAmp,
    PipePipe,
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    /// Produced for unscannable input; the lexer records the error.
    Error,
    Eof,
}

impl TokenKind {
    /// Whether this keyword is a declaration modifier.
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            TokenKind::Public
                | TokenKind::Private
                | TokenKind::Protected
                | TokenKind::Internal
                | TokenKind::Static
                | TokenKind::Sealed
                | TokenKind::Abstract
                | TokenKind::Readonly
                | TokenKind::Partial
                | TokenKind::Const
                | TokenKind::Virtual
                | TokenKind::Override
        )
    }

    /// Whether this keyword starts a type declaration.
    pub fn is_type_declaration(self) -> bool {
        matches!(
            self,
            TokenKind::Class
                | TokenKind::Struct
                | TokenKind::Interface
                | TokenKind::Enum
                | TokenKind::Record
        )
    }

    /// Compound assignment operators and plain `=`.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            TokenKind::Equal
                | TokenKind::PlusEqual
                | TokenKind::MinusEqual
                | TokenKind::StarEqual
                | TokenKind::SlashEqual
                | TokenKind::PercentEqual
        )
    }
}

/// Map an identifier to its keyword kind.
///
/// Keyword type aliases such as `int` or `string` are deliberately *not*
/// keywords here: they are lexed as identifiers and resolved by name, which
/// keeps `int`, `Int32` and `System.Int32` on the same code path.
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match ident {
        "class" => Class,
        "struct" => Struct,
        "interface" => Interface,
        "enum" => Enum,
        "record" => Record,
        "namespace" => Namespace,
        "using" => Using,

        "public" => Public,
        "private" => Private,
        "protected" => Protected,
        "internal" => Internal,
        "static" => Static,
        "sealed" => Sealed,
        "abstract" => Abstract,
        "readonly" => Readonly,
        "partial" => Partial,
        "const" => Const,
        "virtual" => Virtual,
        "override" => Override,

        "void" => Void,
        "var" => Var,

        "return" => Return,
        "if" => If,
        "else" => Else,
        "while" => While,
        "do" => Do,
        "for" => For,
        "break" => Break,
        "continue" => Continue,
        "new" => New,
        "true" => True,
        "false" => False,
        "null" => Null,
        "this" => This,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_keywords() {
        assert_eq!(lookup_keyword("class"), Some(TokenKind::Class));
        assert_eq!(lookup_keyword("struct"), Some(TokenKind::Struct));
        assert_eq!(lookup_keyword("namespace"), Some(TokenKind::Namespace));
        assert!(TokenKind::Record.is_type_declaration());
        assert!(!TokenKind::Namespace.is_type_declaration());
    }

    #[test]
    fn type_aliases_are_identifiers() {
        assert_eq!(lookup_keyword("int"), None);
        assert_eq!(lookup_keyword("string"), None);
        assert_eq!(lookup_keyword("Int32"), None);
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(lookup_keyword("Class"), None);
        assert_eq!(lookup_keyword("RETURN"), None);
    }

    #[test]
    fn modifiers() {
        for word in ["public", "private", "static", "readonly", "partial"] {
            assert!(lookup_keyword(word).unwrap().is_modifier(), "{word}");
        }
        assert!(!TokenKind::Class.is_modifier());
    }
}

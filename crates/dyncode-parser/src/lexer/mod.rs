//! Lexical analysis.

mod cursor;
mod lexer;
mod token;

pub use lexer::{Lexer, decode_literal};
pub use token::{Token, TokenKind, lookup_keyword};

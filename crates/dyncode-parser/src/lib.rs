//! Lexer and parser for the dyncode source language, a C#-like subset.
//!
//! - Lexical analysis (tokenization)
//! - Arena-allocated syntax tree definitions
//! - A recursive-descent and Pratt parser with strict and lenient modes
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use dyncode_parser::Parser;
//!
//! let arena = Bump::new();
//! let source = r#"
//!     public class Greeter {
//!         public static string Greet(string name) { return "Hello " + name; }
//!     }
//! "#;
//!
//! match Parser::parse(source, &arena) {
//!     Ok(unit) => println!("parsed {} item(s)", unit.items().len()),
//!     Err(errors) => eprintln!("parse errors: {errors}"),
//! }
//! ```

pub mod ast;
pub mod lexer;

pub use ast::{CompilationUnit, DeclaredType, Parser};
pub use dyncode_core::Span;
pub use lexer::{Lexer, Token, TokenKind};

//! Fast custom Python parser module.
//!
//! A zero-copy lexer plus a statement-level parser.  Produces a
//! `Vec<Stmt<'src>>` whose spans borrow nothing but byte offsets, and fails
//! with a [`ParseError`](crate::error::ParseError) on malformed input.
//!
//! # Usage
//! ```
//! use pyshuffle::fast_parser::parse;
//! let stmts = parse("import os\n").unwrap();
//! assert_eq!(stmts.len(), 1);
//! ```

pub mod lexer;
pub mod parser;

pub use parser::parse;

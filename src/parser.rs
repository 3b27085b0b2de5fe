//! Python source parser — thin wrapper around the custom fast parser that
//! pairs the top-level statements with a line index for the same source.

use crate::ast::Stmt;
use crate::error::ParseError;
use crate::location::LineIndex;

/// A parsed Python file: its top-level statements in source order.
#[derive(Debug)]
pub struct Module<'src> {
    pub body: Vec<Stmt<'src>>,
    pub lines: LineIndex,
}

/// Parse a Python source string into a [`Module`].
///
/// Fails on the first syntax error; there is no partial result.
pub fn parse_python(source: &str) -> Result<Module<'_>, ParseError> {
    let body = crate::fast_parser::parse(source)?;
    Ok(Module {
        body,
        lines: LineIndex::new(source),
    })
}

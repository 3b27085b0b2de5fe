//! Top-level function ranges.
//!
//! The extractor only ever sees a [`StatementContainer`]: an ordered list of
//! children, each optionally carrying the line span of a function definition.
//! [`Module`] is the container produced by the parser; anything else that can
//! list its children that way (a different parser, a synthetic fixture) plugs
//! in the same.

use serde::Serialize;

use crate::parser::Module;

/// Inclusive, 1-based line span of one function definition, decorators
/// included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FunctionRange {
    pub start: usize,
    pub end: usize,
}

impl FunctionRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Ordered children of a statement container.
pub trait StatementContainer {
    /// One entry per direct child in source order: `Some(range)` for a
    /// function definition, `None` for every other statement.
    fn children(&self) -> Vec<Option<FunctionRange>>;
}

impl StatementContainer for Module<'_> {
    fn children(&self) -> Vec<Option<FunctionRange>> {
        self.body
            .iter()
            .map(|stmt| {
                stmt.as_function().map(|_| {
                    let (start, end) = self.lines.span_lines(stmt.span);
                    FunctionRange::new(start, end)
                })
            })
            .collect()
    }
}

/// Ranges of the container's direct function children, in source order.
///
/// Nested functions and methods are never returned: they are not direct
/// children, so they travel inside their parent's range.
pub fn function_ranges<C>(container: &C) -> Vec<FunctionRange>
where
    C: StatementContainer + ?Sized,
{
    container.children().into_iter().flatten().collect()
}

//! Partition a file's lines into function and filler blocks.

use std::fmt;

use serde::Serialize;

use crate::ranges::FunctionRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Function,
    Filler,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            BlockKind::Function => "function",
            BlockKind::Filler => "filler",
        };
        write!(f, "{kind}")
    }
}

/// Inclusive, 1-based line span tagged with what it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Block {
    pub start: usize,
    pub end: usize,
    pub kind: BlockKind,
}

impl Block {
    pub fn function(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            kind: BlockKind::Function,
        }
    }

    pub fn filler(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            kind: BlockKind::Filler,
        }
    }

    pub fn is_function(&self) -> bool {
        self.kind == BlockKind::Function
    }

    pub fn line_count(&self) -> usize {
        self.end + 1 - self.start
    }
}

/// Cover `[first_line, last_line]` with blocks: one function block per range
/// and a filler block for every gap between them.
///
/// `ranges` must be increasing, non-overlapping and inside the line span.
/// Filler blocks are never empty; adjacent functions get no filler between
/// them, and an empty file (`last_line == 0`) yields no blocks at all.
pub fn partition(ranges: &[FunctionRange], first_line: usize, last_line: usize) -> Vec<Block> {
    let mut blocks = Vec::with_capacity(ranges.len() * 2 + 1);
    let mut cursor = first_line;

    for range in ranges {
        if cursor < range.start {
            blocks.push(Block::filler(cursor, range.start - 1));
        }
        blocks.push(Block::function(range.start, range.end));
        cursor = range.end + 1;
    }

    if cursor <= last_line {
        blocks.push(Block::filler(cursor, last_line));
    }

    blocks
}

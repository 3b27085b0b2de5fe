//! Error types for the reorder pipeline.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::location::offset_to_line_col;

/// Process exit codes for the `pyshuffle` binary.
///
/// `2` is deliberately unused here: clap exits with it on usage errors.
pub mod exit_code {
    /// The destination was written (or the dry run completed).
    pub const SUCCESS: i32 = 0;
    /// The input is not valid Python.
    pub const PARSE_ERROR: i32 = 1;
    /// The input could not be read or the destination could not be written.
    pub const IO_ERROR: i32 = 3;
}

/// Syntax error in the input, positioned at a 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{col}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl ParseError {
    pub fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, col) = offset_to_line_col(offset, source);
        Self {
            line,
            col,
            message: message.into(),
        }
    }
}

/// The pipeline stage a run failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Parse,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Read => "read",
            Stage::Parse => "parse",
            Stage::Write => "write",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Error)]
pub enum ShuffleError {
    #[error("{}:{}", .path.display(), .source)]
    Parse { path: PathBuf, source: ParseError },

    #[error("cannot read {}: {}", .path.display(), .source)]
    Read { path: PathBuf, source: io::Error },

    #[error("cannot write {}: {}", .path.display(), .source)]
    Write { path: PathBuf, source: io::Error },
}

impl ShuffleError {
    pub fn stage(&self) -> Stage {
        match self {
            ShuffleError::Parse { .. } => Stage::Parse,
            ShuffleError::Read { .. } => Stage::Read,
            ShuffleError::Write { .. } => Stage::Write,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.stage() {
            Stage::Parse => exit_code::PARSE_ERROR,
            Stage::Read | Stage::Write => exit_code::IO_ERROR,
        }
    }
}

//! Shuffle the top-level functions of a Python file.
//!
//! The file is parsed, split into function and filler blocks, and the
//! function blocks are permuted among their own slots.  Everything else
//! (imports, module-level statements, comments, blank lines) stays in its
//! slot between the functions, and every line is written back byte for byte.
//!
//! ```
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let src = "import os\ndef a():\n    pass\ndef b():\n    pass\n";
//! let out = pyshuffle::reorder::reorder_source(src, &mut StdRng::seed_from_u64(0)).unwrap();
//! assert!(out.starts_with("import os\n"));
//! assert_eq!(out.len(), src.len());
//! ```

pub mod ast;
pub mod blocks;
pub mod error;
pub mod fast_parser;
pub mod location;
pub mod parser;
pub mod ranges;
pub mod reorder;
pub mod shuffle;
pub mod writer;

pub use error::{ParseError, ShuffleError, Stage};
pub use reorder::{Plan, Report, plan, plan_file, reorder_file, reorder_source};

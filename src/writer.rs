//! Reassemble a file from its blocks.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::blocks::Block;

/// The lines of every block, in block order, concatenated verbatim.
///
/// `lines` are the original lines with their terminators; block spans are
/// 1-based and inclusive.
pub fn render(lines: &[&str], blocks: &[Block]) -> String {
    let mut out = String::with_capacity(lines.iter().map(|l| l.len()).sum());
    for block in blocks {
        for line in block_lines(lines, block) {
            out.push_str(line);
        }
    }
    out
}

/// Write the rendered blocks to `path`, truncating any existing file.
///
/// The handle is closed when this returns, on success or error; a failure
/// part-way through may leave a partially written file behind.
pub fn write_blocks(path: &Path, lines: &[&str], blocks: &[Block]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    let mut bytes = 0usize;
    for block in blocks {
        for line in block_lines(lines, block) {
            out.write_all(line.as_bytes())?;
            bytes += line.len();
        }
    }
    out.flush()?;
    debug!(path = %path.display(), bytes, "wrote reordered file");
    Ok(())
}

fn block_lines<'a>(lines: &'a [&'a str], block: &Block) -> &'a [&'a str] {
    &lines[block.start - 1..block.end]
}

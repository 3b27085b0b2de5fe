use crate::ast::Span;

/// Offset just past every line terminator: `\n`, `\r\n` or a lone `\r`.
pub fn line_ends(source: &str) -> impl Iterator<Item = usize> + '_ {
    let bytes = source.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter_map(move |(i, &b)| match b {
            b'\n' => Some(i + 1),
            b'\r' if bytes.get(i + 1) != Some(&b'\n') => Some(i + 1),
            _ => None,
        })
}

/// Convert a byte offset into (line, col), both 1-indexed.
pub fn offset_to_line_col(offset: usize, source: &str) -> (usize, usize) {
    let mut line = 1;
    let mut line_start = 0;
    for end in line_ends(source) {
        if end > offset {
            break;
        }
        line += 1;
        line_start = end;
    }
    (line, offset - line_start + 1)
}

/// Byte offset of every line start, for repeated offset → line lookups.
///
/// Lines end the same way as in [`crate::reorder::source_lines`].
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
    line_count: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(line_ends(source));
        // A final terminator ends the last line rather than opening a new one.
        let line_count = if source.is_empty() {
            0
        } else if starts.last() == Some(&source.len()) {
            starts.len() - 1
        } else {
            starts.len()
        };
        Self { starts, line_count }
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// 1-based line containing `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }

    /// Inclusive 1-based line range covered by a non-empty span.
    pub fn span_lines(&self, span: Span) -> (usize, usize) {
        let start = self.line_of(span.start as usize);
        let last_byte = (span.end as usize).saturating_sub(1).max(span.start as usize);
        (start, self.line_of(last_byte))
    }
}

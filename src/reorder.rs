//! The reorder pipeline: parse → extract ranges → partition → shuffle → write.

use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::blocks::{Block, partition};
use crate::error::{ParseError, ShuffleError};
use crate::location::line_ends;
use crate::parser::parse_python;
use crate::ranges::{FunctionRange, function_ranges};
use crate::shuffle::shuffle_functions;
use crate::writer::{render, write_blocks};

// ── plan ─────────────────────────────────────────────────────────────────────

/// Everything decided about one file before anything is written.
#[derive(Debug, Clone)]
pub struct Plan {
    pub total_lines: usize,
    /// Top-level function ranges in source order.
    pub ranges: Vec<FunctionRange>,
    /// The partition before shuffling.
    pub blocks: Vec<Block>,
    /// The partition after shuffling; the output is rendered from this.
    pub shuffled: Vec<Block>,
    /// `order[slot]` is the source-order index of the function now in `slot`.
    pub order: Vec<usize>,
}

impl Plan {
    pub fn function_count(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the shuffle left every function where it was.
    pub fn is_identity(&self) -> bool {
        self.order.iter().enumerate().all(|(slot, &from)| slot == from)
    }
}

/// Split text into lines that keep their terminator (`\n`, `\r\n` or a lone
/// `\r`).  A last line without a terminator is still a line; empty text has
/// no lines.
pub fn source_lines(text: &str) -> Vec<&str> {
    let mut start = 0;
    let mut lines: Vec<&str> = line_ends(text)
        .map(|end| {
            let line = &text[start..end];
            start = end;
            line
        })
        .collect();
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// Parse `source` and decide a random order for its top-level functions.
pub fn plan<R>(source: &str, rng: &mut R) -> Result<Plan, ParseError>
where
    R: Rng + ?Sized,
{
    let module = parse_python(source)?;
    let total_lines = module.lines.line_count();
    let ranges = function_ranges(&module);
    let blocks = partition(&ranges, 1, total_lines);
    debug!(
        lines = total_lines,
        functions = ranges.len(),
        blocks = blocks.len(),
        "partitioned source"
    );

    let mut shuffled = blocks.clone();
    let order = shuffle_functions(&mut shuffled, rng);
    debug!(?order, "shuffled function blocks");

    Ok(Plan {
        total_lines,
        ranges,
        blocks,
        shuffled,
        order,
    })
}

/// Reorder the top-level functions of `source` and return the new text.
pub fn reorder_source<R>(source: &str, rng: &mut R) -> Result<String, ParseError>
where
    R: Rng + ?Sized,
{
    let plan = plan(source, rng)?;
    Ok(render(&source_lines(source), &plan.shuffled))
}

// ── files ────────────────────────────────────────────────────────────────────

/// Summary of one run, printed by the CLI (as text or JSON).
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub input: PathBuf,
    /// `None` when nothing was written (dry run).
    pub output: Option<PathBuf>,
    pub lines: usize,
    pub functions: usize,
    /// Blocks in output order.
    pub blocks: Vec<Block>,
    pub order: Vec<usize>,
}

impl Report {
    fn new(input: &Path, output: Option<&Path>, plan: Plan) -> Self {
        Self {
            input: input.to_path_buf(),
            output: output.map(Path::to_path_buf),
            lines: plan.total_lines,
            functions: plan.function_count(),
            blocks: plan.shuffled,
            order: plan.order,
        }
    }
}

fn read_source(input: &Path) -> Result<String, ShuffleError> {
    let source = fs::read_to_string(input).map_err(|source| ShuffleError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    debug!(path = %input.display(), bytes = source.len(), "read source");
    Ok(source)
}

fn plan_source<R>(input: &Path, source: &str, rng: &mut R) -> Result<Plan, ShuffleError>
where
    R: Rng + ?Sized,
{
    plan(source, rng).map_err(|source| ShuffleError::Parse {
        path: input.to_path_buf(),
        source,
    })
}

/// Read `input`, shuffle its top-level functions and write the result to
/// `output`, replacing it if it exists.  `output` may be `input` itself: the
/// source is fully read before anything is written.
pub fn reorder_file<R>(input: &Path, output: &Path, rng: &mut R) -> Result<Report, ShuffleError>
where
    R: Rng + ?Sized,
{
    let source = read_source(input)?;
    let plan = plan_source(input, &source, rng)?;

    write_blocks(output, &source_lines(&source), &plan.shuffled).map_err(|source| {
        ShuffleError::Write {
            path: output.to_path_buf(),
            source,
        }
    })?;
    info!(
        input = %input.display(),
        output = %output.display(),
        functions = plan.function_count(),
        "reordered"
    );

    Ok(Report::new(input, Some(output), plan))
}

/// Like [`reorder_file`] but only reports the plan; nothing is written.
pub fn plan_file<R>(input: &Path, rng: &mut R) -> Result<Report, ShuffleError>
where
    R: Rng + ?Sized,
{
    let source = read_source(input)?;
    let plan = plan_source(input, &source, rng)?;
    info!(input = %input.display(), functions = plan.function_count(), "planned");
    Ok(Report::new(input, None, plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockKind;
    use crate::error::Stage;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    const MODULE: &str = "\
\"\"\"Module docstring.\"\"\"
import os

CONSTANT = 1


def alpha():
    return 'a'


@decorator
def beta(x,
         y):
    '''Doc
    string'''
    return x + y

class Gamma:
    def method(self):
        pass

async def delta():
    def nested():
        pass
    return nested
def epsilon(): pass
# trailing comment
";

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    /// The text of each function block, keyed by its source-order index.
    fn function_texts(source: &str, blocks: &[Block]) -> Vec<String> {
        let lines = source_lines(source);
        blocks
            .iter()
            .filter(|b| b.is_function())
            .map(|b| render(&lines, std::slice::from_ref(b)))
            .collect()
    }

    #[test]
    fn test_source_lines() {
        assert!(source_lines("").is_empty());
        assert_eq!(source_lines("a"), vec!["a"]);
        assert_eq!(source_lines("a\nb\n"), vec!["a\n", "b\n"]);
        assert_eq!(source_lines("a\n\nb"), vec!["a\n", "\n", "b"]);
        assert_eq!(source_lines("a\rb\r\nc\n"), vec!["a\r", "b\r\n", "c\n"]);
    }

    #[test]
    fn test_carriage_return_line_endings() {
        let src = "import os\rdef a():\r    pass\rdef b():\r    return 2\r";
        let plan = plan(src, &mut rng(0)).unwrap();
        assert_eq!(plan.total_lines, 5);
        let spans: Vec<(usize, usize)> = plan.ranges.iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(spans, vec![(2, 3), (4, 5)]);

        let mut outputs = std::collections::HashSet::new();
        for seed in 0..40 {
            let out = reorder_source(src, &mut rng(seed)).unwrap();
            assert!(out.starts_with("import os\r"));
            assert_eq!(out.len(), src.len());
            outputs.insert(out);
        }
        assert!(outputs.contains("import os\rdef b():\r    return 2\rdef a():\r    pass\r"));
        assert_eq!(outputs.len(), 2);
    }

    #[test]
    fn test_plan_ranges() {
        let plan = plan(MODULE, &mut rng(1)).unwrap();
        assert_eq!(plan.total_lines, 27);
        let spans: Vec<(usize, usize)> = plan.ranges.iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(spans, vec![(7, 8), (11, 16), (22, 25), (26, 26)]);
    }

    #[test]
    fn test_plan_partition_covers_file() {
        let plan = plan(MODULE, &mut rng(2)).unwrap();
        for blocks in [&plan.blocks, &plan.shuffled] {
            // After shuffling, blocks are out of line order; sort to check tiling.
            let mut next = 1;
            let mut sorted = blocks.clone();
            sorted.sort_by_key(|b| b.start);
            for block in &sorted {
                assert_eq!(block.start, next);
                next = block.end + 1;
            }
            assert_eq!(next, plan.total_lines + 1);
        }
    }

    #[test]
    fn test_content_conservation_and_filler_invariance() {
        let original = source_lines(MODULE);
        for seed in 0..20 {
            let plan = plan(MODULE, &mut rng(seed)).unwrap();
            let output = render(&original, &plan.shuffled);
            let reordered = source_lines(&output);

            let mut a = original.clone();
            let mut b = reordered.clone();
            a.sort_unstable();
            b.sort_unstable();
            assert_eq!(a, b, "seed {seed}: lines added or dropped");

            // Filler blocks keep their slot; their output line is wherever the
            // blocks before them end.
            let mut out_line = 1;
            for (i, block) in plan.shuffled.iter().enumerate() {
                if block.kind == BlockKind::Filler {
                    assert_eq!(*block, plan.blocks[i], "seed {seed}");
                    for offset in 0..block.line_count() {
                        assert_eq!(
                            original[block.start - 1 + offset],
                            reordered[out_line - 1 + offset],
                            "seed {seed}"
                        );
                    }
                }
                out_line += block.line_count();
            }
        }
    }

    #[test]
    fn test_function_set_invariance() {
        let mut before = function_texts(MODULE, &plan(MODULE, &mut rng(0)).unwrap().blocks);
        before.sort();
        for seed in 0..20 {
            let plan = plan(MODULE, &mut rng(seed)).unwrap();
            let mut after = function_texts(MODULE, &plan.shuffled);
            after.sort();
            assert_eq!(before, after);
        }
    }

    #[test]
    fn test_identity_with_at_most_one_function() {
        let sources = [
            "",
            "a = 1\nb = 2\nc = 3\nd = 4\ne = 5\n",
            "import os\ndef f(): pass\n",
            "def only():\n    return 1",
            "class C:\n    def a(self):\n        pass\n    def b(self):\n        pass\n",
        ];
        for src in sources {
            for seed in 0..5 {
                assert_eq!(reorder_source(src, &mut rng(seed)).unwrap(), src);
            }
        }
    }

    #[test]
    fn test_scenario_import_then_function() {
        let plan = plan("import os\ndef f(): pass\n", &mut rng(0)).unwrap();
        assert_eq!(plan.blocks, vec![Block::filler(1, 1), Block::function(2, 2)]);
        assert_eq!(plan.shuffled, plan.blocks);
        assert!(plan.is_identity());
    }

    #[test]
    fn test_adjacent_functions_swap_with_probability_half() {
        let src = "def f():\n    x = 1\n    return x\ndef g():\n    y = 2\n    return y\n";
        let swapped_src = "def g():\n    y = 2\n    return y\ndef f():\n    x = 1\n    return x\n";

        let plan0 = plan(src, &mut rng(0)).unwrap();
        assert_eq!(plan0.blocks, vec![Block::function(1, 3), Block::function(4, 6)]);

        let mut outcomes: HashMap<String, usize> = HashMap::new();
        let mut r = rng(99);
        for _ in 0..2000 {
            *outcomes.entry(reorder_source(src, &mut r).unwrap()).or_default() += 1;
        }
        assert_eq!(outcomes.len(), 2, "only the two orderings are possible");
        let kept = outcomes[src];
        let swapped = outcomes[swapped_src];
        assert_eq!(kept + swapped, 2000);
        // Expected 1000 each, standard deviation ~22.
        assert!((880..=1120).contains(&swapped), "swapped {swapped}");
    }

    #[test]
    fn test_same_seed_same_output() {
        let a = reorder_source(MODULE, &mut rng(5)).unwrap();
        let b = reorder_source(MODULE, &mut rng(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_error_propagates() {
        let err = plan("def f(:\n", &mut rng(0)).unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_broken_statement_in_a_function_is_a_parse_error() {
        let src = "def f():\n    x = = 1\ndef g():\n    pass\n";
        let err = reorder_source(src, &mut rng(1)).unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_reorder_file_writes_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in.py");
        let output = dir.path().join("out.py");
        fs::write(&input, MODULE).unwrap();

        let report = reorder_file(&input, &output, &mut rng(3)).unwrap();
        assert_eq!(report.functions, 4);
        assert_eq!(report.lines, 27);
        assert_eq!(report.output.as_deref(), Some(output.as_path()));

        let written = fs::read_to_string(&output).unwrap();
        assert_eq!(written, reorder_source(MODULE, &mut rng(3)).unwrap());
        assert_eq!(fs::read_to_string(&input).unwrap(), MODULE);
    }

    #[test]
    fn test_reorder_file_in_place() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("same.py");
        fs::write(&path, MODULE).unwrap();

        reorder_file(&path, &path, &mut rng(8)).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            reorder_source(MODULE, &mut rng(8)).unwrap()
        );
    }

    #[test]
    fn test_plan_file_writes_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in.py");
        fs::write(&input, MODULE).unwrap();

        let report = plan_file(&input, &mut rng(0)).unwrap();
        assert!(report.output.is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_file_errors_carry_stage() {
        let dir = tempfile::TempDir::new().unwrap();

        let missing = dir.path().join("missing.py");
        let err = plan_file(&missing, &mut rng(0)).unwrap_err();
        assert_eq!(err.stage(), Stage::Read);

        let broken = dir.path().join("broken.py");
        fs::write(&broken, "def f(\n").unwrap();
        let err = reorder_file(&broken, &dir.path().join("out.py"), &mut rng(0)).unwrap_err();
        assert_eq!(err.stage(), Stage::Parse);
        assert!(!dir.path().join("out.py").exists(), "no output on parse error");

        let good = dir.path().join("good.py");
        fs::write(&good, MODULE).unwrap();
        let unwritable = dir.path().join("no_such_dir").join("out.py");
        let err = reorder_file(&good, &unwritable, &mut rng(0)).unwrap_err();
        assert_eq!(err.stage(), Stage::Write);
    }
}

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Command;

// ── helpers ──────────────────────────────────────────────────────────────────

fn pyshuffle_bin() -> PathBuf {
    // CARGO_BIN_EXE_pyshuffle is set by cargo test for integration tests
    PathBuf::from(env!("CARGO_BIN_EXE_pyshuffle"))
}

struct TempPy {
    dir: tempfile::TempDir,
}

impl TempPy {
    fn new() -> Self {
        Self {
            dir: tempfile::TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).unwrap()
    }

    /// Run pyshuffle inside the temp dir.  Returns (stdout, stderr, exit_code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let out = Command::new(pyshuffle_bin())
            .current_dir(self.dir.path())
            .args(args)
            .env_remove("PYSHUFFLE_LOG")
            .output()
            .expect("failed to run pyshuffle");
        (
            String::from_utf8_lossy(&out.stdout).into_owned(),
            String::from_utf8_lossy(&out.stderr).into_owned(),
            out.status.code().unwrap_or(-1),
        )
    }
}

const THREE_FUNCTIONS: &str = "\
import os
import sys

LIMIT = 10


def first():
    return 1


@staticmethod
def second(a,
           b):
    return a + b

# separator comment
def third():
    '''Docstring
    over two lines.'''
    return os.sep
";

// ── basic behaviour ──────────────────────────────────────────────────────────

#[test]
fn test_writes_default_output_name() {
    let t = TempPy::new();
    t.file("sample.py", THREE_FUNCTIONS);
    let (stdout, _, code) = t.run(&["sample.py", "--seed", "1"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("3 function(s)"), "{stdout}");
    let output = t.read("output.py");
    assert_eq!(output.len(), THREE_FUNCTIONS.len());
}

#[test]
fn test_output_flag_and_input_untouched() {
    let t = TempPy::new();
    t.file("in.py", THREE_FUNCTIONS);
    let (_, _, code) = t.run(&["in.py", "-o", "shuffled.py", "--seed", "2"]);
    assert_eq!(code, 0);
    assert_eq!(t.read("in.py"), THREE_FUNCTIONS);
    assert!(t.path("shuffled.py").exists());
    assert!(!t.path("output.py").exists());
}

#[test]
fn test_seed_is_reproducible() {
    let t = TempPy::new();
    t.file("in.py", THREE_FUNCTIONS);
    t.run(&["in.py", "-o", "a.py", "--seed", "7"]);
    t.run(&["in.py", "-o", "b.py", "--seed", "7"]);
    assert_eq!(t.read("a.py"), t.read("b.py"));
}

#[test]
fn test_fillers_keep_their_slots() {
    let t = TempPy::new();
    t.file("in.py", THREE_FUNCTIONS);
    let original: Vec<&str> = THREE_FUNCTIONS.split_inclusive('\n').collect();
    for seed in 0..10 {
        let seed = seed.to_string();
        let (stdout, _, code) = t.run(&["in.py", "-o", "out.py", "--json", "--seed", &seed]);
        assert_eq!(code, 0);
        let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        let blocks: Vec<(usize, usize, String)> = report["blocks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| {
                (
                    b["start"].as_u64().unwrap() as usize,
                    b["end"].as_u64().unwrap() as usize,
                    b["kind"].as_str().unwrap().to_string(),
                )
            })
            .collect();

        // Filler blocks sit at the same index with the same lines.
        assert_eq!(blocks[0], (1, 6, "filler".to_string()));
        assert_eq!(blocks[2], (9, 10, "filler".to_string()));
        assert_eq!(blocks[4], (15, 16, "filler".to_string()));

        // The written file is exactly the reported blocks, in order.
        let expected: String = blocks
            .iter()
            .flat_map(|(start, end, _)| original[start - 1..*end].iter().copied())
            .collect();
        assert_eq!(t.read("out.py"), expected, "seed {seed}");

        // The leading filler never moves.
        assert!(t.read("out.py").starts_with("import os\nimport sys\n\nLIMIT = 10\n\n\n"));
    }
}

#[test]
fn test_all_orderings_reachable() {
    let t = TempPy::new();
    t.file("in.py", THREE_FUNCTIONS);
    let mut outputs = HashSet::new();
    for seed in 0..200 {
        let seed = seed.to_string();
        t.run(&["in.py", "-o", "out.py", "--seed", &seed]);
        outputs.insert(t.read("out.py"));
    }
    assert_eq!(outputs.len(), 6, "3 functions have 3! orderings");
    assert!(outputs.contains(THREE_FUNCTIONS));
}

#[test]
fn test_no_functions_output_identical() {
    let t = TempPy::new();
    let src = "import os\nx = 1\n\n# comment\nprint(x)\n";
    t.file("in.py", src);
    let (_, _, code) = t.run(&["in.py"]);
    assert_eq!(code, 0);
    assert_eq!(t.read("output.py"), src);
}

#[test]
fn test_single_function_output_identical() {
    let t = TempPy::new();
    let src = "import os\ndef f(): pass\n";
    t.file("in.py", src);
    t.run(&["in.py"]);
    assert_eq!(t.read("output.py"), src);
}

#[test]
fn test_empty_file() {
    let t = TempPy::new();
    t.file("in.py", "");
    let (_, _, code) = t.run(&["in.py"]);
    assert_eq!(code, 0);
    assert_eq!(t.read("output.py"), "");
}

#[test]
fn test_in_place() {
    let t = TempPy::new();
    t.file("same.py", THREE_FUNCTIONS);
    t.file("copy.py", THREE_FUNCTIONS);
    t.run(&["same.py", "-o", "same.py", "--seed", "4"]);
    t.run(&["copy.py", "-o", "expected.py", "--seed", "4"]);
    assert_eq!(t.read("same.py"), t.read("expected.py"));
}

// ── dry run / JSON ───────────────────────────────────────────────────────────

#[test]
fn test_dry_run_writes_nothing() {
    let t = TempPy::new();
    t.file("in.py", THREE_FUNCTIONS);
    let (stdout, _, code) = t.run(&["in.py", "--dry-run", "--seed", "3"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Dry run"), "{stdout}");
    assert!(stdout.contains("filler"));
    assert!(stdout.contains("function"));
    assert!(!t.path("output.py").exists());
}

#[test]
fn test_json_report() {
    let t = TempPy::new();
    t.file("in.py", THREE_FUNCTIONS);
    let (stdout, _, code) = t.run(&["in.py", "--json", "--seed", "5"]);
    assert_eq!(code, 0);
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(report["functions"], 3);
    assert_eq!(report["lines"], 20);
    assert_eq!(report["output"], "output.py");

    let blocks = report["blocks"].as_array().unwrap();
    let kinds: Vec<&str> = blocks.iter().map(|b| b["kind"].as_str().unwrap()).collect();
    assert_eq!(
        kinds,
        vec!["filler", "function", "filler", "function", "filler", "function"]
    );

    let mut order: Vec<u64> = report["order"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_u64().unwrap())
        .collect();
    order.sort_unstable();
    assert_eq!(order, vec![0, 1, 2]);
}

#[test]
fn test_json_dry_run_has_null_output() {
    let t = TempPy::new();
    t.file("in.py", THREE_FUNCTIONS);
    let (stdout, _, _) = t.run(&["in.py", "--json", "--dry-run"]);
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert!(report["output"].is_null());
}

// ── failures ─────────────────────────────────────────────────────────────────

#[test]
fn test_parse_error_exit_code_and_stage() {
    let t = TempPy::new();
    t.file("bad.py", "def ok():\n    pass\ndef broken(:\n    pass\n");
    let (_, stderr, code) = t.run(&["bad.py"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error[parse]"), "{stderr}");
    assert!(stderr.contains("bad.py:3:"), "{stderr}");
    assert!(!t.path("output.py").exists());
}

#[test]
fn test_broken_expression_is_parse_error() {
    let t = TempPy::new();
    t.file("bad.py", "def f():\n    x = = 1\n\ndef g():\n    pass\n");
    let (_, stderr, code) = t.run(&["bad.py", "-o", "out.py"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("bad.py:2:9:"), "{stderr}");
    assert!(!t.path("out.py").exists());
}

#[test]
fn test_missing_input_is_read_error() {
    let t = TempPy::new();
    let (_, stderr, code) = t.run(&["nope.py"]);
    assert_eq!(code, 3);
    assert!(stderr.contains("error[read]"), "{stderr}");
}

#[test]
fn test_unwritable_output_is_write_error() {
    let t = TempPy::new();
    t.file("in.py", THREE_FUNCTIONS);
    let (_, stderr, code) = t.run(&["in.py", "-o", "missing_dir/out.py"]);
    assert_eq!(code, 3);
    assert!(stderr.contains("error[write]"), "{stderr}");
}

#[test]
fn test_missing_argument_is_usage_error() {
    let t = TempPy::new();
    let (_, _, code) = t.run(&[]);
    assert_eq!(code, 2);
}

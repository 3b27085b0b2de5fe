//! Statement-level AST for the Python parser.
//!
//! Only the structure needed to find top-level definitions is kept: every
//! statement records its byte span, and definitions keep their name and body
//! so nesting can be inspected.  Expressions are never represented; they are
//! consumed as part of the statement that contains them.

// ── Location ─────────────────────────────────────────────────────────────────

/// Byte offset into the source file (0-indexed).
/// Using `u32` keeps nodes small; files >4 GB are not realistic.
pub type Offset = u32;

/// Half-open byte range `[start, end)` covering a statement's tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Offset,
    pub end: Offset,
}

impl Span {
    pub fn new(start: Offset, end: Offset) -> Self {
        Self { start, end }
    }
}

// ── Definitions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FuncDef<'src> {
    pub name: &'src str,
    pub is_async: bool,
    /// One span per `@decorator` line, in source order.
    pub decorators: Vec<Span>,
    pub body: Vec<Stmt<'src>>,
}

#[derive(Debug, Clone)]
pub struct ClassDef<'src> {
    pub name: &'src str,
    pub decorators: Vec<Span>,
    pub body: Vec<Stmt<'src>>,
}

// ── Statements ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Stmt<'src> {
    /// From the first token (the first decorator for decorated definitions)
    /// to the end of the last significant token.  Trailing comments and
    /// blank lines are never included.
    pub span: Span,
    pub kind: StmtKind<'src>,
}

#[derive(Debug, Clone)]
pub enum StmtKind<'src> {
    FunctionDef(Box<FuncDef<'src>>),
    ClassDef(Box<ClassDef<'src>>),
    /// `if`, `for`, `while`, `with`, `try`, `match`.  The bodies of every
    /// clause (`elif`, `else`, `except`, `case`, …) are flattened into `body`.
    Compound {
        keyword: &'static str,
        body: Vec<Stmt<'src>>,
    },
    /// A logical line: assignment, import, expression, `return`, ….
    Simple,
}

impl<'src> Stmt<'src> {
    pub fn as_function(&self) -> Option<&FuncDef<'src>> {
        match &self.kind {
            StmtKind::FunctionDef(f) => Some(f),
            _ => None,
        }
    }
}

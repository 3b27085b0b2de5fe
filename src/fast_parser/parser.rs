//! Recursive-descent Python statement parser.
//!
//! Produces a `Vec<Stmt<'src>>` from the token stream of the [`Lexer`].
//! Expressions are never parsed into a tree: a statement's header or logical
//! line is consumed token by token, tracking only bracket depth and the
//! `lambda` colons that would otherwise be mistaken for a block opener.
//!
//! Every statement records the byte span from its first token to the end of
//! its last significant token, so line ranges come straight from the token
//! stream rather than from rescanning text.
//!
//! Structural errors abort the parse with a [`ParseError`]: a compound header
//! without `:`, a header without an indented block, an unexpected indent,
//! orphan `elif`/`else`/`except`/`finally` clauses, a `try` without a handler,
//! a decorator that does not precede a definition.
//!
//! [`Lexer`]: crate::fast_parser::lexer::Lexer

use crate::ast::{ClassDef, FuncDef, Offset, Span, Stmt, StmtKind};
use crate::error::ParseError;
use crate::fast_parser::lexer::{SpannedToken, Token, tokenize};

// ── Public entry point ────────────────────────────────────────────────────────

/// Parse a Python source string into its top-level statements.
pub fn parse(src: &str) -> Result<Vec<Stmt<'_>>, ParseError> {
    let tokens = tokenize(src)?;
    let mut p = Parser {
        src,
        tokens,
        pos: 0,
        last_end: 0,
    };
    p.parse_module()
}

// ── Parser ────────────────────────────────────────────────────────────────────

struct Parser<'src> {
    src: &'src str,
    /// Always ends with `Token::Eof`.
    tokens: Vec<SpannedToken<'src>>,
    pos: usize,
    /// End offset of the last consumed non-layout token.
    last_end: Offset,
}

impl<'src> Parser<'src> {
    // ── Module ────────────────────────────────────────────────────────────────

    fn parse_module(&mut self) -> Result<Vec<Stmt<'src>>, ParseError> {
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                Token::Eof => break,
                Token::Newline => {
                    self.bump();
                }
                _ => stmts.push(self.parse_stmt()?),
            }
        }
        Ok(stmts)
    }

    // ── Statement dispatch ────────────────────────────────────────────────────

    fn parse_stmt(&mut self) -> Result<Stmt<'src>, ParseError> {
        let offset = self.offset();

        match self.peek().clone() {
            Token::Indent => Err(self.error_here("unexpected indent")),
            Token::Dedent => Err(self.error_here("unexpected unindent")),
            Token::At => self.parse_decorated(offset),
            Token::KwDef => self.parse_funcdef(offset, Vec::new(), false),
            Token::KwClass => self.parse_classdef(offset, Vec::new()),
            Token::KwAsync => match self.peek_nth(1) {
                Token::KwDef => {
                    self.bump(); // consume `async`
                    self.parse_funcdef(offset, Vec::new(), true)
                }
                Token::KwFor => {
                    self.bump();
                    self.parse_compound(offset, "for", &[Token::KwElse])
                }
                Token::KwWith => {
                    self.bump();
                    self.parse_compound(offset, "with", &[])
                }
                _ => self.parse_simple(offset),
            },
            Token::KwIf => self.parse_compound(offset, "if", &[Token::KwElif, Token::KwElse]),
            Token::KwWhile => self.parse_compound(offset, "while", &[Token::KwElse]),
            Token::KwFor => self.parse_compound(offset, "for", &[Token::KwElse]),
            Token::KwWith => self.parse_compound(offset, "with", &[]),
            Token::KwTry => self.parse_try(offset),
            Token::KwMatch if self.is_match_stmt() => self.parse_match(offset),
            Token::KwElif | Token::KwElse | Token::KwExcept | Token::KwFinally => {
                let clause = self.clause_name();
                Err(self.error_here(format!("'{clause}' without a matching statement")))
            }
            // Everything else is a simple statement on one logical line.
            _ => self.parse_simple(offset),
        }
    }

    // ── simple statements ─────────────────────────────────────────────────────

    /// Consume one logical line, including `;`-separated statements.
    fn parse_simple(&mut self, offset: Offset) -> Result<Stmt<'src>, ParseError> {
        self.check_tokens(self.pos, self.line_end(), true)?;
        self.skip_line();
        Ok(self.finish(offset, StmtKind::Simple))
    }

    // ── def / class ───────────────────────────────────────────────────────────

    fn parse_decorated(&mut self, offset: Offset) -> Result<Stmt<'src>, ParseError> {
        let mut decorators = Vec::new();
        while matches!(self.peek(), Token::At) {
            let at = self.offset();
            self.bump(); // consume '@'
            if matches!(self.peek(), Token::Newline | Token::Eof) {
                return Err(self.error_here("expected decorator expression"));
            }
            self.check_tokens(self.pos, self.line_end(), false)?;
            self.skip_line();
            decorators.push(Span::new(at, self.last_end));
        }
        match self.peek() {
            Token::KwDef => self.parse_funcdef(offset, decorators, false),
            Token::KwAsync if matches!(self.peek_nth(1), Token::KwDef) => {
                self.bump(); // consume `async`
                self.parse_funcdef(offset, decorators, true)
            }
            Token::KwClass => self.parse_classdef(offset, decorators),
            _ => Err(self.error_here("expected 'def' or 'class' after decorator")),
        }
    }

    fn parse_funcdef(
        &mut self,
        offset: Offset,
        decorators: Vec<Span>,
        is_async: bool,
    ) -> Result<Stmt<'src>, ParseError> {
        self.bump(); // consume `def`
        let name = self
            .expect_name()
            .ok_or_else(|| self.error_here("expected function name after 'def'"))?;
        // PEP 695 type parameters: `def f[T](x: T)`.
        let signature = self.pos;
        if matches!(self.peek(), Token::LBracket) {
            self.skip_balanced();
        }
        if !matches!(self.peek(), Token::LParen) {
            return Err(self.error_here("expected '(' after function name"));
        }
        // Parameters, `-> annotation` and the trailing ':'.
        self.parse_header_from(signature)?;
        let body = self.parse_block()?;
        Ok(self.finish(
            offset,
            StmtKind::FunctionDef(Box::new(FuncDef {
                name,
                is_async,
                decorators,
                body,
            })),
        ))
    }

    fn parse_classdef(
        &mut self,
        offset: Offset,
        decorators: Vec<Span>,
    ) -> Result<Stmt<'src>, ParseError> {
        self.bump(); // consume `class`
        let name = self
            .expect_name()
            .ok_or_else(|| self.error_here("expected class name after 'class'"))?;
        self.parse_header()?;
        let body = self.parse_block()?;
        Ok(self.finish(
            offset,
            StmtKind::ClassDef(Box::new(ClassDef {
                name,
                decorators,
                body,
            })),
        ))
    }

    // ── compound statements ───────────────────────────────────────────────────

    /// `keyword header: block` followed by any of the `followers` clauses.
    /// An `else` clause is always the last one.
    fn parse_compound(
        &mut self,
        offset: Offset,
        keyword: &'static str,
        followers: &[Token<'src>],
    ) -> Result<Stmt<'src>, ParseError> {
        self.bump(); // consume the keyword
        let mut body = self.parse_clause()?;
        while followers.contains(self.peek()) {
            let is_else = matches!(self.peek(), Token::KwElse);
            self.bump();
            body.extend(self.parse_clause()?);
            if is_else {
                break;
            }
        }
        Ok(self.finish(offset, StmtKind::Compound { keyword, body }))
    }

    fn parse_try(&mut self, offset: Offset) -> Result<Stmt<'src>, ParseError> {
        self.bump(); // consume `try`
        let mut body = self.parse_clause()?;

        let mut handlers = 0usize;
        while matches!(self.peek(), Token::KwExcept) {
            self.bump();
            body.extend(self.parse_clause()?);
            handlers += 1;
        }
        if handlers > 0 && matches!(self.peek(), Token::KwElse) {
            self.bump();
            body.extend(self.parse_clause()?);
        }
        let has_finally = matches!(self.peek(), Token::KwFinally);
        if has_finally {
            self.bump();
            body.extend(self.parse_clause()?);
        }
        if handlers == 0 && !has_finally {
            return Err(self.error_here("expected 'except' or 'finally' block"));
        }
        Ok(self.finish(
            offset,
            StmtKind::Compound {
                keyword: "try",
                body,
            },
        ))
    }

    /// `match` is a soft keyword: it opens a statement only when its logical
    /// line is `match <subject>:` with the colon ending the line.
    fn is_match_stmt(&self) -> bool {
        let mut depth = 0usize;
        let mut lambdas = 0usize;
        let mut i = self.pos + 1;
        loop {
            let tok = &self.tokens[i.min(self.tokens.len() - 1)].token;
            match tok {
                Token::Newline | Token::Eof => return false,
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    depth = depth.saturating_sub(1)
                }
                Token::KwLambda if depth == 0 => lambdas += 1,
                Token::Colon if depth == 0 && lambdas > 0 => lambdas -= 1,
                Token::Colon if depth == 0 => {
                    let next = &self.tokens[(i + 1).min(self.tokens.len() - 1)].token;
                    return i > self.pos + 1 && matches!(next, Token::Newline);
                }
                _ => {}
            }
            i += 1;
        }
    }

    fn parse_match(&mut self, offset: Offset) -> Result<Stmt<'src>, ParseError> {
        self.bump(); // consume `match`
        self.parse_header()?;
        self.expect_block_start()?;
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Token::Dedent => {
                    self.bump();
                    break;
                }
                Token::Eof => break,
                Token::KwCase => {
                    self.bump();
                    body.extend(self.parse_clause()?);
                }
                _ => return Err(self.error_here("expected 'case' block")),
            }
        }
        if body.is_empty() {
            return Err(self.error_here("expected 'case' block"));
        }
        Ok(self.finish(
            offset,
            StmtKind::Compound {
                keyword: "match",
                body,
            },
        ))
    }

    // ── headers and blocks ────────────────────────────────────────────────────

    /// Header plus block of one clause; the clause keyword is already consumed.
    fn parse_clause(&mut self) -> Result<Vec<Stmt<'src>>, ParseError> {
        self.parse_header()?;
        self.parse_block()
    }

    /// Consume tokens up to and including the `:` that opens the block.
    ///
    /// Colons inside brackets (slices, dict displays, annotations of
    /// parameters) and those belonging to a `lambda` are skipped.
    fn parse_header(&mut self) -> Result<(), ParseError> {
        self.parse_header_from(self.pos)
    }

    /// [`Self::parse_header`] for a header whose tokens began at `from`.
    fn parse_header_from(&mut self, from: usize) -> Result<(), ParseError> {
        let mut depth = 0usize;
        let mut lambdas = 0usize;
        loop {
            match self.peek() {
                Token::Newline | Token::Eof => return Err(self.error_here("expected ':'")),
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    depth = depth.saturating_sub(1)
                }
                Token::KwLambda if depth == 0 => lambdas += 1,
                Token::Colon if depth == 0 => {
                    if lambdas == 0 {
                        self.check_tokens(from, self.pos, false)?;
                        self.bump();
                        return Ok(());
                    }
                    lambdas -= 1;
                }
                _ => {}
            }
            self.bump();
        }
    }

    // ── expression checks ─────────────────────────────────────────────────────

    /// Index of the NEWLINE (or EOF) ending the current logical line.
    fn line_end(&self) -> usize {
        let mut i = self.pos;
        while !matches!(self.tokens[i].token, Token::Newline | Token::Eof) {
            i += 1;
        }
        i
    }

    /// Reject token pairs that no Python expression contains, over
    /// `tokens[from..=to]`, where `tokens[to]` ends the line or header.
    ///
    /// This is a neighbour check, not a grammar: two operands in a row, an
    /// operator where an operand must follow, a bare `import`/`del`/…, and a
    /// `from` statement without `import`.
    fn check_tokens(&self, from: usize, to: usize, statement: bool) -> Result<(), ParseError> {
        let mut stmt_start = statement;
        let mut open_from: Option<usize> = None;

        for i in from..to {
            let cur = &self.tokens[i].token;
            let next = &self.tokens[i + 1].token;
            let at_start = stmt_start;
            stmt_start = matches!(cur, Token::Semicolon);

            match cur {
                Token::KwFrom if at_start => open_from = Some(i),
                Token::KwImport => open_from = None,
                Token::Semicolon if open_from.is_some() => {
                    return Err(self.error_at(i, "expected 'import'"));
                }
                _ => {}
            }

            if let Some(keyword) = needs_operand_keyword(cur).filter(|_| ends_expression(next)) {
                return Err(self.error_at(
                    i + 1,
                    format!("expected an expression after '{keyword}'"),
                ));
            }

            if self.expects_operand(i) {
                // `import *`, `def f(a, *, b)` and `def f(a, /)` end on an operator.
                let marker = matches!(cur, Token::Op) && matches!(self.text(i), "*" | "/");
                if self.cannot_start_operand(i + 1) || (!marker && ends_expression(next)) {
                    return Err(self.error_at(i + 1, "expected an expression"));
                }
            }

            let implicit_concat = matches!((cur, next), (Token::Str, Token::Str));
            let type_alias = at_start && matches!(cur, Token::Name("type"));
            if ends_operand(cur) && starts_operand(next) && !implicit_concat && !type_alias {
                return Err(self.error_at(i + 1, "invalid syntax"));
            }
        }

        if open_from.is_some() {
            return Err(self.error_at(to, "expected 'import'"));
        }
        Ok(())
    }

    /// Operators and keywords that must be followed by an operand.
    fn expects_operand(&self, i: usize) -> bool {
        matches!(
            self.tokens[i].token,
            Token::Eq
                | Token::Walrus
                | Token::Arrow
                | Token::At
                | Token::Op
                | Token::KwAnd
                | Token::KwOr
                | Token::KwNot
                | Token::KwIn
                | Token::KwIs
        )
    }

    /// Tokens that can only sit between two operands.
    fn cannot_start_operand(&self, i: usize) -> bool {
        match self.tokens[i].token {
            Token::Eq | Token::Walrus | Token::Arrow | Token::At => true,
            Token::Op => !matches!(self.text(i), "-" | "+" | "~" | "*" | "**"),
            _ => false,
        }
    }

    fn text(&self, i: usize) -> &'src str {
        let tok = &self.tokens[i];
        &self.src[tok.start as usize..tok.end as usize]
    }

    /// The body after a header's `:` — either an indented block or simple
    /// statements on the same line (`if x: return y`).
    fn parse_block(&mut self) -> Result<Vec<Stmt<'src>>, ParseError> {
        if !matches!(self.peek(), Token::Newline) {
            let offset = self.offset();
            return Ok(vec![self.parse_simple(offset)?]);
        }
        self.expect_block_start()?;
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                Token::Dedent => {
                    self.bump();
                    break;
                }
                Token::Eof => break,
                Token::Newline => {
                    self.bump();
                }
                _ => stmts.push(self.parse_stmt()?),
            }
        }
        Ok(stmts)
    }

    fn expect_block_start(&mut self) -> Result<(), ParseError> {
        if !matches!(self.peek(), Token::Newline) {
            return Err(self.error_here("expected newline after ':'"));
        }
        self.bump();
        if !matches!(self.peek(), Token::Indent) {
            return Err(self.error_here("expected an indented block"));
        }
        self.bump();
        Ok(())
    }

    // ── Helper utilities ──────────────────────────────────────────────────────

    fn peek(&self) -> &Token<'src> {
        &self.tokens[self.pos].token
    }

    fn peek_nth(&self, n: usize) -> &Token<'src> {
        let i = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[i].token
    }

    /// Byte offset of the next token.
    fn offset(&self) -> Offset {
        self.tokens[self.pos].start
    }

    /// Consume the next token.  `Eof` is never consumed.
    fn bump(&mut self) -> Token<'src> {
        let tok = &self.tokens[self.pos];
        if !tok.token.is_layout() {
            self.last_end = tok.end;
        }
        if tok.token != Token::Eof {
            self.pos += 1;
        }
        tok.token.clone()
    }

    /// Consume the rest of the logical line, including its NEWLINE.
    fn skip_line(&mut self) {
        loop {
            match self.bump() {
                Token::Newline | Token::Eof => break,
                _ => {}
            }
        }
    }

    /// Skip a bracketed group starting at the current opening bracket.
    fn skip_balanced(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.bump() {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break;
                    }
                }
                Token::Eof => break,
                _ => {}
            }
        }
    }

    fn expect_name(&mut self) -> Option<&'src str> {
        let name = match self.peek() {
            Token::Name(n) => *n,
            // Soft keywords are valid identifiers.
            Token::KwMatch => "match",
            Token::KwCase => "case",
            _ => return None,
        };
        self.bump();
        Some(name)
    }

    fn clause_name(&self) -> &'static str {
        match self.peek() {
            Token::KwElif => "elif",
            Token::KwElse => "else",
            Token::KwExcept => "except",
            _ => "finally",
        }
    }

    fn finish(&self, start: Offset, kind: StmtKind<'src>) -> Stmt<'src> {
        Stmt {
            span: Span::new(start, self.last_end),
            kind,
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::at(self.src, self.offset() as usize, message)
    }

    fn error_at(&self, i: usize, message: impl Into<String>) -> ParseError {
        ParseError::at(self.src, self.tokens[i].start as usize, message)
    }
}

fn starts_operand(tok: &Token<'_>) -> bool {
    matches!(
        tok,
        Token::Name(_)
            | Token::Number
            | Token::Str
            | Token::Ellipsis
            | Token::KwTrue
            | Token::KwFalse
            | Token::KwNone
            | Token::KwMatch
            | Token::KwCase
    )
}

fn ends_operand(tok: &Token<'_>) -> bool {
    starts_operand(tok) || matches!(tok, Token::RParen | Token::RBracket | Token::RBrace)
}

/// Tokens after which an expression can no longer continue.
fn ends_expression(tok: &Token<'_>) -> bool {
    matches!(
        tok,
        Token::Newline
            | Token::Eof
            | Token::Semicolon
            | Token::Comma
            | Token::Colon
            | Token::RParen
            | Token::RBracket
            | Token::RBrace
    )
}

/// Statement keywords that take at least one operand.
fn needs_operand_keyword(tok: &Token<'_>) -> Option<&'static str> {
    match tok {
        Token::KwImport => Some("import"),
        Token::KwDel => Some("del"),
        Token::KwAssert => Some("assert"),
        Token::KwGlobal => Some("global"),
        Token::KwNonlocal => Some("nonlocal"),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

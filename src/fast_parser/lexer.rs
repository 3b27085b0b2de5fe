//! Zero-copy Python lexer.
//!
//! Produces [`Token`] variants that borrow `&'src str` slices directly from
//! the source buffer, each paired with its byte span.
//!
//! Handles:
//! - All keyword tokens
//! - INDENT / DEDENT via an indentation stack
//! - Implicit line continuation inside `(`, `[`, `{`
//! - Explicit line continuation via trailing `\`
//! - All string literal forms: single/triple-quoted, raw, bytes, f-strings
//! - Comments and blank lines (skipped)
//!
//! Unlike a recovering lexer, anything malformed is reported as a
//! [`ParseError`]: unterminated strings, unbalanced brackets, dedents that
//! match no outer level, stray characters.

use crate::error::ParseError;

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // Literals
    Name(&'src str),
    /// Any numeric literal — value not needed.
    Number,
    /// Any string literal, including f-strings and byte strings.
    Str,

    // Structural
    Newline,
    Indent,
    Dedent,

    // Punctuation the parser needs to distinguish
    Eq,        // =
    Walrus,    // :=
    Colon,     // :
    Comma,     // ,
    Dot,       // .
    Ellipsis,  // ...
    Semicolon, // ;
    Arrow,     // ->
    At,        // @

    // Bracket pairs
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    LBrace,   // {
    RBrace,   // }

    /// Every other operator, including augmented assignment.
    Op,

    // Keywords
    KwFalse,
    KwNone,
    KwTrue,
    KwAnd,
    KwAs,
    KwAssert,
    KwAsync,
    KwAwait,
    KwBreak,
    KwClass,
    KwContinue,
    KwDef,
    KwDel,
    KwElif,
    KwElse,
    KwExcept,
    KwFinally,
    KwFor,
    KwFrom,
    KwGlobal,
    KwIf,
    KwImport,
    KwIn,
    KwIs,
    KwLambda,
    KwMatch, // soft keyword — the parser decides whether it opens a statement
    KwCase,  // soft keyword
    KwNonlocal,
    KwNot,
    KwOr,
    KwPass,
    KwRaise,
    KwReturn,
    KwTry,
    KwWhile,
    KwWith,
    KwYield,

    Eof,
}

impl Token<'_> {
    /// Layout tokens carry no source text of their own.
    pub fn is_layout(&self) -> bool {
        matches!(
            self,
            Token::Newline | Token::Indent | Token::Dedent | Token::Eof
        )
    }
}

// ── SpannedToken ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SpannedToken<'src> {
    pub token: Token<'src>,
    /// Byte offset of the first character.
    pub start: u32,
    /// Byte offset one past the last character.
    pub end: u32,
}

/// Tokenise a whole module.  The returned stream always ends with
/// [`Token::Eof`], preceded by a NEWLINE for any unterminated last line and
/// one DEDENT per open indentation level.
pub fn tokenize(src: &str) -> Result<Vec<SpannedToken<'_>>, ParseError> {
    let mut lex = Lexer::new(src);
    let mut out = Vec::new();
    loop {
        let tok = lex.next_token()?;
        let done = tok.token == Token::Eof;
        out.push(tok);
        if done {
            return Ok(out);
        }
    }
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

pub struct Lexer<'src> {
    src: &'src [u8],
    /// The same source as a `&str` — used for safe UTF-8 slicing without `unsafe`.
    src_str: &'src str,
    /// Current byte position.
    pos: usize,
    /// Indentation stack; always starts with [0].
    indent_stack: Vec<usize>,
    /// How many DEDENT tokens remain to be emitted.
    pending_dedents: usize,
    /// Whether the next logical line should trigger indent/dedent analysis.
    at_line_start: bool,
    /// Whether the current logical line has produced a token yet.
    line_has_tokens: bool,
    /// Open brackets with their offsets, innermost last.  While non-empty,
    /// newlines are ignored.
    brackets: Vec<(u8, usize)>,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src: src.as_bytes(),
            src_str: src,
            pos: 0,
            indent_stack: vec![0],
            pending_dedents: 0,
            at_line_start: true,
            line_has_tokens: false,
            brackets: Vec::new(),
        }
    }

    pub fn next_token(&mut self) -> Result<SpannedToken<'src>, ParseError> {
        // Emit pending DEDENT tokens before reading more source.
        if self.pending_dedents > 0 {
            self.pending_dedents -= 1;
            return Ok(self.marker(Token::Dedent));
        }

        loop {
            if self.at_line_start && self.brackets.is_empty() {
                self.at_line_start = false;
                if let Some(tok) = self.handle_indent()? {
                    return Ok(tok);
                }
            }

            if self.pos >= self.src.len() {
                return self.finish();
            }

            let start = self.pos;
            let b = self.src[self.pos];

            // ── Skip whitespace (not newlines) ────────────────────────────
            if matches!(b, b' ' | b'\t' | b'\x0c') {
                self.pos += 1;
                continue;
            }

            // ── Newline: `\n`, `\r\n` or a lone `\r` ───────────────────────
            if b == b'\n' || b == b'\r' {
                self.skip_line_break();
                if !self.brackets.is_empty() {
                    // Inside brackets: implicit continuation — ignore newline.
                    continue;
                }
                self.at_line_start = true;
                if !self.line_has_tokens {
                    continue;
                }
                self.line_has_tokens = false;
                return Ok(SpannedToken {
                    token: Token::Newline,
                    start: start as u32,
                    end: self.pos as u32,
                });
            }

            // ── Explicit line continuation ────────────────────────────────
            if b == b'\\' {
                self.pos += 1;
                match self.src.get(self.pos) {
                    Some(b'\n' | b'\r') => {
                        self.skip_line_break();
                        continue;
                    }
                    None => {
                        return Err(self.error(start, "unexpected EOF after line continuation"));
                    }
                    Some(_) => {
                        return Err(self.error(
                            start,
                            "unexpected character after line continuation character",
                        ));
                    }
                }
            }

            // ── Comment ───────────────────────────────────────────────────
            if b == b'#' {
                self.skip_comment();
                continue;
            }

            // ── String literals ───────────────────────────────────────────
            if self.is_string_start() {
                return self.lex_string(start);
            }

            // ── Numbers ───────────────────────────────────────────────────
            if b.is_ascii_digit()
                || (b == b'.'
                    && self
                        .src
                        .get(self.pos + 1)
                        .copied()
                        .is_some_and(|c| c.is_ascii_digit()))
            {
                self.lex_number();
                return Ok(self.emit(Token::Number, start));
            }

            // ── Identifiers and keywords ──────────────────────────────────
            if is_name_start(b) {
                return Ok(self.lex_name(start));
            }

            // ── Operators and punctuation ─────────────────────────────────
            self.pos += 1;
            let tok = match b {
                b'(' | b'[' | b'{' => {
                    self.brackets.push((b, start));
                    match b {
                        b'(' => Token::LParen,
                        b'[' => Token::LBracket,
                        _ => Token::LBrace,
                    }
                }
                b')' | b']' | b'}' => {
                    self.close_bracket(b, start)?;
                    match b {
                        b')' => Token::RParen,
                        b']' => Token::RBracket,
                        _ => Token::RBrace,
                    }
                }
                b',' => Token::Comma,
                b';' => Token::Semicolon,
                b'@' => {
                    if self.eat_byte(b'=') {
                        Token::Op
                    } else {
                        Token::At
                    }
                }
                b'=' => {
                    if self.eat_byte(b'=') {
                        Token::Op
                    } else {
                        Token::Eq
                    }
                }
                b':' => {
                    if self.eat_byte(b'=') {
                        Token::Walrus
                    } else {
                        Token::Colon
                    }
                }
                b'.' => {
                    if self.src.get(self.pos) == Some(&b'.')
                        && self.src.get(self.pos + 1) == Some(&b'.')
                    {
                        self.pos += 2;
                        Token::Ellipsis
                    } else {
                        Token::Dot
                    }
                }
                b'-' => {
                    if self.eat_byte(b'>') {
                        Token::Arrow
                    } else {
                        self.eat_byte(b'=');
                        Token::Op
                    }
                }
                b'*' | b'/' | b'<' | b'>' => {
                    // `**`, `//`, `<<`, `>>`, each optionally followed by `=`.
                    self.eat_byte(b);
                    self.eat_byte(b'=');
                    Token::Op
                }
                b'+' | b'%' | b'^' | b'&' | b'|' | b'~' => {
                    self.eat_byte(b'=');
                    Token::Op
                }
                b'!' => {
                    if !self.eat_byte(b'=') {
                        return Err(self.error(start, "invalid syntax: '!'"));
                    }
                    Token::Op
                }
                other => {
                    return Err(self.error(
                        start,
                        format!("invalid character '{}'", other as char),
                    ));
                }
            };

            return Ok(self.emit(tok, start));
        }
    }

    // ── Token construction ────────────────────────────────────────────────────

    fn emit(&mut self, token: Token<'src>, start: usize) -> SpannedToken<'src> {
        self.line_has_tokens = true;
        SpannedToken {
            token,
            start: start as u32,
            end: self.pos as u32,
        }
    }

    /// A zero-width layout token at the current position.
    fn marker(&self, token: Token<'src>) -> SpannedToken<'src> {
        SpannedToken {
            token,
            start: self.pos as u32,
            end: self.pos as u32,
        }
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError::at(self.src_str, offset, message)
    }

    /// Consume one line break at `pos`, treating `\r\n` as a single break.
    fn skip_line_break(&mut self) {
        if self.src.get(self.pos) == Some(&b'\r') {
            self.pos += 1;
            self.eat_byte(b'\n');
        } else {
            self.pos += 1;
        }
    }

    /// Skip to the end of a comment, leaving the line break in place.
    fn skip_comment(&mut self) {
        while self.pos < self.src.len() && !matches!(self.src[self.pos], b'\n' | b'\r') {
            self.pos += 1;
        }
    }

    fn eat_byte(&mut self, expected: u8) -> bool {
        if self.src.get(self.pos) == Some(&expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn close_bracket(&mut self, close: u8, offset: usize) -> Result<(), ParseError> {
        let expected = match close {
            b')' => b'(',
            b']' => b'[',
            _ => b'{',
        };
        match self.brackets.pop() {
            Some((open, _)) if open == expected => Ok(()),
            Some((open, _)) => Err(self.error(
                offset,
                format!(
                    "closing parenthesis '{}' does not match opening parenthesis '{}'",
                    close as char, open as char
                ),
            )),
            None => Err(self.error(offset, format!("unmatched '{}'", close as char))),
        }
    }

    /// End of input: close the last logical line, unwind indentation, then EOF.
    fn finish(&mut self) -> Result<SpannedToken<'src>, ParseError> {
        if let Some(&(open, offset)) = self.brackets.last() {
            return Err(self.error(offset, format!("'{}' was never closed", open as char)));
        }
        if self.line_has_tokens {
            self.line_has_tokens = false;
            return Ok(self.marker(Token::Newline));
        }
        if self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            return Ok(self.marker(Token::Dedent));
        }
        Ok(self.marker(Token::Eof))
    }

    // ── Indentation handling ──────────────────────────────────────────────────

    /// Called when `at_line_start` is true.  Scans leading whitespace of the
    /// next non-blank, non-comment line and emits INDENT/DEDENT/nothing.
    ///
    /// Returns `Ok(None)` at EOF or when the indentation is unchanged.
    fn handle_indent(&mut self) -> Result<Option<SpannedToken<'src>>, ParseError> {
        loop {
            let mut col = 0usize;
            while self.pos < self.src.len() {
                match self.src[self.pos] {
                    b' ' => col += 1,
                    b'\t' => col = (col + 8) & !7, // tab stop at 8
                    b'\x0c' => col = 0,
                    _ => break,
                }
                self.pos += 1;
            }

            if self.pos >= self.src.len() {
                return Ok(None);
            }
            match self.src[self.pos] {
                b'\n' | b'\r' => {
                    // blank line — don't generate indent/dedent
                    self.skip_line_break();
                    continue;
                }
                b'#' => {
                    self.skip_comment();
                    if self.pos < self.src.len() {
                        self.skip_line_break();
                    }
                    continue;
                }
                _ => {}
            }

            let top = *self.indent_stack.last().unwrap_or(&0);
            if col > top {
                self.indent_stack.push(col);
                return Ok(Some(self.marker(Token::Indent)));
            }
            if col < top {
                let mut dedents = 0usize;
                while self.indent_stack.len() > 1
                    && self.indent_stack.last().is_some_and(|&level| level > col)
                {
                    self.indent_stack.pop();
                    dedents += 1;
                }
                if self.indent_stack.last() != Some(&col) {
                    return Err(self.error(
                        self.pos,
                        "unindent does not match any outer indentation level",
                    ));
                }
                // Emit the first DEDENT now; queue the rest.
                self.pending_dedents = dedents - 1;
                return Ok(Some(self.marker(Token::Dedent)));
            }
            return Ok(None);
        }
    }

    // ── Identifier / keyword lexing ───────────────────────────────────────────

    fn lex_name(&mut self, start: usize) -> SpannedToken<'src> {
        while self.pos < self.src.len() && is_name_continue(self.src[self.pos]) {
            self.pos += 1;
        }
        // The identifier ends at an ASCII byte or EOF, so `start..pos` lies on
        // char boundaries even when it contains non-ASCII letters.
        let s = &self.src_str[start..self.pos];
        let tok = match s {
            "False" => Token::KwFalse,
            "None" => Token::KwNone,
            "True" => Token::KwTrue,
            "and" => Token::KwAnd,
            "as" => Token::KwAs,
            "assert" => Token::KwAssert,
            "async" => Token::KwAsync,
            "await" => Token::KwAwait,
            "break" => Token::KwBreak,
            "class" => Token::KwClass,
            "continue" => Token::KwContinue,
            "def" => Token::KwDef,
            "del" => Token::KwDel,
            "elif" => Token::KwElif,
            "else" => Token::KwElse,
            "except" => Token::KwExcept,
            "finally" => Token::KwFinally,
            "for" => Token::KwFor,
            "from" => Token::KwFrom,
            "global" => Token::KwGlobal,
            "if" => Token::KwIf,
            "import" => Token::KwImport,
            "in" => Token::KwIn,
            "is" => Token::KwIs,
            "lambda" => Token::KwLambda,
            "match" => Token::KwMatch,
            "case" => Token::KwCase,
            "nonlocal" => Token::KwNonlocal,
            "not" => Token::KwNot,
            "or" => Token::KwOr,
            "pass" => Token::KwPass,
            "raise" => Token::KwRaise,
            "return" => Token::KwReturn,
            "try" => Token::KwTry,
            "while" => Token::KwWhile,
            "with" => Token::KwWith,
            "yield" => Token::KwYield,
            other => Token::Name(other),
        };
        self.emit(tok, start)
    }

    // ── Number lexing ─────────────────────────────────────────────────────────

    fn lex_number(&mut self) {
        // Skip the whole numeric literal.  We don't need the value.
        while self.pos < self.src.len() {
            let b = self.src[self.pos];
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' {
                self.pos += 1;
            } else if (b == b'+' || b == b'-')
                && self.pos > 0
                && (self.src[self.pos - 1] == b'e' || self.src[self.pos - 1] == b'E')
            {
                // Exponent sign in float literal.
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    // ── String literals ───────────────────────────────────────────────────────

    fn is_string_start(&self) -> bool {
        let b = self.src[self.pos];
        match b {
            b'"' | b'\'' => true,
            _ if is_prefix_letter(b) => {
                // Could be a string prefix.  Check next byte.
                let next = self.src.get(self.pos + 1).copied().unwrap_or(0);
                match next {
                    b'"' | b'\'' => true,
                    _ if is_prefix_letter(next) => {
                        // Two-char prefix like rb, br, rf, fr, rt
                        let nn = self.src.get(self.pos + 2).copied().unwrap_or(0);
                        nn == b'"' || nn == b'\''
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn lex_string(&mut self, start: usize) -> Result<SpannedToken<'src>, ParseError> {
        let mut templated = false;
        while let Some(&b) = self.src.get(self.pos) {
            if !is_prefix_letter(b) {
                break;
            }
            templated |= matches!(b, b'f' | b'F' | b't' | b'T');
            self.pos += 1;
        }
        self.skip_string_body(start, templated)?;
        Ok(self.emit(Token::Str, start))
    }

    /// Skip a string from its opening quote at `pos` through its closing
    /// quote.  In f- and t-strings, `{...}` replacement fields may hold
    /// nested strings using the same quote.
    fn skip_string_body(&mut self, start: usize, templated: bool) -> Result<(), ParseError> {
        let q = self.src[self.pos];
        let triple =
            self.src.get(self.pos + 1) == Some(&q) && self.src.get(self.pos + 2) == Some(&q);
        self.pos += if triple { 3 } else { 1 };

        loop {
            let Some(&b) = self.src.get(self.pos) else {
                let message = if triple {
                    "unterminated triple-quoted string literal"
                } else {
                    "unterminated string literal"
                };
                return Err(self.error(start, message));
            };
            if b == b'\\' {
                // Skip the escaped byte; `\` + CRLF continues the string too.
                self.pos += 1;
                if self.src.get(self.pos) == Some(&b'\r')
                    && self.src.get(self.pos + 1) == Some(&b'\n')
                {
                    self.pos += 1;
                }
                if self.pos < self.src.len() {
                    self.pos += 1;
                }
                continue;
            }
            if templated && b == b'{' {
                if self.src.get(self.pos + 1) == Some(&b'{') {
                    self.pos += 2;
                } else {
                    self.pos += 1;
                    self.skip_replacement_field(start)?;
                }
                continue;
            }
            if b == q {
                if !triple {
                    self.pos += 1;
                    return Ok(());
                }
                if self.src.get(self.pos + 1) == Some(&q) && self.src.get(self.pos + 2) == Some(&q)
                {
                    self.pos += 3;
                    return Ok(());
                }
            } else if (b == b'\n' || b == b'\r') && !triple {
                return Err(self.error(start, "unterminated string literal"));
            }
            self.pos += 1;
        }
    }

    /// Skip an f-string replacement field; `pos` is just past its `{`.
    fn skip_replacement_field(&mut self, start: usize) -> Result<(), ParseError> {
        let mut brackets = 0usize;
        loop {
            let Some(&b) = self.src.get(self.pos) else {
                return Err(self.error(start, "unterminated f-string literal"));
            };
            match b {
                b'(' | b'[' | b'{' => brackets += 1,
                b')' | b']' => brackets = brackets.saturating_sub(1),
                b'}' if brackets > 0 => brackets -= 1,
                b'}' => {
                    self.pos += 1;
                    return Ok(());
                }
                b':' if brackets == 0 => {
                    self.pos += 1;
                    return self.skip_format_spec(start);
                }
                b'"' | b'\'' => {
                    let templated = self.quote_prefix_is_templated();
                    self.skip_string_body(start, templated)?;
                    continue;
                }
                _ => {}
            }
            self.pos += 1;
        }
    }

    /// Skip a format spec up to the `}` closing its field.  Quotes are
    /// literal here; only nested `{...}` fields are special.
    fn skip_format_spec(&mut self, start: usize) -> Result<(), ParseError> {
        loop {
            match self.src.get(self.pos) {
                None => return Err(self.error(start, "unterminated f-string literal")),
                Some(b'{') => {
                    self.pos += 1;
                    self.skip_replacement_field(start)?;
                }
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Whether the letters right before the quote at `pos` are an f- or
    /// t-string prefix.
    fn quote_prefix_is_templated(&self) -> bool {
        let letters = self.src[..self.pos]
            .iter()
            .rev()
            .take_while(|b| b.is_ascii_alphabetic())
            .count();
        let prefix = &self.src[self.pos - letters..self.pos];
        prefix.len() <= 2
            && prefix.iter().all(|&b| is_prefix_letter(b))
            && prefix.iter().any(|&b| matches!(b, b'f' | b'F' | b't' | b'T'))
    }
}

fn is_prefix_letter(b: u8) -> bool {
    matches!(
        b,
        b'r' | b'R' | b'b' | b'B' | b'u' | b'U' | b'f' | b'F' | b't' | b'T'
    )
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_name_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Core Yarilo lexer: converts source text to a token stream.
//!
//! - Brackets `[ ]` and parens `( )` are the only punctuation
//! - Words carry their sigil as a [`WordKind`]: `w`, `w:`, `:w`, `'w`
//! - `/ident` at the start of a token is a refinement
//! - `;` starts a comment that runs to end of line
//! - Error recovery: collects up to 20 errors instead of stopping at the first

use yarilo_types::ast::WordKind;
use yarilo_types::{ErrorCode, SourceFile, Span, SyntaxError, SyntaxErrors};

use crate::token::{Token, TokenKind};

/// The Yarilo lexer.
pub struct Lexer<'src> {
    source: &'src str,
    /// Source file for error reporting.
    source_file: &'src SourceFile,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based, counted in chars).
    col: u32,
    errors: SyntaxErrors,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: SyntaxErrors,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: &source_file.source,
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: SyntaxErrors::empty(),
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.errors.is_full() {
                break;
            }
            let token = self.scan();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self
            .source_file
            .line(span.start_line)
            .unwrap_or("")
            .to_string();
        let err = SyntaxError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == ';' {
                while let Some(ch) = self.peek() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Token scanning
    // ─────────────────────────────────────────────────────────────

    fn scan(&mut self) -> Token {
        loop {
            self.skip_trivia();
            if self.errors.is_full() {
                return Token::new(TokenKind::Eof, self.current_span());
            }

            let start = self.pos;
            let start_line = self.line;
            let start_col = self.col;
            let Some(ch) = self.peek() else {
                return Token::new(TokenKind::Eof, self.current_span());
            };

            let simple = match ch {
                '[' => Some(TokenKind::LBracket),
                ']' => Some(TokenKind::RBracket),
                '(' => Some(TokenKind::LParen),
                ')' => Some(TokenKind::RParen),
                _ => None,
            };
            if let Some(kind) = simple {
                self.advance();
                return Token::new(kind, self.span_from(start_line, start_col));
            }

            let scanned = match ch {
                '"' => {
                    self.advance();
                    Some(self.scan_string(start_line, start_col))
                }
                '\'' => {
                    self.advance();
                    self.scan_word(WordKind::Quote, start_line, start_col)
                }
                ':' => {
                    self.advance();
                    self.scan_word(WordKind::Get, start_line, start_col)
                }
                '/' => {
                    self.advance();
                    Some(self.scan_refinement(start_line, start_col))
                }
                '-' if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                    self.advance();
                    Some(self.scan_number(start, start_line, start_col))
                }
                c if c.is_ascii_digit() => Some(self.scan_number(start, start_line, start_col)),
                c if is_symbol_char(c) => self.scan_word(WordKind::Normal, start_line, start_col),
                other => {
                    self.advance();
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNEXPECTED_CHARACTER,
                        format!("unexpected character '{other}'"),
                        span,
                    );
                    None
                }
            };

            // `None` means an error was recorded and nothing usable was produced.
            if let Some(token) = scanned {
                return token;
            }
        }
    }

    /// Consume a run of symbol characters and return it.
    fn take_symbol(&mut self) -> &'src str {
        let source = self.source;
        let start = self.pos;
        while self.peek().is_some_and(is_symbol_char) {
            self.advance();
        }
        &source[start..self.pos]
    }

    /// Scan a word body; the sigil (if any) was already consumed.
    fn scan_word(&mut self, kind: WordKind, start_line: u32, start_col: u32) -> Option<Token> {
        let text = self.take_symbol();
        if text.is_empty() {
            let span = self.span_from(start_line, start_col);
            self.emit_error(ErrorCode::EMPTY_SYMBOL, "expected a symbol after sigil", span);
            return None;
        }

        let mut kind = kind;
        if kind == WordKind::Normal && self.peek() == Some(':') {
            self.advance();
            kind = WordKind::Set;
        }

        Some(Token::new(
            TokenKind::Word {
                kind,
                text: text.to_string(),
            },
            self.span_from(start_line, start_col),
        ))
    }

    /// `/ident` is a refinement; a lone `/` is an ordinary word.
    fn scan_refinement(&mut self, start_line: u32, start_col: u32) -> Token {
        let ident = self.take_symbol();
        let span = self.span_from(start_line, start_col);
        if ident.is_empty() {
            return Token::new(
                TokenKind::Word {
                    kind: WordKind::Normal,
                    text: "/".to_string(),
                },
                span,
            );
        }
        Token::new(TokenKind::Refinement(ident.to_string()), span)
    }

    // ─────────────────────────────────────────────────────────────
    // Literals
    // ─────────────────────────────────────────────────────────────

    /// `start` is the byte offset of the literal, including a consumed `-`.
    fn scan_number(&mut self, start: usize, start_line: u32, start_col: u32) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let source = self.source;
        let text = &source[start..self.pos];

        // `12abc`, `1.2.3`: swallow the rest of the symbol and report it.
        if self.peek().is_some_and(is_symbol_char) {
            self.take_symbol();
            let span = self.span_from(start_line, start_col);
            let whole = &source[start..self.pos];
            self.emit_error(
                ErrorCode::MALFORMED_NUMBER,
                format!("malformed number '{whole}'"),
                span,
            );
            return Token::new(TokenKind::Number(0.0), span);
        }

        let span = self.span_from(start_line, start_col);
        match text.parse::<f64>() {
            Ok(value) => Token::new(TokenKind::Number(value), span),
            Err(_) => {
                self.emit_error(
                    ErrorCode::MALFORMED_NUMBER,
                    format!("malformed number '{text}'"),
                    span,
                );
                Token::new(TokenKind::Number(0.0), span)
            }
        }
    }

    /// Scan a string literal starting after the opening `"`. Strings may
    /// span lines.
    fn scan_string(&mut self, start_line: u32, start_col: u32) -> Token {
        let mut buf = String::new();

        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_STRING,
                        "unterminated string literal",
                        span,
                    );
                    return Token::new(TokenKind::Str(buf), span);
                }
                Some('"') => {
                    self.advance();
                    return Token::new(TokenKind::Str(buf), self.span_from(start_line, start_col));
                }
                Some('\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }
    }

    /// Scan an escape sequence starting at the `\`.
    /// Returns the unescaped character, or `None` at end of input.
    fn scan_escape_sequence(&mut self) -> Option<char> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();

        match self.advance() {
            Some('"') => Some('"'),
            Some('\\') => Some('\\'),
            Some('n') => Some('\n'),
            Some('t') => Some('\t'),
            Some('r') => Some('\r'),
            Some(ch) => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::INVALID_ESCAPE,
                    format!("invalid escape sequence '\\{ch}'"),
                    span,
                );
                Some(ch)
            }
            None => None,
        }
    }
}

/// Anything that is not whitespace, a bracket, a quote, a comment start or
/// a colon can appear inside a symbol.
fn is_symbol_char(ch: char) -> bool {
    !ch.is_whitespace() && !matches!(ch, '[' | ']' | '(' | ')' | '"' | ';' | ':')
}

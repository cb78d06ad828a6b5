//! Core parser: nests bracketed token runs and splits paths.

use yarilo_lexer::token::{Token, TokenKind};
use yarilo_types::ast::{Node, NodeKind, WordKind};
use yarilo_types::{ErrorCode, SourceFile, Span, SyntaxError, SyntaxErrors};

/// Deepest allowed `[`/`(` nesting.
pub const MAX_NESTING: usize = 64;

/// The Yarilo parser.
///
/// Consumes a token stream produced by the lexer. There is no grammar beyond
/// bracket nesting, so recovery is simple: stray closers are reported and
/// skipped, missing closers are reported at the opener.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    source_file: &'src SourceFile,
    errors: SyntaxErrors,
}

/// Result of parsing.
pub struct ParseResult {
    pub nodes: Vec<Node>,
    pub errors: SyntaxErrors,
}

/// Which closer ends the sequence being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closer {
    TopLevel,
    Bracket,
    Paren,
}

impl Closer {
    fn token(self) -> Option<TokenKind> {
        match self {
            Closer::TopLevel => None,
            Closer::Bracket => Some(TokenKind::RBracket),
            Closer::Paren => Some(TokenKind::RParen),
        }
    }
}

impl<'src> Parser<'src> {
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            source_file,
            errors: SyntaxErrors::empty(),
        }
    }

    pub fn parse(mut self) -> ParseResult {
        let (nodes, _) = self.parse_sequence(Closer::TopLevel, Span::point(1, 1));
        ParseResult {
            nodes,
            errors: self.errors,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    fn peek_kind(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or(Span::point(1, 1))
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(token)
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self
            .source_file
            .line(span.start_line)
            .unwrap_or("")
            .to_string();
        let error = SyntaxError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push(error);
    }

    // ── Sequences ─────────────────────────────────────────────────────────────

    /// Parse items until `closer` (consumed) or end of input. Returns the
    /// items and the span of the closing token, if one was found.
    fn parse_sequence(&mut self, closer: Closer, open_span: Span) -> (Vec<Node>, Span) {
        let mut nodes = Vec::new();

        loop {
            if self.errors.is_full() {
                return (nodes, open_span);
            }

            match self.peek_kind() {
                TokenKind::Eof => {
                    if let Some(expected) = closer.token() {
                        self.error_at(
                            ErrorCode::UNCLOSED_BRACKET,
                            format!("missing '{expected}' for bracket opened here"),
                            open_span,
                        );
                    }
                    return (nodes, self.current_span());
                }
                kind @ (TokenKind::RBracket | TokenKind::RParen) => {
                    let span = self.current_span();
                    if closer.token().as_ref() == Some(kind) {
                        self.pos += 1;
                        return (nodes, span);
                    }
                    let message = format!("unexpected '{kind}'");
                    self.pos += 1;
                    self.error_at(ErrorCode::UNEXPECTED_CLOSE, message, span);
                }
                _ => {
                    if let Some(node) = self.parse_item() {
                        nodes.push(node);
                    }
                }
            }
        }
    }

    fn parse_item(&mut self) -> Option<Node> {
        let token = self.advance()?;
        let span = token.span;
        let kind = match token.kind {
            TokenKind::LBracket | TokenKind::LParen if self.depth >= MAX_NESTING => {
                self.error_at(
                    ErrorCode::NESTING_TOO_DEEP,
                    format!("nesting deeper than {MAX_NESTING} levels"),
                    span,
                );
                self.skip_group();
                return None;
            }
            TokenKind::LBracket => {
                let (items, close) = self.nested(Closer::Bracket, span);
                return Some(Node::new(NodeKind::Block(items), span.merge(close)));
            }
            TokenKind::LParen => {
                let (items, close) = self.nested(Closer::Paren, span);
                return Some(Node::new(NodeKind::Paren(items), span.merge(close)));
            }
            TokenKind::Number(n) => NodeKind::Number(n),
            TokenKind::Str(s) => NodeKind::String(s),
            TokenKind::Refinement(ident) => NodeKind::Refinement(ident),
            TokenKind::Word { kind, text } => self.word(kind, text, span)?,
            // Closers and Eof are handled by `parse_sequence`.
            TokenKind::RBracket | TokenKind::RParen | TokenKind::Eof => return None,
        };
        Some(Node::new(kind, span))
    }

    fn nested(&mut self, closer: Closer, open_span: Span) -> (Vec<Node>, Span) {
        self.depth += 1;
        let result = self.parse_sequence(closer, open_span);
        self.depth -= 1;
        result
    }

    /// Skip the rest of a group whose opener was just consumed, without
    /// recursing.
    fn skip_group(&mut self) {
        let mut open = 1usize;
        while let Some(token) = self.advance() {
            match token.kind {
                TokenKind::LBracket | TokenKind::LParen => open += 1,
                TokenKind::RBracket | TokenKind::RParen => {
                    open -= 1;
                    if open == 0 {
                        return;
                    }
                }
                TokenKind::Eof => return,
                _ => {}
            }
        }
    }

    /// A word whose text contains `/` or `.` after its first character is a
    /// path: `core/add`, `m.dbl`.
    fn word(&mut self, kind: WordKind, text: String, span: Span) -> Option<NodeKind> {
        let is_path = text
            .char_indices()
            .any(|(i, c)| i > 0 && is_separator(c));
        if !is_path {
            return Some(NodeKind::Word { kind, symbol: text });
        }

        let segments: Vec<String> = text.split(is_separator).map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            self.error_at(
                ErrorCode::EMPTY_SYMBOL,
                format!("empty segment in path '{text}'"),
                span,
            );
            return None;
        }
        Some(NodeKind::Path { kind, segments })
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '.'
}

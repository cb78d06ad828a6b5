//! Lexer tests: brackets, word sigils, refinements, literals, comments,
//! error recovery and determinism.

use yarilo_lexer::{Lexer, TokenKind};
use yarilo_types::ast::WordKind;
use yarilo_types::{ErrorCode, SourceFile, Span};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Lex source text and return just the token kinds (excluding final Eof).
fn kinds(source: &str) -> Vec<TokenKind> {
    let sf = SourceFile::new("test.y", source);
    Lexer::new(&sf)
        .lex()
        .tokens
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| t.kind)
        .collect()
}

fn error_codes(source: &str) -> Vec<ErrorCode> {
    let sf = SourceFile::new("test.y", source);
    Lexer::new(&sf)
        .lex()
        .errors
        .errors
        .into_iter()
        .map(|e| e.code)
        .collect()
}

fn word(kind: WordKind, text: &str) -> TokenKind {
    TokenKind::Word {
        kind,
        text: text.into(),
    }
}

fn norm(text: &str) -> TokenKind {
    word(WordKind::Normal, text)
}

// ─────────────────────────────────────────────────────────────────────
// Words
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_word_sigils() {
    assert_eq!(
        kinds("x x: :x 'x"),
        vec![
            norm("x"),
            word(WordKind::Set, "x"),
            word(WordKind::Get, "x"),
            word(WordKind::Quote, "x"),
        ]
    );
}

#[test]
fn test_operator_words() {
    assert_eq!(
        kinds("1 + 2 * 3"),
        vec![
            TokenKind::Number(1.0),
            norm("+"),
            TokenKind::Number(2.0),
            norm("*"),
            TokenKind::Number(3.0),
        ]
    );
}

#[test]
fn test_hyphenated_and_path_words_stay_whole() {
    assert_eq!(
        kinds("native-infix core/add :core/add Impl-Native:"),
        vec![
            norm("native-infix"),
            norm("core/add"),
            word(WordKind::Get, "core/add"),
            word(WordKind::Set, "Impl-Native"),
        ]
    );
}

#[test]
fn test_set_word_operator() {
    assert_eq!(kinds("+:"), vec![word(WordKind::Set, "+")]);
}

#[test]
fn test_refinements() {
    assert_eq!(
        kinds("[n /local x /out]"),
        vec![
            TokenKind::LBracket,
            norm("n"),
            TokenKind::Refinement("local".into()),
            norm("x"),
            TokenKind::Refinement("out".into()),
            TokenKind::RBracket,
        ]
    );
}

#[test]
fn test_lone_slash_is_a_word() {
    assert_eq!(kinds("/ 2"), vec![norm("/"), TokenKind::Number(2.0)]);
}

// ─────────────────────────────────────────────────────────────────────
// Brackets
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_brackets_need_no_whitespace() {
    assert_eq!(
        kinds("[a](b)"),
        vec![
            TokenKind::LBracket,
            norm("a"),
            TokenKind::RBracket,
            TokenKind::LParen,
            norm("b"),
            TokenKind::RParen,
        ]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Literals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_numbers() {
    assert_eq!(
        kinds("0 42 3.25 -7 -0.5"),
        vec![
            TokenKind::Number(0.0),
            TokenKind::Number(42.0),
            TokenKind::Number(3.25),
            TokenKind::Number(-7.0),
            TokenKind::Number(-0.5),
        ]
    );
}

#[test]
fn test_minus_followed_by_space_is_a_word() {
    assert_eq!(
        kinds("5 - 3"),
        vec![TokenKind::Number(5.0), norm("-"), TokenKind::Number(3.0)]
    );
}

#[test]
fn test_malformed_number() {
    assert_eq!(error_codes("12abc"), vec![ErrorCode::MALFORMED_NUMBER]);
    assert_eq!(error_codes("1.2.3"), vec![ErrorCode::MALFORMED_NUMBER]);
}

#[test]
fn test_strings_and_escapes() {
    assert_eq!(
        kinds(r#""hello" "a\"b" "tab\there" "line\nbreak""#),
        vec![
            TokenKind::Str("hello".into()),
            TokenKind::Str("a\"b".into()),
            TokenKind::Str("tab\there".into()),
            TokenKind::Str("line\nbreak".into()),
        ]
    );
}

#[test]
fn test_string_may_span_lines() {
    assert_eq!(kinds("\"a\nb\""), vec![TokenKind::Str("a\nb".into())]);
}

#[test]
fn test_string_keeps_unicode() {
    assert_eq!(kinds("\"ярило\""), vec![TokenKind::Str("ярило".into())]);
}

#[test]
fn test_invalid_escape_reports_and_recovers() {
    let sf = SourceFile::new("test.y", r#""a\qb""#);
    let result = Lexer::new(&sf).lex();
    assert_eq!(result.errors.total_errors, 1);
    assert_eq!(result.errors.errors[0].code, ErrorCode::INVALID_ESCAPE);
    assert_eq!(result.tokens[0].kind, TokenKind::Str("aqb".into()));
}

#[test]
fn test_unterminated_string() {
    assert_eq!(error_codes("\"open"), vec![ErrorCode::UNTERMINATED_STRING]);
}

// ─────────────────────────────────────────────────────────────────────
// Comments & whitespace
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_comments_are_skipped() {
    assert_eq!(
        kinds("a ; the rest [ is ignored\nb"),
        vec![norm("a"), norm("b")]
    );
}

#[test]
fn test_empty_and_blank_sources() {
    assert!(kinds("").is_empty());
    assert!(kinds("  \n\t ; only a comment").is_empty());
}

#[test]
fn test_stream_always_ends_with_eof() {
    let sf = SourceFile::new("test.y", "a b");
    let tokens = Lexer::new(&sf).lex().tokens;
    assert_eq!(tokens.last().map(|t| &t.kind), Some(&TokenKind::Eof));
}

// ─────────────────────────────────────────────────────────────────────
// Spans
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_spans_track_lines_and_columns() {
    let sf = SourceFile::new("test.y", "add 1\n  x:");
    let tokens = Lexer::new(&sf).lex().tokens;
    assert_eq!(tokens[0].span, Span::new(1, 1, 1, 3));
    assert_eq!(tokens[1].span, Span::new(1, 5, 1, 5));
    assert_eq!(tokens[2].span, Span::new(2, 3, 2, 4));
}

// ─────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_empty_symbol_after_sigil() {
    assert_eq!(error_codes(": x"), vec![ErrorCode::EMPTY_SYMBOL]);
    assert_eq!(error_codes("' x"), vec![ErrorCode::EMPTY_SYMBOL]);
}

#[test]
fn test_error_carries_source_line() {
    let sf = SourceFile::new("test.y", "ok\nbad \"x");
    let errors = Lexer::new(&sf).lex().errors;
    let err = &errors.errors[0];
    assert_eq!(err.span.start_line, 2);
    assert_eq!(err.source_line, "bad \"x");
    assert_eq!(err.file, "test.y");
}

#[test]
fn test_error_recovery_continues_lexing() {
    let sf = SourceFile::new("test.y", ": a : b");
    let result = Lexer::new(&sf).lex();
    assert_eq!(result.errors.total_errors, 2);
    let words: Vec<_> = result
        .tokens
        .iter()
        .filter(|t| matches!(t.kind, TokenKind::Word { .. }))
        .collect();
    assert_eq!(words.len(), 2);
}

#[test]
fn test_error_cap_stops_lexing() {
    let source = ": ".repeat(50);
    let sf = SourceFile::new("test.y", source.as_str());
    let result = Lexer::new(&sf).lex();
    assert_eq!(result.errors.errors.len(), yarilo_types::MAX_ERRORS);
    assert_eq!(
        result.tokens.last().map(|t| &t.kind),
        Some(&TokenKind::Eof)
    );
}

// ─────────────────────────────────────────────────────────────────────
// Determinism
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_determinism_100_iterations() {
    let source = "fib: proc [n] [either gt n 1 [add fib sub n 1 fib sub n 2] [n]]";
    let first = kinds(source);
    for _ in 0..100 {
        assert_eq!(kinds(source), first);
    }
}

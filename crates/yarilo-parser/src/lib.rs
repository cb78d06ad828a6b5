//! Yarilo parser: converts a token stream into a plain syntax tree.

mod parser;

pub use parser::{ParseResult, Parser, MAX_NESTING};

use yarilo_lexer::Lexer;
use yarilo_types::ast::Node;
use yarilo_types::{SourceFile, SyntaxErrors};

/// Lex and parse `source` in one step.
///
/// Lexer diagnostics come first, followed by parser diagnostics.
pub fn parse(name: &str, source: &str) -> Result<Vec<Node>, SyntaxErrors> {
    let sf = SourceFile::new(name, source);
    let lexed = Lexer::new(&sf).lex();
    let mut errors = lexed.errors;
    let parsed = Parser::new(lexed.tokens, &sf).parse();
    errors.extend(parsed.errors);
    if errors.has_errors() {
        Err(errors)
    } else {
        Ok(parsed.nodes)
    }
}

//! A tree-walking interpreter for the Lapis scripting language: lexer,
//! recursive-descent parser, and evaluator over a lexical environment
//! chain, all threaded through spanned, structured diagnostics.

pub mod ast;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod source_map;
pub mod token;
pub mod value;

use error::LapisResult;
use interpreter::Interpreter;
use parser::Parser;
use source_map::SourceMap;

/// Lex, parse, and run a complete program. Returns the source map used (so
/// a caller can render a returned error with [`diagnostics::Diagnostic::render_compact`])
/// alongside the run's outcome.
pub fn run_source(path: &str, content: &str) -> (SourceMap, LapisResult<()>) {
    let mut source_map = SourceMap::new();

    let tokens = match lexer::Lexer::new(&mut source_map, path, content).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => return (source_map, Err(e)),
    };
    let program = match Parser::new_default(tokens).parse() {
        Ok(program) => program,
        Err(errors) => {
            let first = errors.into_iter().next().expect("a failed parse always reports at least one error");
            return (source_map, Err(first));
        }
    };

    let mut interp = Interpreter::new(source_map);
    let result = interp.run(&program);
    (interp.source_map, result)
}

/// Evaluate a snippet and render its outcome: the display form of its
/// trailing expression statement's value on success, or a compact
/// diagnostic on failure. Used by integration tests.
pub fn eval_to_string(content: &str) -> String {
    let mut source_map = SourceMap::new();

    let tokens = match lexer::Lexer::new(&mut source_map, "<eval>", content).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => return e.diagnostic.render_compact(&source_map),
    };
    let program = match Parser::new_default(tokens).parse() {
        Ok(program) => program,
        Err(errors) => {
            let first = errors.into_iter().next().expect("a failed parse always reports at least one error");
            return first.diagnostic.render_compact(&source_map);
        }
    };

    let mut interp = Interpreter::new(source_map);
    match interp.run_and_eval_last(&program) {
        Ok(value) => value::to_display_string(&value),
        Err(e) => e.diagnostic.render_compact(&interp.source_map),
    }
}

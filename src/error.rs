//! The internal error type threaded through lexing, parsing and evaluation.
//!
//! `LapisError` wraps a [`Diagnostic`] plus a [`Kind`] discriminant so
//! callers can branch on error family without string-matching the error
//! code: the top-level `try` handler, for instance, only ever catches
//! `Kind::Runtime | Kind::Access | Kind::Import`, never `Kind::Lex` or
//! `Kind::Parse` (those occur before evaluation starts).

use crate::diagnostics::{Diagnostic, Label, Severity};
use crate::source_map::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Lex,
    Parse,
    Runtime,
    Access,
    Import,
    Internal,
}

#[derive(Debug, Clone)]
pub struct LapisError {
    pub kind: Kind,
    pub diagnostic: Diagnostic,
}

impl LapisError {
    pub fn new(kind: Kind, diagnostic: Diagnostic) -> Self {
        Self { kind, diagnostic }
    }

    pub fn is_catchable(&self) -> bool {
        matches!(self.kind, Kind::Runtime | Kind::Access | Kind::Import)
    }
}

impl std::fmt::Display for LapisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.diagnostic.severity, self.diagnostic.code, self.diagnostic.message)
    }
}

impl std::error::Error for LapisError {}

pub type LapisResult<T> = Result<T, LapisError>;

// --- Lexical errors (LAP1xxx) -------------------------------------------

pub fn unexpected_character(span: Span, ch: char) -> LapisError {
    let diagnostic = Diagnostic::error("LAP1001", format!("unexpected character '{ch}'"))
        .with_label(Label::primary(span, format!("unexpected character '{ch}'")))
        .with_help("check for typos or unsupported characters");
    LapisError::new(Kind::Lex, diagnostic)
}

pub fn unterminated_string(span: Span) -> LapisError {
    let diagnostic = Diagnostic::error("LAP1002", "unterminated string literal")
        .with_label(Label::primary(span, "string starts here"))
        .with_help("add a closing quote to terminate the string");
    LapisError::new(Kind::Lex, diagnostic)
}

pub fn unterminated_template(span: Span) -> LapisError {
    let diagnostic = Diagnostic::error("LAP1002", "unterminated template literal")
        .with_label(Label::primary(span, "template literal starts here"))
        .with_help("add a closing backtick to terminate the template literal");
    LapisError::new(Kind::Lex, diagnostic)
}

pub fn unterminated_comment(span: Span) -> LapisError {
    let diagnostic = Diagnostic::error("LAP1002", "unterminated block comment")
        .with_label(Label::primary(span, "comment starts here"))
        .with_help("add a closing */ for every /*");
    LapisError::new(Kind::Lex, diagnostic)
}

// --- Parser errors (LAP2xxx) ---------------------------------------------

pub fn expected_token(span: Span, expected: &str, found: &str) -> LapisError {
    let diagnostic = Diagnostic::error("LAP2002", format!("expected '{expected}', found '{found}'"))
        .with_label(Label::primary(span, format!("expected '{expected}' here")))
        .with_help(format!("add '{expected}' before this token"));
    LapisError::new(Kind::Parse, diagnostic)
}

pub fn unexpected_token(span: Span, found: &str) -> LapisError {
    let diagnostic = Diagnostic::error("LAP2001", format!("unexpected token '{found}'"))
        .with_label(Label::primary(span, "unexpected token"));
    LapisError::new(Kind::Parse, diagnostic)
}

pub fn expected_expression(span: Span) -> LapisError {
    let diagnostic = Diagnostic::error("LAP2003", "expected expression")
        .with_label(Label::primary(span, "expected expression here"))
        .with_help("add a valid expression (variable, literal, or function call)");
    LapisError::new(Kind::Parse, diagnostic)
}

pub fn invalid_assignment_target(span: Span) -> LapisError {
    let diagnostic = Diagnostic::error("LAP2005", "invalid assignment target")
        .with_label(Label::primary(span, "cannot assign to this expression"))
        .with_help("only variables, properties, and array elements can be assigned to");
    LapisError::new(Kind::Parse, diagnostic)
}

pub fn variadic_not_last(span: Span) -> LapisError {
    let diagnostic = Diagnostic::error("LAP2001", "variadic parameter must be the last parameter")
        .with_label(Label::primary(span, "variadic parameter declared here"))
        .with_help("move this parameter to the end of the parameter list");
    LapisError::new(Kind::Parse, diagnostic)
}

// --- Type / runtime errors (LAP3xxx) -------------------------------------

pub fn type_mismatch_binary(
    expr_span: Span,
    left_span: Span,
    right_span: Span,
    operator: &str,
    left_type: &str,
    right_type: &str,
) -> LapisError {
    let message = format!("cannot use operator '{operator}' with {left_type} and {right_type}");
    let help = if operator == "+" {
        match (left_type, right_type) {
            ("number", "string") => "convert the number to a string first, or use string concatenation".to_string(),
            ("string", "number") => "convert the string to a number first, or use string concatenation".to_string(),
            _ => "the + operator is only defined for numbers and strings".to_string(),
        }
    } else if matches!(operator, "==" | "!=") {
        "equality operators work with any types".to_string()
    } else {
        format!("operator '{operator}' requires numeric operands")
    };

    let diagnostic = Diagnostic::error("LAP3001", message.clone())
        .with_label(Label::primary(expr_span, message))
        .with_label(Label::secondary(left_span, format!("left operand has type {left_type}")))
        .with_label(Label::secondary(right_span, format!("right operand has type {right_type}")))
        .with_help(help);
    LapisError::new(Kind::Runtime, diagnostic)
}

pub fn cannot_call(span: Span, type_name: &str) -> LapisError {
    let diagnostic = Diagnostic::error("LAP3003", format!("value of type {type_name} is not callable"))
        .with_label(Label::primary(span, "attempted call here"));
    LapisError::new(Kind::Runtime, diagnostic)
}

pub fn wrong_arity(span: Span, expected: String, got: usize) -> LapisError {
    let diagnostic = Diagnostic::error("LAP3004", format!("expected {expected} argument(s), got {got}"))
        .with_label(Label::primary(span, "call site"));
    LapisError::new(Kind::Runtime, diagnostic)
}

pub fn no_property(span: Span, type_name: &str, name: &str) -> LapisError {
    let diagnostic = Diagnostic::error("LAP3005", format!("{type_name} has no property or method '{name}'"))
        .with_label(Label::primary(span, format!("'{name}' not found")));
    LapisError::new(Kind::Runtime, diagnostic)
}

pub fn index_out_of_bounds(span: Span, index: i64, len: usize) -> LapisError {
    let diagnostic = Diagnostic::error("LAP3007", format!("index {index} out of bounds for length {len}"))
        .with_label(Label::primary(span, "index used here"));
    LapisError::new(Kind::Runtime, diagnostic)
}

pub fn division_by_zero(span: Span) -> LapisError {
    let diagnostic = Diagnostic::error("LAP3008", "division by zero")
        .with_label(Label::primary(span, "division by zero"))
        .with_help("ensure the denominator is not zero before dividing");
    LapisError::new(Kind::Runtime, diagnostic)
}

// --- Runtime / access / import errors (LAP4xxx) --------------------------

pub fn undefined_variable(span: Span, name: &str) -> LapisError {
    let diagnostic = Diagnostic::error("LAP4001", format!("undefined variable '{name}'"))
        .with_label(Label::primary(span, format!("'{name}' not found")))
        .with_help(format!("declare the variable with 'var {name} = value;' before using it"));
    LapisError::new(Kind::Runtime, diagnostic)
}

pub fn access_violation(span: Span, name: &str) -> LapisError {
    let diagnostic = Diagnostic::error("LAP4002", format!("cannot access private binding '{name}' from another file"))
        .with_label(Label::primary(span, "private binding accessed here"));
    LapisError::new(Kind::Access, diagnostic)
}

pub fn import_error(span: Span, message: impl Into<String>) -> LapisError {
    let message = message.into();
    let diagnostic = Diagnostic::error("LAP4003", message.clone()).with_label(Label::primary(span, message));
    LapisError::new(Kind::Import, diagnostic)
}

/// A plain runtime error with a message and no further structure, used for
/// conditions grouped under the generic runtime-error family (builtin
/// argument validation, `Console.error`, `String.format` failures, for-in
/// over a non-array). Distinct from `undefined_variable`'s LAP4001.
pub fn runtime(span: Span, message: impl Into<String>) -> LapisError {
    let message = message.into();
    let diagnostic = Diagnostic::error("LAP4004", message.clone()).with_label(Label::primary(span, message));
    LapisError::new(Kind::Runtime, diagnostic)
}

pub fn control_flow_misuse(span: Span, what: &str) -> LapisError {
    let diagnostic = Diagnostic::error("LAP4005", format!("'{what}' used outside of its valid context"))
        .with_label(Label::primary(span, format!("stray '{what}'")));
    LapisError::new(Kind::Runtime, diagnostic)
}

pub fn internal(message: impl Into<String>) -> LapisError {
    let diagnostic = Diagnostic::new("LAP9001", Severity::Error, message);
    LapisError::new(Kind::Internal, diagnostic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_map::Span;

    fn dummy_span() -> Span {
        Span::new(0, 0, 0)
    }

    #[test]
    fn generic_runtime_errors_do_not_collide_with_undefined_variable() {
        let undefined = undefined_variable(dummy_span(), "x");
        let generic = runtime(dummy_span(), "boom");
        let misuse = control_flow_misuse(dummy_span(), "break");
        assert_ne!(undefined.diagnostic.code, generic.diagnostic.code);
        assert_ne!(undefined.diagnostic.code, misuse.diagnostic.code);
    }
}

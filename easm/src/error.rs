use crate::parser::Rule;
use pest::error::{Error as PestError, ErrorVariant, InputLocation};
use pest::Span;
use std::fmt;

/// Assembly-time errors, one variant per stage.
///
/// Every variant wraps a pest error so each message carries its source
/// line and column.
#[derive(Debug)]
pub enum Error {
    /// An illegal character the tokenizer cannot place.
    Lexer(PestError<Rule>),
    /// A legal token in an unexpected position.
    Parser(PestError<Rule>),
    /// Duplicate or undefined label.
    Symbol(PestError<Rule>),
    /// Form mismatch, bad register or out-of-range immediate.
    Encoding(PestError<Rule>),
}

impl Error {
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Lexer(_) => "lexer error",
            Error::Parser(_) => "parser error",
            Error::Symbol(_) => "symbol error",
            Error::Encoding(_) => "encoding error",
        }
    }

    fn inner(&self) -> &PestError<Rule> {
        match self {
            Error::Lexer(err) | Error::Parser(err) | Error::Symbol(err) | Error::Encoding(err) => {
                err
            }
        }
    }

    /// Attaches a file name to the underlying span rendering.
    pub fn with_path(self, path: &str) -> Error {
        match self {
            Error::Lexer(err) => Error::Lexer(err.with_path(path)),
            Error::Parser(err) => Error::Parser(err.with_path(path)),
            Error::Symbol(err) => Error::Symbol(err.with_path(path)),
            Error::Encoding(err) => Error::Encoding(err.with_path(path)),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}:", self.kind())?;
        write!(f, "{}", self.inner())
    }
}

impl std::error::Error for Error {}

pub(crate) fn custom(span: Span, message: String) -> PestError<Rule> {
    PestError::new_from_span(ErrorVariant::CustomError { message }, span)
}

pub(crate) fn parser_error(span: Span, message: String) -> Error {
    Error::Parser(custom(span, message))
}

pub(crate) fn symbol_error(span: Span, message: String) -> Error {
    Error::Symbol(custom(span, message))
}

pub(crate) fn encoding_error(span: Span, message: String) -> Error {
    Error::Encoding(custom(span, message))
}

/// Splits raw pest parse failures into lexer and parser errors: a failure
/// at a character no token may start with is the tokenizer's complaint,
/// anything else is a malformed statement.
pub(crate) fn classify_parse_error(err: PestError<Rule>, input: &str) -> Error {
    let position = match err.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    };

    match input[position..].chars().next() {
        Some(c) if !is_legal_start(c) => Error::Lexer(err),
        _ => Error::Parser(err),
    }
}

fn is_legal_start(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c.is_ascii_whitespace()
        || matches!(c, '_' | '#' | ',' | ':' | '[' | ']' | '"' | '-' | '.')
}

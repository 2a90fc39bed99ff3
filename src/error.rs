//! Error types shared by the formula parser, the rule parser and the engines.

use thiserror::Error;

/// Malformed formula or rule-program text.
///
/// Parsing is a pure function of its input, so a `ParseError` never leaves any
/// engine in a modified state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty formula")]
    Empty,

    #[error("unexpected character {found:?} at offset {position}")]
    UnexpectedChar { position: usize, found: char },

    #[error("unexpected {found} at offset {position}")]
    UnexpectedToken { position: usize, found: String },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("operator '{operator}' at offset {position} is missing an operand")]
    MissingOperand { position: usize, operator: char },

    #[error("unclosed '(' at offset {position}")]
    UnclosedParen { position: usize },

    #[error("unmatched ')' at offset {position}")]
    UnmatchedParen { position: usize },

    #[error("formula nested too deeply at offset {position}")]
    TooDeep { position: usize },

    #[error("line {line}: {reason}")]
    InvalidRule { line: usize, reason: String },

    #[error("rule program contains no rules")]
    EmptyProgram,
}

/// Errors returned by engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{component} used after dispose")]
    Disposed { component: &'static str },

    #[error("invalid solver parameter {key}={value}")]
    InvalidParam { key: String, value: String },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

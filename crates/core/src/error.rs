use crate::usage::TokenType;
use thiserror::Error;

/// Raised before a directive is ready to run: a bad invocation or a bad
/// configuration detected during `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveParseError {
    #[error("{message}")]
    Config { directive: String, message: String },
    #[error("invalid '{directive}' invocation at line {line}, column {column}: {message}")]
    Syntax { directive: String, line: usize, column: usize, message: String },
    #[error("expected directive '{expected}', found '{found}'")]
    NameMismatch { expected: String, found: String },
    #[error("'{directive}' is missing required argument '{parameter}'")]
    MissingArgument { directive: String, parameter: String },
    #[error("'{directive}' takes at most {max} argument(s), got {found}")]
    TooManyArguments { directive: String, max: usize, found: usize },
    #[error("'{directive}' argument '{parameter}' must be a {expected}, found a {found}")]
    WrongTokenType { directive: String, parameter: String, expected: TokenType, found: TokenType },
}

impl DirectiveParseError {
    pub fn config(directive: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config { directive: directive.into(), message: message.into() }
    }

    /// Name of the directive the error belongs to.
    pub fn directive(&self) -> &str {
        match self {
            Self::Config { directive, .. }
            | Self::Syntax { directive, .. }
            | Self::MissingArgument { directive, .. }
            | Self::TooManyArguments { directive, .. }
            | Self::WrongTokenType { directive, .. } => directive,
            Self::NameMismatch { expected, .. } => expected,
        }
    }
}

/// Fatal failure while processing a batch. Rows handled before the failure
/// keep whatever the directive already wrote to them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error encountered while executing '{directive}' : {message}")]
pub struct DirectiveExecutionError {
    pub directive: String,
    pub message: String,
}

impl DirectiveExecutionError {
    pub fn new(directive: impl Into<String>, message: impl Into<String>) -> Self {
        Self { directive: directive.into(), message: message.into() }
    }
}

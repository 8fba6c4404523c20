use std::error::Error;

use thiserror::Error;

use promfix_parser::parser::ParseError;

use crate::promqltest::LoadError;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, PartialEq, Clone, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    ParseError(#[from] ParseError),
    #[error(transparent)]
    LoadError(#[from] LoadError),
    #[error("{0}")]
    ArgumentError(String),
    #[error("{0}")]
    TypeCastError(String),
    #[error("invalid regular expression: {0}")]
    InvalidRegex(String),
    #[error("query timed out in {0}")]
    Timeout(String),
    #[error("query processing would load too many samples into memory in {0}")]
    TooManySamples(String),
    #[error("vector cannot contain metrics with the same labelset")]
    DuplicateLabelSet,
    #[error("{0}")]
    Disabled(String),
    #[error("{0}")]
    General(String),
}

impl From<&str> for RuntimeError {
    fn from(message: &str) -> Self {
        RuntimeError::General(String::from(message))
    }
}

impl From<String> for RuntimeError {
    fn from(message: String) -> Self {
        RuntimeError::General(message)
    }
}

impl<E: Error + 'static> From<(&str, E)> for RuntimeError {
    fn from((message, err): (&str, E)) -> Self {
        RuntimeError::General(format!("{message}: {err}"))
    }
}

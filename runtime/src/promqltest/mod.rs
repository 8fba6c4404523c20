//! Loader for Prometheus `load` scripts: the data-definition part of the
//! promqltest format used by rule unit tests.
//!
//! ```text
//! load 1m
//!   http_requests_total{job="api"} 0+10x5 _ stale
//!   up{job="api"} 1x5
//! ```
pub use lazy_loader::*;
pub use parser::LoadCmd;

use thiserror::Error;

mod lazy_loader;
mod parser;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("no \"load\" command found")]
    NoLoadCommand,
    #[error("invalid command at line {line}: {command}")]
    InvalidCommand { line: usize, command: String },
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl LoadError {
    pub(crate) fn parse<S: Into<String>>(line: usize, message: S) -> Self {
        LoadError::Parse {
            line,
            message: message.into(),
        }
    }
}

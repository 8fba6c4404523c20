use std::io;
use std::path::PathBuf;

use thiserror::Error;

use promfix_common::duration::DurationError;
use promfix_runtime::promqltest::LoadError;
use promfix_runtime::RuntimeError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that keep the server from starting.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("cannot read fixture file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot decode fixture file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid interval {value:?}: {source}")]
    Interval {
        value: String,
        #[source]
        source: DurationError,
    },
    #[error("fixture file defines no input series")]
    NoInputSeries,
    #[error("cannot load fixture series: {0}")]
    Load(#[from] LoadError),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error("{0}")]
    BadData(String),
    #[error("error while executing query: {0}")]
    Query(#[from] RuntimeError),
    #[error("rule result is not a vector or scalar")]
    UnexpectedResult,
    #[error("query task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

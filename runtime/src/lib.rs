#![forbid(unsafe_code)]
extern crate chrono;
extern crate regex;

mod runtime_error;

pub mod execution;
mod functions;
pub mod promqltest;
pub mod provider;
pub mod types;

pub use execution::*;
pub use provider::*;
pub use runtime_error::*;
pub use types::*;

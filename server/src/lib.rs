#![forbid(unsafe_code)]
//! Serves the input series of a Prometheus rule unit-test file through the
//! Prometheus HTTP query API.
pub mod config;
pub mod engine;
pub mod error;
pub mod fixture;
pub mod http;
pub mod index;
pub mod metadata;

pub use config::Config;
pub use engine::FixtureEngine;
pub use error::*;

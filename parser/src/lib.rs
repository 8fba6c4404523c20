#![forbid(unsafe_code)]
extern crate logos;
extern crate phf;
extern crate regex;
extern crate serde;
extern crate strum;
extern crate strum_macros;
extern crate thiserror;

pub mod ast;
pub mod binaryop;
pub mod common;
pub mod functions;
pub mod label;
pub mod parser;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::binaryop::*;
    pub use crate::common::*;
    pub use crate::functions::*;
    pub use crate::label::*;
    pub use crate::parser::*;
}

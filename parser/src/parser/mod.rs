pub use parse_error::*;
pub use parser::*;

mod aggregation;
mod check_ast;
mod expr;
mod function;
pub(crate) mod lexer;
pub mod number;
mod parse_error;
#[allow(clippy::module_inception)]
mod parser;
mod selector;
pub mod tokens;

#[cfg(test)]
mod parser_test;

pub use lexer::TokenWithLocation;

pub use context::*;
pub use exec::*;

pub(crate) mod binary;
mod context;
pub(crate) mod eval;
mod exec;

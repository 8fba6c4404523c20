pub(crate) mod aggregate;
pub(crate) mod rollup;
pub(crate) mod transform;
mod utils;

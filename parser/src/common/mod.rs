mod operator;
mod value;

pub use operator::*;
pub use value::*;

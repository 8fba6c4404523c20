mod signature;

pub use signature::*;

#![forbid(unsafe_code)]
extern crate ahash;
extern crate regex;
extern crate xxhash_rust;

pub mod duration;
pub mod format;
pub mod hash;
pub mod label;
pub mod regex_util;
pub mod time;
pub mod value;

pub mod prelude {
    pub use crate::duration::*;
    pub use crate::format::*;
    pub use crate::hash::*;
    pub use crate::label::*;
    pub use crate::regex_util::*;
    pub use crate::time::*;
    pub use crate::value::*;
}

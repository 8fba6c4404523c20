pub use deadline::*;
pub use memory_provider::MemoryMetricProvider;
pub use search::*;

mod deadline;
mod memory_provider;
mod search;

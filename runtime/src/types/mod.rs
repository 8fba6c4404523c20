pub use metric_name::*;
pub use query_value::*;
pub use timeseries::*;

mod metric_name;
mod query_value;
mod timeseries;

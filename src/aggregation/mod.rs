pub mod aggregator;
pub mod statistics;
pub mod window;

pub use aggregator::{Aggregator, PreparedAggregate};
pub use statistics::{CityStatistics, PriceCategory};

pub mod notifier;
pub mod series_store;

pub use notifier::Notifier;
pub use series_store::{AppendOutcome, SeriesRange, SeriesStore};

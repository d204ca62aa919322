pub mod janitor;
pub mod pipeline;

pub use janitor::Janitor;
pub use pipeline::{HotelListing, PriceFeedCore};

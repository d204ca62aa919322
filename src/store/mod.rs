pub mod memory;

pub use memory::InMemorySeriesStore;

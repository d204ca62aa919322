pub mod observation;
pub mod snapshot;
pub mod stream;

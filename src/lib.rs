pub mod aggregation;
pub mod alerts;
pub mod api;
pub mod catalog;
pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod feeds;
pub mod ingestion;
pub mod interfaces;
pub mod observability;
pub mod store;
pub mod subscription;
pub mod types;
pub mod utils;

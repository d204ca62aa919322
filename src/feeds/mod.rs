use async_trait::async_trait;
use std::sync::Arc;
use crate::catalog::HotelCatalog;
use crate::config::sources::{ConnectionType, PriceSourceConfig};
use crate::error::Result;
use crate::events::observation::RawObservation;
use crate::types::ids::SourceId;
use crate::utils::clock::Clock;

pub mod runner;
pub mod simulator;
pub mod websocket;

pub use runner::FeedRunner;
pub use simulator::SimulatedConnector;
pub use websocket::WebSocketConnector;

/// Upstream source of raw price observations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceConnector: Send + Sync {
    async fn connect(&mut self) -> Result<()>;
    async fn next_observation(&mut self) -> Result<RawObservation>;
    fn is_healthy(&self) -> bool;
    fn source_id(&self) -> &SourceId;
}

pub fn build_connector(
    config: &PriceSourceConfig,
    catalog: &HotelCatalog,
    clock: Arc<dyn Clock>,
) -> Box<dyn PriceConnector> {
    match &config.connection_type {
        ConnectionType::WebSocket { url } => {
            Box::new(WebSocketConnector::new(config.source_id.clone(), url.clone()))
        }
        ConnectionType::Simulated { interval_ms, volatility, seed } => Box::new(SimulatedConnector::new(
            config.source_id.clone(),
            catalog,
            std::time::Duration::from_millis(*interval_ms),
            *volatility,
            *seed,
            clock,
        )),
    }
}

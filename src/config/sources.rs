use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::types::ids::SourceId;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PriceSourceConfig {
    pub source_id: SourceId,
    pub connection_type: ConnectionType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,
}

impl PriceSourceConfig {
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ConnectionType {
    WebSocket { url: String },
    Simulated {
        interval_ms: u64,
        /// Maximum relative move per tick, e.g. 0.03 for 3%.
        volatility: f64,
        #[serde(default)]
        seed: Option<u64>,
    },
}

fn default_enabled() -> bool {
    true
}

fn default_max_reconnect_attempts() -> u32 {
    10
}

fn default_reconnect_backoff_ms() -> u64 {
    500
}

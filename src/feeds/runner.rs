use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use crate::error::{Error, Result};
use crate::feeds::PriceConnector;
use crate::ingestion::IngestionGate;

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Pumps one connector into the ingestion gate, reconnecting with
/// exponential backoff.
pub struct FeedRunner {
    connector: Box<dyn PriceConnector>,
    gate: Arc<IngestionGate>,
    max_reconnect_attempts: u32,
    backoff: Duration,
}

impl FeedRunner {
    pub fn new(
        connector: Box<dyn PriceConnector>,
        gate: Arc<IngestionGate>,
        max_reconnect_attempts: u32,
        backoff: Duration,
    ) -> Self {
        FeedRunner {
            connector,
            gate,
            max_reconnect_attempts,
            backoff,
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }

    /// Runs until the connector fails more than `max_reconnect_attempts`
    /// times in a row.
    pub async fn run(mut self) -> Result<()> {
        let source_id = self.connector.source_id().clone();
        let mut failures = 0u32;

        loop {
            if !self.connector.is_healthy() {
                if let Err(e) = self.connector.connect().await {
                    failures += 1;
                    if failures > self.max_reconnect_attempts {
                        warn!(source_id = %source_id, "Giving up after {} failed attempts: {}", failures, e);
                        return Err(Error::MaxReconnectAttemptsExceeded);
                    }
                    let delay = self.delay(failures);
                    warn!(source_id = %source_id, attempt = failures, ?delay, "Connect failed: {}", e);
                    tokio::time::sleep(delay).await;
                    continue;
                }
                info!(source_id = %source_id, "Feed connected");
            }

            let raw = match self.connector.next_observation().await {
                Ok(raw) => raw,
                Err(Error::DeserializationError(e)) => {
                    warn!(source_id = %source_id, "Skipping malformed frame: {}", e);
                    continue;
                }
                Err(e) => {
                    failures += 1;
                    if failures > self.max_reconnect_attempts {
                        warn!(source_id = %source_id, "Giving up after {} failed reads: {}", failures, e);
                        return Err(Error::MaxReconnectAttemptsExceeded);
                    }
                    let delay = self.delay(failures);
                    warn!(source_id = %source_id, attempt = failures, ?delay, "Feed read failed: {}", e);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };
            failures = 0;

            // Rejections are reported by the gate; the feed keeps going.
            let _ = self.gate.submit(raw).await;
        }
    }
}

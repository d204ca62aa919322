use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use crate::aggregation::Aggregator;
use crate::ingestion::IngestionGate;
use crate::subscription::SubscriptionHub;
use crate::utils::clock::Clock;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub purged_observations: usize,
    pub expired_subscriptions: usize,
    pub refreshed_windows: usize,
    pub pruned_backlogs: usize,
}

/// Periodic housekeeping over the store, subscriptions, rolling windows and
/// replay backlogs.
pub struct Janitor {
    gate: Arc<IngestionGate>,
    hub: Arc<SubscriptionHub>,
    aggregator: Arc<Aggregator>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl Janitor {
    pub fn new(
        gate: Arc<IngestionGate>,
        hub: Arc<SubscriptionHub>,
        aggregator: Arc<Aggregator>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Janitor {
            gate,
            hub,
            aggregator,
            clock,
            interval,
        }
    }

    pub fn run_once(&self) -> MaintenanceReport {
        let now = self.clock.now_timestamp();
        let report = MaintenanceReport {
            purged_observations: self.gate.purge_expired(),
            expired_subscriptions: self.hub.expire_disconnected(now),
            refreshed_windows: self.aggregator.refresh_windows(now),
            pruned_backlogs: self.hub.prune_backlogs(now),
        };
        if report != MaintenanceReport::default() {
            debug!(?report, "Maintenance pass");
        }
        report
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.run_once();
        }
    }
}

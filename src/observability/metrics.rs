use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Ingestion metrics
    pub static ref OBSERVATIONS_SUBMITTED: IntCounter = IntCounter::new(
        "observations_submitted_total",
        "Total number of observations submitted to the ingestion gate"
    ).unwrap();

    pub static ref OBSERVATIONS_ACCEPTED: IntCounter = IntCounter::new(
        "observations_accepted_total",
        "Total number of new observations accepted"
    ).unwrap();

    pub static ref OBSERVATIONS_CORRECTED: IntCounter = IntCounter::new(
        "observations_corrected_total",
        "Total number of observations that replaced an earlier version"
    ).unwrap();

    pub static ref OBSERVATIONS_DUPLICATE: IntCounter = IntCounter::new(
        "observations_duplicate_total",
        "Total number of idempotent resubmissions"
    ).unwrap();

    pub static ref OBSERVATIONS_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("observations_rejected_total", "Total number of observations rejected"),
        &["reason"]
    ).unwrap();

    pub static ref OBSERVATIONS_OUT_OF_RETENTION: IntCounter = IntCounter::new(
        "observations_out_of_retention_total",
        "Total number of observations dropped as older than retention"
    ).unwrap();

    pub static ref OBSERVATIONS_PURGED: IntCounter = IntCounter::new(
        "observations_purged_total",
        "Total number of expired observations removed from the store"
    ).unwrap();

    // Subscription metrics
    pub static ref ACTIVE_SUBSCRIBERS: IntGauge = IntGauge::new(
        "active_subscribers",
        "Number of subscriptions currently held by the hub"
    ).unwrap();

    pub static ref RESYNC_SIGNALS: IntCounter = IntCounter::new(
        "resync_signals_total",
        "Total number of subscribers told to resynchronise after overflowing"
    ).unwrap();

    pub static ref SUBSCRIPTIONS_EXPIRED: IntCounter = IntCounter::new(
        "subscriptions_expired_total",
        "Total number of disconnected subscriptions dropped after the grace period"
    ).unwrap();

    // Alert metrics
    pub static ref ALERT_NOTIFICATIONS: IntCounter = IntCounter::new(
        "alert_notifications_total",
        "Total number of price alert notifications sent"
    ).unwrap();

    // Latency metrics
    pub static ref INGESTION_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ingestion_latency_seconds",
            "Time from submit to fan-out of an accepted observation"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1])
    ).unwrap();
}

/// Registers every collector once; later calls are no-ops.
pub fn register_metrics() {
    static REGISTER: std::sync::Once = std::sync::Once::new();
    REGISTER.call_once(|| {
        REGISTRY.register(Box::new(OBSERVATIONS_SUBMITTED.clone())).unwrap();
        REGISTRY.register(Box::new(OBSERVATIONS_ACCEPTED.clone())).unwrap();
        REGISTRY.register(Box::new(OBSERVATIONS_CORRECTED.clone())).unwrap();
        REGISTRY.register(Box::new(OBSERVATIONS_DUPLICATE.clone())).unwrap();
        REGISTRY.register(Box::new(OBSERVATIONS_REJECTED.clone())).unwrap();
        REGISTRY.register(Box::new(OBSERVATIONS_OUT_OF_RETENTION.clone())).unwrap();
        REGISTRY.register(Box::new(OBSERVATIONS_PURGED.clone())).unwrap();
        REGISTRY.register(Box::new(ACTIVE_SUBSCRIBERS.clone())).unwrap();
        REGISTRY.register(Box::new(RESYNC_SIGNALS.clone())).unwrap();
        REGISTRY.register(Box::new(SUBSCRIPTIONS_EXPIRED.clone())).unwrap();
        REGISTRY.register(Box::new(ALERT_NOTIFICATIONS.clone())).unwrap();
        REGISTRY.register(Box::new(INGESTION_LATENCY.clone())).unwrap();
    });
}

/// Text exposition of the registry for `GET /metrics`.
pub fn encode_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_idempotent_and_encodes() {
        register_metrics();
        register_metrics();
        OBSERVATIONS_SUBMITTED.inc();
        assert!(encode_metrics().contains("observations_submitted_total"));
    }
}

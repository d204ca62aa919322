use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn, Instrument};
use crate::aggregation::Aggregator;
use crate::error::{Error, Result, ValidationFailure};
use crate::events::observation::{ObservationKey, PriceObservation, RawObservation};
use crate::events::stream::PriceUpdate;
use crate::ingestion::validator::ObservationValidator;
use crate::ingestion::SubmitOutcome;
use crate::interfaces::series_store::{AppendOutcome, SeriesStore};
use crate::observability::metrics::{
    INGESTION_LATENCY, OBSERVATIONS_ACCEPTED, OBSERVATIONS_CORRECTED, OBSERVATIONS_DUPLICATE,
    OBSERVATIONS_OUT_OF_RETENTION, OBSERVATIONS_PURGED, OBSERVATIONS_REJECTED, OBSERVATIONS_SUBMITTED,
};
use crate::observability::tracing::trace_ingestion;
use crate::subscription::SubscriptionHub;
use crate::types::ids::HotelId;
use crate::utils::clock::Clock;

/// Serialisation state of one hotel. Holding the lock is what makes
/// append, aggregate and publish one ordered unit.
#[derive(Debug, Default)]
struct HotelLane {
    /// `None` until the lane has been seeded from the store.
    next_sequence: Option<u64>,
}

/// Single entry point for upstream observations.
pub struct IngestionGate {
    validator: ObservationValidator,
    store: Arc<dyn SeriesStore>,
    aggregator: Arc<Aggregator>,
    hub: Arc<SubscriptionHub>,
    clock: Arc<dyn Clock>,
    lanes: DashMap<HotelId, Arc<Mutex<HotelLane>>>,
}

impl IngestionGate {
    pub fn new(
        validator: ObservationValidator,
        store: Arc<dyn SeriesStore>,
        aggregator: Arc<Aggregator>,
        hub: Arc<SubscriptionHub>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        IngestionGate {
            validator,
            store,
            aggregator,
            hub,
            clock,
            lanes: DashMap::new(),
        }
    }

    fn lane(&self, hotel_id: &HotelId) -> Arc<Mutex<HotelLane>> {
        self.lanes
            .entry(hotel_id.clone())
            .or_default()
            .clone()
    }

    /// Validates, stores, aggregates and fans out one observation.
    ///
    /// Observations for the same hotel are applied strictly one at a time in
    /// arrival order; different hotels never wait on each other.
    pub async fn submit(&self, raw: RawObservation) -> Result<SubmitOutcome> {
        OBSERVATIONS_SUBMITTED.inc();
        let timer = INGESTION_LATENCY.start_timer();
        let span = trace_ingestion(&raw.hotel_id, &raw.source_id);
        let hotel_id = raw.hotel_id.clone();

        let result = self.apply(raw).instrument(span).await;

        match &result {
            Ok(SubmitOutcome::Accepted { sequence, .. }) => {
                OBSERVATIONS_ACCEPTED.inc();
                debug!(hotel_id = %hotel_id, sequence, "Observation accepted");
            }
            Ok(SubmitOutcome::Corrected { sequence, .. }) => {
                OBSERVATIONS_CORRECTED.inc();
                info!(hotel_id = %hotel_id, sequence, "Observation corrected");
            }
            Ok(SubmitOutcome::Duplicate) => {
                OBSERVATIONS_DUPLICATE.inc();
                debug!(hotel_id = %hotel_id, "Duplicate observation ignored");
            }
            Err(Error::Validation(failure)) => {
                OBSERVATIONS_REJECTED.with_label_values(&[rejection_reason(failure)]).inc();
                warn!(hotel_id = %hotel_id, "Observation rejected: {}", failure);
            }
            Err(Error::OutOfRetention { timestamp, horizon }) => {
                OBSERVATIONS_OUT_OF_RETENTION.inc();
                info!(hotel_id = %hotel_id, %timestamp, %horizon, "Observation older than retention dropped");
            }
            Err(e) => {
                OBSERVATIONS_REJECTED.with_label_values(&["ingestion"]).inc();
                error!(hotel_id = %hotel_id, "Ingestion failed: {}", e);
            }
        }

        timer.observe_duration();
        result
    }

    async fn apply(&self, raw: RawObservation) -> Result<SubmitOutcome> {
        let now = self.clock.now_timestamp();

        // Step 1: Validate
        let price = self.validator.validate(&raw, now)?;
        let horizon = self.store.retention_horizon(now);
        if raw.timestamp < horizon {
            return Err(Error::OutOfRetention {
                timestamp: raw.timestamp,
                horizon,
            });
        }

        // Step 2: Enter the hotel's lane
        let hotel_id = raw.hotel_id.clone();
        let lane = self.lane(&hotel_id);
        let mut lane = lane.lock().await;
        let sequence = match lane.next_sequence {
            Some(next) => next,
            None => {
                let last = self.store.last_sequence(&hotel_id);
                if last > 0 && !self.aggregator.is_tracking(&hotel_id) {
                    self.aggregator
                        .rebuild(&hotel_id, now)
                        .map_err(|e| e.into_ingestion(&hotel_id))?;
                }
                lane.next_sequence = Some(last + 1);
                last + 1
            }
        };

        // Step 3: Dedupe against the stored version of this key
        let key = ObservationKey {
            timestamp: raw.timestamp,
            source_id: raw.source_id.clone(),
        };
        let previous = self.store.get(&hotel_id, &key, now);
        if let Some(previous) = &previous {
            if previous.price == price && previous.available == raw.available {
                return Ok(SubmitOutcome::Duplicate);
            }
        }

        let observation = PriceObservation {
            hotel_id: hotel_id.clone(),
            city_id: raw.city_id,
            timestamp: raw.timestamp,
            price,
            available: raw.available,
            source_id: raw.source_id,
            sequence,
            revision: previous.as_ref().map_or(0, |p| p.revision + 1),
        };

        // Step 4: Apply; nothing is visible until the store append succeeds
        let prepared = self.aggregator
            .prepare(&observation, previous.as_ref(), now)
            .map_err(|e| e.into_ingestion(&hotel_id))?;

        let appended = self.store
            .append(observation.clone(), now)
            .map_err(|e| e.into_ingestion(&hotel_id))?;
        if appended == AppendOutcome::Duplicate {
            return Ok(SubmitOutcome::Duplicate);
        }

        lane.next_sequence = Some(sequence + 1);
        let snapshot = self.aggregator.commit(prepared);

        // Step 5: Fan out while still holding the lane, keeping per-hotel order
        self.hub.publish(PriceUpdate::new(&observation, snapshot.clone()));
        drop(lane);

        Ok(if observation.is_correction() {
            SubmitOutcome::Corrected { sequence, snapshot }
        } else {
            SubmitOutcome::Accepted { sequence, snapshot }
        })
    }

    /// Physically drops expired observations. Reads ignore them regardless.
    pub fn purge_expired(&self) -> usize {
        let purged = self.store.purge_expired(self.clock.now_timestamp());
        if purged > 0 {
            OBSERVATIONS_PURGED.inc_by(purged as u64);
            debug!(purged, "Purged expired observations");
        }
        purged
    }
}

fn rejection_reason(failure: &ValidationFailure) -> &'static str {
    match failure {
        ValidationFailure::NonPositivePrice => "non_positive_price",
        ValidationFailure::InvalidPrice(_) => "invalid_price",
        ValidationFailure::FutureTimestamp { .. } => "future_timestamp",
        ValidationFailure::UnknownHotel(_) => "unknown_hotel",
        ValidationFailure::UnknownCity(_) => "unknown_city",
        ValidationFailure::CityMismatch { .. } => "city_mismatch",
        ValidationFailure::MissingSource => "missing_source",
    }
}

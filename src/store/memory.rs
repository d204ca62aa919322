use dashmap::DashMap;
use im::OrdMap;
use std::time::Duration;
use crate::error::{Error, Result};
use crate::events::observation::{ObservationKey, PriceObservation};
use crate::interfaces::series_store::{AppendOutcome, SeriesRange, SeriesStore};
use crate::types::ids::{HotelId, SourceId};
use crate::types::timestamp::Timestamp;

#[derive(Clone, Debug, Default)]
struct Series {
    points: OrdMap<ObservationKey, PriceObservation>,
    last_sequence: u64,
}

impl Series {
    /// Drops entries older than `horizon` from the front of the series.
    fn purge_before(&mut self, horizon: Timestamp) -> usize {
        let (expired, kept) = self.points.clone().split(&horizon_key(horizon));
        if expired.is_empty() {
            return 0;
        }
        self.points = kept;
        expired.len()
    }
}

// Source ids are never empty, so this key sorts before every real entry at `timestamp`.
fn horizon_key(timestamp: Timestamp) -> ObservationKey {
    ObservationKey {
        timestamp,
        source_id: SourceId::new(""),
    }
}

/// In-memory series store with bounded retention.
///
/// Every hotel's series is a persistent ordered map; readers clone it in O(1)
/// under a short shard lock and iterate without holding any lock, so a
/// concurrent append is either fully visible to them or not at all.
pub struct InMemorySeriesStore {
    series: DashMap<HotelId, Series>,
    retention: Duration,
    max_points_per_series: usize,
}

impl InMemorySeriesStore {
    pub fn new(retention: Duration, max_points_per_series: usize) -> Self {
        InMemorySeriesStore {
            series: DashMap::new(),
            retention,
            max_points_per_series,
        }
    }

    fn snapshot(&self, hotel_id: &HotelId) -> Option<OrdMap<ObservationKey, PriceObservation>> {
        self.series.get(hotel_id).map(|s| s.points.clone())
    }

    pub fn hotel_count(&self) -> usize {
        self.series.len()
    }
}

impl SeriesStore for InMemorySeriesStore {
    fn append(&self, observation: PriceObservation, now: Timestamp) -> Result<AppendOutcome> {
        let horizon = self.retention_horizon(now);
        if observation.timestamp < horizon {
            return Err(Error::OutOfRetention {
                timestamp: observation.timestamp,
                horizon,
            });
        }

        let mut series = self.series.entry(observation.hotel_id.clone()).or_default();
        let key = observation.key();

        if let Some(existing) = series.points.get(&key) {
            if existing.same_reading(&observation) {
                return Ok(AppendOutcome::Duplicate);
            }
            let previous = existing.clone();
            series.last_sequence = series.last_sequence.max(observation.sequence);
            series.points.insert(key, observation);
            return Ok(AppendOutcome::Replaced { previous });
        }

        if series.points.len() >= self.max_points_per_series {
            let purged = series.purge_before(horizon);
            if purged > 0 {
                tracing::debug!("Purged {} expired observations for {}", purged, observation.hotel_id);
            }
            if series.points.len() >= self.max_points_per_series {
                return Err(Error::SeriesCapacityExceeded {
                    hotel_id: observation.hotel_id.clone(),
                    capacity: self.max_points_per_series,
                });
            }
        }

        series.last_sequence = series.last_sequence.max(observation.sequence);
        series.points.insert(key, observation);
        Ok(AppendOutcome::Inserted)
    }

    fn get(&self, hotel_id: &HotelId, key: &ObservationKey, now: Timestamp) -> Option<PriceObservation> {
        if key.timestamp < self.retention_horizon(now) {
            return None;
        }
        self.series.get(hotel_id).and_then(|s| s.points.get(key).cloned())
    }

    fn range(&self, hotel_id: &HotelId, from: Timestamp, to: Timestamp, now: Timestamp) -> SeriesRange {
        let from = from.max(self.retention_horizon(now));
        match self.snapshot(hotel_id) {
            Some(points) if from < to => SeriesRange::new(points, from, to),
            _ => SeriesRange::empty(),
        }
    }

    fn latest(&self, hotel_id: &HotelId, now: Timestamp) -> Option<PriceObservation> {
        let points = self.snapshot(hotel_id)?;
        let (newest_key, _) = points.get_max()?;
        if newest_key.timestamp < self.retention_horizon(now) {
            return None;
        }
        // Several sources may report the same instant; the last one inserted wins.
        points
            .range(horizon_key(newest_key.timestamp)..)
            .map(|(_, observation)| observation)
            .max_by_key(|observation| observation.sequence)
            .cloned()
    }

    fn recent(&self, hotel_id: &HotelId, limit: usize, now: Timestamp) -> Vec<PriceObservation> {
        let Some(points) = self.snapshot(hotel_id) else {
            return Vec::new();
        };
        let horizon = self.retention_horizon(now);
        let mut recent: Vec<PriceObservation> = points
            .iter()
            .rev()
            .take_while(|(key, _)| key.timestamp >= horizon)
            .take(limit)
            .map(|(_, observation)| observation.clone())
            .collect();
        recent.reverse();
        recent
    }

    fn observations_after(&self, hotel_id: &HotelId, sequence: u64, now: Timestamp) -> Vec<PriceObservation> {
        let range = self.range(hotel_id, Timestamp::from_secs(i64::MIN), Timestamp::from_secs(i64::MAX), now);
        let mut after: Vec<PriceObservation> = range
            .iter()
            .filter(|observation| observation.sequence > sequence)
            .cloned()
            .collect();
        after.sort_by_key(|observation| observation.sequence);
        after
    }

    fn last_sequence(&self, hotel_id: &HotelId) -> u64 {
        self.series.get(hotel_id).map(|s| s.last_sequence).unwrap_or(0)
    }

    fn purge_expired(&self, now: Timestamp) -> usize {
        let horizon = self.retention_horizon(now);
        let mut purged = 0;
        for mut series in self.series.iter_mut() {
            purged += series.purge_before(horizon);
        }
        if purged > 0 {
            tracing::info!("Purged {} observations older than {}", purged, horizon);
        }
        purged
    }

    fn len(&self, hotel_id: &HotelId) -> usize {
        self.series.get(hotel_id).map(|s| s.points.len()).unwrap_or(0)
    }

    fn retention_horizon(&self, now: Timestamp) -> Timestamp {
        now.saturating_sub(self.retention)
    }
}

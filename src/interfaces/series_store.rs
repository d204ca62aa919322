use im::OrdMap;
use crate::error::Result;
use crate::events::observation::{ObservationKey, PriceObservation};
use crate::types::ids::{HotelId, SourceId};
use crate::types::timestamp::Timestamp;

#[derive(Clone, Debug, PartialEq)]
pub enum AppendOutcome {
    Inserted,
    Replaced { previous: PriceObservation },
    Duplicate,
}

/// Per-hotel ordered store of accepted observations.
///
/// Reads take `now` so entries older than the retention horizon are ignored
/// even when they have not been purged yet.
pub trait SeriesStore: Send + Sync {
    /// Inserts in timestamp order, replacing an existing entry with the same key.
    fn append(&self, observation: PriceObservation, now: Timestamp) -> Result<AppendOutcome>;

    fn get(&self, hotel_id: &HotelId, key: &ObservationKey, now: Timestamp) -> Option<PriceObservation>;

    /// Observations with `from <= timestamp < to`.
    fn range(&self, hotel_id: &HotelId, from: Timestamp, to: Timestamp, now: Timestamp) -> SeriesRange;

    fn latest(&self, hotel_id: &HotelId, now: Timestamp) -> Option<PriceObservation>;

    /// Up to `limit` most recent observations, oldest first.
    fn recent(&self, hotel_id: &HotelId, limit: usize, now: Timestamp) -> Vec<PriceObservation>;

    /// Live observations accepted after `sequence`, in sequence order.
    fn observations_after(&self, hotel_id: &HotelId, sequence: u64, now: Timestamp) -> Vec<PriceObservation>;

    /// Highest sequence ever appended for the hotel, zero if none.
    fn last_sequence(&self, hotel_id: &HotelId) -> u64;

    /// Physically removes expired observations; returns how many were dropped.
    fn purge_expired(&self, now: Timestamp) -> usize;

    fn len(&self, hotel_id: &HotelId) -> usize;

    fn retention_horizon(&self, now: Timestamp) -> Timestamp;
}

/// Lazy, restartable view over a slice of one hotel's series.
///
/// Holds a structurally shared copy of the series, so later appends are
/// never observed by an existing range.
#[derive(Clone, Debug, Default)]
pub struct SeriesRange {
    points: OrdMap<ObservationKey, PriceObservation>,
    from: Timestamp,
    to: Timestamp,
}

impl SeriesRange {
    pub fn new(points: OrdMap<ObservationKey, PriceObservation>, from: Timestamp, to: Timestamp) -> Self {
        SeriesRange { points, from, to }
    }

    pub fn empty() -> Self {
        SeriesRange::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceObservation> + '_ {
        let lower = ObservationKey {
            timestamp: self.from,
            source_id: SourceId::new(""),
        };
        let to = self.to;
        self.points
            .range(lower..)
            .take_while(move |(key, _)| key.timestamp < to)
            .map(|(_, observation)| observation)
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }
}

impl<'a> IntoIterator for &'a SeriesRange {
    type Item = &'a PriceObservation;
    type IntoIter = Box<dyn Iterator<Item = &'a PriceObservation> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

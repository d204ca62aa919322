use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::types::ids::{CityId, HotelId, SourceId};
use crate::types::price::Price;
use crate::types::timestamp::Timestamp;

/// Observation as pushed by an upstream source, before validation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawObservation {
    pub hotel_id: HotelId,
    pub city_id: CityId,
    pub timestamp: Timestamp,
    /// Amount in major currency units; normalised to cents by the gate.
    pub price: Decimal,
    #[serde(default = "default_available")]
    pub available: bool,
    pub source_id: SourceId,
}

fn default_available() -> bool {
    true
}

/// Identity of an observation within a hotel's series.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservationKey {
    pub timestamp: Timestamp,
    pub source_id: SourceId,
}

/// Accepted, immutable price reading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub hotel_id: HotelId,
    pub city_id: CityId,
    pub timestamp: Timestamp,
    pub price: Price,
    pub available: bool,
    pub source_id: SourceId,
    /// Per-hotel acceptance sequence; also the insertion order.
    pub sequence: u64,
    /// Number of corrections applied to this key; zero for the first version.
    pub revision: u32,
}

impl PriceObservation {
    pub fn key(&self) -> ObservationKey {
        ObservationKey {
            timestamp: self.timestamp,
            source_id: self.source_id.clone(),
        }
    }

    pub fn is_correction(&self) -> bool {
        self.revision > 0
    }

    /// Same reading, ignoring acceptance bookkeeping.
    pub fn same_reading(&self, other: &PriceObservation) -> bool {
        self.price == other.price && self.available == other.available
    }

    /// Ordering used to pick the latest observation: timestamp, then insertion order.
    pub fn recency(&self) -> (Timestamp, u64) {
        (self.timestamp, self.sequence)
    }
}

/// Point on a hotel's price history chart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: Timestamp,
    pub price: Price,
    pub available: bool,
}

impl From<&PriceObservation> for PricePoint {
    fn from(observation: &PriceObservation) -> Self {
        PricePoint {
            date: observation.timestamp,
            price: observation.price,
            available: observation.available,
        }
    }
}

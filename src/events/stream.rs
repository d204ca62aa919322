use serde::{Deserialize, Serialize};
use crate::events::observation::PriceObservation;
use crate::events::snapshot::AggregateSnapshot;
use crate::types::ids::{CityId, HotelId, SourceId};
use crate::types::price::Price;
use crate::types::timestamp::Timestamp;

/// Incremental update for one accepted observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub hotel_id: HotelId,
    pub city_id: CityId,
    pub sequence: u64,
    pub timestamp: Timestamp,
    pub price: Price,
    pub available: bool,
    pub source_id: SourceId,
    pub snapshot: AggregateSnapshot,
    pub corrected: bool,
}

impl PriceUpdate {
    pub fn new(observation: &PriceObservation, snapshot: AggregateSnapshot) -> Self {
        PriceUpdate {
            hotel_id: observation.hotel_id.clone(),
            city_id: observation.city_id.clone(),
            sequence: observation.sequence,
            timestamp: observation.timestamp,
            price: observation.price,
            available: observation.available,
            source_id: observation.source_id.clone(),
            snapshot,
            corrected: observation.is_correction(),
        }
    }
}

/// Message delivered to a subscriber's outbound queue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Snapshot {
        hotel_id: HotelId,
        snapshot: AggregateSnapshot,
    },
    PriceUpdate(PriceUpdate),
    /// End of a catch-up burst or replay; incremental updates follow.
    CaughtUp {
        replayed: usize,
    },
    ResyncRequired,
}

impl StreamMessage {
    /// Hotel and sequence this message advances the subscriber's cursor to.
    pub fn cursor_position(&self) -> Option<(&HotelId, u64)> {
        match self {
            StreamMessage::Snapshot { hotel_id, snapshot } => Some((hotel_id, snapshot.sequence)),
            StreamMessage::PriceUpdate(update) => Some((&update.hotel_id, update.sequence)),
            _ => None,
        }
    }
}

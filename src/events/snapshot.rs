use serde::{Deserialize, Serialize};
use crate::types::ids::{CityId, HotelId, SourceId};
use crate::types::price::Price;
use crate::types::timestamp::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Flat,
}

/// Cached per-hotel statistics, recomputed on every accepted observation.
///
/// `min_price`, `max_price` and `avg_price` cover the live rolling window only
/// and are `None` when the window is empty. `current_price` is always the
/// latest accepted observation, inside the window or not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub hotel_id: HotelId,
    pub city_id: CityId,
    /// Sequence of the last observation reflected here.
    pub sequence: u64,
    pub base_price: Price,
    pub current_price: Price,
    pub current_available: bool,
    pub observed_at: Timestamp,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub avg_price: Option<Price>,
    pub window_count: u64,
    pub trend: Trend,
    pub pct_change_vs_base: Option<f64>,
    /// Latest quote from each source, ordered by source id.
    pub source_prices: Vec<SourceQuote>,
    /// Cheapest available quote across sources.
    pub best_price: Option<SourceQuote>,
}

/// Most recent observation from one upstream source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceQuote {
    pub source_id: SourceId,
    pub price: Price,
    pub available: bool,
    pub observed_at: Timestamp,
}

/// Statistics for one local hour of a hotel's series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HourBucket {
    /// Local hour of day, 0..=23.
    pub hour: u32,
    pub starts_at: Timestamp,
    pub min: Option<Price>,
    pub max: Option<Price>,
    pub avg: Option<Price>,
    pub count: u64,
    pub representative_price: Option<Price>,
}

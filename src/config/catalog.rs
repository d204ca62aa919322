use serde::{Deserialize, Serialize};
use crate::types::ids::{CityId, HotelId};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub cities: Vec<CityConfig>,
    #[serde(default)]
    pub hotels: Vec<HotelConfig>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CityConfig {
    pub city_id: CityId,
    pub name: String,
    /// Offset of local city time from UTC, used for hour buckets.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HotelConfig {
    pub hotel_id: HotelId,
    pub city_id: CityId,
    pub name: String,
    #[serde(default)]
    pub rating: Option<f64>,
    /// Reference price in cents; the first accepted observation is used when absent.
    #[serde(default)]
    pub base_price_cents: Option<i64>,
}

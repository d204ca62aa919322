#![allow(dead_code)]

use rust_decimal::Decimal;
use std::sync::Arc;
use hotel_price_feed::config::catalog::{CatalogConfig, CityConfig, HotelConfig};
use hotel_price_feed::config::loader::AppConfig;
use hotel_price_feed::core::PriceFeedCore;
use hotel_price_feed::events::observation::RawObservation;
use hotel_price_feed::types::ids::{CityId, HotelId, SourceId};
use hotel_price_feed::types::timestamp::Timestamp;
use hotel_price_feed::utils::clock::ManualClock;

/// 2024-05-01T12:00:00Z
pub const NOW: i64 = 1_714_564_800;
pub const CITY: &str = "page-az";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.catalog = CatalogConfig {
        cities: vec![
            CityConfig {
                city_id: CityId::from(CITY),
                name: "Page".to_string(),
                utc_offset_minutes: -420,
            },
            CityConfig {
                city_id: CityId::from("flagstaff-az"),
                name: "Flagstaff".to_string(),
                utc_offset_minutes: -420,
            },
        ],
        hotels: vec![
            hotel("budget-inn", CITY, "Budget Inn", Some(2.5), Some(10_000)),
            hotel("lake-powell-inn", CITY, "Lake Powell Inn", Some(4.0), Some(25_000)),
            hotel("desert-view-motel", CITY, "Desert View Motel", Some(3.5), None),
            hotel("canyon-lodge", "flagstaff-az", "Canyon Lodge", None, None),
        ],
    };
    config
}

fn hotel(id: &str, city: &str, name: &str, rating: Option<f64>, base: Option<i64>) -> HotelConfig {
    HotelConfig {
        hotel_id: HotelId::from(id),
        city_id: CityId::from(city),
        name: name.to_string(),
        rating,
        base_price_cents: base,
    }
}

pub fn build_core(config: AppConfig) -> (Arc<ManualClock>, Arc<PriceFeedCore>) {
    let clock = Arc::new(ManualClock::at(Timestamp::from_secs(NOW)));
    let core = PriceFeedCore::new(config, clock.clone()).expect("valid config");
    (clock, Arc::new(core))
}

pub fn core() -> (Arc<ManualClock>, Arc<PriceFeedCore>) {
    build_core(test_config())
}

/// Observation `secs_ago` before `NOW`, priced in whole currency units.
pub fn raw(hotel: &str, secs_ago: i64, price: i64) -> RawObservation {
    let city = if hotel == "canyon-lodge" { "flagstaff-az" } else { CITY };
    RawObservation {
        hotel_id: HotelId::from(hotel),
        city_id: CityId::from(city),
        timestamp: Timestamp::from_secs(NOW - secs_ago),
        price: Decimal::from(price),
        available: true,
        source_id: SourceId::from("ota-1"),
    }
}

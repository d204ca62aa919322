use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use crate::catalog::HotelCatalog;
use crate::error::{Error, Result};
use crate::events::observation::RawObservation;
use crate::feeds::PriceConnector;
use crate::types::ids::{CityId, HotelId, SourceId};
use crate::types::price::Price;
use crate::utils::clock::Clock;

const FLOOR: Price = Price::from_cents(1_000);

struct SimulatedHotel {
    hotel_id: HotelId,
    city_id: CityId,
    price: Price,
}

/// Random walk around each hotel's base price, one hotel per tick.
pub struct SimulatedConnector {
    source_id: SourceId,
    hotels: Vec<SimulatedHotel>,
    interval: Duration,
    volatility: f64,
    rng: SmallRng,
    clock: Arc<dyn Clock>,
    cursor: usize,
    connected: bool,
}

impl SimulatedConnector {
    pub fn new(
        source_id: SourceId,
        catalog: &HotelCatalog,
        interval: Duration,
        volatility: f64,
        seed: Option<u64>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let mut hotels: Vec<SimulatedHotel> = catalog
            .hotels()
            .map(|h| SimulatedHotel {
                hotel_id: h.hotel_id.clone(),
                city_id: h.city_id.clone(),
                price: h.base_price.unwrap_or_else(|| Price::from_cents(rng.gen_range(8_000..30_000))),
            })
            .collect();
        hotels.sort_by(|a, b| a.hotel_id.cmp(&b.hotel_id));

        SimulatedConnector {
            source_id,
            hotels,
            interval,
            volatility: volatility.abs(),
            rng,
            clock,
            cursor: 0,
            connected: false,
        }
    }

    fn step(&mut self) -> Option<RawObservation> {
        if self.hotels.is_empty() {
            return None;
        }
        let index = self.cursor % self.hotels.len();
        self.cursor = self.cursor.wrapping_add(1);

        let factor = if self.volatility > 0.0 {
            1.0 + self.rng.gen_range(-self.volatility..=self.volatility)
        } else {
            1.0
        };
        let available = self.rng.gen_bool(0.9);

        let hotel = &mut self.hotels[index];
        let cents = (hotel.price.cents() as f64 * factor).round() as i64;
        hotel.price = Price::from_cents(cents).max(FLOOR);

        Some(RawObservation {
            hotel_id: hotel.hotel_id.clone(),
            city_id: hotel.city_id.clone(),
            timestamp: self.clock.now_timestamp(),
            price: hotel.price.to_decimal(),
            available,
            source_id: self.source_id.clone(),
        })
    }
}

#[async_trait]
impl PriceConnector for SimulatedConnector {
    async fn connect(&mut self) -> Result<()> {
        self.connected = true;
        tracing::info!("Simulated feed {} started for {} hotels", self.source_id, self.hotels.len());
        Ok(())
    }

    async fn next_observation(&mut self) -> Result<RawObservation> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        tokio::time::sleep(self.interval).await;
        self.step().ok_or(Error::ConnectionClosed)
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn source_id(&self) -> &SourceId {
        &self.source_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CityInfo, HotelInfo};
    use crate::types::timestamp::Timestamp;
    use crate::utils::clock::ManualClock;
    use chrono::FixedOffset;

    fn catalog() -> HotelCatalog {
        let mut catalog = HotelCatalog::default();
        catalog.add_city(CityInfo {
            city_id: CityId::from("page-az"),
            name: "Page".to_string(),
            utc_offset: FixedOffset::west_opt(7 * 3600).unwrap(),
        });
        for (id, base) in [("budget-inn", 10_000), ("lake-powell-inn", 25_000)] {
            catalog.add_hotel(HotelInfo {
                hotel_id: HotelId::from(id),
                city_id: CityId::from("page-az"),
                name: id.to_string(),
                rating: None,
                base_price: Some(Price::from_cents(base)),
            }).unwrap();
        }
        catalog
    }

    fn connector(seed: u64) -> SimulatedConnector {
        SimulatedConnector::new(
            SourceId::from("simulator"),
            &catalog(),
            Duration::from_millis(1),
            0.05,
            Some(seed),
            Arc::new(ManualClock::at(Timestamp::from_secs(1_714_564_800))),
        )
    }

    #[test]
    fn walks_within_volatility_band_round_robin() {
        let mut sim = connector(7);
        let first = sim.step().unwrap();
        let second = sim.step().unwrap();

        assert_eq!(first.hotel_id, HotelId::from("budget-inn"));
        assert_eq!(second.hotel_id, HotelId::from("lake-powell-inn"));

        let price = Price::from_decimal(first.price).unwrap().cents();
        assert!((9_500..=10_500).contains(&price));
        assert_eq!(first.source_id, SourceId::from("simulator"));
    }

    #[test]
    fn same_seed_gives_same_sequence() {
        let mut a = connector(42);
        let mut b = connector(42);
        for _ in 0..10 {
            assert_eq!(a.step().unwrap().price, b.step().unwrap().price);
        }
    }

    #[tokio::test]
    async fn requires_connect() {
        let mut sim = connector(1);
        assert!(matches!(sim.next_observation().await, Err(Error::NotConnected)));
        sim.connect().await.unwrap();
        assert!(sim.is_healthy());
        assert!(sim.next_observation().await.is_ok());
    }
}

use chrono::FixedOffset;
use serde::Serialize;
use std::collections::HashMap;
use crate::config::catalog::CatalogConfig;
use crate::error::{Error, Result};
use crate::types::ids::{CityId, HotelId};
use crate::types::price::Price;

#[derive(Clone, Debug, Serialize)]
pub struct CityInfo {
    pub city_id: CityId,
    pub name: String,
    #[serde(skip)]
    pub utc_offset: FixedOffset,
}

#[derive(Clone, Debug, Serialize)]
pub struct HotelInfo {
    pub hotel_id: HotelId,
    pub city_id: CityId,
    pub name: String,
    pub rating: Option<f64>,
    pub base_price: Option<Price>,
}

/// Known cities and hotels. Observations for anything else are rejected.
#[derive(Clone, Debug, Default)]
pub struct HotelCatalog {
    cities: HashMap<CityId, CityInfo>,
    hotels: HashMap<HotelId, HotelInfo>,
    by_city: HashMap<CityId, Vec<HotelId>>,
}

impl HotelCatalog {
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let mut catalog = HotelCatalog::default();

        for city in &config.cities {
            let utc_offset = FixedOffset::east_opt(city.utc_offset_minutes * 60)
                .ok_or_else(|| Error::ConfigError(format!(
                    "invalid UTC offset for city {}: {} minutes",
                    city.city_id, city.utc_offset_minutes
                )))?;
            catalog.add_city(CityInfo {
                city_id: city.city_id.clone(),
                name: city.name.clone(),
                utc_offset,
            });
        }

        for hotel in &config.hotels {
            catalog.add_hotel(HotelInfo {
                hotel_id: hotel.hotel_id.clone(),
                city_id: hotel.city_id.clone(),
                name: hotel.name.clone(),
                rating: hotel.rating,
                base_price: hotel.base_price_cents.map(Price::from_cents),
            })?;
        }

        Ok(catalog)
    }

    pub fn add_city(&mut self, city: CityInfo) {
        self.by_city.entry(city.city_id.clone()).or_default();
        self.cities.insert(city.city_id.clone(), city);
    }

    pub fn add_hotel(&mut self, hotel: HotelInfo) -> Result<()> {
        let hotels = self.by_city
            .get_mut(&hotel.city_id)
            .ok_or_else(|| Error::CityNotFound(hotel.city_id.clone()))?;
        if !hotels.contains(&hotel.hotel_id) {
            hotels.push(hotel.hotel_id.clone());
        }
        self.hotels.insert(hotel.hotel_id.clone(), hotel);
        Ok(())
    }

    pub fn hotel(&self, hotel_id: &HotelId) -> Option<&HotelInfo> {
        self.hotels.get(hotel_id)
    }

    pub fn city(&self, city_id: &CityId) -> Option<&CityInfo> {
        self.cities.get(city_id)
    }

    pub fn hotels_in_city(&self, city_id: &CityId) -> Result<Vec<&HotelInfo>> {
        let ids = self.by_city
            .get(city_id)
            .ok_or_else(|| Error::CityNotFound(city_id.clone()))?;
        Ok(ids.iter().filter_map(|id| self.hotels.get(id)).collect())
    }

    pub fn hotel_ids_in_city(&self, city_id: &CityId) -> Result<Vec<HotelId>> {
        self.by_city
            .get(city_id)
            .cloned()
            .ok_or_else(|| Error::CityNotFound(city_id.clone()))
    }

    /// UTC offset of the city a hotel belongs to.
    pub fn hotel_offset(&self, hotel_id: &HotelId) -> Result<FixedOffset> {
        let hotel = self.hotel(hotel_id)
            .ok_or_else(|| Error::HotelNotFound(hotel_id.clone()))?;
        self.city(&hotel.city_id)
            .map(|c| c.utc_offset)
            .ok_or_else(|| Error::CityNotFound(hotel.city_id.clone()))
    }

    pub fn hotels(&self) -> impl Iterator<Item = &HotelInfo> {
        self.hotels.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::catalog::{CityConfig, HotelConfig};

    fn config() -> CatalogConfig {
        CatalogConfig {
            cities: vec![CityConfig {
                city_id: CityId::from("page-az"),
                name: "Page".to_string(),
                utc_offset_minutes: -420,
            }],
            hotels: vec![
                HotelConfig {
                    hotel_id: HotelId::from("budget-inn"),
                    city_id: CityId::from("page-az"),
                    name: "Budget Inn".to_string(),
                    rating: Some(2.0),
                    base_price_cents: Some(10000),
                },
                HotelConfig {
                    hotel_id: HotelId::from("lake-powell-inn"),
                    city_id: CityId::from("page-az"),
                    name: "Lake Powell Inn".to_string(),
                    rating: Some(2.0),
                    base_price_cents: None,
                },
            ],
        }
    }

    #[test]
    fn lists_hotels_in_configured_order() {
        let catalog = HotelCatalog::from_config(&config()).unwrap();
        let names: Vec<_> = catalog
            .hotels_in_city(&CityId::from("page-az"))
            .unwrap()
            .into_iter()
            .map(|h| h.name.as_str())
            .collect();
        assert_eq!(names, vec!["Budget Inn", "Lake Powell Inn"]);
    }

    #[test]
    fn resolves_city_offset_for_hotel() {
        let catalog = HotelCatalog::from_config(&config()).unwrap();
        let offset = catalog.hotel_offset(&HotelId::from("budget-inn")).unwrap();
        assert_eq!(offset.local_minus_utc(), -7 * 3600);
    }

    #[test]
    fn unknown_city_is_an_error() {
        let catalog = HotelCatalog::from_config(&config()).unwrap();
        assert!(matches!(
            catalog.hotels_in_city(&CityId::from("atlantis")),
            Err(Error::CityNotFound(_))
        ));
    }
}

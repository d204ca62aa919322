use serde::Serialize;
use std::collections::BTreeMap;
use crate::aggregation::aggregator::Aggregator;
use crate::error::Result;
use crate::events::snapshot::Trend;
use crate::types::ids::CityId;
use crate::types::price::Price;

const BUDGET_CEILING: Price = Price::from_cents(10_000);
const MID_RANGE_CEILING: Price = Price::from_cents(30_000);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceCategory {
    Budget,
    MidRange,
    Luxury,
}

impl PriceCategory {
    pub fn of(price: Price) -> Self {
        if price < BUDGET_CEILING {
            PriceCategory::Budget
        } else if price < MID_RANGE_CEILING {
            PriceCategory::MidRange
        } else {
            PriceCategory::Luxury
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CategoryRange {
    pub min: Option<Price>,
    pub max: Option<Price>,
    pub count: usize,
}

impl CategoryRange {
    fn add(&mut self, price: Price) {
        self.min = Some(self.min.map_or(price, |m| m.min(price)));
        self.max = Some(self.max.map_or(price, |m| m.max(price)));
        self.count += 1;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PriceRanges {
    pub budget: CategoryRange,
    pub mid_range: CategoryRange,
    pub luxury: CategoryRange,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrendCounts {
    pub increasing: usize,
    pub decreasing: usize,
    pub flat: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CityStatistics {
    pub city_id: CityId,
    pub hotel_count: usize,
    pub priced_hotel_count: usize,
    pub average_price: Option<Price>,
    pub price_ranges: PriceRanges,
    /// Keyed by star rating rounded to the nearest whole star.
    pub average_price_by_rating: BTreeMap<u8, Price>,
    pub trends: TrendCounts,
}

impl Aggregator {
    /// Statistics over the current price of every hotel in a city.
    pub fn city_statistics(&self, city_id: &CityId) -> Result<CityStatistics> {
        let hotels = self.catalog().hotels_in_city(city_id)?;

        let mut ranges = PriceRanges::default();
        let mut trends = TrendCounts::default();
        let mut by_rating: BTreeMap<u8, (i64, u64)> = BTreeMap::new();
        let mut sum_cents: i64 = 0;
        let mut priced: u64 = 0;

        for hotel in &hotels {
            let Some(snapshot) = self.snapshot(&hotel.hotel_id) else {
                continue;
            };
            let price = snapshot.current_price;

            match PriceCategory::of(price) {
                PriceCategory::Budget => ranges.budget.add(price),
                PriceCategory::MidRange => ranges.mid_range.add(price),
                PriceCategory::Luxury => ranges.luxury.add(price),
            }
            match snapshot.trend {
                Trend::Increasing => trends.increasing += 1,
                Trend::Decreasing => trends.decreasing += 1,
                Trend::Flat => trends.flat += 1,
            }
            if let Some(rating) = hotel.rating {
                let stars = rating.round().clamp(0.0, 10.0) as u8;
                let entry = by_rating.entry(stars).or_insert((0, 0));
                entry.0 = entry.0.saturating_add(price.cents());
                entry.1 += 1;
            }

            sum_cents = sum_cents.saturating_add(price.cents());
            priced += 1;
        }

        Ok(CityStatistics {
            city_id: city_id.clone(),
            hotel_count: hotels.len(),
            priced_hotel_count: priced as usize,
            average_price: Price::average(sum_cents, priced),
            price_ranges: ranges,
            average_price_by_rating: by_rating
                .into_iter()
                .filter_map(|(stars, (sum, count))| Price::average(sum, count).map(|avg| (stars, avg)))
                .collect(),
            trends,
        })
    }
}

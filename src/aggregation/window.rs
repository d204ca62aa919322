use im::OrdMap;
use crate::error::{Error, Result};
use crate::events::observation::ObservationKey;
use crate::types::ids::SourceId;
use crate::types::price::Price;
use crate::types::timestamp::Timestamp;

/// Members of a hotel's rolling window with running sum, count and a price
/// multiset for min/max. Cloning is O(1).
#[derive(Clone, Debug, Default)]
pub struct WindowLedger {
    members: OrdMap<ObservationKey, Price>,
    prices: OrdMap<Price, u32>,
    sum_cents: i64,
    count: u64,
}

impl WindowLedger {
    pub fn insert(&mut self, key: ObservationKey, price: Price) -> Result<()> {
        self.remove(&key);
        self.sum_cents = self.sum_cents
            .checked_add(price.cents())
            .ok_or_else(|| Error::Overflow { operation: "window sum".to_string() })?;
        self.count += 1;
        *self.prices.entry(price).or_insert(0) += 1;
        self.members.insert(key, price);
        Ok(())
    }

    pub fn remove(&mut self, key: &ObservationKey) -> Option<Price> {
        let price = self.members.remove(key)?;
        self.forget(price);
        Some(price)
    }

    /// Subtracts every member older than `start`; returns how many left the window.
    pub fn evict_before(&mut self, start: Timestamp) -> usize {
        let lower = ObservationKey {
            timestamp: start,
            source_id: SourceId::new(""),
        };
        let (expired, kept) = self.members.clone().split(&lower);
        if expired.is_empty() {
            return 0;
        }
        self.members = kept;
        for price in expired.values() {
            self.forget(*price);
        }
        expired.len()
    }

    fn forget(&mut self, price: Price) {
        self.sum_cents -= price.cents();
        self.count -= 1;
        let remaining = self.prices.get(&price).copied().unwrap_or(0);
        if remaining <= 1 {
            self.prices.remove(&price);
        } else {
            self.prices.insert(price, remaining - 1);
        }
    }

    pub fn contains(&self, key: &ObservationKey) -> bool {
        self.members.contains_key(key)
    }

    pub fn min(&self) -> Option<Price> {
        self.prices.get_min().map(|(price, _)| *price)
    }

    pub fn max(&self) -> Option<Price> {
        self.prices.get_max().map(|(price, _)| *price)
    }

    pub fn average(&self) -> Option<Price> {
        Price::average(self.sum_cents, self.count)
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn oldest(&self) -> Option<Timestamp> {
        self.members.get_min().map(|(key, _)| key.timestamp)
    }
}

use chrono::{NaiveDate, TimeZone};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use crate::aggregation::window::WindowLedger;
use crate::catalog::HotelCatalog;
use crate::error::{Error, Result};
use crate::events::observation::{ObservationKey, PriceObservation};
use crate::events::snapshot::{AggregateSnapshot, HourBucket, SourceQuote, Trend};
use crate::interfaces::series_store::SeriesStore;
use crate::types::ids::{CityId, HotelId, SourceId};
use crate::types::price::Price;
use crate::types::timestamp::Timestamp;

const HOUR_SECS: i64 = 3_600;

#[derive(Clone, Debug)]
enum BaseReference {
    Configured(Price),
    FirstObserved { key: ObservationKey, price: Price },
    Unset,
}

impl BaseReference {
    fn price(&self) -> Option<Price> {
        match self {
            BaseReference::Configured(price) => Some(*price),
            BaseReference::FirstObserved { price, .. } => Some(*price),
            BaseReference::Unset => None,
        }
    }

    /// The first accepted observation becomes the base; a correction of
    /// that same key moves it.
    fn observe(&mut self, observation: &PriceObservation) {
        match self {
            BaseReference::Configured(_) => {}
            BaseReference::Unset => {
                *self = BaseReference::FirstObserved {
                    key: observation.key(),
                    price: observation.price,
                };
            }
            BaseReference::FirstObserved { key, price } => {
                if *key == observation.key() {
                    *price = observation.price;
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
struct HotelAggregate {
    city_id: CityId,
    window: WindowLedger,
    base: BaseReference,
    latest: Option<PriceObservation>,
    /// Latest observation per source, replaced by recency like `latest`.
    sources: BTreeMap<SourceId, PriceObservation>,
    snapshot: Option<AggregateSnapshot>,
}

impl HotelAggregate {
    fn new(city_id: CityId, configured_base: Option<Price>) -> Self {
        HotelAggregate {
            city_id,
            window: WindowLedger::default(),
            base: configured_base.map_or(BaseReference::Unset, BaseReference::Configured),
            latest: None,
            sources: BTreeMap::new(),
            snapshot: None,
        }
    }

    /// Makes `observation` the latest overall and for its source when it is
    /// at least as recent, or when it corrects the entry currently held.
    fn observe_latest(&mut self, observation: &PriceObservation) {
        if supersedes(self.latest.as_ref(), observation) {
            self.latest = Some(observation.clone());
        }
        if supersedes(self.sources.get(&observation.source_id), observation) {
            self.sources.insert(observation.source_id.clone(), observation.clone());
        }
    }

    fn source_quotes(&self) -> Vec<SourceQuote> {
        self.sources
            .values()
            .map(|o| SourceQuote {
                source_id: o.source_id.clone(),
                price: o.price,
                available: o.available,
                observed_at: o.timestamp,
            })
            .collect()
    }

    fn build_snapshot(&self, hotel_id: &HotelId, sequence: u64, trend: Trend) -> Option<AggregateSnapshot> {
        let latest = self.latest.as_ref()?;
        let base_price = self.base.price().unwrap_or(latest.price);
        let source_prices = self.source_quotes();
        // Ties go to the first source id.
        let best_price = source_prices
            .iter()
            .filter(|q| q.available)
            .min_by_key(|q| q.price)
            .cloned();

        Some(AggregateSnapshot {
            hotel_id: hotel_id.clone(),
            city_id: self.city_id.clone(),
            sequence,
            base_price,
            current_price: latest.price,
            current_available: latest.available,
            observed_at: latest.timestamp,
            min_price: self.window.min(),
            max_price: self.window.max(),
            avg_price: self.window.average(),
            window_count: self.window.count(),
            trend,
            pct_change_vs_base: latest.price.pct_change_from(base_price),
            source_prices,
            best_price,
        })
    }
}

/// Aggregate state computed for one observation but not yet visible.
#[derive(Debug)]
pub struct PreparedAggregate {
    hotel_id: HotelId,
    state: HotelAggregate,
    snapshot: AggregateSnapshot,
}

impl PreparedAggregate {
    pub fn snapshot(&self) -> &AggregateSnapshot {
        &self.snapshot
    }
}

/// Incrementally maintained per-hotel statistics.
///
/// Every hotel keeps its own rolling-window ledger, so an update costs
/// O(log n) regardless of how long the series is, and the cached snapshot is
/// read without touching the store.
pub struct Aggregator {
    store: Arc<dyn SeriesStore>,
    catalog: Arc<HotelCatalog>,
    hotels: DashMap<HotelId, HotelAggregate>,
    rolling_window: Duration,
    trend_epsilon: f64,
}

impl Aggregator {
    pub fn new(
        store: Arc<dyn SeriesStore>,
        catalog: Arc<HotelCatalog>,
        rolling_window: Duration,
        trend_epsilon: f64,
    ) -> Self {
        Aggregator {
            store,
            catalog,
            hotels: DashMap::new(),
            rolling_window,
            trend_epsilon,
        }
    }

    fn window_start(&self, now: Timestamp) -> Timestamp {
        now.saturating_sub(self.rolling_window)
    }

    fn configured_base(&self, hotel_id: &HotelId) -> Option<Price> {
        self.catalog.hotel(hotel_id).and_then(|h| h.base_price)
    }

    /// Computes the state that results from accepting `observation`.
    ///
    /// `previous` is the version of the same key it replaces, if any. Nothing
    /// is visible to readers until the result is passed to [`commit`].
    ///
    /// [`commit`]: Aggregator::commit
    pub fn prepare(
        &self,
        observation: &PriceObservation,
        previous: Option<&PriceObservation>,
        now: Timestamp,
    ) -> Result<PreparedAggregate> {
        let hotel_id = &observation.hotel_id;
        let mut state = match self.hotels.get(hotel_id) {
            Some(existing) => existing.clone(),
            None => HotelAggregate::new(observation.city_id.clone(), self.configured_base(hotel_id)),
        };
        let prior_average = state.snapshot.as_ref().and_then(|s| s.avg_price);

        // Step 1: Drop members that slid out of the window
        let window_start = self.window_start(now);
        let evicted = state.window.evict_before(window_start);
        if evicted > 0 {
            debug!(hotel_id = %hotel_id, evicted, "Rolling window advanced");
        }

        // Step 2: Swap the superseded version for the new one
        if let Some(previous) = previous {
            state.window.remove(&previous.key());
        }
        if observation.timestamp >= window_start {
            state.window.insert(observation.key(), observation.price)?;
        }

        // Step 3: Latest, per-source quotes and base reference
        state.observe_latest(observation);
        state.base.observe(observation);

        // Step 4: Trend against the average before this observation
        let current = state.latest.as_ref().map_or(observation.price, |l| l.price);
        let trend = classify_trend(current, prior_average, self.trend_epsilon);

        let sequence = state.snapshot.as_ref().map_or(0, |s| s.sequence).max(observation.sequence);
        let snapshot = state
            .build_snapshot(hotel_id, sequence, trend)
            .ok_or_else(|| Error::Ingestion {
                hotel_id: hotel_id.clone(),
                reason: "aggregate has no latest observation".to_string(),
            })?;
        state.snapshot = Some(snapshot.clone());

        Ok(PreparedAggregate {
            hotel_id: hotel_id.clone(),
            state,
            snapshot,
        })
    }

    pub fn commit(&self, prepared: PreparedAggregate) -> AggregateSnapshot {
        let PreparedAggregate { hotel_id, state, snapshot } = prepared;
        self.hotels.insert(hotel_id, state);
        snapshot
    }

    pub fn on_accepted(
        &self,
        observation: &PriceObservation,
        previous: Option<&PriceObservation>,
        now: Timestamp,
    ) -> Result<AggregateSnapshot> {
        let prepared = self.prepare(observation, previous, now)?;
        Ok(self.commit(prepared))
    }

    /// Cached snapshot; `None` until the hotel has an accepted observation.
    pub fn snapshot(&self, hotel_id: &HotelId) -> Option<AggregateSnapshot> {
        self.hotels.get(hotel_id).and_then(|s| s.snapshot.clone())
    }

    pub fn is_tracking(&self, hotel_id: &HotelId) -> bool {
        self.hotels.contains_key(hotel_id)
    }

    /// Recomputes a hotel's state from the store. Trend restarts as flat.
    pub fn rebuild(&self, hotel_id: &HotelId, now: Timestamp) -> Result<Option<AggregateSnapshot>> {
        let hotel = self.catalog
            .hotel(hotel_id)
            .ok_or_else(|| Error::HotelNotFound(hotel_id.clone()))?;
        let mut state = HotelAggregate::new(hotel.city_id.clone(), hotel.base_price);

        let window = self.store.range(
            hotel_id,
            self.window_start(now),
            Timestamp::from_secs(i64::MAX),
            now,
        );
        for observation in &window {
            state.window.insert(observation.key(), observation.price)?;
        }

        let accepted = self.store.observations_after(hotel_id, 0, now);
        if accepted.is_empty() {
            self.hotels.remove(hotel_id);
            return Ok(None);
        }
        if let Some(first) = accepted.first() {
            state.base.observe(first);
        }
        for observation in &accepted {
            state.observe_latest(observation);
        }

        let sequence = self.store.last_sequence(hotel_id);
        state.snapshot = state.build_snapshot(hotel_id, sequence, Trend::Flat);
        let snapshot = state.snapshot.clone();
        self.hotels.insert(hotel_id.clone(), state);

        debug!(hotel_id = %hotel_id, sequence, "Aggregate rebuilt from store");
        Ok(snapshot)
    }

    /// Evicts window members that aged out for hotels with no recent
    /// acceptance; sequence and trend are kept. Returns hotels refreshed.
    pub fn refresh_windows(&self, now: Timestamp) -> usize {
        let window_start = self.window_start(now);
        let mut refreshed = 0;

        for mut entry in self.hotels.iter_mut() {
            if entry.window.evict_before(window_start) == 0 {
                continue;
            }
            let hotel_id = entry.key().clone();
            let state = entry.value_mut();
            if let Some((sequence, trend)) = state.snapshot.as_ref().map(|s| (s.sequence, s.trend)) {
                state.snapshot = state.build_snapshot(&hotel_id, sequence, trend);
            }
            refreshed += 1;
        }

        refreshed
    }

    /// Hourly statistics for `count` consecutive local hours starting at
    /// `start_hour` on `day` (today in the hotel's city when `None`).
    pub fn hour_buckets(
        &self,
        hotel_id: &HotelId,
        day: Option<NaiveDate>,
        start_hour: u32,
        count: u32,
        now: Timestamp,
    ) -> Result<Vec<HourBucket>> {
        if start_hour > 23 {
            return Err(Error::InvalidQuery(format!("start_hour {} is not in 0..=23", start_hour)));
        }
        if count == 0 || count > 24 {
            return Err(Error::InvalidQuery(format!("count {} is not in 1..=24", count)));
        }

        let offset = self.catalog.hotel_offset(hotel_id)?;
        let day = day.unwrap_or_else(|| now.to_local(offset).date_naive());
        let midnight = day
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| offset.from_local_datetime(&naive).single())
            .ok_or_else(|| Error::InvalidQuery(format!("no local midnight for {}", day)))?;

        let first_start = midnight.timestamp() + i64::from(start_hour) * HOUR_SECS;
        let span_end = first_start + i64::from(count) * HOUR_SECS;
        let range = self.store.range(
            hotel_id,
            Timestamp::from_secs(first_start),
            Timestamp::from_secs(span_end),
            now,
        );

        let mut accumulators: Vec<BucketAccumulator> = (0..count).map(|_| BucketAccumulator::default()).collect();
        for observation in &range {
            let index = ((observation.timestamp.as_secs() - first_start) / HOUR_SECS) as usize;
            if let Some(bucket) = accumulators.get_mut(index) {
                bucket.add(observation);
            }
        }

        Ok(accumulators
            .into_iter()
            .enumerate()
            .map(|(i, bucket)| {
                let i = i as u32;
                bucket.finish(
                    (start_hour + i) % 24,
                    Timestamp::from_secs(first_start + i64::from(i) * HOUR_SECS),
                )
            })
            .collect())
    }

    pub(crate) fn catalog(&self) -> &HotelCatalog {
        &self.catalog
    }
}

fn supersedes(held: Option<&PriceObservation>, observation: &PriceObservation) -> bool {
    match held {
        Some(held) => observation.recency() >= held.recency() || held.key() == observation.key(),
        None => true,
    }
}

fn classify_trend(current: Price, prior_average: Option<Price>, epsilon: f64) -> Trend {
    let Some(average) = prior_average else {
        return Trend::Flat;
    };
    let current = current.cents() as f64;
    let average = average.cents() as f64;

    if current > average * (1.0 + epsilon) {
        Trend::Increasing
    } else if current < average * (1.0 - epsilon) {
        Trend::Decreasing
    } else {
        Trend::Flat
    }
}

#[derive(Default)]
struct BucketAccumulator {
    min: Option<Price>,
    max: Option<Price>,
    sum_cents: i64,
    count: u64,
    representative: Option<(Timestamp, u64, Price)>,
}

impl BucketAccumulator {
    fn add(&mut self, observation: &PriceObservation) {
        let price = observation.price;
        self.min = Some(self.min.map_or(price, |m| m.min(price)));
        self.max = Some(self.max.map_or(price, |m| m.max(price)));
        self.sum_cents = self.sum_cents.saturating_add(price.cents());
        self.count += 1;

        let (timestamp, sequence) = observation.recency();
        let newer = self.representative
            .map_or(true, |(ts, seq, _)| (timestamp, sequence) > (ts, seq));
        if newer {
            self.representative = Some((timestamp, sequence, price));
        }
    }

    fn finish(self, hour: u32, starts_at: Timestamp) -> HourBucket {
        HourBucket {
            hour,
            starts_at,
            min: self.min,
            max: self.max,
            avg: Price::average(self.sum_cents, self.count),
            count: self.count,
            representative_price: self.representative.map(|(_, _, price)| price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CityInfo, HotelInfo};
    use crate::store::InMemorySeriesStore;
    use crate::types::ids::SourceId;
    use chrono::FixedOffset;

    const DAY: u64 = 86_400;
    // 2024-05-01T12:00:00Z
    const NOW: i64 = 1_714_564_800;

    fn catalog() -> Arc<HotelCatalog> {
        let mut catalog = HotelCatalog::default();
        catalog.add_city(CityInfo {
            city_id: CityId::from("page-az"),
            name: "Page".to_string(),
            utc_offset: FixedOffset::west_opt(7 * 3600).unwrap(),
        });
        catalog.add_hotel(HotelInfo {
            hotel_id: HotelId::from("budget-inn"),
            city_id: CityId::from("page-az"),
            name: "Budget Inn".to_string(),
            rating: Some(2.5),
            base_price: Some(Price::from_major(100)),
        }).unwrap();
        catalog.add_hotel(HotelInfo {
            hotel_id: HotelId::from("lake-powell-inn"),
            city_id: CityId::from("page-az"),
            name: "Lake Powell Inn".to_string(),
            rating: Some(4.0),
            base_price: None,
        }).unwrap();
        Arc::new(catalog)
    }

    fn setup() -> (Arc<InMemorySeriesStore>, Aggregator) {
        let store = Arc::new(InMemorySeriesStore::new(Duration::from_secs(30 * DAY), 1_000));
        let aggregator = Aggregator::new(store.clone(), catalog(), Duration::from_secs(30 * DAY), 0.01);
        (store, aggregator)
    }

    fn observation(hotel: &str, ts: i64, major: i64, sequence: u64) -> PriceObservation {
        PriceObservation {
            hotel_id: HotelId::from(hotel),
            city_id: CityId::from("page-az"),
            timestamp: Timestamp::from_secs(ts),
            price: Price::from_major(major),
            available: true,
            source_id: SourceId::from("feed"),
            sequence,
            revision: 0,
        }
    }

    fn accept(store: &InMemorySeriesStore, aggregator: &Aggregator, obs: PriceObservation) -> AggregateSnapshot {
        let now = Timestamp::from_secs(NOW);
        store.append(obs.clone(), now).unwrap();
        aggregator.on_accepted(&obs, None, now).unwrap()
    }

    #[test]
    fn computes_window_statistics_and_trend() {
        let (store, aggregator) = setup();

        let first = accept(&store, &aggregator, observation("budget-inn", NOW - 300, 100, 1));
        assert_eq!(first.trend, Trend::Flat);

        let second = accept(&store, &aggregator, observation("budget-inn", NOW - 200, 120, 2));
        assert_eq!(second.trend, Trend::Increasing);

        let third = accept(&store, &aggregator, observation("budget-inn", NOW - 100, 80, 3));
        assert_eq!(third.min_price, Some(Price::from_major(80)));
        assert_eq!(third.max_price, Some(Price::from_major(120)));
        assert_eq!(third.avg_price, Some(Price::from_major(100)));
        assert_eq!(third.trend, Trend::Decreasing);
        assert_eq!(third.current_price, Price::from_major(80));
        assert_eq!(third.pct_change_vs_base, Some(-20.0));
        assert_eq!(third.sequence, 3);
    }

    #[test]
    fn late_observation_updates_window_but_not_current() {
        let (store, aggregator) = setup();
        accept(&store, &aggregator, observation("budget-inn", NOW - 100, 100, 1));
        let snapshot = accept(&store, &aggregator, observation("budget-inn", NOW - 500, 60, 2));

        assert_eq!(snapshot.current_price, Price::from_major(100));
        assert_eq!(snapshot.min_price, Some(Price::from_major(60)));
        assert_eq!(snapshot.sequence, 2);
    }

    #[test]
    fn correction_replaces_previous_version_in_window() {
        let (store, aggregator) = setup();
        let original = observation("budget-inn", NOW - 100, 100, 1);
        accept(&store, &aggregator, original.clone());

        let mut corrected = observation("budget-inn", NOW - 100, 90, 2);
        corrected.revision = 1;
        let snapshot = aggregator
            .on_accepted(&corrected, Some(&original), Timestamp::from_secs(NOW))
            .unwrap();

        assert_eq!(snapshot.window_count, 1);
        assert_eq!(snapshot.current_price, Price::from_major(90));
        assert_eq!(snapshot.max_price, Some(Price::from_major(90)));
    }

    #[test]
    fn first_observation_is_base_without_catalog_price() {
        let (store, aggregator) = setup();
        accept(&store, &aggregator, observation("lake-powell-inn", NOW - 100, 200, 1));
        let snapshot = accept(&store, &aggregator, observation("lake-powell-inn", NOW - 50, 250, 2));

        assert_eq!(snapshot.base_price, Price::from_major(200));
        assert_eq!(snapshot.pct_change_vs_base, Some(25.0));
    }

    #[test]
    fn prepare_has_no_visible_effect_until_commit() {
        let (_store, aggregator) = setup();
        let obs = observation("budget-inn", NOW - 100, 100, 1);
        let prepared = aggregator.prepare(&obs, None, Timestamp::from_secs(NOW)).unwrap();

        assert!(aggregator.snapshot(&obs.hotel_id).is_none());
        aggregator.commit(prepared);
        assert_eq!(aggregator.snapshot(&obs.hotel_id).unwrap().sequence, 1);
    }

    #[test]
    fn empty_window_reports_no_statistics() {
        let (store, aggregator) = setup();
        accept(&store, &aggregator, observation("budget-inn", NOW - 100, 100, 1));

        let later = Timestamp::from_secs(NOW + 31 * DAY as i64);
        assert_eq!(aggregator.refresh_windows(later), 1);

        let snapshot = aggregator.snapshot(&HotelId::from("budget-inn")).unwrap();
        assert_eq!(snapshot.window_count, 0);
        assert_eq!(snapshot.avg_price, None);
        assert_eq!(snapshot.current_price, Price::from_major(100));
    }

    #[test]
    fn rebuild_matches_incremental_state() {
        let (store, aggregator) = setup();
        for (i, major) in [100, 120, 80].into_iter().enumerate() {
            accept(&store, &aggregator, observation("lake-powell-inn", NOW - 300 + i as i64 * 100, major, i as u64 + 1));
        }
        let incremental = aggregator.snapshot(&HotelId::from("lake-powell-inn")).unwrap();

        let fresh = Aggregator::new(store.clone(), catalog(), Duration::from_secs(30 * DAY), 0.01);
        let rebuilt = fresh
            .rebuild(&HotelId::from("lake-powell-inn"), Timestamp::from_secs(NOW))
            .unwrap()
            .unwrap();

        assert_eq!(rebuilt.avg_price, incremental.avg_price);
        assert_eq!(rebuilt.base_price, incremental.base_price);
        assert_eq!(rebuilt.sequence, incremental.sequence);
        assert_eq!(rebuilt.trend, Trend::Flat);
        assert_eq!(rebuilt.source_prices, incremental.source_prices);
        assert_eq!(rebuilt.best_price, incremental.best_price);
    }

    fn sourced(source: &str, ts: i64, major: i64, sequence: u64) -> PriceObservation {
        PriceObservation {
            source_id: SourceId::from(source),
            ..observation("budget-inn", ts, major, sequence)
        }
    }

    #[test]
    fn best_price_is_cheapest_latest_quote_across_sources() {
        let (store, aggregator) = setup();
        accept(&store, &aggregator, sourced("expedia", NOW - 300, 95, 1));
        accept(&store, &aggregator, sourced("booking", NOW - 200, 110, 2));
        // Older expedia quote arriving late does not displace its latest one.
        let snapshot = accept(&store, &aggregator, sourced("expedia", NOW - 400, 70, 3));

        let quotes: Vec<(String, Price)> = snapshot.source_prices
            .iter()
            .map(|q| (q.source_id.to_string(), q.price))
            .collect();
        assert_eq!(quotes, vec![
            ("booking".to_string(), Price::from_major(110)),
            ("expedia".to_string(), Price::from_major(95)),
        ]);
        let best = snapshot.best_price.unwrap();
        assert_eq!(best.source_id, SourceId::from("expedia"));
        assert_eq!(best.price, Price::from_major(95));
        assert_eq!(snapshot.current_price, Price::from_major(110));
    }

    #[test]
    fn best_price_follows_corrections_and_availability() {
        let (store, aggregator) = setup();
        let expedia = sourced("expedia", NOW - 300, 95, 1);
        accept(&store, &aggregator, expedia.clone());
        accept(&store, &aggregator, sourced("booking", NOW - 200, 110, 2));

        let mut sold_out = sourced("expedia", NOW - 300, 95, 3);
        sold_out.available = false;
        sold_out.revision = 1;
        let snapshot = aggregator
            .on_accepted(&sold_out, Some(&expedia), Timestamp::from_secs(NOW))
            .unwrap();

        let best = snapshot.best_price.unwrap();
        assert_eq!(best.source_id, SourceId::from("booking"));
        assert_eq!(best.price, Price::from_major(110));
        assert_eq!(snapshot.source_prices.len(), 2);
        assert!(!snapshot.source_prices[1].available);
    }

    #[test]
    fn hour_buckets_use_city_local_time() {
        let (store, aggregator) = setup();
        // 09:10 and 09:40 local (UTC-7) on 2024-05-01, then 11:05
        let nine_local = 1_714_579_200;
        accept(&store, &aggregator, observation("budget-inn", nine_local + 600, 100, 1));
        accept(&store, &aggregator, observation("budget-inn", nine_local + 2_400, 140, 2));
        accept(&store, &aggregator, observation("budget-inn", nine_local + 7_500, 90, 3));

        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let buckets = aggregator
            .hour_buckets(&HotelId::from("budget-inn"), Some(day), 9, 3, Timestamp::from_secs(NOW + DAY as i64))
            .unwrap();

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].hour, 9);
        assert_eq!(buckets[0].starts_at, Timestamp::from_secs(nine_local));
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[0].avg, Some(Price::from_major(120)));
        assert_eq!(buckets[0].representative_price, Some(Price::from_major(140)));
        assert_eq!(buckets[1].count, 0);
        assert_eq!(buckets[1].representative_price, None);
        assert_eq!(buckets[2].min, Some(Price::from_major(90)));
    }

    #[test]
    fn hour_buckets_reject_unknown_hotel_and_bad_hours() {
        let (_store, aggregator) = setup();
        let now = Timestamp::from_secs(NOW);

        assert!(matches!(
            aggregator.hour_buckets(&HotelId::from("nowhere"), None, 9, 14, now),
            Err(Error::HotelNotFound(_))
        ));
        assert!(matches!(
            aggregator.hour_buckets(&HotelId::from("budget-inn"), None, 24, 1, now),
            Err(Error::InvalidQuery(_))
        ));
    }
}

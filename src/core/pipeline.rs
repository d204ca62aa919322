use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use crate::aggregation::{Aggregator, CityStatistics};
use crate::alerts::{AlertBook, TracingNotifier};
use crate::catalog::{HotelCatalog, HotelInfo};
use crate::config::loader::AppConfig;
use crate::core::janitor::Janitor;
use crate::error::{Error, Result};
use crate::events::observation::{PricePoint, RawObservation};
use crate::events::snapshot::{AggregateSnapshot, HourBucket};
use crate::feeds::{build_connector, FeedRunner};
use crate::ingestion::{IngestionGate, ObservationValidator, SubmitOutcome};
use crate::interfaces::notifier::Notifier;
use crate::interfaces::series_store::SeriesStore;
use crate::store::InMemorySeriesStore;
use crate::subscription::SubscriptionHub;
use crate::types::ids::{CityId, HotelId};
use crate::types::timestamp::Timestamp;
use crate::utils::clock::Clock;
use crate::utils::task_supervisor::TaskSupervisor;

/// Hotel entry of a city listing with its cached aggregate.
#[derive(Clone, Debug, Serialize)]
pub struct HotelListing {
    #[serde(flatten)]
    pub hotel: HotelInfo,
    pub snapshot: Option<AggregateSnapshot>,
}

/// Owns every component of the price feed and wires them together.
pub struct PriceFeedCore {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    catalog: Arc<HotelCatalog>,
    store: Arc<dyn SeriesStore>,
    aggregator: Arc<Aggregator>,
    hub: Arc<SubscriptionHub>,
    gate: Arc<IngestionGate>,
    alerts: Arc<AlertBook>,
}

impl PriceFeedCore {
    pub fn new(config: AppConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_notifier(config, clock, Arc::new(TracingNotifier))
    }

    pub fn with_notifier(config: AppConfig, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Result<Self> {
        config.validate()?;
        let catalog = Arc::new(HotelCatalog::from_config(&config.catalog)?);

        let store: Arc<dyn SeriesStore> = Arc::new(InMemorySeriesStore::new(
            config.feed.retention(),
            config.feed.max_points_per_series,
        ));
        let aggregator = Arc::new(Aggregator::new(
            store.clone(),
            catalog.clone(),
            config.feed.rolling_window(),
            config.feed.trend_epsilon,
        ));
        let hub = Arc::new(SubscriptionHub::new(
            store.clone(),
            aggregator.clone(),
            clock.clone(),
            config.subscriptions.clone(),
        ));
        let gate = Arc::new(IngestionGate::new(
            ObservationValidator::new(catalog.clone(), config.feed.clock_skew_tolerance()),
            store.clone(),
            aggregator.clone(),
            hub.clone(),
            clock.clone(),
        ));
        let alerts = Arc::new(AlertBook::new(
            aggregator.clone(),
            notifier,
            clock.clone(),
            config.alerts.notify_cooldown(),
        ));

        info!(
            cities = config.catalog.cities.len(),
            hotels = config.catalog.hotels.len(),
            "Price feed core initialised"
        );

        Ok(PriceFeedCore {
            config,
            clock,
            catalog,
            store,
            aggregator,
            hub,
            gate,
            alerts,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &HotelCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn SeriesStore> {
        &self.store
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    pub fn hub(&self) -> &Arc<SubscriptionHub> {
        &self.hub
    }

    pub fn gate(&self) -> &Arc<IngestionGate> {
        &self.gate
    }

    pub fn alerts(&self) -> &Arc<AlertBook> {
        &self.alerts
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now_timestamp()
    }

    pub async fn submit(&self, raw: RawObservation) -> Result<SubmitOutcome> {
        self.gate.submit(raw).await
    }

    fn require_hotel(&self, hotel_id: &HotelId) -> Result<&HotelInfo> {
        self.catalog
            .hotel(hotel_id)
            .ok_or_else(|| Error::HotelNotFound(hotel_id.clone()))
    }

    pub fn hotels_in_city(&self, city_id: &CityId) -> Result<Vec<HotelListing>> {
        let mut listings: Vec<HotelListing> = self.catalog
            .hotels_in_city(city_id)?
            .into_iter()
            .map(|hotel| HotelListing {
                hotel: hotel.clone(),
                snapshot: self.aggregator.snapshot(&hotel.hotel_id),
            })
            .collect();
        listings.sort_by(|a, b| a.hotel.name.cmp(&b.hotel.name));
        Ok(listings)
    }

    /// Stored points with `from <= date < to`; open bounds cover all retained data.
    pub fn price_history(
        &self,
        hotel_id: &HotelId,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<PricePoint>> {
        self.require_hotel(hotel_id)?;
        let from = from.unwrap_or(Timestamp::from_secs(i64::MIN));
        let to = to.unwrap_or(Timestamp::from_secs(i64::MAX));
        if from > to {
            return Err(Error::InvalidQuery(format!("from {} is after to {}", from, to)));
        }

        let range = self.store.range(hotel_id, from, to, self.now());
        Ok(range.iter().map(PricePoint::from).collect())
    }

    pub fn price_trends(&self, hotel_id: &HotelId) -> Result<AggregateSnapshot> {
        self.require_hotel(hotel_id)?;
        self.aggregator
            .snapshot(hotel_id)
            .ok_or_else(|| Error::NoPriceData(hotel_id.clone()))
    }

    pub fn hour_buckets(
        &self,
        hotel_id: &HotelId,
        day: Option<NaiveDate>,
        start_hour: Option<u32>,
        count: Option<u32>,
    ) -> Result<Vec<HourBucket>> {
        self.aggregator.hour_buckets(
            hotel_id,
            day,
            start_hour.unwrap_or(self.config.feed.hour_bucket_start),
            count.unwrap_or(self.config.feed.hour_bucket_count),
            self.now(),
        )
    }

    pub fn city_statistics(&self, city_id: &CityId) -> Result<CityStatistics> {
        self.aggregator.city_statistics(city_id)
    }

    /// Spawns enabled feeds, the janitor and the alert checker.
    pub fn spawn_background_tasks(&self, supervisor: &mut TaskSupervisor) {
        for source in self.config.sources.iter().filter(|s| s.enabled) {
            let connector = build_connector(source, &self.catalog, self.clock.clone());
            let runner = FeedRunner::new(
                connector,
                self.gate.clone(),
                source.max_reconnect_attempts,
                source.reconnect_backoff(),
            );
            let source_id = source.source_id.clone();
            supervisor.spawn(format!("feed:{}", source_id), async move {
                if let Err(e) = runner.run().await {
                    tracing::error!(source_id = %source_id, "Feed stopped: {}", e);
                }
            });
        }

        let janitor = Janitor::new(
            self.gate.clone(),
            self.hub.clone(),
            self.aggregator.clone(),
            self.clock.clone(),
            self.config.feed.purge_interval(),
        );
        supervisor.spawn("janitor", janitor.run());

        let alerts = self.alerts.clone();
        let interval = self.config.alerts.check_interval();
        supervisor.spawn("alert_checker", async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                alerts.check_alerts().await;
            }
        });
    }
}

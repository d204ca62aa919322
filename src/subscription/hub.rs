use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::aggregation::Aggregator;
use crate::config::SubscriptionConfig;
use crate::error::{Error, Result};
use crate::events::stream::{PriceUpdate, StreamMessage};
use crate::interfaces::series_store::SeriesStore;
use crate::observability::metrics::{ACTIVE_SUBSCRIBERS, RESYNC_SIGNALS, SUBSCRIPTIONS_EXPIRED};
use crate::observability::tracing::trace_fanout;
use crate::subscription::backlog::UpdateBacklog;
use crate::subscription::subscriber::{Delivery, Subscriber, Subscription};
use crate::subscription::{Scope, SubscriptionState};
use crate::types::ids::{CityId, ClientId, HotelId};
use crate::types::timestamp::Timestamp;
use crate::utils::clock::Clock;

/// Fan-out of accepted observations to streaming clients.
///
/// `publish` never blocks on a client: every subscriber has its own queue,
/// drained by the client's transport task.
pub struct SubscriptionHub {
    store: Arc<dyn SeriesStore>,
    aggregator: Arc<Aggregator>,
    clock: Arc<dyn Clock>,
    config: SubscriptionConfig,
    subscribers: DashMap<ClientId, Arc<Subscriber>>,
    index: DashMap<Scope, HashSet<ClientId>>,
    backlogs: DashMap<HotelId, UpdateBacklog>,
    attachments: AtomicU64,
}

impl SubscriptionHub {
    pub fn new(
        store: Arc<dyn SeriesStore>,
        aggregator: Arc<Aggregator>,
        clock: Arc<dyn Clock>,
        config: SubscriptionConfig,
    ) -> Self {
        SubscriptionHub {
            store,
            aggregator,
            clock,
            config,
            subscribers: DashMap::new(),
            index: DashMap::new(),
            backlogs: DashMap::new(),
            attachments: AtomicU64::new(0),
        }
    }

    fn next_generation(&self) -> u64 {
        self.attachments.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn hotels_in_scope(&self, scope: &Scope) -> Result<Vec<HotelId>> {
        let catalog = self.aggregator.catalog();
        match scope {
            Scope::Hotel(hotel_id) => catalog
                .hotel(hotel_id)
                .map(|h| vec![h.hotel_id.clone()])
                .ok_or_else(|| Error::HotelNotFound(hotel_id.clone())),
            Scope::City(city_id) => catalog.hotel_ids_in_city(city_id),
        }
    }

    fn subscriber(&self, client_id: &ClientId) -> Option<Arc<Subscriber>> {
        self.subscribers.get(client_id).map(|s| Arc::clone(&s))
    }

    /// Starts a subscription with a catch-up burst: the current snapshot and
    /// the most recent observations of every hotel in scope. Any existing
    /// subscription for `client_id` is replaced.
    pub fn subscribe(&self, client_id: ClientId, scope: Scope) -> Result<Subscription> {
        let hotels = self.hotels_in_scope(&scope)?;
        let now = self.clock.now_timestamp();

        self.remove(&client_id);
        let subscriber = Arc::new(Subscriber::new(client_id, scope.clone(), self.config.queue_capacity, now));
        let subscription = subscriber.attach(self.next_generation(), now);
        self.index.entry(scope.clone()).or_default().insert(client_id);
        self.subscribers.insert(client_id, subscriber.clone());

        let mut replayed = 0;
        for hotel_id in &hotels {
            replayed += self.send_burst(&subscriber, hotel_id, now);
        }
        let replayed = subscriber.finish_catch_up(replayed);
        self.update_gauge();

        info!(client_id = %client_id, scope = %scope, replayed, "Subscription started");
        Ok(subscription)
    }

    fn send_burst(&self, subscriber: &Subscriber, hotel_id: &HotelId, now: Timestamp) -> usize {
        let Some(snapshot) = self.aggregator.snapshot(hotel_id) else {
            subscriber.ensure_cursor(hotel_id);
            return 0;
        };

        let recent = self.store.recent(hotel_id, self.config.catch_up_burst, now);
        subscriber.enqueue_catch_up(StreamMessage::Snapshot {
            hotel_id: hotel_id.clone(),
            snapshot: snapshot.clone(),
        });

        recent
            .iter()
            .filter(|o| o.sequence <= snapshot.sequence)
            .filter(|o| {
                subscriber.enqueue_catch_up(StreamMessage::PriceUpdate(PriceUpdate::new(o, snapshot.clone())))
            })
            .count()
    }

    /// Reattaches a disconnected client and replays, per hotel, every update
    /// after its cursor.
    pub fn resume(&self, client_id: ClientId) -> Result<Subscription> {
        let now = self.clock.now_timestamp();
        let subscriber = self.subscriber(&client_id)
            .ok_or(Error::SubscriptionNotFound(client_id))?;

        if subscriber.is_expired(now, self.config.disconnect_grace()) {
            self.remove(&client_id);
            SUBSCRIPTIONS_EXPIRED.inc();
            info!(client_id = %client_id, "Resume refused, subscription expired");
            return Err(Error::SubscriptionExpired(client_id));
        }

        let hotels = self.hotels_in_scope(subscriber.scope())?;
        let subscription = subscriber.attach(self.next_generation(), now);

        let mut replayed = 0;
        for hotel_id in &hotels {
            replayed += match subscriber.cursor(hotel_id) {
                Some(cursor) => self.replay_after(&subscriber, hotel_id, cursor, now),
                None => self.send_burst(&subscriber, hotel_id, now),
            };
        }
        let replayed = subscriber.finish_catch_up(replayed);
        self.update_gauge();

        info!(client_id = %client_id, replayed, "Subscription resumed");
        Ok(subscription)
    }

    fn replay_after(&self, subscriber: &Subscriber, hotel_id: &HotelId, cursor: u64, now: Timestamp) -> usize {
        let from_backlog = self.backlogs
            .get(hotel_id)
            .and_then(|backlog| backlog.since(cursor));

        let updates = match from_backlog {
            Some(updates) => updates,
            None => {
                // Backlog no longer reaches the cursor; rebuild from the store.
                let Some(snapshot) = self.aggregator.snapshot(hotel_id) else {
                    return 0;
                };
                debug!(hotel_id = %hotel_id, cursor, "Replaying from store");
                self.store
                    .observations_after(hotel_id, cursor, now)
                    .iter()
                    .filter(|o| o.sequence <= snapshot.sequence)
                    .map(|o| PriceUpdate::new(o, snapshot.clone()))
                    .collect()
            }
        };

        updates
            .into_iter()
            .filter(|update| subscriber.enqueue_catch_up(StreamMessage::PriceUpdate(update.clone())))
            .count()
    }

    /// Fans an accepted observation out to every subscriber covering its hotel.
    pub fn publish(&self, update: PriceUpdate) {
        let _span = trace_fanout(&update.hotel_id, update.sequence).entered();

        // Backlog first, so a concurrent resume either replays it or buffers it.
        self.backlogs
            .entry(update.hotel_id.clone())
            .or_insert_with(|| UpdateBacklog::new(self.config.backlog_per_hotel))
            .push(update.clone());

        let now = self.clock.now_timestamp();
        for client_id in self.interested(&update.hotel_id, &update.city_id) {
            let Some(subscriber) = self.subscriber(&client_id) else {
                continue;
            };
            match subscriber.deliver(&update, now) {
                Delivery::Lagged => {
                    RESYNC_SIGNALS.inc();
                    warn!(client_id = %client_id, hotel_id = %update.hotel_id, "Subscriber queue full, resync required");
                }
                Delivery::Closed => {
                    debug!(client_id = %client_id, "Subscriber receiver dropped, marked disconnected");
                }
                Delivery::Delivered | Delivery::Buffered | Delivery::Skipped => {}
            }
        }
    }

    fn interested(&self, hotel_id: &HotelId, city_id: &CityId) -> Vec<ClientId> {
        let mut clients = Vec::new();
        for scope in [Scope::Hotel(hotel_id.clone()), Scope::City(city_id.clone())] {
            if let Some(ids) = self.index.get(&scope) {
                clients.extend(ids.iter().copied());
            }
        }
        clients
    }

    /// Stops delivery and keeps the cursor for the grace period.
    pub fn disconnect(&self, client_id: ClientId) -> Result<()> {
        let subscriber = self.subscriber(&client_id)
            .ok_or(Error::SubscriptionNotFound(client_id))?;
        subscriber.detach(self.clock.now_timestamp());
        info!(client_id = %client_id, "Subscriber disconnected");
        Ok(())
    }

    /// Disconnects on behalf of a closing transport. A no-op when the client
    /// has since been resumed or resubscribed by another connection.
    pub fn release(&self, subscription: &Subscription) -> bool {
        let client_id = subscription.client_id();
        let Some(subscriber) = self.subscriber(&client_id) else {
            return false;
        };
        let released = subscriber.detach_generation(subscription.generation(), self.clock.now_timestamp());
        if released {
            info!(client_id = %client_id, "Subscriber disconnected");
        } else {
            debug!(client_id = %client_id, "Stale connection closed, subscription kept");
        }
        released
    }

    pub fn unsubscribe(&self, client_id: ClientId) -> Result<()> {
        if !self.remove(&client_id) {
            return Err(Error::SubscriptionNotFound(client_id));
        }
        self.update_gauge();
        info!(client_id = %client_id, "Unsubscribed");
        Ok(())
    }

    fn remove(&self, client_id: &ClientId) -> bool {
        let Some((_, subscriber)) = self.subscribers.remove(client_id) else {
            return false;
        };
        if let Some(mut ids) = self.index.get_mut(subscriber.scope()) {
            ids.remove(client_id);
        }
        self.index.remove_if(subscriber.scope(), |_, ids| ids.is_empty());
        subscriber.close();
        true
    }

    /// Drops subscriptions disconnected for longer than the grace period.
    pub fn expire_disconnected(&self, now: Timestamp) -> usize {
        let grace = self.config.disconnect_grace();
        let expired: Vec<ClientId> = self.subscribers
            .iter()
            .filter(|entry| {
                entry.value().detach_if_closed(now);
                entry.value().is_expired(now, grace)
            })
            .map(|entry| *entry.key())
            .collect();

        let removed = expired.iter().filter(|id| self.remove(id)).count();
        if removed > 0 {
            SUBSCRIPTIONS_EXPIRED.inc_by(removed as u64);
            self.update_gauge();
            info!(removed, "Expired disconnected subscriptions");
        }
        removed
    }

    /// Drops backlogs whose newest update is past the retention horizon.
    /// Replays for those hotels fall back to the store.
    pub fn prune_backlogs(&self, now: Timestamp) -> usize {
        let horizon = self.store.retention_horizon(now);
        let mut pruned = 0;
        self.backlogs.retain(|_, backlog| {
            let live = backlog.newest_timestamp().is_some_and(|ts| ts >= horizon);
            if !live {
                pruned += 1;
            }
            live
        });
        if pruned > 0 {
            debug!(pruned, "Pruned stale update backlogs");
        }
        pruned
    }

    pub fn state(&self, client_id: &ClientId) -> Option<SubscriptionState> {
        let subscriber = self.subscriber(client_id)?;
        Some(subscriber.state(self.clock.now_timestamp(), self.config.disconnect_grace()))
    }

    pub fn connected_at(&self, client_id: &ClientId) -> Option<Timestamp> {
        self.subscriber(client_id).map(|s| s.connected_at())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn update_gauge(&self) {
        ACTIVE_SUBSCRIBERS.set(self.subscribers.len() as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CityInfo, HotelCatalog, HotelInfo};
    use crate::events::observation::PriceObservation;
    use crate::store::InMemorySeriesStore;
    use crate::types::ids::SourceId;
    use crate::types::price::Price;
    use crate::utils::clock::ManualClock;
    use chrono::FixedOffset;
    use std::time::Duration;

    const NOW: i64 = 1_714_564_800;

    struct Fixture {
        store: Arc<InMemorySeriesStore>,
        aggregator: Arc<Aggregator>,
        clock: Arc<ManualClock>,
        hub: SubscriptionHub,
        next_sequence: u64,
    }

    impl Fixture {
        fn new(config: SubscriptionConfig) -> Self {
            let mut catalog = HotelCatalog::default();
            catalog.add_city(CityInfo {
                city_id: CityId::from("page-az"),
                name: "Page".to_string(),
                utc_offset: FixedOffset::west_opt(7 * 3600).unwrap(),
            });
            for id in ["budget-inn", "lake-powell-inn"] {
                catalog.add_hotel(HotelInfo {
                    hotel_id: HotelId::from(id),
                    city_id: CityId::from("page-az"),
                    name: id.to_string(),
                    rating: None,
                    base_price: None,
                }).unwrap();
            }
            let store = Arc::new(InMemorySeriesStore::new(Duration::from_secs(86_400), 10_000));
            let aggregator = Arc::new(Aggregator::new(
                store.clone(),
                Arc::new(catalog),
                Duration::from_secs(86_400),
                0.01,
            ));
            let clock = Arc::new(ManualClock::at(Timestamp::from_secs(NOW)));
            let hub = SubscriptionHub::new(store.clone(), aggregator.clone(), clock.clone(), config);
            Fixture { store, aggregator, clock, hub, next_sequence: 0 }
        }

        fn accept(&mut self, hotel: &str, offset: i64, major: i64) -> u64 {
            self.next_sequence += 1;
            let now = self.clock.now_timestamp();
            let observation = PriceObservation {
                hotel_id: HotelId::from(hotel),
                city_id: CityId::from("page-az"),
                timestamp: Timestamp::from_secs(NOW + offset),
                price: Price::from_major(major),
                available: true,
                source_id: SourceId::from("feed"),
                sequence: self.next_sequence,
                revision: 0,
            };
            self.store.append(observation.clone(), now).unwrap();
            let snapshot = self.aggregator.on_accepted(&observation, None, now).unwrap();
            self.hub.publish(PriceUpdate::new(&observation, snapshot));
            self.next_sequence
        }
    }

    fn drain(subscription: &mut Subscription) -> Vec<StreamMessage> {
        let mut messages = Vec::new();
        while let Some(message) = subscription.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[test]
    fn burst_sends_snapshot_recent_history_then_caught_up() {
        let mut fx = Fixture::new(SubscriptionConfig { catch_up_burst: 2, ..Default::default() });
        fx.accept("budget-inn", -30, 100);
        fx.accept("budget-inn", -20, 110);
        fx.accept("budget-inn", -10, 120);

        let client = ClientId::new();
        let mut subscription = fx.hub.subscribe(client, Scope::Hotel(HotelId::from("budget-inn"))).unwrap();
        let messages = drain(&mut subscription);

        assert!(matches!(&messages[0], StreamMessage::Snapshot { snapshot, .. } if snapshot.sequence == 3));
        let replayed: Vec<u64> = messages.iter().filter_map(|m| match m {
            StreamMessage::PriceUpdate(u) => Some(u.sequence),
            _ => None,
        }).collect();
        assert_eq!(replayed, vec![2, 3]);
        assert_eq!(messages.last(), Some(&StreamMessage::CaughtUp { replayed: 2 }));
        assert_eq!(fx.hub.state(&client), Some(SubscriptionState::CaughtUp));
    }

    #[test]
    fn city_scope_receives_every_hotel_in_city() {
        let mut fx = Fixture::new(SubscriptionConfig::default());
        let mut subscription = fx.hub.subscribe(ClientId::new(), Scope::City(CityId::from("page-az"))).unwrap();
        drain(&mut subscription);

        fx.accept("budget-inn", 0, 100);
        fx.accept("lake-powell-inn", 0, 200);

        let hotels: Vec<String> = drain(&mut subscription).into_iter().filter_map(|m| match m {
            StreamMessage::PriceUpdate(u) => Some(u.hotel_id.to_string()),
            _ => None,
        }).collect();
        assert_eq!(hotels, vec!["budget-inn", "lake-powell-inn"]);
    }

    #[test]
    fn overflow_signals_resync_once() {
        let mut fx = Fixture::new(SubscriptionConfig { queue_capacity: 3, ..Default::default() });
        let client = ClientId::new();
        let mut subscription = fx.hub.subscribe(client, Scope::Hotel(HotelId::from("budget-inn"))).unwrap();
        drain(&mut subscription);

        for i in 0..6 {
            fx.accept("budget-inn", i, 100 + i);
        }
        let messages = drain(&mut subscription);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages.iter().filter(|m| **m == StreamMessage::ResyncRequired).count(), 1);
        assert_eq!(messages.last(), Some(&StreamMessage::ResyncRequired));
        assert_eq!(fx.hub.state(&client), Some(SubscriptionState::Lagging));

        fx.accept("budget-inn", 10, 200);
        assert!(drain(&mut subscription).is_empty());
    }

    #[test]
    fn catch_up_burst_does_not_count_against_capacity() {
        let mut fx = Fixture::new(SubscriptionConfig { queue_capacity: 3, ..Default::default() });
        for i in 0..5 {
            fx.accept("budget-inn", i - 100, 100 + i);
            fx.accept("lake-powell-inn", i - 100, 200 + i);
        }
        let client = ClientId::new();
        let mut subscription = fx.hub.subscribe(client, Scope::City(CityId::from("page-az"))).unwrap();
        assert_eq!(subscription.queued(), 13);

        for i in 0..3 {
            fx.accept("budget-inn", i, 150 + i);
        }
        assert_eq!(fx.hub.state(&client), Some(SubscriptionState::CaughtUp));
        fx.accept("budget-inn", 10, 160);
        assert_eq!(fx.hub.state(&client), Some(SubscriptionState::Lagging));

        let messages = drain(&mut subscription);
        let caught_up = messages
            .iter()
            .position(|m| matches!(m, StreamMessage::CaughtUp { .. }))
            .unwrap();
        let live: Vec<&StreamMessage> = messages[caught_up + 1..].iter().collect();
        assert_eq!(live.len(), 4);
        assert!(live[..3].iter().all(|m| matches!(m, StreamMessage::PriceUpdate(_))));
        assert_eq!(live[3], &StreamMessage::ResyncRequired);
    }

    #[test]
    fn stale_connection_release_keeps_newer_attachment() {
        let mut fx = Fixture::new(SubscriptionConfig::default());
        let client = ClientId::new();
        let scope = Scope::Hotel(HotelId::from("budget-inn"));
        let first = fx.hub.subscribe(client, scope).unwrap();
        fx.hub.disconnect(client).unwrap();

        let mut second = fx.hub.resume(client).unwrap();
        drain(&mut second);
        assert!(!fx.hub.release(&first));
        assert_eq!(fx.hub.state(&client), Some(SubscriptionState::CaughtUp));

        fx.accept("budget-inn", 0, 100);
        assert!(matches!(second.try_recv(), Some(StreamMessage::PriceUpdate(u)) if u.price == Price::from_major(100)));

        assert!(fx.hub.release(&second));
        assert_eq!(fx.hub.state(&client), Some(SubscriptionState::Disconnected));
    }

    #[test]
    fn release_after_resubscribe_is_a_no_op() {
        let fx = Fixture::new(SubscriptionConfig::default());
        let client = ClientId::new();
        let scope = Scope::Hotel(HotelId::from("budget-inn"));
        let first = fx.hub.subscribe(client, scope.clone()).unwrap();
        let _second = fx.hub.subscribe(client, scope).unwrap();

        assert!(!fx.hub.release(&first));
        assert_eq!(fx.hub.state(&client), Some(SubscriptionState::CaughtUp));
    }

    #[test]
    fn resume_replays_from_cursor_without_gaps() {
        let mut fx = Fixture::new(SubscriptionConfig::default());
        let client = ClientId::new();
        let mut subscription = fx.hub.subscribe(client, Scope::Hotel(HotelId::from("budget-inn"))).unwrap();
        drain(&mut subscription);

        fx.accept("budget-inn", 0, 100);
        fx.accept("budget-inn", 1, 101);
        // Received only the first update before the connection dropped.
        assert!(matches!(subscription.try_recv(), Some(StreamMessage::PriceUpdate(u)) if u.sequence == 1));
        drop(subscription);
        fx.hub.disconnect(client).unwrap();

        fx.accept("budget-inn", 2, 102);
        fx.clock.advance(Duration::from_secs(60));

        let mut resumed = fx.hub.resume(client).unwrap();
        let sequences: Vec<u64> = drain(&mut resumed).into_iter().filter_map(|m| match m {
            StreamMessage::PriceUpdate(u) => Some(u.sequence),
            _ => None,
        }).collect();
        assert_eq!(sequences, vec![2, 3]);
    }

    #[test]
    fn resume_falls_back_to_store_when_backlog_is_short() {
        let mut fx = Fixture::new(SubscriptionConfig { backlog_per_hotel: 1, ..Default::default() });
        let client = ClientId::new();
        let mut subscription = fx.hub.subscribe(client, Scope::Hotel(HotelId::from("budget-inn"))).unwrap();
        drain(&mut subscription);
        drop(subscription);
        fx.hub.disconnect(client).unwrap();

        fx.accept("budget-inn", 0, 100);
        fx.accept("budget-inn", 1, 101);
        fx.accept("budget-inn", 2, 102);

        let mut resumed = fx.hub.resume(client).unwrap();
        let sequences: Vec<u64> = drain(&mut resumed).into_iter().filter_map(|m| match m {
            StreamMessage::PriceUpdate(u) => Some(u.sequence),
            _ => None,
        }).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[test]
    fn resume_after_grace_is_expired() {
        let fx = Fixture::new(SubscriptionConfig::default());
        let client = ClientId::new();
        let subscription = fx.hub.subscribe(client, Scope::Hotel(HotelId::from("budget-inn"))).unwrap();
        drop(subscription);
        fx.hub.disconnect(client).unwrap();

        fx.clock.advance(Duration::from_secs(301));
        assert_eq!(fx.hub.state(&client), Some(SubscriptionState::Expired));
        assert!(matches!(fx.hub.resume(client), Err(Error::SubscriptionExpired(_))));
        assert_eq!(fx.hub.subscriber_count(), 0);
    }

    #[test]
    fn janitor_expiry_removes_dropped_receivers() {
        let fx = Fixture::new(SubscriptionConfig::default());
        let subscription = fx.hub.subscribe(ClientId::new(), Scope::Hotel(HotelId::from("budget-inn"))).unwrap();
        drop(subscription);

        let now = Timestamp::from_secs(NOW);
        assert_eq!(fx.hub.expire_disconnected(now), 0);
        assert_eq!(fx.hub.expire_disconnected(Timestamp::from_secs(NOW + 301)), 1);
        assert_eq!(fx.hub.subscriber_count(), 0);
    }

    #[test]
    fn backlogs_past_retention_are_pruned() {
        let mut fx = Fixture::new(SubscriptionConfig::default());
        fx.accept("budget-inn", -100, 100);
        fx.accept("lake-powell-inn", 0, 200);
        let now = Timestamp::from_secs(NOW);
        assert_eq!(fx.hub.prune_backlogs(now), 0);

        // Store retention is one day; only budget-inn's update falls behind it.
        assert_eq!(fx.hub.prune_backlogs(Timestamp::from_secs(NOW + 86_350)), 1);
        assert_eq!(fx.hub.backlogs.len(), 1);
        assert!(fx.hub.backlogs.contains_key(&HotelId::from("lake-powell-inn")));
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let fx = Fixture::new(SubscriptionConfig::default());
        assert!(matches!(
            fx.hub.subscribe(ClientId::new(), Scope::Hotel(HotelId::from("nowhere"))),
            Err(Error::HotelNotFound(_))
        ));
        assert!(matches!(fx.hub.unsubscribe(ClientId::new()), Err(Error::SubscriptionNotFound(_))));
    }
}

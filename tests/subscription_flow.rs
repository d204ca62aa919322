mod common;

use common::*;
use std::time::Duration;
use hotel_price_feed::config::catalog::HotelConfig;
use hotel_price_feed::error::Error;
use hotel_price_feed::events::stream::StreamMessage;
use hotel_price_feed::subscription::{Scope, Subscription, SubscriptionState};
use hotel_price_feed::types::ids::{CityId, ClientId, HotelId};
use hotel_price_feed::types::price::Price;

fn drain(subscription: &mut Subscription) -> Vec<StreamMessage> {
    let mut messages = Vec::new();
    while let Some(message) = subscription.try_recv() {
        messages.push(message);
    }
    messages
}

fn update_sequences(messages: &[StreamMessage]) -> Vec<(String, u64)> {
    messages
        .iter()
        .filter_map(|m| match m {
            StreamMessage::PriceUpdate(u) => Some((u.hotel_id.to_string(), u.sequence)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn subscriber_sees_burst_then_live_updates() {
    let (_clock, core) = core();
    core.submit(raw("budget-inn", 60, 100)).await.unwrap();
    core.submit(raw("budget-inn", 50, 105)).await.unwrap();

    let client = ClientId::new();
    let mut subscription = core.hub().subscribe(client, Scope::City(CityId::from(CITY))).unwrap();
    let burst = drain(&mut subscription);

    assert!(matches!(
        &burst[0],
        StreamMessage::Snapshot { hotel_id, snapshot } if hotel_id.as_str() == "budget-inn" && snapshot.sequence == 2
    ));
    assert_eq!(update_sequences(&burst), vec![("budget-inn".to_string(), 1), ("budget-inn".to_string(), 2)]);
    assert_eq!(burst.last(), Some(&StreamMessage::CaughtUp { replayed: 2 }));

    core.submit(raw("lake-powell-inn", 5, 260)).await.unwrap();
    core.submit(raw("budget-inn", 5, 95)).await.unwrap();

    let live = drain(&mut subscription);
    assert_eq!(
        update_sequences(&live),
        vec![("lake-powell-inn".to_string(), 1), ("budget-inn".to_string(), 3)]
    );
    assert_eq!(subscription.cursor(&HotelId::from("budget-inn")), Some(3));
    assert_eq!(core.hub().state(&client), Some(SubscriptionState::CaughtUp));
}

#[tokio::test]
async fn only_accepted_changes_are_fanned_out() {
    let (_clock, core) = core();
    let mut subscription = core.hub()
        .subscribe(ClientId::new(), Scope::Hotel(HotelId::from("budget-inn")))
        .unwrap();
    drain(&mut subscription);

    core.submit(raw("budget-inn", 30, 100)).await.unwrap();
    core.submit(raw("budget-inn", 30, 100)).await.unwrap();
    assert!(core.submit(raw("budget-inn", -600, 100)).await.is_err());
    core.submit(raw("budget-inn", 30, 97)).await.unwrap();
    core.submit(raw("lake-powell-inn", 30, 300)).await.unwrap();

    let updates: Vec<_> = drain(&mut subscription)
        .into_iter()
        .filter_map(|m| match m {
            StreamMessage::PriceUpdate(u) => Some(u),
            _ => None,
        })
        .collect();
    assert_eq!(updates.len(), 2);
    assert!(!updates[0].corrected);
    assert!(updates[1].corrected);
    assert_eq!(updates[1].price, Price::from_major(97));
    assert_eq!(updates[1].snapshot.current_price, Price::from_major(97));
}

#[tokio::test]
async fn price_update_wire_shape() {
    let (_clock, core) = core();
    let mut subscription = core.hub()
        .subscribe(ClientId::new(), Scope::Hotel(HotelId::from("budget-inn")))
        .unwrap();
    drain(&mut subscription);

    core.submit(raw("budget-inn", 0, 120)).await.unwrap();
    let message = subscription.try_recv().unwrap();
    let json = serde_json::to_value(&message).unwrap();

    assert_eq!(json["type"], "price_update");
    assert_eq!(json["hotel_id"], "budget-inn");
    assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
    assert_eq!(json["price"], 12_000);
    assert_eq!(json["corrected"], false);
    assert_eq!(json["snapshot"]["current_price"], 12_000);

    let resync = serde_json::to_value(StreamMessage::ResyncRequired).unwrap();
    assert_eq!(resync, serde_json::json!({ "type": "resync_required" }));
}

#[tokio::test]
async fn reconnect_within_grace_replays_missed_updates() {
    let (clock, core) = core();
    let client = ClientId::new();
    let mut subscription = core.hub()
        .subscribe(client, Scope::Hotel(HotelId::from("budget-inn")))
        .unwrap();
    drain(&mut subscription);

    core.submit(raw("budget-inn", 40, 100)).await.unwrap();
    drain(&mut subscription);
    drop(subscription);
    core.hub().disconnect(client).unwrap();
    assert_eq!(core.hub().state(&client), Some(SubscriptionState::Disconnected));

    core.submit(raw("budget-inn", 30, 101)).await.unwrap();
    core.submit(raw("budget-inn", 20, 102)).await.unwrap();
    clock.advance(Duration::from_secs(120));

    let mut resumed = core.hub().resume(client).unwrap();
    let messages = drain(&mut resumed);
    assert_eq!(
        update_sequences(&messages),
        vec![("budget-inn".to_string(), 2), ("budget-inn".to_string(), 3)]
    );
    assert_eq!(messages.last(), Some(&StreamMessage::CaughtUp { replayed: 2 }));
}

#[tokio::test]
async fn reconnect_after_grace_must_resubscribe() {
    let (clock, core) = core();
    let client = ClientId::new();
    let subscription = core.hub()
        .subscribe(client, Scope::Hotel(HotelId::from("budget-inn")))
        .unwrap();
    drop(subscription);
    core.hub().disconnect(client).unwrap();

    clock.advance(Duration::from_secs(301));
    assert!(matches!(core.hub().resume(client), Err(Error::SubscriptionExpired(_))));
    assert!(matches!(core.hub().resume(client), Err(Error::SubscriptionNotFound(_))));

    core.submit(raw("budget-inn", 0, 100)).await.unwrap();
    let mut fresh = core.hub().subscribe(client, Scope::Hotel(HotelId::from("budget-inn"))).unwrap();
    assert!(matches!(fresh.try_recv(), Some(StreamMessage::Snapshot { .. })));
}

#[tokio::test]
async fn slow_subscriber_is_told_to_resync_and_can_recover() {
    let mut config = test_config();
    config.subscriptions.queue_capacity = 2;
    let (_clock, core) = build_core(config);

    let client = ClientId::new();
    let scope = Scope::Hotel(HotelId::from("budget-inn"));
    let mut subscription = core.hub().subscribe(client, scope.clone()).unwrap();
    drain(&mut subscription);

    for i in 0..5 {
        core.submit(raw("budget-inn", 100 - i, 100 + i)).await.unwrap();
    }
    let messages = drain(&mut subscription);
    assert_eq!(messages.iter().filter(|m| **m == StreamMessage::ResyncRequired).count(), 1);
    assert_eq!(core.hub().state(&client), Some(SubscriptionState::Lagging));

    let mut fresh = core.hub().subscribe(client, scope).unwrap();
    let burst = drain(&mut fresh);
    assert!(matches!(&burst[0], StreamMessage::Snapshot { snapshot, .. } if snapshot.sequence == 5));
    assert_eq!(core.hub().subscriber_count(), 1);
}

#[tokio::test]
async fn full_city_burst_leaves_room_for_live_updates() {
    let mut config = test_config();
    config.catalog.hotels.push(HotelConfig {
        hotel_id: HotelId::from("wahweap-lodge"),
        city_id: CityId::from(CITY),
        name: "Wahweap Lodge".to_string(),
        rating: Some(3.0),
        base_price_cents: None,
    });
    let (_clock, core) = build_core(config);
    let hotels = ["budget-inn", "lake-powell-inn", "desert-view-motel", "wahweap-lodge"];
    for hotel in hotels {
        for i in 0..60 {
            core.submit(raw(hotel, 3_600 - i * 10, 100 + i)).await.unwrap();
        }
    }

    let client = ClientId::new();
    let mut subscription = core.hub().subscribe(client, Scope::City(CityId::from(CITY))).unwrap();
    assert_eq!(subscription.queued(), 4 * (1 + 50) + 1);
    assert_eq!(core.hub().state(&client), Some(SubscriptionState::CaughtUp));

    core.submit(raw("budget-inn", 1, 90)).await.unwrap();
    assert_eq!(core.hub().state(&client), Some(SubscriptionState::CaughtUp));

    let messages = drain(&mut subscription);
    assert!(!messages.contains(&StreamMessage::ResyncRequired));
    assert!(matches!(
        messages.last(),
        Some(StreamMessage::PriceUpdate(u)) if u.hotel_id.as_str() == "budget-inn" && u.sequence == 61
    ));
}

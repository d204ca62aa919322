use serde::{Deserialize, Serialize};
use crate::types::ids::{CityId, HotelId};

pub mod backlog;
pub mod hub;
pub mod subscriber;

pub use hub::SubscriptionHub;
pub use subscriber::Subscription;

/// What a subscription covers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Scope {
    Hotel(HotelId),
    City(CityId),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Hotel(id) => write!(f, "hotel:{}", id),
            Scope::City(id) => write!(f, "city:{}", id),
        }
    }
}

/// Lifecycle of a subscription.
///
/// `Connected` while the catch-up burst is queued, `CaughtUp` while
/// incremental updates flow, `Lagging` after the queue overflowed until the
/// client subscribes again, `Disconnected` during the reconnect grace period
/// and `Expired` afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Connected,
    CaughtUp,
    Lagging,
    Disconnected,
    Expired,
}

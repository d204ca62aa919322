use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::types::ids::{AlertId, HotelId};
use crate::types::price::Price;
use crate::types::timestamp::Timestamp;

pub mod book;
pub mod notifier;

pub use book::AlertBook;
pub use notifier::TracingNotifier;

/// Request to be told when a hotel's price drops to `target_price`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewAlert {
    pub hotel_id: HotelId,
    pub email: String,
    /// Major currency units, as entered by the user.
    pub target_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: AlertId,
    pub hotel_id: HotelId,
    pub email: String,
    pub target_price: Price,
    pub active: bool,
    pub created_at: Timestamp,
    pub last_checked: Option<Timestamp>,
    pub last_notified: Option<Timestamp>,
}

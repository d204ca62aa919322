use thiserror::Error;
use crate::types::ids::{AlertId, CityId, ClientId, HotelId};
use crate::types::timestamp::Timestamp;

#[derive(Error, Debug)]
pub enum Error {
    // Ingestion Errors
    #[error("Validation failed: {0}")]
    Validation(ValidationFailure),

    #[error("Observation at {timestamp} is older than the retention horizon {horizon}")]
    OutOfRetention {
        timestamp: Timestamp,
        horizon: Timestamp,
    },

    #[error("Ingestion failed for hotel {hotel_id}: {reason}")]
    Ingestion {
        hotel_id: HotelId,
        reason: String,
    },

    #[error("Series for hotel {hotel_id} is full ({capacity} observations)")]
    SeriesCapacityExceeded {
        hotel_id: HotelId,
        capacity: usize,
    },

    // Catalog Errors
    #[error("Hotel not found: {0}")]
    HotelNotFound(HotelId),

    #[error("City not found: {0}")]
    CityNotFound(CityId),

    #[error("No price data for hotel {0}")]
    NoPriceData(HotelId),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    // Subscription Errors
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(ClientId),

    #[error("Subscription expired: {0}")]
    SubscriptionExpired(ClientId),

    // Alert Errors
    #[error("Alert not found: {0}")]
    AlertNotFound(AlertId),

    #[error("Invalid alert: {0}")]
    InvalidAlert(String),

    // Feed Errors
    #[error("Price connector not connected")]
    NotConnected,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Max reconnect attempts exceeded")]
    MaxReconnectAttemptsExceeded,

    #[error("Deserialization failed: {0}")]
    DeserializationError(String),

    // System Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task failure: {0}")]
    TaskFailure(String),

    // Arithmetic Errors
    #[error("Overflow in {operation}")]
    Overflow { operation: String },
}

impl Error {
    /// Wraps an internal failure so the observation is reported as not accepted.
    pub fn into_ingestion(self, hotel_id: &HotelId) -> Error {
        match self {
            Error::Validation(_) | Error::OutOfRetention { .. } | Error::Ingestion { .. } => self,
            other => Error::Ingestion {
                hotel_id: hotel_id.clone(),
                reason: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    NonPositivePrice,
    InvalidPrice(String),
    FutureTimestamp {
        timestamp: Timestamp,
        latest_allowed: Timestamp,
    },
    UnknownHotel(HotelId),
    UnknownCity(CityId),
    CityMismatch {
        hotel_id: HotelId,
        expected: CityId,
        found: CityId,
    },
    MissingSource,
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationFailure::NonPositivePrice => write!(f, "price must be positive"),
            ValidationFailure::InvalidPrice(raw) => write!(f, "invalid price: {}", raw),
            ValidationFailure::FutureTimestamp { timestamp, latest_allowed } => {
                write!(f, "timestamp {} is after {}", timestamp, latest_allowed)
            }
            ValidationFailure::UnknownHotel(id) => write!(f, "unknown hotel {}", id),
            ValidationFailure::UnknownCity(id) => write!(f, "unknown city {}", id),
            ValidationFailure::CityMismatch { hotel_id, expected, found } => write!(
                f,
                "hotel {} belongs to city {}, not {}",
                hotel_id, expected, found
            ),
            ValidationFailure::MissingSource => write!(f, "source_id is empty"),
        }
    }
}

use std::sync::Arc;
use std::time::Duration;
use crate::catalog::HotelCatalog;
use crate::error::{Error, Result, ValidationFailure};
use crate::events::observation::RawObservation;
use crate::types::price::Price;
use crate::types::timestamp::Timestamp;

pub struct ObservationValidator {
    catalog: Arc<HotelCatalog>,
    clock_skew_tolerance: Duration,
}

impl ObservationValidator {
    pub fn new(catalog: Arc<HotelCatalog>, clock_skew_tolerance: Duration) -> Self {
        ObservationValidator {
            catalog,
            clock_skew_tolerance,
        }
    }

    /// Checks a raw observation and returns its price in cents.
    pub fn validate(&self, raw: &RawObservation, now: Timestamp) -> Result<Price> {
        self.validate_source(raw)?;
        self.validate_identity(raw)?;
        self.validate_timestamp(raw.timestamp, now)?;
        self.validate_price(raw)
    }

    fn validate_source(&self, raw: &RawObservation) -> Result<()> {
        if raw.source_id.as_str().trim().is_empty() {
            return Err(Error::Validation(ValidationFailure::MissingSource));
        }
        Ok(())
    }

    fn validate_identity(&self, raw: &RawObservation) -> Result<()> {
        // Check city first so an unknown city is not reported as a mismatch
        if self.catalog.city(&raw.city_id).is_none() {
            return Err(Error::Validation(ValidationFailure::UnknownCity(raw.city_id.clone())));
        }

        let hotel = self.catalog
            .hotel(&raw.hotel_id)
            .ok_or_else(|| Error::Validation(ValidationFailure::UnknownHotel(raw.hotel_id.clone())))?;

        if hotel.city_id != raw.city_id {
            return Err(Error::Validation(ValidationFailure::CityMismatch {
                hotel_id: raw.hotel_id.clone(),
                expected: hotel.city_id.clone(),
                found: raw.city_id.clone(),
            }));
        }

        Ok(())
    }

    fn validate_timestamp(&self, timestamp: Timestamp, now: Timestamp) -> Result<()> {
        let latest_allowed = now.saturating_add(self.clock_skew_tolerance);
        if timestamp > latest_allowed {
            return Err(Error::Validation(ValidationFailure::FutureTimestamp {
                timestamp,
                latest_allowed,
            }));
        }
        Ok(())
    }

    fn validate_price(&self, raw: &RawObservation) -> Result<Price> {
        let price = Price::from_decimal(raw.price)
            .ok_or_else(|| Error::Validation(ValidationFailure::InvalidPrice(raw.price.to_string())))?;

        // Rounding may take a tiny positive amount to zero
        if !price.is_positive() {
            return Err(Error::Validation(ValidationFailure::NonPositivePrice));
        }

        Ok(price)
    }
}

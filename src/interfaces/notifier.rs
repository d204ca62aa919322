use async_trait::async_trait;
use crate::alerts::PriceAlert;
use crate::error::Result;
use crate::types::price::Price;

/// Delivery channel for triggered price alerts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &PriceAlert, current_price: Price) -> Result<()>;
}

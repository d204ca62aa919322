use async_trait::async_trait;
use tracing::info;
use crate::alerts::PriceAlert;
use crate::error::Result;
use crate::interfaces::notifier::Notifier;
use crate::types::price::Price;

/// Logs triggered alerts instead of sending mail.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, alert: &PriceAlert, current_price: Price) -> Result<()> {
        info!(
            alert_id = %alert.id,
            hotel_id = %alert.hotel_id,
            email = %alert.email,
            target_price = %alert.target_price,
            current_price = %current_price,
            "Price alert triggered"
        );
        Ok(())
    }
}

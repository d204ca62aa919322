use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use crate::aggregation::Aggregator;
use crate::alerts::{NewAlert, PriceAlert};
use crate::error::{Error, Result};
use crate::interfaces::notifier::Notifier;
use crate::observability::metrics::ALERT_NOTIFICATIONS;
use crate::types::ids::AlertId;
use crate::types::price::Price;
use crate::utils::clock::Clock;

/// Registered price alerts and the periodic check that triggers them.
pub struct AlertBook {
    alerts: DashMap<AlertId, PriceAlert>,
    aggregator: Arc<Aggregator>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    notify_cooldown: Duration,
}

impl AlertBook {
    pub fn new(
        aggregator: Arc<Aggregator>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        notify_cooldown: Duration,
    ) -> Self {
        AlertBook {
            alerts: DashMap::new(),
            aggregator,
            notifier,
            clock,
            notify_cooldown,
        }
    }

    pub fn create(&self, request: NewAlert) -> Result<PriceAlert> {
        if self.aggregator.catalog().hotel(&request.hotel_id).is_none() {
            return Err(Error::HotelNotFound(request.hotel_id));
        }
        let email = request.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::InvalidAlert(format!("invalid email: {:?}", request.email)));
        }
        let target_price = Price::from_decimal(request.target_price)
            .filter(|p| p.is_positive())
            .ok_or_else(|| Error::InvalidAlert(format!("invalid target price: {}", request.target_price)))?;

        let alert = PriceAlert {
            id: AlertId::new(),
            hotel_id: request.hotel_id,
            email: email.to_string(),
            target_price,
            active: true,
            created_at: self.clock.now_timestamp(),
            last_checked: None,
            last_notified: None,
        };
        self.alerts.insert(alert.id, alert.clone());

        info!(alert_id = %alert.id, hotel_id = %alert.hotel_id, "Price alert created");
        Ok(alert)
    }

    /// Active alerts registered by `email`, oldest first.
    pub fn list_for_email(&self, email: &str) -> Vec<PriceAlert> {
        let mut alerts: Vec<PriceAlert> = self.alerts
            .iter()
            .filter(|a| a.active && a.email.eq_ignore_ascii_case(email.trim()))
            .map(|a| a.value().clone())
            .collect();
        alerts.sort_by_key(|a| a.created_at);
        alerts
    }

    pub fn deactivate(&self, id: AlertId) -> Result<()> {
        let mut alert = self.alerts
            .get_mut(&id)
            .filter(|alert| alert.active)
            .ok_or(Error::AlertNotFound(id))?;
        alert.active = false;
        info!(alert_id = %id, "Price alert deactivated");
        Ok(())
    }

    pub fn get(&self, id: AlertId) -> Option<PriceAlert> {
        self.alerts.get(&id).map(|a| a.clone())
    }

    /// Compares every active alert against its hotel's current price and
    /// notifies those at or below target, at most once per cooldown.
    /// Returns how many notifications were sent.
    pub async fn check_alerts(&self) -> usize {
        let now = self.clock.now_timestamp();
        let active: Vec<PriceAlert> = self.alerts
            .iter()
            .filter(|a| a.active)
            .map(|a| a.value().clone())
            .collect();

        let mut sent = 0;
        for alert in active {
            let current = self.aggregator.snapshot(&alert.hotel_id).map(|s| s.current_price);
            let cooled_down = alert
                .last_notified
                .is_none_or(|at| now > at.saturating_add(self.notify_cooldown));
            let triggered = current.filter(|price| *price <= alert.target_price && cooled_down);

            let mut notified = false;
            if let Some(price) = triggered {
                match self.notifier.notify(&alert, price).await {
                    Ok(()) => {
                        ALERT_NOTIFICATIONS.inc();
                        notified = true;
                        sent += 1;
                    }
                    Err(e) => warn!(alert_id = %alert.id, "Failed to send price alert: {}", e),
                }
            }

            if let Some(mut stored) = self.alerts.get_mut(&alert.id) {
                stored.last_checked = Some(now);
                if notified {
                    stored.last_notified = Some(now);
                }
            }
        }

        debug!(sent, "Price alerts checked");
        sent
    }
}

use crate::config::catalog::CatalogConfig;
use crate::config::sources::PriceSourceConfig;
use crate::config::*;
use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub subscriptions: SubscriptionConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub sources: Vec<PriceSourceConfig>,
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("PRICEFEED").separator("__"))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let app_config: AppConfig = config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        app_config.validate()?;
        Ok(app_config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.feed.rolling_window_secs > self.feed.retention_secs {
            return Err(Error::ConfigError(format!(
                "rolling window ({}s) exceeds retention ({}s)",
                self.feed.rolling_window_secs, self.feed.retention_secs
            )));
        }
        if self.feed.trend_epsilon.is_nan() || self.feed.trend_epsilon < 0.0 {
            return Err(Error::ConfigError("trend_epsilon must be non-negative".to_string()));
        }
        if self.subscriptions.queue_capacity == 0 {
            return Err(Error::ConfigError("queue_capacity must be positive".to_string()));
        }
        if self.feed.hour_bucket_start > 23 {
            return Err(Error::ConfigError("hour_bucket_start must be within 0..=23".to_string()));
        }

        for hotel in &self.catalog.hotels {
            if !self.catalog.cities.iter().any(|c| c.city_id == hotel.city_id) {
                return Err(Error::ConfigError(format!(
                    "hotel {} references unknown city {}",
                    hotel.hotel_id, hotel.city_id
                )));
            }
        }

        Ok(())
    }
}

use std::time::Duration;
use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod sources;
pub mod loader;

const DAY_SECS: u64 = 86_400;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    pub retention_secs: u64,
    pub rolling_window_secs: u64,
    pub trend_epsilon: f64,
    pub clock_skew_tolerance_secs: u64,
    pub max_points_per_series: usize,
    pub purge_interval_secs: u64,
    pub hour_bucket_count: u32,
    pub hour_bucket_start: u32,
}

impl FeedConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn rolling_window(&self) -> Duration {
        Duration::from_secs(self.rolling_window_secs)
    }

    pub fn clock_skew_tolerance(&self) -> Duration {
        Duration::from_secs(self.clock_skew_tolerance_secs)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            retention_secs: 30 * DAY_SECS,        // 30 days
            rolling_window_secs: 30 * DAY_SECS,   // 30 days
            trend_epsilon: 0.01,                  // 1%
            clock_skew_tolerance_secs: 60,
            max_points_per_series: 100_000,
            purge_interval_secs: 60,
            hour_bucket_count: 14,
            hour_bucket_start: 9,                 // 9 AM to 10 PM
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    pub queue_capacity: usize,
    pub catch_up_burst: usize,
    pub disconnect_grace_secs: u64,
    pub backlog_per_hotel: usize,
}

impl SubscriptionConfig {
    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_secs(self.disconnect_grace_secs)
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        SubscriptionConfig {
            queue_capacity: 200,
            catch_up_burst: 50,
            disconnect_grace_secs: 300,  // 5 minutes
            backlog_per_hotel: 500,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertConfig {
    pub check_interval_secs: u64,
    pub notify_cooldown_secs: u64,
}

impl AlertConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn notify_cooldown(&self) -> Duration {
        Duration::from_secs(self.notify_cooldown_secs)
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfig {
            check_interval_secs: 300,       // 5 minutes
            notify_cooldown_secs: DAY_SECS, // once a day
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            json: false,
            filter: "info".to_string(),
        }
    }
}

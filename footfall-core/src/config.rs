//! Configuration for the footfall pipeline and providers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Thresholds for one buffering stage: flush when `count` items have
/// accumulated or `max_delay` has elapsed since the first unflushed item,
/// whichever comes first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Flush when the batch reaches this many items.
    pub count: usize,

    /// Flush this long after the first unflushed item.
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl BatchConfig {
    /// Create a batch config from a count and delay.
    #[must_use]
    pub fn new(count: usize, max_delay: Duration) -> Self {
        Self { count, max_delay }
    }
}

/// Configuration for a footfall deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootfallConfig {
    /// Connection string handed to the real store backend wired at the edge.
    #[serde(default = "default_connection_string")]
    pub connection_string: String,

    /// Database name for the store backend.
    #[serde(default = "default_database")]
    pub database: String,

    /// Hit-buffer thresholds.
    #[serde(default = "default_buffer")]
    pub buffer: BatchConfig,

    /// Window-scheduler thresholds.
    #[serde(default = "default_scheduler")]
    pub scheduler: BatchConfig,

    /// Path whose hits mark a logout, compared case-insensitively.
    #[serde(default = "default_logout_path")]
    pub logout_path: String,

    /// How long a previously tracked session may stay idle before eviction.
    #[serde(default = "default_inactivity_timeout", with = "humantime_serde")]
    pub inactivity_timeout: Duration,
}

fn default_connection_string() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    footfall_store::REPORTS_DATABASE.to_string()
}

fn default_buffer() -> BatchConfig {
    BatchConfig::new(1000, Duration::from_secs(60))
}

fn default_scheduler() -> BatchConfig {
    // Five hit-buffer flush intervals, so one window aggregates several
    // storage flushes' worth of data.
    BatchConfig::new(6, Duration::from_secs(300))
}

fn default_logout_path() -> String {
    "/logout".to_string()
}

fn default_inactivity_timeout() -> Duration {
    Duration::from_secs(600)
}

impl Default for FootfallConfig {
    fn default() -> Self {
        Self {
            connection_string: default_connection_string(),
            database: default_database(),
            buffer: default_buffer(),
            scheduler: default_scheduler(),
            logout_path: default_logout_path(),
            inactivity_timeout: default_inactivity_timeout(),
        }
    }
}

impl FootfallConfig {
    /// Parse a config from TOML, filling omitted fields with defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Set the connection string.
    #[must_use]
    pub fn with_connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_string = connection_string.into();
        self
    }

    /// Set the database name.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the hit-buffer thresholds.
    #[must_use]
    pub fn with_buffer(mut self, buffer: BatchConfig) -> Self {
        self.buffer = buffer;
        self
    }

    /// Set the window-scheduler thresholds.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: BatchConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Set the logout path.
    #[must_use]
    pub fn with_logout_path(mut self, logout_path: impl Into<String>) -> Self {
        self.logout_path = logout_path.into();
        self
    }

    /// Set the inactivity eviction timeout.
    #[must_use]
    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }
}

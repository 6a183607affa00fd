//! The subscription registry - push boundary for completed reports.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

/// Default per-host broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 64;

/// A completed report published for one host.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedReport {
    /// The report name, e.g. `logged_in`.
    pub report: String,

    /// The host the report covers.
    pub host: String,

    /// When the published data was generated.
    pub generated: DateTime<Utc>,

    /// The report-shaped value.
    pub payload: serde_json::Value,
}

/// Relays completed reports to subscribers registered by host.
///
/// Created once at process start and passed by reference to providers and
/// transports; subscribers for a host receive every report published for
/// that host. Slow subscribers lag on the broadcast channel rather than
/// blocking publishers.
pub struct SubscriptionRegistry {
    capacity: usize,
    channels: RwLock<HashMap<String, broadcast::Sender<PublishedReport>>>,
}

impl SubscriptionRegistry {
    /// Create a registry with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a registry with a custom per-host channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Register for every report published for `host`.
    pub async fn subscribe(&self, host: &str) -> broadcast::Receiver<PublishedReport> {
        let mut channels = self.channels.write().await;
        channels
            .entry(host.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish a report to the host's subscribers.
    ///
    /// Returns the number of subscribers reached; zero when nobody is
    /// registered for the host.
    pub async fn publish(&self, report: PublishedReport) -> usize {
        let channels = self.channels.read().await;
        let Some(tx) = channels.get(&report.host) else {
            debug!(host = %report.host, report = %report.report, "no subscribers for host");
            return 0;
        };
        tx.send(report).unwrap_or(0)
    }

    /// Number of hosts with at least one registration.
    pub async fn host_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

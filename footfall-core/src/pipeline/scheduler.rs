//! The window scheduler - second stage of the ingest pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::config::BatchConfig;
use crate::engine::ReportEngine;
use crate::pipeline::batcher::{Batcher, FlushHandler};
use crate::pipeline::min_max;

/// Invoked with the computed `[start, end]` window on every flush.
pub(crate) type WindowTrigger = Arc<dyn Fn(DateTime<Utc>, DateTime<Utc>) + Send + Sync>;

/// Accumulates flush timestamps from the hit buffer and periodically turns
/// them into report-generation windows.
///
/// Buffering here is what decouples storage-write frequency from
/// report-generation frequency: one window aggregates several hit-buffer
/// flushes' worth of data. Generation runs as a detached task; the
/// ingestion path never blocks on it.
pub struct WindowScheduler {
    batcher: Batcher<DateTime<Utc>>,
}

impl WindowScheduler {
    /// Spawn a scheduler that triggers `engine` for each computed window.
    pub fn spawn(config: BatchConfig, engine: Arc<ReportEngine>) -> Self {
        let trigger: WindowTrigger = Arc::new(move |start, end| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                match engine.generate(start, end).await {
                    Ok(summary) => info!(
                        providers = summary.results.len(),
                        duration = ?summary.duration,
                        "report generation finished"
                    ),
                    Err(error) => error!(%error, "report generation failed"),
                }
            });
        });
        Self::with_trigger(config, trigger)
    }

    pub(crate) fn with_trigger(config: BatchConfig, trigger: WindowTrigger) -> Self {
        let handler: FlushHandler<DateTime<Utc>> = Arc::new(move |batch: Vec<DateTime<Utc>>| {
            let trigger = Arc::clone(&trigger);
            Box::pin(async move {
                let Some((start, end)) = min_max(batch) else {
                    return;
                };
                debug!(%start, %end, "report window ready");
                trigger(start, end);
            })
        });

        Self {
            batcher: Batcher::spawn("window-scheduler", config, handler),
        }
    }

    /// Feed one flush timestamp into the current window batch.
    pub fn observe(&self, logged: DateTime<Utc>) {
        self.batcher.push(logged);
    }

    /// Stop the drain task, flushing any buffered timestamps first.
    pub async fn shutdown(&self) {
        self.batcher.shutdown().await;
    }
}

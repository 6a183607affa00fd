//! The hit buffer - first stage of the ingest pipeline.

use std::sync::Arc;

use tracing::{debug, error};

use footfall_models::Hit;
use footfall_store::HitStore;

use crate::config::BatchConfig;
use crate::pipeline::batcher::{Batcher, FlushHandler};
use crate::pipeline::min_max;
use crate::pipeline::scheduler::WindowScheduler;

/// Buffers incoming hits and persists them in batches.
///
/// On each flush of a non-empty batch the hits go to the store as a single
/// bulk write, then the batch's earliest and latest `logged` timestamps are
/// emitted to the window scheduler, min first. A failed bulk write is
/// logged and the batch dropped - at-least-once persistence, no retries at
/// this layer, and no window is emitted for data the store never received.
pub struct HitBuffer {
    batcher: Batcher<Hit>,
}

impl HitBuffer {
    /// Spawn the buffering stage in front of `store` and `scheduler`.
    pub fn spawn(
        config: BatchConfig,
        store: Arc<dyn HitStore>,
        scheduler: Arc<WindowScheduler>,
    ) -> Self {
        let handler: FlushHandler<Hit> = Arc::new(move |batch: Vec<Hit>| {
            let store = Arc::clone(&store);
            let scheduler = Arc::clone(&scheduler);
            Box::pin(async move {
                let Some((earliest, latest)) = min_max(batch.iter().map(|h| h.logged)) else {
                    return;
                };
                let count = batch.len();

                if let Err(error) = store.insert_batch(batch).await {
                    error!(%error, count, "failed to persist hit batch");
                    return;
                }
                debug!(count, "persisted hit batch");

                scheduler.observe(earliest);
                scheduler.observe(latest);
            })
        });

        Self {
            batcher: Batcher::spawn("hit-buffer", config, handler),
        }
    }

    /// Record one hit. Non-blocking fire-and-forget.
    pub fn log(&self, hit: Hit) {
        self.batcher.push(hit);
    }

    /// Stop the drain task, persisting any buffered hits first.
    pub async fn shutdown(&self) {
        self.batcher.shutdown().await;
    }
}

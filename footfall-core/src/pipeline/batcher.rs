//! Count-or-deadline batching with a dedicated drain task.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::config::BatchConfig;

/// Type alias for async flush handlers.
pub type FlushHandler<T> =
    Arc<dyn Fn(Vec<T>) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Accumulates items and flushes when either a count threshold or a delay
/// since the first unflushed item is reached, whichever comes first.
///
/// One drain task owns the batch: concurrent [`push`](Self::push) calls
/// append through an unbounded channel in arrival order, and every flush
/// hands the handler a single consistent snapshot. The channel is unbounded:
/// if producers outrun flush throughput the batch grows without bound.
pub struct Batcher<T> {
    stage: &'static str,
    tx: mpsc::UnboundedSender<T>,
    handle: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl<T: Send + 'static> Batcher<T> {
    /// Spawn the drain task for a batching stage.
    ///
    /// `stage` names the stage in logs. The handler is awaited inline by the
    /// drain task, so items arriving mid-flush queue up for the next batch.
    pub fn spawn(stage: &'static str, config: BatchConfig, handler: FlushHandler<T>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let count = config.count.max(1);
        let max_delay = config.max_delay;

        let handle = tokio::spawn(async move {
            let mut batch: Vec<T> = Vec::new();
            let mut deadline: Option<Instant> = None;

            loop {
                // Value unused while `deadline` is None; the branch below is
                // disabled then.
                let wake = deadline.unwrap_or_else(Instant::now);

                tokio::select! {
                    _ = token.cancelled() => break,
                    item = rx.recv() => match item {
                        Some(item) => {
                            if batch.is_empty() {
                                deadline = Some(Instant::now() + max_delay);
                            }
                            batch.push(item);
                            if batch.len() >= count {
                                deadline = None;
                                let drained = std::mem::take(&mut batch);
                                trace!(stage, count = drained.len(), "count threshold reached");
                                handler(drained).await;
                            }
                        }
                        None => break,
                    },
                    _ = time::sleep_until(wake), if deadline.is_some() => {
                        deadline = None;
                        let drained = std::mem::take(&mut batch);
                        if !drained.is_empty() {
                            trace!(stage, count = drained.len(), "flush deadline reached");
                            handler(drained).await;
                        }
                    }
                }
            }

            // Drain whatever was sent before shutdown and flush the residue.
            while let Ok(item) = rx.try_recv() {
                batch.push(item);
            }
            if !batch.is_empty() {
                trace!(stage, count = batch.len(), "flushing residue on shutdown");
                handler(batch).await;
            }
        });

        Self {
            stage,
            tx,
            handle: Mutex::new(Some(handle)),
            shutdown,
        }
    }

    /// Append an item to the current batch. Non-blocking.
    pub fn push(&self, item: T) {
        if self.tx.send(item).is_err() {
            warn!(stage = self.stage, "item dropped after batcher shutdown");
        }
    }

    /// Stop the drain task, flushing any buffered residue first.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle
            && let Err(error) = handle.await
        {
            warn!(stage = self.stage, %error, "batch drain task panicked");
        }
    }
}

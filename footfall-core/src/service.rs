//! The footfall composition root.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use footfall_models::{GenerationSummary, Hit};
use footfall_store::{HitStore, SummaryStore};

use crate::catalog::ReportCatalog;
use crate::config::FootfallConfig;
use crate::engine::ReportEngine;
use crate::error::Result;
use crate::pipeline::{HitBuffer, WindowScheduler};
use crate::provider::ReportProvider;
use crate::push::SubscriptionRegistry;

/// The assembled footfall service: ingest pipeline, report engine, query
/// catalog, and push registry, wired at startup from an explicit provider
/// registration list.
pub struct Footfall {
    buffer: HitBuffer,
    scheduler: Arc<WindowScheduler>,
    engine: Arc<ReportEngine>,
    catalog: ReportCatalog,
    registry: Arc<SubscriptionRegistry>,
}

impl Footfall {
    /// Wire the service together.
    ///
    /// Fails fast on duplicate provider names, before any hit is accepted.
    pub fn new(
        config: &FootfallConfig,
        hit_store: Arc<dyn HitStore>,
        summary_store: Arc<dyn SummaryStore>,
        providers: Vec<Arc<dyn ReportProvider>>,
        registry: Arc<SubscriptionRegistry>,
    ) -> Result<Self> {
        let catalog = ReportCatalog::new(&providers)?;
        let engine = Arc::new(ReportEngine::new(
            providers,
            Arc::clone(&hit_store),
            summary_store,
        )?);
        let scheduler = Arc::new(WindowScheduler::spawn(
            config.scheduler.clone(),
            Arc::clone(&engine),
        ));
        let buffer = HitBuffer::spawn(config.buffer.clone(), hit_store, Arc::clone(&scheduler));

        info!(
            buffer_count = config.buffer.count,
            scheduler_count = config.scheduler.count,
            reports = catalog.names().len(),
            "footfall pipeline started"
        );

        Ok(Self {
            buffer,
            scheduler,
            engine,
            catalog,
            registry,
        })
    }

    /// Record one hit. Non-blocking fire-and-forget.
    pub fn log(&self, hit: Hit) {
        self.buffer.log(hit);
    }

    /// The ad-hoc report query facade.
    pub fn catalog(&self) -> &ReportCatalog {
        &self.catalog
    }

    /// The push registry providers publish completed reports to.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Run one generation for an explicit window, bypassing the scheduler.
    pub async fn generate_now(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<GenerationSummary> {
        self.engine.generate(start, end).await
    }

    /// Stop both pipeline stages, flushing buffered hits and timestamps.
    ///
    /// Generation runs already in flight are detached and unaffected.
    pub async fn shutdown(&self) {
        self.buffer.shutdown().await;
        self.scheduler.shutdown().await;
        info!("footfall pipeline stopped");
    }
}

//! The report-generation fan-out engine.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use footfall_models::{GenerationResult, GenerationSummary, Hit, ReportOutcome};
use footfall_store::{HitStore, SummaryStore};

use crate::error::{Error, Result};
use crate::provider::ReportProvider;

/// Runs every registered provider against a window of hits and records an
/// auditable summary of the run.
pub struct ReportEngine {
    providers: Vec<Arc<dyn ReportProvider>>,
    hits: Arc<dyn HitStore>,
    summaries: Arc<dyn SummaryStore>,
}

impl ReportEngine {
    /// Create an engine over a provider registration list.
    ///
    /// Fails with [`Error::DuplicateProvider`] when two providers share a
    /// name; this is a configuration error caught before any run.
    pub fn new(
        providers: Vec<Arc<dyn ReportProvider>>,
        hits: Arc<dyn HitStore>,
        summaries: Arc<dyn SummaryStore>,
    ) -> Result<Self> {
        let mut names = HashSet::new();
        for provider in &providers {
            if !names.insert(provider.name().to_string()) {
                return Err(Error::DuplicateProvider(provider.name().to_string()));
            }
        }

        Ok(Self {
            providers,
            hits,
            summaries,
        })
    }

    /// Generate reports for the inclusive window `[start, end]`.
    ///
    /// Loads the window's hits once, runs every provider concurrently
    /// against the same set, waits for all of them, and persists one
    /// [`GenerationSummary`]. A failing or panicking provider is contained
    /// as an entry in the summary; a storage failure fails the run.
    pub async fn generate(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<GenerationSummary> {
        let run_at = Utc::now();
        let timer = Instant::now();

        let hits: Arc<[Hit]> = self.hits.query_range(start, end).await?.into();
        info!(hits = hits.len(), %start, %end, "generating reports");

        let mut tasks = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let window = Arc::clone(&hits);
            let name = provider.name().to_string();
            let handle = tokio::spawn(async move { provider.generate(&window).await });
            tasks.push((name, handle));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for (name, handle) in tasks {
            let result = match handle.await {
                Ok(Ok(())) => GenerationResult::success(name),
                Ok(Err(error)) => {
                    warn!(provider = %name, %error, "report provider failed");
                    GenerationResult::with_message(name, error.outcome(), error.to_string())
                }
                Err(join_error) => {
                    let message = panic_text(join_error);
                    warn!(provider = %name, message = %message, "report provider panicked");
                    GenerationResult::with_message(name, ReportOutcome::UnknownFailure, message)
                }
            };
            results.push(result);
        }

        let summary = GenerationSummary::new(run_at, timer.elapsed(), results);
        self.summaries.append(summary.clone()).await?;
        Ok(summary)
    }

    /// The registered providers, in registration order.
    pub fn providers(&self) -> &[Arc<dyn ReportProvider>] {
        &self.providers
    }
}

/// Render a provider task's join failure into diagnostic text.
fn panic_text(error: tokio::task::JoinError) -> String {
    if !error.is_panic() {
        return "provider task was cancelled".to_string();
    }
    let payload = error.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "provider panicked".to_string())
}

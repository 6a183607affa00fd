//! Store traits the rest of footfall programs against.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use footfall_models::{GenerationSummary, Hit, LoggedInReport};

use crate::error::Result;

/// Append/query access to persisted hits.
#[async_trait]
pub trait HitStore: Send + Sync {
    /// Persist a batch of hits as a single bulk write.
    async fn insert_batch(&self, hits: Vec<Hit>) -> Result<()>;

    /// All hits with `logged` in the inclusive range `[start, end]`.
    async fn query_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Hit>>;
}

/// Append-only storage for generation summaries.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Persist one run's summary.
    async fn append(&self, summary: GenerationSummary) -> Result<()>;

    /// The most recently appended summary, if any.
    async fn latest(&self) -> Result<Option<GenerationSummary>>;
}

/// Find/upsert access to per-(date, host) logged-in report documents.
#[async_trait]
pub trait LoggedInReportStore: Send + Sync {
    /// The report document for a (date, host) pair, if one exists.
    async fn find(&self, date: NaiveDate, host: &str) -> Result<Option<LoggedInReport>>;

    /// Insert or replace the whole report document, keyed by (date, host).
    async fn upsert(&self, report: LoggedInReport) -> Result<()>;
}

//! In-memory store implementations for testing and development.
//!
//! These keep documents in process memory without persistence. Range and
//! key semantics match what a real document-store backend provides.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use footfall_models::{GenerationSummary, Hit, LoggedInReport};

use crate::error::Result;
use crate::traits::{HitStore, LoggedInReportStore, SummaryStore};

/// In-memory implementation of [`HitStore`].
#[derive(Default)]
pub struct InMemoryHitStore {
    hits: RwLock<Vec<Hit>>,
}

impl InMemoryHitStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted hits.
    pub async fn len(&self) -> usize {
        self.hits.read().await.len()
    }

    /// Whether no hits have been persisted.
    pub async fn is_empty(&self) -> bool {
        self.hits.read().await.is_empty()
    }
}

#[async_trait]
impl HitStore for InMemoryHitStore {
    async fn insert_batch(&self, hits: Vec<Hit>) -> Result<()> {
        self.hits.write().await.extend(hits);
        Ok(())
    }

    async fn query_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Hit>> {
        Ok(self
            .hits
            .read()
            .await
            .iter()
            .filter(|h| h.logged >= start && h.logged <= end)
            .cloned()
            .collect())
    }
}

/// In-memory implementation of [`SummaryStore`].
#[derive(Default)]
pub struct InMemorySummaryStore {
    summaries: RwLock<Vec<GenerationSummary>>,
}

impl InMemorySummaryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of appended summaries.
    pub async fn len(&self) -> usize {
        self.summaries.read().await.len()
    }

    /// All appended summaries in append order.
    pub async fn all(&self) -> Vec<GenerationSummary> {
        self.summaries.read().await.clone()
    }
}

#[async_trait]
impl SummaryStore for InMemorySummaryStore {
    async fn append(&self, summary: GenerationSummary) -> Result<()> {
        self.summaries.write().await.push(summary);
        Ok(())
    }

    async fn latest(&self) -> Result<Option<GenerationSummary>> {
        Ok(self.summaries.read().await.last().cloned())
    }
}

/// In-memory implementation of [`LoggedInReportStore`], keyed by
/// (date, host).
#[derive(Default)]
pub struct InMemoryLoggedInReportStore {
    reports: RwLock<HashMap<(NaiveDate, String), LoggedInReport>>,
}

impl InMemoryLoggedInReportStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored report documents.
    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }
}

#[async_trait]
impl LoggedInReportStore for InMemoryLoggedInReportStore {
    async fn find(&self, date: NaiveDate, host: &str) -> Result<Option<LoggedInReport>> {
        Ok(self
            .reports
            .read()
            .await
            .get(&(date, host.to_string()))
            .cloned())
    }

    async fn upsert(&self, report: LoggedInReport) -> Result<()> {
        self.reports
            .write()
            .await
            .insert((report.date, report.host.clone()), report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[tokio::test]
    async fn insert_batch_accumulates_hits() {
        let store = InMemoryHitStore::new();
        assert!(store.is_empty().await);

        let now = Utc::now();
        store
            .insert_batch(vec![Hit::new("h", "/a", now), Hit::new("h", "/b", now)])
            .await
            .unwrap();
        store.insert_batch(vec![Hit::new("h", "/c", now)]).await.unwrap();

        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn query_range_bounds_are_inclusive() {
        let store = InMemoryHitStore::new();
        let start = Utc::now();
        let end = start + TimeDelta::minutes(10);

        store
            .insert_batch(vec![
                Hit::new("h", "/before", start - TimeDelta::seconds(1)),
                Hit::new("h", "/at-start", start),
                Hit::new("h", "/inside", start + TimeDelta::minutes(5)),
                Hit::new("h", "/at-end", end),
                Hit::new("h", "/after", end + TimeDelta::seconds(1)),
            ])
            .await
            .unwrap();

        let hits = store.query_range(start, end).await.unwrap();
        let paths: Vec<_> = hits.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["/at-start", "/inside", "/at-end"]);
    }

    #[tokio::test]
    async fn summary_store_latest_is_last_appended() {
        let store = InMemorySummaryStore::new();
        assert!(store.latest().await.unwrap().is_none());

        let first = GenerationSummary::new(Utc::now(), std::time::Duration::ZERO, Vec::new());
        let second = GenerationSummary::new(Utc::now(), std::time::Duration::ZERO, Vec::new());
        let second_id = second.id;

        store.append(first).await.unwrap();
        store.append(second).await.unwrap();

        assert_eq!(store.len().await, 2);
        assert_eq!(store.latest().await.unwrap().unwrap().id, second_id);
    }

    #[tokio::test]
    async fn report_store_find_misses_other_keys() {
        let store = InMemoryLoggedInReportStore::new();
        let today = Utc::now().date_naive();

        store
            .upsert(LoggedInReport::new(today, "a.example.com"))
            .await
            .unwrap();

        assert!(store.find(today, "a.example.com").await.unwrap().is_some());
        assert!(store.find(today, "b.example.com").await.unwrap().is_none());
        assert!(
            store
                .find(today.pred_opt().unwrap(), "a.example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn report_store_upsert_replaces_document() {
        let store = InMemoryLoggedInReportStore::new();
        let today = Utc::now().date_naive();

        let mut report = LoggedInReport::new(today, "a.example.com");
        store.upsert(report.clone()).await.unwrap();

        report.push_segment(footfall_models::LoggedInSegment {
            generated: Utc::now(),
            total: 0,
            users: Vec::new(),
        });
        store.upsert(report).await.unwrap();

        assert_eq!(store.len().await, 1);
        let stored = store.find(today, "a.example.com").await.unwrap().unwrap();
        assert_eq!(stored.segments.len(), 1);
    }
}

//! Document-store boundary for footfall.
//!
//! The durable store is an external collaborator: a keyed document store
//! with bulk-insert, range-query, find-one, and upsert capability. This
//! crate defines the async traits the rest of footfall programs against and
//! in-memory implementations used by tests and development:
//!
//! - [`HitStore`] - bulk-insert and range-query over persisted hits
//! - [`SummaryStore`] - append-only generation summaries
//! - [`LoggedInReportStore`] - find/upsert of per-(date, host) report
//!   documents
//!
//! Collection names are significant configuration for real backends and are
//! exported as constants.

mod error;
mod memory;
mod traits;

pub use error::{Error, Result};
pub use memory::{InMemoryHitStore, InMemoryLoggedInReportStore, InMemorySummaryStore};
pub use traits::{HitStore, LoggedInReportStore, SummaryStore};

/// Collection where hits are stored.
pub const HIT_COLLECTION: &str = "hits";

/// Collection where generation summaries are stored.
pub const SUMMARY_COLLECTION: &str = "summaries";

/// Default database name for real backends.
pub const REPORTS_DATABASE: &str = "footfall";

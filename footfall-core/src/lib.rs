//! footfall-core: hit ingestion pipeline, report engine, and providers.
//!
//! Footfall ingests per-request telemetry events ("hits") from a web
//! application, buffers them in memory, persists them in batches, and
//! periodically runs a set of pluggable report providers over windows of
//! the persisted data.
//!
//! # Architecture
//!
//! ```text
//! log(hit) ──> HitBuffer ───bulk write───> HitStore
//!                  │                          │
//!                  └─min/max logged─> WindowScheduler      range query
//!                                          │                  │
//!                                        spawn                ▼
//!                                          └────────> ReportEngine
//!                                                      │    │    │
//!                                                      ▼    ▼    ▼
//!                                                   {ReportProvider...}
//!                                                      │
//!                                  report stores <─────┤
//!                                  SummaryStore  <─ summary
//!                                  SubscriptionRegistry <─ publish
//! ```
//!
//! Both pipeline stages flush on a count threshold or a delay since their
//! first unflushed item, whichever comes first. Report generation runs as a
//! detached task; ingestion never blocks on it. Providers run concurrently
//! per generation with per-provider failure isolation.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod provider;
pub mod providers;
pub mod push;
pub mod service;

// Re-export key types for convenience
pub use catalog::ReportCatalog;
pub use config::{BatchConfig, FootfallConfig};
pub use engine::ReportEngine;
pub use error::{Error, ProviderError, Result};
pub use pipeline::{HitBuffer, WindowScheduler};
pub use provider::ReportProvider;
pub use providers::{LOGGED_IN_REPORT, LoggedInProvider};
pub use push::{PublishedReport, SubscriptionRegistry};
pub use service::Footfall;

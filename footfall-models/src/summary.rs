//! Audit records for a report-generation run.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one provider's attempt to generate its report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOutcome {
    /// The provider generated its report.
    Success,
    /// The provider failed with an uncontained error or panic.
    UnknownFailure,
    /// The provider ran but the window lacked the data it needs.
    NotEnoughInformation,
    /// The provider was skipped, e.g. disabled.
    NotRun,
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::UnknownFailure => write!(f, "unknown_failure"),
            Self::NotEnoughInformation => write!(f, "not_enough_information"),
            Self::NotRun => write!(f, "not_run"),
        }
    }
}

/// One provider's result within a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// The provider's registered name.
    pub provider: String,

    /// How the attempt ended.
    pub outcome: ReportOutcome,

    /// Diagnostic messages, empty on success.
    #[serde(default)]
    pub messages: Vec<String>,
}

impl GenerationResult {
    /// A successful result with no diagnostics.
    pub fn success(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            outcome: ReportOutcome::Success,
            messages: Vec::new(),
        }
    }

    /// A result with the given outcome and one diagnostic message.
    pub fn with_message(
        provider: impl Into<String>,
        outcome: ReportOutcome,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            outcome,
            messages: vec![message.into()],
        }
    }
}

/// The summary of one report-generation run.
///
/// Append-only: created by the engine at the end of a run and never mutated
/// after persistence. Result order may match completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSummary {
    /// Unique id assigned at creation.
    pub id: Uuid,

    /// Wall-clock time the run started, taken before the hit query.
    pub run_at: DateTime<Utc>,

    /// Elapsed wall time for the whole run.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// One entry per registered provider.
    pub results: Vec<GenerationResult>,
}

impl GenerationSummary {
    /// Create a summary for a run started at `run_at`.
    pub fn new(run_at: DateTime<Utc>, duration: Duration, results: Vec<GenerationResult>) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_at,
            duration,
            results,
        }
    }

    /// Whether every provider reported [`ReportOutcome::Success`].
    pub fn succeeded(&self) -> bool {
        self.results
            .iter()
            .all(|r| r.outcome == ReportOutcome::Success)
    }

    /// The result for a named provider, if present.
    pub fn result_for(&self, provider: &str) -> Option<&GenerationResult> {
        self.results.iter().find(|r| r.provider == provider)
    }
}

//! The per-host, per-day logged-in users report document.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One tracked user session within a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedInUser {
    /// The user's identity.
    pub identity: String,

    /// Timestamp of the first hit of the session so far.
    pub first_hit: DateTime<Utc>,

    /// Timestamp of the last hit of the session so far.
    pub last_hit: DateTime<Utc>,

    /// Total hits made during the session so far, cumulative across
    /// generation runs.
    pub total_hits: u64,

    /// Average time between hits for the session so far.
    #[serde(with = "humantime_serde")]
    pub average_per_hit: Duration,
}

/// One reconciled snapshot of logged-in users for a host/day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedInSegment {
    /// When this segment was generated.
    pub generated: DateTime<Utc>,

    /// Number of users in the segment.
    pub total: usize,

    /// The reconciled user sessions.
    pub users: Vec<LoggedInUser>,
}

impl LoggedInSegment {
    /// The entry for `identity`, if present.
    pub fn user(&self, identity: &str) -> Option<&LoggedInUser> {
        self.users.iter().find(|u| u.identity == identity)
    }
}

/// The logged-in users report for one (date, host) pair.
///
/// An append-only log of reconciled snapshots: each generation run appends a
/// [`LoggedInSegment`] rather than mutating prior ones, and the last segment
/// is the authoritative current state for that host/day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedInReport {
    /// Unique id assigned at creation.
    pub id: Uuid,

    /// The day this report covers.
    pub date: NaiveDate,

    /// The host this report covers.
    pub host: String,

    /// Segments ordered by `generated`.
    pub segments: Vec<LoggedInSegment>,
}

impl LoggedInReport {
    /// Create an empty report for a (date, host) pair.
    pub fn new(date: NaiveDate, host: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            host: host.into(),
            segments: Vec::new(),
        }
    }

    /// The most recently generated segment, if any.
    pub fn latest_segment(&self) -> Option<&LoggedInSegment> {
        self.segments.iter().max_by_key(|s| s.generated)
    }

    /// Append a segment to the log.
    pub fn push_segment(&mut self, segment: LoggedInSegment) {
        self.segments.push(segment);
    }
}

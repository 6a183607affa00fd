//! The Hit entity - one recorded request/response event.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One recorded inbound request/response event.
///
/// A hit is created once per completed HTTP request by the interception
/// layer, persisted exactly once by the ingest buffer, and read-only to
/// every downstream consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
    /// Unique id assigned at creation.
    pub id: Uuid,

    /// The logical timestamp the hit was logged.
    pub logged: DateTime<Utc>,

    /// The host the hit was logged on, e.g. `app.example.com`.
    pub host: String,

    /// The request path, e.g. `/api/users`.
    pub path: String,

    /// The HTTP method.
    pub method: String,

    /// The response status code.
    pub status_code: u16,

    /// The response sub-status code, `0` when the server has none.
    pub sub_status_code: u16,

    /// Wall time the request took to complete.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// The caller principal, absent or blank for anonymous requests.
    pub identity: Option<String>,

    /// The caller's user agent string.
    pub user_agent: String,
}

impl Hit {
    /// Create a hit for `host`/`path` logged at `logged`.
    ///
    /// Remaining fields default to an anonymous `GET` with a `200` response;
    /// use the `with_*` methods to fill them in.
    pub fn new(host: impl Into<String>, path: impl Into<String>, logged: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            logged,
            host: host.into(),
            path: path.into(),
            method: "GET".to_string(),
            status_code: 200,
            sub_status_code: 0,
            duration: Duration::ZERO,
            identity: None,
            user_agent: String::new(),
        }
    }

    /// Set the caller principal.
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Set the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Set the response status and sub-status codes.
    #[must_use]
    pub fn with_status(mut self, status_code: u16, sub_status_code: u16) -> Self {
        self.status_code = status_code;
        self.sub_status_code = sub_status_code;
        self
    }

    /// Set the request duration.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// The caller principal, normalized: `None` for anonymous or blank
    /// identities.
    pub fn identity(&self) -> Option<&str> {
        self.identity
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

//! The logged-in users report - per-host session reconciliation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use footfall_models::{Hit, LoggedInReport, LoggedInSegment, LoggedInUser};
use footfall_store::LoggedInReportStore;

use crate::config::FootfallConfig;
use crate::error::ProviderError;
use crate::provider::ReportProvider;
use crate::push::{PublishedReport, SubscriptionRegistry};

/// Report name, doubling as the collection where report documents live.
pub const LOGGED_IN_REPORT: &str = "logged_in";

/// Rules applied during reconciliation.
#[derive(Debug, Clone)]
struct SessionRules {
    logout_path: String,
    inactivity_timeout: Duration,
}

/// Tracks which identities are currently logged in per host.
///
/// Each generation run reconciles the window's activity with the last
/// persisted segment for (today, host): new sessions are added, still-idle
/// sessions are carried forward, sessions idle past the inactivity timeout
/// are evicted, and confirmed logouts are dropped. The result is appended
/// to the day's report as a new segment and published to the host's
/// subscribers.
///
/// Hosts never share state, so they are reconciled concurrently. The
/// find/append/upsert sequence for one (date, host) document is a
/// read-modify-write critical section; overlapping runs serialize on a
/// per-key lock.
pub struct LoggedInProvider {
    store: Arc<dyn LoggedInReportStore>,
    registry: Arc<SubscriptionRegistry>,
    rules: SessionRules,
    locks: Mutex<HashMap<(NaiveDate, String), Arc<Mutex<()>>>>,
}

impl LoggedInProvider {
    /// Create a provider using the configured logout path and inactivity
    /// timeout.
    pub fn new(
        store: Arc<dyn LoggedInReportStore>,
        registry: Arc<SubscriptionRegistry>,
        config: &FootfallConfig,
    ) -> Self {
        Self::with_rules(
            store,
            registry,
            config.logout_path.clone(),
            config.inactivity_timeout,
        )
    }

    /// Create a provider with explicit session rules.
    pub fn with_rules(
        store: Arc<dyn LoggedInReportStore>,
        registry: Arc<SubscriptionRegistry>,
        logout_path: impl Into<String>,
        inactivity_timeout: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            rules: SessionRules {
                logout_path: logout_path.into(),
                inactivity_timeout,
            },
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The serialization lock for one (date, host) report document.
    async fn day_lock(&self, date: NaiveDate, host: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry((date, host.to_string())).or_default())
    }
}

#[async_trait]
impl ReportProvider for LoggedInProvider {
    fn name(&self) -> &str {
        LOGGED_IN_REPORT
    }

    async fn generate(&self, hits: &[Hit]) -> Result<(), ProviderError> {
        let mut by_host: HashMap<String, Vec<Hit>> = HashMap::new();
        for hit in hits {
            by_host.entry(hit.host.clone()).or_default().push(hit.clone());
        }
        if by_host.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let date = now.date_naive();

        let mut tasks = Vec::with_capacity(by_host.len());
        for (host, host_hits) in by_host {
            let store = Arc::clone(&self.store);
            let registry = Arc::clone(&self.registry);
            let rules = self.rules.clone();
            let lock = self.day_lock(date, &host).await;

            tasks.push(tokio::spawn(async move {
                let _guard = lock.lock().await;

                let prior = store.find(date, &host).await?;
                let segment = reconcile(
                    &host_hits,
                    prior.as_ref().and_then(|r| r.latest_segment()),
                    &rules,
                    now,
                );
                info!(host = %host, users = segment.total, "reconciled logged-in segment");

                let payload = serde_json::to_value(&segment)?;
                let mut report = prior.unwrap_or_else(|| LoggedInReport::new(date, host.clone()));
                report.push_segment(segment);
                store.upsert(report).await?;

                registry
                    .publish(PublishedReport {
                        report: LOGGED_IN_REPORT.to_string(),
                        host,
                        generated: now,
                        payload,
                    })
                    .await;

                Ok::<(), ProviderError>(())
            }));
        }

        let mut failures = Vec::new();
        for task in tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => failures.push(error.to_string()),
                Err(join_error) => failures.push(join_error.to_string()),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            warn!(failed_hosts = failures.len(), "logged-in reconciliation failed for some hosts");
            Err(ProviderError::Failed(failures.join("; ")))
        }
    }

    async fn get(
        &self,
        host: &str,
        params: &[(String, String)],
    ) -> Result<Option<serde_json::Value>, ProviderError> {
        let date = match params.iter().find(|(key, _)| key.as_str() == "date") {
            Some((_, value)) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map_err(|e| ProviderError::Failed(format!("invalid date parameter {value:?}: {e}")))?,
            None => Utc::now().date_naive(),
        };

        let report = self.store.find(date, host).await?;
        Ok(report.map(serde_json::to_value).transpose()?)
    }
}

/// Reconcile one host's window of hits with its prior segment.
///
/// Pure function of its inputs; `now` is injected so eviction and the
/// segment timestamp are deterministic under test.
fn reconcile(
    hits: &[Hit],
    prior: Option<&LoggedInSegment>,
    rules: &SessionRules,
    now: DateTime<Utc>,
) -> LoggedInSegment {
    let is_logout = |hit: &Hit| hit.path.eq_ignore_ascii_case(&rules.logout_path);

    // Identities with any activity in the window.
    let active: HashSet<&str> = hits.iter().filter_map(Hit::identity).collect();

    // A logout is provisional: it only sticks when no later non-logout hit
    // re-enters the session.
    let mut logged_out: HashSet<&str> = HashSet::new();
    for logout in hits.iter().filter(|h| is_logout(h)) {
        let Some(identity) = logout.identity() else {
            continue;
        };
        let reentered = hits.iter().any(|h| {
            h.identity() == Some(identity) && h.logged > logout.logged && !is_logout(h)
        });
        if !reentered {
            logged_out.insert(identity);
        }
    }

    // Window candidates with their activity stats.
    let mut users: Vec<LoggedInUser> = Vec::new();
    for identity in &active {
        if logged_out.contains(identity) {
            continue;
        }
        let mut bounds: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
        let mut total_hits = 0u64;
        for hit in hits.iter().filter(|h| h.identity() == Some(*identity)) {
            total_hits += 1;
            bounds = Some(match bounds {
                None => (hit.logged, hit.logged),
                Some((first, last)) => (first.min(hit.logged), last.max(hit.logged)),
            });
        }
        let Some((first_hit, last_hit)) = bounds else {
            continue;
        };
        users.push(LoggedInUser {
            identity: (*identity).to_string(),
            first_hit,
            last_hit,
            total_hits,
            average_per_hit: Duration::ZERO,
        });
    }

    // Fold in the prior segment: evict idle sessions, drop confirmed
    // logouts, carry or merge the rest.
    if let Some(prior) = prior {
        for prior_user in &prior.users {
            let idle = (now - prior_user.last_hit)
                .to_std()
                .is_ok_and(|idle| idle > rules.inactivity_timeout);
            if !active.contains(prior_user.identity.as_str()) && idle {
                users.retain(|u| u.identity != prior_user.identity);
                continue;
            }
            if logged_out.contains(prior_user.identity.as_str()) {
                continue;
            }
            match users.iter_mut().find(|u| u.identity == prior_user.identity) {
                None => users.push(prior_user.clone()),
                Some(user) => {
                    // The window's first_hit stands; totals accumulate
                    // across the whole session.
                    user.last_hit = user.last_hit.max(prior_user.last_hit);
                    user.total_hits += prior_user.total_hits;
                }
            }
        }
    }

    for user in &mut users {
        user.average_per_hit = average_per_hit(user.first_hit, user.last_hit, user.total_hits);
    }
    users.sort_by(|a, b| a.identity.cmp(&b.identity));

    LoggedInSegment {
        generated: now,
        total: users.len(),
        users,
    }
}

/// Average time between hits: session span divided by hit count.
fn average_per_hit(first_hit: DateTime<Utc>, last_hit: DateTime<Utc>, total_hits: u64) -> Duration {
    if total_hits == 0 {
        return Duration::ZERO;
    }
    let span = (last_hit - first_hit).to_std().unwrap_or(Duration::ZERO);
    Duration::from_nanos((span.as_nanos() / u128::from(total_hits)) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    use footfall_store::InMemoryLoggedInReportStore;

    fn rules() -> SessionRules {
        SessionRules {
            logout_path: "/logout".to_string(),
            inactivity_timeout: Duration::from_secs(600),
        }
    }

    fn hit(path: &str, identity: &str, logged: DateTime<Utc>) -> Hit {
        Hit::new("app.example.com", path, logged).with_identity(identity)
    }

    fn prior_user(identity: &str, last_hit: DateTime<Utc>, total_hits: u64) -> LoggedInUser {
        LoggedInUser {
            identity: identity.to_string(),
            first_hit: last_hit - TimeDelta::minutes(30),
            last_hit,
            total_hits,
            average_per_hit: Duration::ZERO,
        }
    }

    fn segment_of(users: Vec<LoggedInUser>, generated: DateTime<Utc>) -> LoggedInSegment {
        LoggedInSegment {
            total: users.len(),
            users,
            generated,
        }
    }

    // ==================== reconcile ====================

    #[test]
    fn window_activity_builds_session_stats() {
        let now = Utc::now();
        let t0 = now - TimeDelta::minutes(2);
        let hits = vec![
            hit("/home", "alice", t0),
            hit("/dash", "alice", t0 + TimeDelta::minutes(1)),
        ];

        let segment = reconcile(&hits, None, &rules(), now);

        assert_eq!(segment.total, 1);
        let alice = segment.user("alice").unwrap();
        assert_eq!(alice.first_hit, t0);
        assert_eq!(alice.last_hit, t0 + TimeDelta::minutes(1));
        assert_eq!(alice.total_hits, 2);
    }

    #[test]
    fn confirmed_logout_excludes_user() {
        let now = Utc::now();
        let t0 = now - TimeDelta::minutes(5);
        let hits = vec![
            hit("/home", "bob", t0),
            hit("/logout", "bob", t0 + TimeDelta::minutes(1)),
        ];

        let segment = reconcile(&hits, None, &rules(), now);

        assert_eq!(segment.total, 0);
        assert!(segment.user("bob").is_none());
    }

    #[test]
    fn relogin_after_logout_keeps_user_active() {
        let now = Utc::now();
        let t0 = now - TimeDelta::minutes(10);
        let hits = vec![
            hit("/logout", "carol", t0),
            hit("/home", "carol", t0 + TimeDelta::minutes(5)),
        ];

        let segment = reconcile(&hits, None, &rules(), now);

        let carol = segment.user("carol").unwrap();
        assert_eq!(carol.last_hit, t0 + TimeDelta::minutes(5));
    }

    #[test]
    fn logout_path_match_is_case_insensitive() {
        let now = Utc::now();
        let hits = vec![
            hit("/home", "bob", now - TimeDelta::minutes(2)),
            hit("/LogOut", "bob", now - TimeDelta::minutes(1)),
        ];

        let segment = reconcile(&hits, None, &rules(), now);
        assert!(segment.user("bob").is_none());
    }

    #[test]
    fn anonymous_hits_are_ignored() {
        let now = Utc::now();
        let mut anonymous = Hit::new("app.example.com", "/home", now - TimeDelta::minutes(1));
        anonymous.identity = Some("  ".to_string());
        let hits = vec![
            anonymous,
            Hit::new("app.example.com", "/ping", now - TimeDelta::minutes(1)),
            hit("/home", "alice", now - TimeDelta::minutes(1)),
        ];

        let segment = reconcile(&hits, None, &rules(), now);
        assert_eq!(segment.total, 1);
        assert!(segment.user("alice").is_some());
    }

    #[test]
    fn idle_prior_user_is_evicted_and_recent_one_carried() {
        let now = Utc::now();
        let prior = segment_of(
            vec![
                prior_user("dave", now - TimeDelta::minutes(15), 4),
                prior_user("erin", now - TimeDelta::minutes(5), 2),
            ],
            now - TimeDelta::minutes(5),
        );
        let hits = vec![hit("/home", "alice", now - TimeDelta::minutes(1))];

        let segment = reconcile(&hits, Some(&prior), &rules(), now);

        assert!(segment.user("dave").is_none());
        let erin = segment.user("erin").unwrap();
        assert_eq!(erin.last_hit, now - TimeDelta::minutes(5));
        assert_eq!(erin.total_hits, 2);
        assert!(segment.user("alice").is_some());
    }

    #[test]
    fn window_activity_refreshes_idle_user() {
        let now = Utc::now();
        let prior = segment_of(
            vec![prior_user("dave", now - TimeDelta::minutes(15), 4)],
            now - TimeDelta::minutes(15),
        );
        // Active in this window, so the inactivity timeout does not apply.
        let hits = vec![hit("/home", "dave", now - TimeDelta::minutes(1))];

        let segment = reconcile(&hits, Some(&prior), &rules(), now);

        let dave = segment.user("dave").unwrap();
        assert_eq!(dave.total_hits, 5);
        assert_eq!(dave.last_hit, now - TimeDelta::minutes(1));
    }

    #[test]
    fn merge_accumulates_totals_and_keeps_window_first_hit() {
        let now = Utc::now();
        let prior_last = now - TimeDelta::minutes(30);
        let prior = segment_of(vec![prior_user("frank", prior_last, 3)], prior_last);
        let hits = vec![
            hit("/a", "frank", now - TimeDelta::minutes(10)),
            hit("/b", "frank", now - TimeDelta::minutes(5)),
        ];

        let segment = reconcile(&hits, Some(&prior), &rules(), now);

        let frank = segment.user("frank").unwrap();
        assert_eq!(frank.total_hits, 5);
        assert_eq!(frank.first_hit, now - TimeDelta::minutes(10));
        assert_eq!(frank.last_hit, now - TimeDelta::minutes(5));
    }

    #[test]
    fn merge_keeps_later_prior_last_hit() {
        let now = Utc::now();
        let prior_last = now - TimeDelta::minutes(2);
        let prior = segment_of(vec![prior_user("frank", prior_last, 3)], prior_last);
        let hits = vec![hit("/a", "frank", now - TimeDelta::minutes(8))];

        let segment = reconcile(&hits, Some(&prior), &rules(), now);

        let frank = segment.user("frank").unwrap();
        assert_eq!(frank.last_hit, prior_last);
        assert_eq!(frank.total_hits, 4);
    }

    #[test]
    fn carry_forward_does_not_accumulate_on_rerun() {
        let now = Utc::now();
        let prior = segment_of(
            vec![prior_user("grace", now - TimeDelta::minutes(5), 7)],
            now - TimeDelta::minutes(5),
        );
        let hits = vec![hit("/home", "alice", now - TimeDelta::minutes(1))];

        let first_run = reconcile(&hits, Some(&prior), &rules(), now);
        assert_eq!(first_run.user("grace").unwrap().total_hits, 7);

        let second_run = reconcile(&hits, Some(&first_run), &rules(), now);
        assert_eq!(second_run.user("grace").unwrap().total_hits, 7);
    }

    #[test]
    fn logged_out_prior_user_is_not_carried() {
        let now = Utc::now();
        let prior = segment_of(
            vec![prior_user("bob", now - TimeDelta::minutes(5), 3)],
            now - TimeDelta::minutes(5),
        );
        let hits = vec![
            hit("/home", "bob", now - TimeDelta::minutes(2)),
            hit("/logout", "bob", now - TimeDelta::minutes(1)),
        ];

        let segment = reconcile(&hits, Some(&prior), &rules(), now);
        assert!(segment.user("bob").is_none());
    }

    #[test]
    fn single_hit_user_has_zero_average() {
        let now = Utc::now();
        let hits = vec![hit("/home", "alice", now - TimeDelta::minutes(1))];

        let segment = reconcile(&hits, None, &rules(), now);
        assert_eq!(segment.user("alice").unwrap().average_per_hit, Duration::ZERO);
    }

    #[test]
    fn average_is_session_span_over_total_hits() {
        let now = Utc::now();
        let t0 = now - TimeDelta::minutes(10);
        let hits = vec![
            hit("/a", "alice", t0),
            hit("/b", "alice", t0 + TimeDelta::minutes(4)),
            hit("/c", "alice", t0 + TimeDelta::minutes(10)),
        ];

        let segment = reconcile(&hits, None, &rules(), now);
        // 10 minutes across 3 hits.
        assert_eq!(
            segment.user("alice").unwrap().average_per_hit,
            Duration::from_secs(200)
        );
    }

    #[test]
    fn users_are_sorted_by_identity() {
        let now = Utc::now();
        let hits = vec![
            hit("/a", "zoe", now - TimeDelta::minutes(1)),
            hit("/a", "adam", now - TimeDelta::minutes(1)),
            hit("/a", "mia", now - TimeDelta::minutes(1)),
        ];

        let segment = reconcile(&hits, None, &rules(), now);
        let names: Vec<&str> = segment.users.iter().map(|u| u.identity.as_str()).collect();
        assert_eq!(names, vec!["adam", "mia", "zoe"]);
    }

    // ==================== provider ====================

    fn provider() -> (
        Arc<InMemoryLoggedInReportStore>,
        Arc<SubscriptionRegistry>,
        LoggedInProvider,
    ) {
        let store = Arc::new(InMemoryLoggedInReportStore::new());
        let registry = Arc::new(SubscriptionRegistry::new());
        let provider = LoggedInProvider::with_rules(
            Arc::clone(&store) as Arc<dyn LoggedInReportStore>,
            Arc::clone(&registry),
            "/logout",
            Duration::from_secs(600),
        );
        (store, registry, provider)
    }

    #[tokio::test]
    async fn generate_creates_one_report_per_host() {
        let (store, _registry, provider) = provider();
        let now = Utc::now();
        let hits = vec![
            Hit::new("a.example.com", "/home", now).with_identity("alice"),
            Hit::new("b.example.com", "/home", now).with_identity("bob"),
        ];

        provider.generate(&hits).await.unwrap();

        assert_eq!(store.len().await, 2);
        let today = now.date_naive();
        let a = store.find(today, "a.example.com").await.unwrap().unwrap();
        assert_eq!(a.latest_segment().unwrap().total, 1);
        assert!(a.latest_segment().unwrap().user("alice").is_some());
        let b = store.find(today, "b.example.com").await.unwrap().unwrap();
        assert!(b.latest_segment().unwrap().user("bob").is_some());
    }

    #[tokio::test]
    async fn generate_appends_segments_across_runs() {
        let (store, _registry, provider) = provider();
        let now = Utc::now();

        let first = vec![Hit::new("a.example.com", "/home", now).with_identity("alice")];
        provider.generate(&first).await.unwrap();

        let second = vec![
            Hit::new("a.example.com", "/dash", now).with_identity("alice"),
            Hit::new("a.example.com", "/home", now).with_identity("heidi"),
        ];
        provider.generate(&second).await.unwrap();

        let report = store
            .find(now.date_naive(), "a.example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.segments.len(), 2);

        let latest = report.latest_segment().unwrap();
        assert_eq!(latest.total, 2);
        // Session totals accumulate across runs.
        assert_eq!(latest.user("alice").unwrap().total_hits, 2);
    }

    #[tokio::test]
    async fn generate_evicts_idle_prior_users() {
        let (store, _registry, provider) = provider();
        let now = Utc::now();
        let today = now.date_naive();

        let mut seeded = LoggedInReport::new(today, "a.example.com");
        seeded.push_segment(segment_of(
            vec![prior_user("dave", now - TimeDelta::minutes(15), 4)],
            now - TimeDelta::minutes(15),
        ));
        store.upsert(seeded).await.unwrap();

        let hits = vec![Hit::new("a.example.com", "/home", now).with_identity("alice")];
        provider.generate(&hits).await.unwrap();

        let latest = store
            .find(today, "a.example.com")
            .await
            .unwrap()
            .unwrap()
            .latest_segment()
            .unwrap()
            .clone();
        assert!(latest.user("dave").is_none());
        assert!(latest.user("alice").is_some());
    }

    #[tokio::test]
    async fn generate_publishes_segment_to_host_subscribers() {
        let (_store, registry, provider) = provider();
        let mut rx = registry.subscribe("a.example.com").await;

        let hits = vec![Hit::new("a.example.com", "/home", Utc::now()).with_identity("alice")];
        provider.generate(&hits).await.unwrap();

        let published = rx.recv().await.unwrap();
        assert_eq!(published.report, LOGGED_IN_REPORT);
        assert_eq!(published.host, "a.example.com");
        assert_eq!(published.payload["total"], 1);
    }

    #[tokio::test]
    async fn generate_with_no_hits_is_a_no_op() {
        let (store, _registry, provider) = provider();
        provider.generate(&[]).await.unwrap();
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn get_returns_todays_report_as_json() {
        let (_store, _registry, provider) = provider();
        let now = Utc::now();
        let hits = vec![Hit::new("a.example.com", "/home", now).with_identity("alice")];
        provider.generate(&hits).await.unwrap();

        let value = provider.get("a.example.com", &[]).await.unwrap().unwrap();
        assert_eq!(value["host"], "a.example.com");
        assert_eq!(value["segments"][0]["total"], 1);

        assert!(provider.get("quiet.example.com", &[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_honors_the_date_parameter() {
        let (store, _registry, provider) = provider();
        let yesterday = Utc::now().date_naive().pred_opt().unwrap();
        store
            .upsert(LoggedInReport::new(yesterday, "a.example.com"))
            .await
            .unwrap();

        let params = vec![("date".to_string(), yesterday.format("%Y-%m-%d").to_string())];
        assert!(provider.get("a.example.com", &params).await.unwrap().is_some());

        // Nothing for today.
        assert!(provider.get("a.example.com", &[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_rejects_malformed_date_parameter() {
        let (_store, _registry, provider) = provider();
        let params = vec![("date".to_string(), "not-a-date".to_string())];
        assert!(provider.get("a.example.com", &params).await.is_err());
    }
}

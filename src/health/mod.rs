//! Connection-health monitor and the retry bookkeeping around the initial load.

use crate::api::{ApiError, CenterGateway};
use crate::config::{EnvConfig, MAX_AUTO_RETRIES};
use crate::store::{fetch_catalog, Catalog};
use log::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadTrigger {
    /// First load when the list is mounted.
    Initial,
    /// Scheduled automatically after a failed initial load.
    AutoRetry,
    /// The user pressed "Retry".
    UserRetry,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub endpoint: Option<String>,
    pub row_count: Option<u64>,
    pub attempt: u32,
}

/// Result of one probe. Never persisted; recomputed on every attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
    pub raw_error: Option<ApiError>,
    pub status_code: Option<u16>,
    pub diagnostics: Diagnostics,
}

impl ConnectionStatus {
    fn failed(e: ApiError, attempt: u32) -> Self {
        Self {
            success: false,
            message: format!("Failed to connect to database: {}", e.message),
            status_code: e.status,
            raw_error: Some(e),
            diagnostics: Diagnostics {
                attempt,
                ..Diagnostics::default()
            },
        }
    }
}

/// Check that the backend answers. Does not touch any list state.
pub async fn probe(gateway: &dyn CenterGateway, attempt: u32) -> ConnectionStatus {
    match gateway.probe().await {
        Ok(report) => {
            info!("backend reachable at {} ({})", report.endpoint, report.status_code);
            ConnectionStatus {
                success: true,
                message: "Connected".to_string(),
                raw_error: None,
                status_code: Some(report.status_code),
                diagnostics: Diagnostics {
                    endpoint: Some(report.endpoint),
                    row_count: report.row_count,
                    attempt,
                },
            }
        }
        Err(e) => {
            warn!("probe attempt {attempt} failed: {e}");
            ConnectionStatus::failed(e, attempt)
        }
    }
}

/// Probe, then fetch the catalog. A fetch failure after a good probe is
/// reported through the same failed status so the UI has one error path.
pub async fn probe_and_fetch(
    gateway: &dyn CenterGateway,
    attempt: u32,
) -> Result<(ConnectionStatus, Catalog), ConnectionStatus> {
    let status = probe(gateway, attempt).await;
    if !status.success {
        return Err(status);
    }
    match fetch_catalog(gateway).await {
        Ok(catalog) => Ok((status, catalog)),
        Err(e) => {
            warn!("catalog fetch failed after successful probe: {e}");
            Err(ConnectionStatus {
                success: false,
                message: "Failed to load recreation centers. Please try again later.".to_string(),
                status_code: e.status,
                raw_error: Some(e),
                diagnostics: status.diagnostics,
            })
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_auto_retries: u32,
    pub delay_ms: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &EnvConfig) -> Self {
        Self {
            max_auto_retries: config.auto_retry_limit.min(MAX_AUTO_RETRIES),
            delay_ms: config.auto_retry_delay_ms,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_auto_retries: MAX_AUTO_RETRIES,
            delay_ms: 2_000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    AutoRetry { retry: u32, delay_ms: u32 },
    WaitForUser,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Tracks load attempts, the visible error, and any scheduled auto retry.
///
/// Auto retries are only granted to the initial load path and never exceed
/// the policy limit; a user retry that fails waits for the user again.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadTracker {
    policy: RetryPolicy,
    phase: LoadPhase,
    attempts: u32,
    auto_retries_used: u32,
    retry_pending: bool,
    last_status: Option<ConnectionStatus>,
}

impl LoadTracker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            phase: LoadPhase::Idle,
            attempts: 0,
            auto_retries_used: 0,
            retry_pending: false,
            last_status: None,
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn auto_retries_used(&self) -> u32 {
        self.auto_retries_used
    }

    pub fn last_status(&self) -> Option<&ConnectionStatus> {
        self.last_status.as_ref()
    }

    /// Message for the error banner; cleared by the next success.
    pub fn error_banner(&self) -> Option<&str> {
        match (&self.phase, &self.last_status) {
            (LoadPhase::Failed, Some(s)) => Some(s.message.as_str()),
            _ => None,
        }
    }

    /// A user retry is offered whenever the last attempt failed; it
    /// supersedes any scheduled auto retry.
    pub fn can_retry(&self) -> bool {
        self.phase == LoadPhase::Failed
    }

    pub fn retry_pending(&self) -> bool {
        self.retry_pending
    }

    /// Start an attempt; returns its 1-based number for diagnostics.
    pub fn begin(&mut self, trigger: LoadTrigger) -> u32 {
        if trigger == LoadTrigger::UserRetry {
            self.retry_pending = false;
        }
        self.attempts += 1;
        self.phase = LoadPhase::Loading;
        self.attempts
    }

    pub fn succeed(&mut self, status: ConnectionStatus) {
        self.phase = LoadPhase::Ready;
        self.retry_pending = false;
        self.last_status = Some(status);
    }

    pub fn fail(&mut self, trigger: LoadTrigger, status: ConnectionStatus) -> RetryDecision {
        self.phase = LoadPhase::Failed;
        self.last_status = Some(status);

        let on_initial_path = matches!(trigger, LoadTrigger::Initial | LoadTrigger::AutoRetry);
        if on_initial_path && self.auto_retries_used < self.policy.max_auto_retries {
            self.auto_retries_used += 1;
            self.retry_pending = true;
            return RetryDecision::AutoRetry {
                retry: self.auto_retries_used,
                delay_ms: self.policy.delay_ms,
            };
        }
        self.retry_pending = false;
        RetryDecision::WaitForUser
    }

    /// Called when a scheduled auto retry fires. `false` means it was
    /// cancelled in the meantime and must not run.
    pub fn take_pending_retry(&mut self) -> bool {
        std::mem::take(&mut self.retry_pending)
    }

    /// Drop any scheduled auto retry (the consuming view went away).
    pub fn cancel_pending(&mut self) {
        self.retry_pending = false;
    }

    /// Apply a finished attempt to the tracker and, on success, to the store.
    pub fn finish(
        &mut self,
        trigger: LoadTrigger,
        outcome: Result<(ConnectionStatus, Catalog), ConnectionStatus>,
        store: &mut crate::store::CenterStore,
    ) -> Option<RetryDecision> {
        match outcome {
            Ok((status, catalog)) => {
                store.replace_catalog(catalog);
                self.succeed(status);
                None
            }
            Err(status) => Some(self.fail(trigger, status)),
        }
    }
}

impl Default for LoadTracker {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryBackend;
    use crate::api::ApiErrorKind;
    use crate::models::fixtures::center;
    use crate::store::CenterStore;
    use futures::executor::block_on;

    fn backend() -> MemoryBackend {
        MemoryBackend::with_centers(vec![
            center("a", "Oakridge", "Portland", &["Pool"]),
            center("b", "Riverside", "Salem", &["Trails"]),
        ])
    }

    /// Run one attempt the way the list page does, ignoring the timer delay.
    fn attempt(
        b: &MemoryBackend,
        t: &mut LoadTracker,
        s: &mut CenterStore,
        trigger: LoadTrigger,
    ) -> Option<RetryDecision> {
        let n = t.begin(trigger);
        let outcome = block_on(probe_and_fetch(b, n));
        t.finish(trigger, outcome, s)
    }

    #[test]
    fn test_probe_success_reports_diagnostics() {
        let b = backend();
        let status = block_on(probe(&b, 1));
        assert!(status.success);
        assert_eq!(status.status_code, Some(200));
        assert_eq!(status.diagnostics.row_count, Some(2));
        assert_eq!(status.diagnostics.attempt, 1);
        assert!(status.raw_error.is_none());
    }

    #[test]
    fn test_probe_failure_carries_raw_error() {
        let b = backend();
        b.fail_probes(1);
        let status = block_on(probe(&b, 3));
        assert!(!status.success);
        assert!(status.message.starts_with("Failed to connect to database"));
        assert_eq!(
            status.raw_error.as_ref().map(|e| e.kind),
            Some(ApiErrorKind::Connectivity)
        );
        assert_eq!(status.diagnostics.attempt, 3);
    }

    #[test]
    fn test_failed_status_message_names_cause_once() {
        let status = ConnectionStatus::failed(ApiError::http(503, "", "Health check"), 1);
        assert_eq!(status.message, "Failed to connect to database: Health check (503)");
        assert_eq!(status.status_code, Some(503));
    }

    #[test]
    fn test_initial_failures_then_auto_retry_success() {
        let b = backend();
        b.fail_probes(2);
        let mut t = LoadTracker::default();
        let mut s = CenterStore::new();

        assert_eq!(
            attempt(&b, &mut t, &mut s, LoadTrigger::Initial),
            Some(RetryDecision::AutoRetry {
                retry: 1,
                delay_ms: 2_000
            })
        );
        assert!(t.take_pending_retry());
        assert!(matches!(
            attempt(&b, &mut t, &mut s, LoadTrigger::AutoRetry),
            Some(RetryDecision::AutoRetry { retry: 2, .. })
        ));
        assert!(t.take_pending_retry());
        assert_eq!(attempt(&b, &mut t, &mut s, LoadTrigger::AutoRetry), None);

        assert_eq!(t.phase(), LoadPhase::Ready);
        assert_eq!(s.canonical().len(), 2);
        assert!(t.error_banner().is_none());
    }

    #[test]
    fn test_auto_retries_exhausted_then_user_retry_succeeds() {
        let b = backend();
        b.fail_probes(3);
        let mut t = LoadTracker::default();
        let mut s = CenterStore::new();

        attempt(&b, &mut t, &mut s, LoadTrigger::Initial);
        attempt(&b, &mut t, &mut s, LoadTrigger::AutoRetry);
        assert_eq!(
            attempt(&b, &mut t, &mut s, LoadTrigger::AutoRetry),
            Some(RetryDecision::WaitForUser)
        );
        assert_eq!(t.auto_retries_used(), 2);
        assert!(t.can_retry());
        assert!(t.error_banner().is_some());
        assert!(s.canonical().is_empty());

        assert_eq!(attempt(&b, &mut t, &mut s, LoadTrigger::UserRetry), None);
        assert_eq!(s.canonical().len(), 2);
        assert!(t.error_banner().is_none());
        assert_eq!(t.attempts(), 4);
    }

    #[test]
    fn test_user_retry_never_schedules_auto_retry() {
        let b = backend();
        b.fail_probes(5);
        let mut t = LoadTracker::default();
        let mut s = CenterStore::new();
        assert_eq!(
            attempt(&b, &mut t, &mut s, LoadTrigger::UserRetry),
            Some(RetryDecision::WaitForUser)
        );
        assert_eq!(t.auto_retries_used(), 0);
        assert!(!t.take_pending_retry());
    }

    #[test]
    fn test_failed_reload_keeps_loaded_list() {
        let b = backend();
        let mut t = LoadTracker::default();
        let mut s = CenterStore::new();
        assert_eq!(attempt(&b, &mut t, &mut s, LoadTrigger::Initial), None);

        b.fail_probes(1);
        attempt(&b, &mut t, &mut s, LoadTrigger::UserRetry);
        assert_eq!(t.phase(), LoadPhase::Failed);
        assert_eq!(s.canonical().len(), 2);
    }

    #[test]
    fn test_fetch_failure_after_probe_is_a_failed_status() {
        let b = backend();
        b.fail_reads(1);
        let outcome = block_on(probe_and_fetch(&b, 1));
        let status = outcome.unwrap_err();
        assert!(!status.success);
        assert_eq!(status.diagnostics.row_count, Some(2));
    }

    #[test]
    fn test_cancelled_retry_does_not_run() {
        let b = backend();
        b.fail_probes(1);
        let mut t = LoadTracker::default();
        let mut s = CenterStore::new();
        attempt(&b, &mut t, &mut s, LoadTrigger::Initial);
        t.cancel_pending();
        assert!(!t.take_pending_retry());
    }

    #[test]
    fn test_policy_from_config_is_clamped() {
        let mut c = EnvConfig::from_lookup(|_| None);
        c.auto_retry_limit = 10;
        c.auto_retry_delay_ms = 500;
        assert_eq!(
            RetryPolicy::from_config(&c),
            RetryPolicy {
                max_auto_retries: 2,
                delay_ms: 500
            }
        );
    }
}

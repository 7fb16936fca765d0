//! Backend liveness monitoring.
//!
//! `HealthMonitor::start` spawns a task that probes `GET /health` right away
//! and then on a fixed interval, publishing a `BackendStatus` on a watch
//! channel. The returned `MonitorHandle` stops the task when cancelled or
//! dropped; a probe still in flight at that moment never publishes.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::ApiClient;

/// Default time between liveness probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendStatus {
    #[default]
    Unknown,
    Connected,
    Offline,
}

impl BackendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendStatus::Unknown => "unknown",
            BackendStatus::Connected => "connected",
            BackendStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct HealthMonitor {
    api: ApiClient,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run a single probe. No retries: a failure is reported as `Offline`.
    pub async fn probe(&self) -> BackendStatus {
        match self.api.check_health().await {
            Ok(()) => BackendStatus::Connected,
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                BackendStatus::Offline
            }
        }
    }

    /// Start polling on the current tokio runtime.
    pub fn start(self) -> MonitorHandle {
        let (tx, rx) = watch::channel(BackendStatus::Unknown);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(tx, cancel.clone()));
        MonitorHandle {
            status: rx,
            cancel,
            task: Some(task),
        }
    }

    async fn run(self, tx: watch::Sender<BackendStatus>, cancel: CancellationToken) {
        if !self.api.is_configured() {
            // Keep polling anyway; each tick reports Offline until an
            // address exists.
            info!("Backend address not configured; reporting offline");
            tx.send_replace(BackendStatus::Offline);
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let status = tokio::select! {
                () = cancel.cancelled() => break,
                status = self.probe() => status,
            };

            if cancel.is_cancelled() {
                break;
            }
            let previous = tx.send_replace(status);
            if previous != status {
                info!(from = %previous, to = %status, "Backend status changed");
            }
        }
        debug!("Health monitor stopped");
    }
}

/// Owns the polling task. Dropping it stops polling.
pub struct MonitorHandle {
    status: watch::Receiver<BackendStatus>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// The most recently published status.
    pub fn status(&self) -> BackendStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<BackendStatus> {
        self.status.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel and wait for the task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Long enough that only the immediate first probe runs in a test.
    const SLOW_INTERVAL: Duration = Duration::from_secs(3600);

    fn monitor_for(base: Option<String>) -> HealthMonitor {
        HealthMonitor::new(ApiClient::new(base).unwrap()).with_interval(SLOW_INTERVAL)
    }

    async fn next_status(rx: &mut watch::Receiver<BackendStatus>) -> BackendStatus {
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("status change within timeout")
            .expect("monitor still running");
        *rx.borrow_and_update()
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(BackendStatus::default(), BackendStatus::Unknown);
        assert_eq!(BackendStatus::Connected.to_string(), "connected");
        assert_eq!(BackendStatus::Offline.as_str(), "offline");
    }

    #[tokio::test]
    async fn test_successful_probe_connects() {
        let server = MockServer::start().await;
        Mock::given(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let handle = monitor_for(Some(server.uri())).start();
        let mut rx = handle.subscribe();
        assert_eq!(next_status(&mut rx).await, BackendStatus::Connected);
        assert_eq!(handle.status(), BackendStatus::Connected);
    }

    #[tokio::test]
    async fn test_error_status_goes_offline() {
        let server = MockServer::start().await;
        Mock::given(path("/health"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let handle = monitor_for(Some(server.uri())).start();
        let mut rx = handle.subscribe();
        assert_eq!(next_status(&mut rx).await, BackendStatus::Offline);
    }

    #[tokio::test]
    async fn test_unreachable_backend_goes_offline() {
        let monitor = monitor_for(Some("http://127.0.0.1:9".to_string()));
        assert_eq!(monitor.probe().await, BackendStatus::Offline);
    }

    #[tokio::test]
    async fn test_missing_base_reports_offline_immediately() {
        let handle = monitor_for(None).start();
        let mut rx = handle.subscribe();
        assert_eq!(next_status(&mut rx).await, BackendStatus::Offline);
        // Still polling
        assert!(!handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_polls_on_interval() {
        let server = MockServer::start().await;
        Mock::given(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2..)
            .mount(&server)
            .await;

        let handle = HealthMonitor::new(ApiClient::new(Some(server.uri())).unwrap())
            .with_interval(Duration::from_millis(50))
            .start();
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.shutdown().await;
        // `expect(2..)` is verified when the server drops
    }

    #[tokio::test]
    async fn test_no_transition_after_teardown() {
        let server = MockServer::start().await;
        Mock::given(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
            .mount(&server)
            .await;

        let handle = monitor_for(Some(server.uri())).start();
        let rx = handle.subscribe();

        // Let the first probe get in flight, then tear down
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(handle);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(*rx.borrow(), BackendStatus::Unknown);
        assert!(!rx.has_changed().unwrap_or(false));
    }
}

//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Telemetry binding and aggregation for the metering dashboard."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Host collaborator seam and bounded acquisition of the host handle.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use meterdash_common::time::duration_to_millis;
use meterdash_common::HostConfig;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::errors::{EngineError, Result};
use crate::events::HostEvent;
use crate::metrics::EngineMetrics;

/// Requirements announced to the host when the dashboard registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRegistration {
    pub need_realtime_configs: bool,
    pub need_history_configs: bool,
    pub need_actions: bool,
    pub max_realtime_configs_count: usize,
    pub max_history_configs_count: usize,
    pub max_actions_count: usize,
    pub min_realtime_configs_count: usize,
    pub min_history_configs_count: usize,
    pub min_actions_count: usize,
}

impl Default for HostRegistration {
    fn default() -> Self {
        Self::from_config(&HostConfig::default())
    }
}

impl HostRegistration {
    pub fn from_config(config: &HostConfig) -> Self {
        Self {
            need_realtime_configs: true,
            need_history_configs: true,
            need_actions: true,
            max_realtime_configs_count: config.max_realtime_configs,
            max_history_configs_count: config.max_history_configs,
            max_actions_count: config.max_actions,
            min_realtime_configs_count: 0,
            min_history_configs_count: 0,
            min_actions_count: 0,
        }
    }
}

/// Event source owned by the host runtime.
#[async_trait]
pub trait TelemetryHost: Send {
    /// Announce the dashboard's requirements. Called once before any event is read.
    async fn register(&mut self, registration: &HostRegistration) -> Result<()>;

    /// Next inbound event; `None` once the host has closed the stream.
    async fn next_event(&mut self) -> Result<Option<HostEvent>>;
}

/// Fixed-interval polling with an attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionPolicy {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl AcquisitionPolicy {
    pub fn new(poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            poll_interval,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(config: &HostConfig) -> Self {
        Self::new(config.poll_interval, config.max_attempts)
    }
}

impl Default for AcquisitionPolicy {
    fn default() -> Self {
        Self::from_config(&HostConfig::default())
    }
}

/// Host availability as seen by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Pending,
    Ready,
    /// Terminal: the attempt cap was reached.
    Unavailable,
}

/// Polls for the host handle and publishes progress on a watch channel.
#[derive(Debug)]
pub struct HostAcquirer {
    policy: AcquisitionPolicy,
    metrics: Option<EngineMetrics>,
    status: watch::Sender<HostStatus>,
}

impl HostAcquirer {
    pub fn new(policy: AcquisitionPolicy, metrics: Option<EngineMetrics>) -> Self {
        let (status, _) = watch::channel(HostStatus::Pending);
        Self {
            policy,
            metrics,
            status,
        }
    }

    pub fn policy(&self) -> AcquisitionPolicy {
        self.policy
    }

    /// Subscribe to status changes.
    pub fn status(&self) -> watch::Receiver<HostStatus> {
        self.status.subscribe()
    }

    /// Call `probe` (1-indexed attempt) until it yields a handle. Between
    /// attempts the acquirer sleeps for the poll interval.
    pub async fn acquire<F, Fut, H>(&self, mut probe: F) -> Result<H>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Option<H>>,
    {
        let started = Instant::now();
        self.status.send_replace(HostStatus::Pending);
        for attempt in 1..=self.policy.max_attempts {
            let handle = probe(attempt).await;
            if let Some(metrics) = &self.metrics {
                metrics.record_acquisition_attempt(handle.is_some());
            }
            if let Some(handle) = handle {
                info!(
                    target: "meterdash::engine::host",
                    attempt,
                    waited_ms = duration_to_millis(started.elapsed()),
                    "telemetry host acquired",
                );
                self.status.send_replace(HostStatus::Ready);
                return Ok(handle);
            }
            warn!(
                target: "meterdash::engine::host",
                attempt,
                max_attempts = self.policy.max_attempts,
                "telemetry host not available yet; retrying",
            );
            if attempt < self.policy.max_attempts {
                sleep(self.policy.poll_interval).await;
            }
        }

        let waited = started.elapsed();
        error!(
            target: "meterdash::engine::host",
            attempts = self.policy.max_attempts,
            waited_ms = duration_to_millis(waited),
            "telemetry host unavailable; giving up",
        );
        self.status.send_replace(HostStatus::Unavailable);
        Err(EngineError::HostUnavailable {
            attempts: self.policy.max_attempts,
            waited,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_defaults_match_dashboard_limits() {
        let registration = HostRegistration::default();
        assert_eq!(registration.max_realtime_configs_count, 20);
        assert_eq!(registration.max_history_configs_count, 1);
        assert_eq!(registration.max_actions_count, 2);
        assert_eq!(registration.min_actions_count, 0);
        let json = serde_json::to_value(registration).unwrap();
        assert_eq!(json["needRealtimeConfigs"], serde_json::json!(true));
        assert_eq!(json["maxRealtimeConfigsCount"], serde_json::json!(20));
    }

    #[test]
    fn policy_follows_host_config() {
        let policy = AcquisitionPolicy::default();
        assert_eq!(policy.poll_interval, Duration::from_millis(500));
        assert_eq!(policy.max_attempts, 120);
        assert_eq!(AcquisitionPolicy::new(Duration::ZERO, 0).max_attempts, 1);
    }
}

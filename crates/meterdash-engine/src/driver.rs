//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Telemetry binding and aggregation for the metering dashboard."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::engine::{TelemetryEngine, UpdateOutcome};
use crate::errors::Result;
use crate::host::TelemetryHost;

/// Why the event loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    HostClosed,
    Shutdown,
    UpdateLimit,
}

/// Counters for one run of the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoopSummary {
    pub events: u64,
    pub configurations: u64,
    pub published: u64,
    pub ignored: u64,
    pub stop: StopReason,
}

impl LoopSummary {
    fn new() -> Self {
        Self {
            events: 0,
            configurations: 0,
            published: 0,
            ignored: 0,
            stop: StopReason::HostClosed,
        }
    }

    fn count(&mut self, outcome: UpdateOutcome) {
        self.events += 1;
        match outcome {
            UpdateOutcome::Configured { .. } => self.configurations += 1,
            UpdateOutcome::Ignored => self.ignored += 1,
            UpdateOutcome::Published { .. } => self.published += 1,
        }
    }
}

/// Apply host events to `engine` one at a time until the host closes or
/// `shutdown` fires.
pub async fn run_event_loop<H>(
    host: &mut H,
    engine: &mut TelemetryEngine,
    shutdown: broadcast::Receiver<()>,
) -> Result<LoopSummary>
where
    H: TelemetryHost + ?Sized,
{
    run_event_loop_until(host, engine, shutdown, None).await
}

/// Like [`run_event_loop`], additionally stopping after `max_published`
/// published updates.
pub async fn run_event_loop_until<H>(
    host: &mut H,
    engine: &mut TelemetryEngine,
    mut shutdown: broadcast::Receiver<()>,
    max_published: Option<u64>,
) -> Result<LoopSummary>
where
    H: TelemetryHost + ?Sized,
{
    let mut summary = LoopSummary::new();
    loop {
        if max_published.is_some_and(|limit| summary.published >= limit) {
            summary.stop = StopReason::UpdateLimit;
            break;
        }
        tokio::select! {
            _ = shutdown.recv() => {
                debug!(target: "meterdash::engine::driver", "shutdown signal received");
                summary.stop = StopReason::Shutdown;
                break;
            }
            event = host.next_event() => {
                let Some(event) = event? else {
                    summary.stop = StopReason::HostClosed;
                    break;
                };
                let kind = event.kind();
                let outcome = engine.apply(event);
                debug!(target: "meterdash::engine::driver", kind, ?outcome, "host event applied");
                summary.count(outcome);
            }
        }
    }
    info!(
        target: "meterdash::engine::driver",
        events = summary.events,
        published = summary.published,
        ignored = summary.ignored,
        stop = ?summary.stop,
        "event loop finished",
    );
    Ok(summary)
}

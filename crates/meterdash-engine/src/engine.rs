//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Telemetry binding and aggregation for the metering dashboard."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::sync::Arc;

use chrono::NaiveTime;
use meterdash_common::time::wall_clock_now;
use meterdash_logging::{
    log_system_event, md_debug, md_info, md_warn, LogContext, SystemEventOutcome,
};
use parking_lot::RwLock;

use crate::derive::derive;
use crate::events::{ConfigurationEvent, HostEvent, ValuesEvent};
use crate::history::HistorySet;
use crate::metrics::EngineMetrics;
use crate::registry::ChannelRegistry;
use crate::resolver::{
    resolve_with_report, FillReason, RawReading, ResolveReport, DEFAULT_VALUE,
};
use crate::state::{DashboardState, EngineState};

/// Reader side of the engine. Cheap to clone; every clone sees the latest
/// published snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    inner: Arc<RwLock<Arc<DashboardState>>>,
}

impl SnapshotHandle {
    fn new(initial: DashboardState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// Most recently published state. The returned value never changes.
    pub fn latest(&self) -> Arc<DashboardState> {
        self.inner.read().clone()
    }

    fn publish(&self, state: DashboardState) {
        *self.inner.write() = Arc::new(state);
    }
}

/// What an inbound event did to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Registry rebound with `bound` channel ids.
    Configured { bound: usize },
    /// Values arrived before any channel was bound; nothing changed.
    Ignored,
    /// A new snapshot was published.
    Published { tick: u64 },
}

/// Single-writer owner of the registry and chart history.
#[derive(Debug)]
pub struct TelemetryEngine {
    registry: ChannelRegistry,
    history: HistorySet,
    state: EngineState,
    tick: u64,
    published: SnapshotHandle,
    metrics: Option<EngineMetrics>,
}

impl Default for TelemetryEngine {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TelemetryEngine {
    pub fn new(metrics: Option<EngineMetrics>) -> Self {
        Self {
            registry: ChannelRegistry::new(),
            history: HistorySet::new(),
            state: EngineState::Unconfigured,
            tick: 0,
            published: SnapshotHandle::new(DashboardState::initial()),
            metrics,
        }
    }

    /// Drop the binding and all history. Existing snapshot handles stay
    /// connected and observe the initial state.
    pub fn reset(&mut self) {
        self.registry = ChannelRegistry::new();
        self.history = HistorySet::new();
        self.state = EngineState::Unconfigured;
        self.tick = 0;
        self.published.publish(DashboardState::initial());
        md_info!("telemetry engine reset");
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn history(&self) -> &HistorySet {
        &self.history
    }

    /// Number of published updates since construction or the last reset.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn snapshot(&self) -> Arc<DashboardState> {
        self.published.latest()
    }

    pub fn handle(&self) -> SnapshotHandle {
        self.published.clone()
    }

    pub fn apply(&mut self, event: HostEvent) -> UpdateOutcome {
        match event {
            HostEvent::Configuration(configuration) => self.on_configuration(&configuration),
            HostEvent::Values(values) => self.on_values(&values),
        }
    }

    /// Replace the channel binding with the ordered ids of `event`.
    pub fn on_configuration(&mut self, event: &ConfigurationEvent) -> UpdateOutcome {
        self.registry.bind(event.ordered_ids().cloned());
        self.state = EngineState::Configured;
        let bound = self.registry.len();
        let unbound = self.registry.unbound_roles().count();
        if let Some(metrics) = &self.metrics {
            metrics.record_configuration(bound);
        }
        if unbound > 0 {
            md_warn!(
                context = LogContext::new().with_tick(self.tick),
                "short configuration: {bound} ids bound, {unbound} roles will read as zero"
            );
        } else {
            md_info!(
                context = LogContext::new().with_tick(self.tick),
                "channel registry bound: {bound} ids"
            );
        }
        UpdateOutcome::Configured { bound }
    }

    /// Values event stamped with the current local wall-clock time.
    pub fn on_values(&mut self, event: &ValuesEvent) -> UpdateOutcome {
        self.on_values_at(event, wall_clock_now())
    }

    pub fn on_values_at(&mut self, event: &ValuesEvent, time: NaiveTime) -> UpdateOutcome {
        self.on_reading_at(&event.to_reading(), time)
    }

    /// Resolve, derive, append to every chart and publish, in that order.
    pub fn on_reading_at(&mut self, reading: &RawReading, time: NaiveTime) -> UpdateOutcome {
        if self.registry.is_empty() {
            md_debug!(
                context = LogContext::new().with_tick(self.tick),
                "values received with no bound channels; ignoring {} readings",
                reading.len()
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_ignored_update();
            }
            return UpdateOutcome::Ignored;
        }

        let tick = self.tick + 1;
        let (resolved, report) = resolve_with_report(&self.registry, reading);
        let summary = derive(&resolved);
        self.history.record_tick(time, &resolved);
        self.trace_default_fills(tick, &report);
        if let Some(metrics) = &self.metrics {
            metrics.record_update(&report, &self.history);
        }

        let snapshot = DashboardState::assemble(
            tick,
            self.state,
            resolved,
            summary,
            self.history.clone(),
            self.registry.len(),
            report.fills,
            Some(time),
        );
        self.published.publish(snapshot);
        self.tick = tick;
        UpdateOutcome::Published { tick }
    }

    fn trace_default_fills(&self, tick: u64, report: &ResolveReport) {
        if report.is_clean() {
            return;
        }
        log_system_event(
            Some(&LogContext::new().with_tick(tick)),
            "values.defaulted",
            &format!(
                "{} roles read as {DEFAULT_VALUE} ({} unbound, {} missing)",
                report.fills.len(),
                report.count(FillReason::Unbound),
                report.count(FillReason::MissingValue)
            ),
            SystemEventOutcome::Degraded,
        );
        for fill in &report.fills {
            let mut context = LogContext::new()
                .with_role(fill.role.label())
                .with_tick(tick);
            if let Some(channel) = &fill.channel {
                context = context.with_channel(channel.as_str());
            }
            md_debug!(
                context = context,
                "role defaulted to {DEFAULT_VALUE} ({})",
                fill.reason.as_str()
            );
        }
    }
}

//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Telemetry binding and aggregation for the metering dashboard."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use meterdash_metrics::SharedRegistry;
use prometheus::{IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts};

use crate::history::HistorySet;
use crate::resolver::ResolveReport;
use crate::roles::MetricGroup;

/// Metrics published by the telemetry engine.
#[derive(Clone)]
pub struct EngineMetrics {
    registry: SharedRegistry,
    updates_total: IntCounter,
    ignored_updates_total: IntCounter,
    configurations_total: IntCounter,
    bound_channels: IntGauge,
    default_fills_total: IntCounterVec,
    history_len: IntGaugeVec,
    host_acquisition_attempts_total: IntCounterVec,
}

impl EngineMetrics {
    /// Register the engine metric family against the provided registry.
    pub fn new(registry: SharedRegistry) -> crate::errors::Result<Self> {
        let updates_total = IntCounter::with_opts(Opts::new(
            "meterdash_engine_updates_total",
            "Values events that produced a published snapshot",
        ))?;
        registry.register(Box::new(updates_total.clone()))?;

        let ignored_updates_total = IntCounter::with_opts(Opts::new(
            "meterdash_engine_ignored_updates_total",
            "Values events dropped because no channels were bound",
        ))?;
        registry.register(Box::new(ignored_updates_total.clone()))?;

        let configurations_total = IntCounter::with_opts(Opts::new(
            "meterdash_engine_configurations_total",
            "Configuration events applied to the channel registry",
        ))?;
        registry.register(Box::new(configurations_total.clone()))?;

        let bound_channels = IntGauge::with_opts(Opts::new(
            "meterdash_engine_bound_channels",
            "Channel ids in the current registry",
        ))?;
        registry.register(Box::new(bound_channels.clone()))?;

        let default_fills_total = IntCounterVec::new(
            Opts::new(
                "meterdash_engine_default_fills_total",
                "Roles resolved to the default value, by role and reason",
            ),
            &["role", "reason"],
        )?;
        registry.register(Box::new(default_fills_total.clone()))?;

        let history_len = IntGaugeVec::new(
            Opts::new(
                "meterdash_engine_history_len",
                "Samples currently held per chart group",
            ),
            &["group"],
        )?;
        registry.register(Box::new(history_len.clone()))?;

        let host_acquisition_attempts_total = IntCounterVec::new(
            Opts::new(
                "meterdash_engine_host_acquisition_attempts_total",
                "Host handle probes, by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(host_acquisition_attempts_total.clone()))?;

        Ok(Self {
            registry,
            updates_total,
            ignored_updates_total,
            configurations_total,
            bound_channels,
            default_fills_total,
            history_len,
            host_acquisition_attempts_total,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn record_configuration(&self, bound: usize) {
        self.configurations_total.inc();
        self.bound_channels.set(bound as i64);
    }

    pub fn record_ignored_update(&self) {
        self.ignored_updates_total.inc();
    }

    /// Count a published update along with its default fills and buffer sizes.
    pub fn record_update(&self, report: &ResolveReport, history: &HistorySet) {
        self.updates_total.inc();
        for fill in &report.fills {
            self.default_fills_total
                .with_label_values(&[fill.role.label(), fill.reason.as_str()])
                .inc();
        }
        for group in MetricGroup::ALL {
            self.history_len
                .with_label_values(&[group.as_str()])
                .set(history.get(group).len() as i64);
        }
    }

    pub fn record_acquisition_attempt(&self, ready: bool) {
        let outcome = if ready { "ready" } else { "pending" };
        self.host_acquisition_attempts_total
            .with_label_values(&[outcome])
            .inc();
    }
}

impl std::fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineMetrics").finish_non_exhaustive()
    }
}

//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Telemetry binding and aggregation for the metering dashboard."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Telemetry binding and aggregation engine for the metering dashboard.
//!
//! The host sends one configuration event (an ordered list of channel ids)
//! followed by a stream of values events. Channel position decides the role
//! ([`roles::ROLE_TABLE`]); every values event is resolved, summarised and
//! appended to four rolling chart buffers before a new [`DashboardState`] is
//! published.

pub mod derive;
pub mod driver;
pub mod engine;
pub mod errors;
pub mod events;
pub mod history;
pub mod host;
pub mod metrics;
pub mod registry;
pub mod resolver;
pub mod roles;
pub mod state;

pub use derive::{derive, DerivedSummary, TotalSource};
pub use driver::{run_event_loop, run_event_loop_until, LoopSummary, StopReason};
pub use engine::{SnapshotHandle, TelemetryEngine, UpdateOutcome};
pub use errors::{EngineError, Result};
pub use events::{ChannelDescriptor, ConfigurationEvent, HostEvent, ValuesEvent};
pub use history::{HistoryBuffer, HistorySample, HistorySet, HISTORY_CAPACITY};
pub use host::{AcquisitionPolicy, HostAcquirer, HostRegistration, HostStatus, TelemetryHost};
pub use metrics::EngineMetrics;
pub use registry::{ChannelId, ChannelRegistry};
pub use resolver::{
    resolve, resolve_with_report, DefaultFill, FillReason, RawReading, ResolveReport,
    ResolvedMetrics, DEFAULT_VALUE,
};
pub use roles::{MetricGroup, Role, Unit, ROLE_COUNT, ROLE_TABLE};
pub use state::{DashboardState, EngineState, Readout};

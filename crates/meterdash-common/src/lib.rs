//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the dashboard runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Shared primitives for the metering dashboard workspace.
//! This crate exposes configuration loading, logging bootstrap and the
//! wall-clock helpers used to stamp chart samples.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    AppConfig, HostConfig, LoadedAppConfig, LoggingConfig, MetricsConfig, SimulationConfig,
    MAX_REALTIME_CHANNELS,
};
pub use logging::{init_tracing, ConsoleStream, LogFormat};
pub use time::{wall_clock_label, wall_clock_now, wall_clock_of};

//! ---
//! ems_section: "11-simulation-test-harness"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulated meter host and scenario replay."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Simulated telemetry host for development, demos and tests.

pub mod generator;
pub mod host;
pub mod replay;

pub use generator::SyntheticMeter;
pub use host::{acquire_simulated, SimulatedHost};
pub use replay::{ScenarioFile, ScenarioReplay};

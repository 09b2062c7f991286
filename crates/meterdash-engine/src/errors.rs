//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Telemetry binding and aggregation for the metering dashboard."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("telemetry host unavailable after {attempts} attempts ({waited:?})")]
    HostUnavailable { attempts: u32, waited: Duration },
    #[error("invalid host payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("host channel failed: {0}")]
    Host(String),
    #[error("metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl EngineError {
    pub fn host(message: impl Into<String>) -> Self {
        EngineError::Host(message.into())
    }
}

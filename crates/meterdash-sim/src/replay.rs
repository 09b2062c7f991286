//! ---
//! ems_section: "11-simulation-test-harness"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulated meter host and scenario replay."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use meterdash_engine::{ChannelId, ConfigurationEvent, ValuesEvent};
use serde::Deserialize;
use serde_json::{Map, Value};

/// On-disk scenario: the channel list sent as configuration, then frames of
/// `{ "<id>": <number> }`. A frame entry may also be a raw host entry such as
/// `{ "value": 1.0 }` or something malformed, which is passed through as is.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioFile {
    pub channels: Vec<ChannelId>,
    #[serde(default)]
    pub frames: Vec<Map<String, Value>>,
}

/// Cycles through the frames of a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioReplay {
    configuration: ConfigurationEvent,
    frames: Vec<ValuesEvent>,
    cursor: usize,
}

impl ScenarioReplay {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("unable to read scenario file {}", path.display()))?;
                Self::from_json(&contents)
                    .with_context(|| format!("invalid scenario JSON {}", path.display()))
            }
            _ => anyhow::bail!("unsupported scenario format: {}", path.display()),
        }
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let scenario: ScenarioFile = serde_json::from_str(contents)?;
        Ok(Self::from_scenario(scenario))
    }

    pub fn from_scenario(scenario: ScenarioFile) -> Self {
        let frames = scenario
            .frames
            .into_iter()
            .map(|frame| {
                frame
                    .into_iter()
                    .fold(ValuesEvent::new(), |event, (id, entry)| match entry {
                        Value::Number(number) => match number.as_f64() {
                            Some(value) => event.with_value(id, value),
                            None => event,
                        },
                        other => event.with_raw(id, other),
                    })
            })
            .collect();
        Self {
            configuration: ConfigurationEvent::from_ids(scenario.channels),
            frames,
            cursor: 0,
        }
    }

    pub fn configuration(&self) -> &ConfigurationEvent {
        &self.configuration
    }

    pub fn channel_count(&self) -> usize {
        self.configuration.realtime_configs.len()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Next frame, wrapping around at the end. `None` only for an empty scenario.
    pub fn next_values(&mut self) -> Option<ValuesEvent> {
        if self.frames.is_empty() {
            return None;
        }
        let frame = self.frames[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        Some(frame)
    }
}

//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Telemetry binding and aggregation for the metering dashboard."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::Result;
use crate::registry::ChannelId;
use crate::resolver::RawReading;

/// One realtime channel as described by the host configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    pub id: ChannelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChannelDescriptor {
    pub fn new(id: impl Into<ChannelId>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// Configuration event: the ordered realtime channel list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationEvent {
    #[serde(default)]
    pub realtime_configs: Vec<ChannelDescriptor>,
}

impl ConfigurationEvent {
    pub fn from_ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ChannelId>,
    {
        Self {
            realtime_configs: ids.into_iter().map(ChannelDescriptor::new).collect(),
        }
    }

    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Identifiers in configuration order.
    pub fn ordered_ids(&self) -> impl Iterator<Item = &ChannelId> + '_ {
        self.realtime_configs.iter().map(|descriptor| &descriptor.id)
    }
}

/// Values event: `{ "<channel id>": { "value": <number> }, ... }`.
///
/// Entries are kept as raw JSON; the numeric extraction happens in
/// [`ValuesEvent::to_reading`] so that malformed entries degrade to absence
/// instead of failing the whole event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValuesEvent {
    entries: Map<String, Value>,
}

impl ValuesEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a well-formed `{ "value": v }` entry.
    pub fn with_value(mut self, id: impl Into<ChannelId>, value: f64) -> Self {
        let id: ChannelId = id.into();
        self.entries
            .insert(id.as_str().to_owned(), serde_json::json!({ "value": value }));
        self
    }

    /// Insert an arbitrary JSON entry, well-formed or not.
    pub fn with_raw(mut self, id: impl Into<ChannelId>, entry: Value) -> Self {
        let id: ChannelId = id.into();
        self.entries.insert(id.as_str().to_owned(), entry);
        self
    }

    /// Build from any JSON value. A non-object payload carries no readings.
    pub fn from_value(payload: Value) -> Self {
        match payload {
            Value::Object(entries) => Self { entries },
            other => {
                tracing::warn!(payload_kind = json_kind(&other), "values payload is not an object; treating as empty");
                Self::default()
            }
        }
    }

    /// Parse a JSON document. Only syntactically invalid JSON is an error.
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(Self::from_value(serde_json::from_str(payload)?))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Numeric readings keyed by channel. Entries without a numeric `value`
    /// are skipped and therefore resolve to the default later on.
    pub fn to_reading(&self) -> RawReading {
        self.entries
            .iter()
            .filter_map(|(id, entry)| {
                let value = entry.get("value").and_then(Value::as_f64);
                if value.is_none() {
                    tracing::debug!(channel = %id, "ignoring malformed value entry");
                }
                value.map(|value| (ChannelId::new(id.clone()), value))
            })
            .collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Inbound event delivered by the host runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Configuration(ConfigurationEvent),
    Values(ValuesEvent),
}

impl HostEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            HostEvent::Configuration(_) => "configuration",
            HostEvent::Values(_) => "values",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn configuration_keeps_order_and_ignores_extra_fields() {
        let event = ConfigurationEvent::from_json(
            r#"{"realtime_configs":[
                {"id": 11, "name": "U1", "unit": "V"},
                {"id": "12"},
                {"id": 10}
            ], "history_configs": []}"#,
        )
        .unwrap();
        let ids: Vec<&str> = event.ordered_ids().map(ChannelId::as_str).collect();
        assert_eq!(ids, ["11", "12", "10"]);
        assert_eq!(event.realtime_configs[0].name.as_deref(), Some("U1"));
    }

    #[test]
    fn missing_realtime_list_is_an_empty_configuration() {
        let event = ConfigurationEvent::from_json("{}").unwrap();
        assert!(event.realtime_configs.is_empty());
    }

    #[test]
    fn invalid_configuration_json_is_an_error() {
        assert!(ConfigurationEvent::from_json("{not json").is_err());
    }

    #[test]
    fn malformed_value_entries_are_dropped() {
        let event = ValuesEvent::from_value(json!({
            "1": {"value": 230.5},
            "2": {"value": "231"},
            "3": {"other": 1},
            "4": 17,
            "5": {"value": null},
            "6": {"value": -4}
        }));
        let reading = event.to_reading();
        assert_eq!(reading.len(), 2);
        assert_eq!(reading.get(&ChannelId::from("1")), Some(230.5));
        assert_eq!(reading.get(&ChannelId::from("6")), Some(-4.0));
        assert_eq!(reading.get(&ChannelId::from("2")), None);
    }

    #[test]
    fn non_object_payload_is_empty() {
        assert!(ValuesEvent::from_value(json!([1, 2, 3])).is_empty());
        assert!(ValuesEvent::from_json("null").unwrap().is_empty());
        assert!(ValuesEvent::from_json("{").is_err());
    }

    #[test]
    fn builder_entries_round_into_reading() {
        let reading = ValuesEvent::new()
            .with_value(7u64, 1.5)
            .with_raw("8", json!({"value": true}))
            .to_reading();
        assert_eq!(reading.get(&ChannelId::from(7u64)), Some(1.5));
        assert_eq!(reading.get(&ChannelId::from("8")), None);
    }
}

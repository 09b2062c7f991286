//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Telemetry binding and aggregation for the metering dashboard."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::ops::Index;

use serde::Serialize;

use crate::registry::{ChannelId, ChannelRegistry};
use crate::roles::{Role, ROLE_COUNT, ROLE_TABLE};

/// Value substituted for any role that cannot be resolved.
pub const DEFAULT_VALUE: f64 = 0.0;

/// Numeric readings from one values event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReading {
    values: HashMap<ChannelId, f64>,
}

impl RawReading {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<ChannelId>, value: f64) -> Option<f64> {
        self.values.insert(id.into(), value)
    }

    pub fn get(&self, id: &ChannelId) -> Option<f64> {
        self.values.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T: Into<ChannelId>> FromIterator<(T, f64)> for RawReading {
    fn from_iter<I: IntoIterator<Item = (T, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(id, value)| (id.into(), value)).collect(),
        }
    }
}

/// Every role resolved to a number. Values are passed through unchanged:
/// NaN, negatives and out-of-range readings are not filtered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedMetrics {
    values: [f64; ROLE_COUNT],
}

impl Default for ResolvedMetrics {
    fn default() -> Self {
        Self {
            values: [DEFAULT_VALUE; ROLE_COUNT],
        }
    }
}

impl ResolvedMetrics {
    pub fn get(&self, role: Role) -> f64 {
        self.values[role.position()]
    }

    /// Values in role-table order.
    pub fn as_array(&self) -> &[f64; ROLE_COUNT] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, f64)> + '_ {
        ROLE_TABLE.iter().copied().zip(self.values.iter().copied())
    }

    /// The three values plotted for a role triple.
    pub fn triple(&self, roles: [Role; 3]) -> [f64; 3] {
        roles.map(|role| self.get(role))
    }
}

impl Index<Role> for ResolvedMetrics {
    type Output = f64;

    fn index(&self, role: Role) -> &f64 {
        &self.values[role.position()]
    }
}

/// Why a role fell back to [`DEFAULT_VALUE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillReason {
    /// The configuration is shorter than the role's position.
    Unbound,
    /// A channel is bound but the event carried no usable value for it.
    MissingValue,
}

impl FillReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FillReason::Unbound => "unbound",
            FillReason::MissingValue => "missing-value",
        }
    }
}

/// One defaulted role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultFill {
    pub role: Role,
    pub channel: Option<ChannelId>,
    pub reason: FillReason,
}

/// Side record of every default substitution made during one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub fills: Vec<DefaultFill>,
}

impl ResolveReport {
    pub fn is_clean(&self) -> bool {
        self.fills.is_empty()
    }

    pub fn count(&self, reason: FillReason) -> usize {
        self.fills.iter().filter(|fill| fill.reason == reason).count()
    }
}

/// Resolve every role against the registry and reading.
pub fn resolve(registry: &ChannelRegistry, reading: &RawReading) -> ResolvedMetrics {
    resolve_with_report(registry, reading).0
}

/// Same as [`resolve`], also reporting which roles were default-filled and why.
pub fn resolve_with_report(
    registry: &ChannelRegistry,
    reading: &RawReading,
) -> (ResolvedMetrics, ResolveReport) {
    let mut resolved = ResolvedMetrics::default();
    let mut report = ResolveReport::default();
    for role in ROLE_TABLE {
        let Some(channel) = registry.channel_for(role) else {
            report.fills.push(DefaultFill {
                role,
                channel: None,
                reason: FillReason::Unbound,
            });
            continue;
        };
        match reading.get(channel) {
            Some(value) => resolved.values[role.position()] = value,
            None => report.fills.push(DefaultFill {
                role,
                channel: Some(channel.clone()),
                reason: FillReason::MissingValue,
            }),
        }
    }
    (resolved, report)
}

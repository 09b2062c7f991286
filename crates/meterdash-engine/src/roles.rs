//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Telemetry binding and aggregation for the metering dashboard."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Static role table. The position of a channel in the host configuration
//! decides its role; the table below is the only place that mapping lives.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of semantic roles a configuration can bind.
pub const ROLE_COUNT: usize = 18;

/// Semantic meaning of a configured channel position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    U1,
    U2,
    U3,
    I1,
    I2,
    I3,
    P1,
    P2,
    P3,
    PTotal,
    PMax,
    PMin,
    ThdI1,
    ThdI2,
    ThdI3,
    ThdU1N,
    ThdU2N,
    ThdU3N,
}

/// Roles in configuration order: `ROLE_TABLE[i]` is the role of position `i`.
pub const ROLE_TABLE: [Role; ROLE_COUNT] = [
    Role::U1,
    Role::U2,
    Role::U3,
    Role::I1,
    Role::I2,
    Role::I3,
    Role::P1,
    Role::P2,
    Role::P3,
    Role::PTotal,
    Role::PMax,
    Role::PMin,
    Role::ThdI1,
    Role::ThdI2,
    Role::ThdI3,
    Role::ThdU1N,
    Role::ThdU2N,
    Role::ThdU3N,
];

impl Role {
    /// Configuration position bound to this role.
    pub const fn position(self) -> usize {
        self as usize
    }

    /// Role at a configuration position, if the position is inside the table.
    pub fn at(position: usize) -> Option<Role> {
        ROLE_TABLE.get(position).copied()
    }

    /// Display label used on panels.
    pub fn label(self) -> &'static str {
        match self {
            Role::U1 => "U1",
            Role::U2 => "U2",
            Role::U3 => "U3",
            Role::I1 => "I1",
            Role::I2 => "I2",
            Role::I3 => "I3",
            Role::P1 => "P1",
            Role::P2 => "P2",
            Role::P3 => "P3",
            Role::PTotal => "P total",
            Role::PMax => "P max",
            Role::PMin => "P min",
            Role::ThdI1 => "THD I1",
            Role::ThdI2 => "THD I2",
            Role::ThdI3 => "THD I3",
            Role::ThdU1N => "THD U1-N",
            Role::ThdU2N => "THD U2-N",
            Role::ThdU3N => "THD U3-N",
        }
    }

    pub fn unit(self) -> Unit {
        match self {
            Role::U1 | Role::U2 | Role::U3 => Unit::Volt,
            Role::I1 | Role::I2 | Role::I3 => Unit::Ampere,
            Role::P1 | Role::P2 | Role::P3 | Role::PTotal | Role::PMax | Role::PMin => {
                Unit::Kilowatt
            }
            _ => Unit::Percent,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Engineering unit attached to a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Volt,
    Ampere,
    Kilowatt,
    Percent,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Volt => "V",
            Unit::Ampere => "A",
            Unit::Kilowatt => "kW",
            Unit::Percent => "%",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for Unit {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

/// Chart grouping; each group keeps its own rolling history of three series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricGroup {
    Voltage,
    Current,
    Power,
    Thd,
}

impl MetricGroup {
    pub const ALL: [MetricGroup; 4] = [
        MetricGroup::Voltage,
        MetricGroup::Current,
        MetricGroup::Power,
        MetricGroup::Thd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricGroup::Voltage => "voltage",
            MetricGroup::Current => "current",
            MetricGroup::Power => "power",
            MetricGroup::Thd => "thd",
        }
    }

    pub fn unit(self) -> Unit {
        match self {
            MetricGroup::Voltage => Unit::Volt,
            MetricGroup::Current => Unit::Ampere,
            MetricGroup::Power => Unit::Kilowatt,
            MetricGroup::Thd => Unit::Percent,
        }
    }

    /// Roles plotted as `value1..value3`. The THD chart tracks current distortion.
    pub fn series_roles(self) -> [Role; 3] {
        match self {
            MetricGroup::Voltage => [Role::U1, Role::U2, Role::U3],
            MetricGroup::Current => [Role::I1, Role::I2, Role::I3],
            MetricGroup::Power => [Role::P1, Role::P2, Role::P3],
            MetricGroup::Thd => [Role::ThdI1, Role::ThdI2, Role::ThdI3],
        }
    }

    /// Legend labels for `value1..value3`.
    pub fn series_labels(self) -> [&'static str; 3] {
        match self {
            MetricGroup::Voltage => ["U1", "U2", "U3"],
            MetricGroup::Current => ["I1", "I2", "I3"],
            MetricGroup::Power => ["P1", "P2", "P3"],
            MetricGroup::Thd => ["THD1", "THD2", "THD3"],
        }
    }
}

impl fmt::Display for MetricGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

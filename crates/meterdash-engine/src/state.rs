//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Telemetry binding and aggregation for the metering dashboard."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Read-only aggregate handed to the renderer once per update.

use std::fmt;

use chrono::NaiveTime;
use serde::{Serialize, Serializer};

use meterdash_common::time::wall_clock_label;

use crate::derive::DerivedSummary;
use crate::history::HistorySet;
use crate::resolver::{DefaultFill, ResolvedMetrics};
use crate::roles::{Role, Unit};

/// Engine lifecycle. There is no way back to `Unconfigured` short of a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Unconfigured,
    Configured,
}

impl EngineState {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineState::Unconfigured => "unconfigured",
            EngineState::Configured => "configured",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoltagePanel {
    pub u1: f64,
    pub u2: f64,
    pub u3: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurrentPanel {
    pub i1: f64,
    pub i2: f64,
    pub i3: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerPanel {
    pub p1: f64,
    pub p2: f64,
    pub p3: f64,
    pub total: f64,
    pub unit: Unit,
}

/// The six distortion figures, kept for on-demand display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThdDetails {
    #[serde(rename = "thdI1")]
    pub thd_i1: f64,
    #[serde(rename = "thdI2")]
    pub thd_i2: f64,
    #[serde(rename = "thdI3")]
    pub thd_i3: f64,
    #[serde(rename = "thdU1N")]
    pub thd_u1n: f64,
    #[serde(rename = "thdU2N")]
    pub thd_u2n: f64,
    #[serde(rename = "thdU3N")]
    pub thd_u3n: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThdPanel {
    pub main: f64,
    pub unit: Unit,
    pub details: ThdDetails,
}

/// One header readout, e.g. `U TOTAL` / `220.0 V`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readout {
    pub label: &'static str,
    pub text: String,
}

impl Readout {
    fn new(label: &'static str, value: f64, unit: Unit) -> Self {
        Self {
            label,
            text: format!("{value:.1} {unit}"),
        }
    }
}

/// Everything the renderer needs for one tick. Built complete, then published
/// as a unit so readers never see a new summary next to stale charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub tick: u64,
    pub state: EngineState,
    pub summary: DerivedSummary,
    pub voltage: VoltagePanel,
    pub current: CurrentPanel,
    pub power: PowerPanel,
    pub thd: ThdPanel,
    pub history: HistorySet,
    pub bound_channels: usize,
    pub default_fills: Vec<DefaultFill>,
    #[serde(serialize_with = "serialize_optional_wall_clock")]
    pub updated_at: Option<NaiveTime>,
    #[serde(skip)]
    resolved: ResolvedMetrics,
}

fn serialize_optional_wall_clock<S: Serializer>(
    time: &Option<NaiveTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match time {
        Some(time) => serializer.serialize_str(&wall_clock_label(*time)),
        None => serializer.serialize_none(),
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::initial()
    }
}

impl DashboardState {
    /// All-zero state published before the first update.
    pub fn initial() -> Self {
        Self::assemble(
            0,
            EngineState::Unconfigured,
            ResolvedMetrics::default(),
            DerivedSummary::default(),
            HistorySet::new(),
            0,
            Vec::new(),
            None,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        tick: u64,
        state: EngineState,
        resolved: ResolvedMetrics,
        summary: DerivedSummary,
        history: HistorySet,
        bound_channels: usize,
        default_fills: Vec<DefaultFill>,
        updated_at: Option<NaiveTime>,
    ) -> Self {
        let value = |role: Role| resolved.get(role);
        Self {
            tick,
            state,
            summary,
            voltage: VoltagePanel {
                u1: value(Role::U1),
                u2: value(Role::U2),
                u3: value(Role::U3),
                unit: Unit::Volt,
            },
            current: CurrentPanel {
                i1: value(Role::I1),
                i2: value(Role::I2),
                i3: value(Role::I3),
                unit: Unit::Ampere,
            },
            power: PowerPanel {
                p1: value(Role::P1),
                p2: value(Role::P2),
                p3: value(Role::P3),
                total: summary.p_total,
                unit: Unit::Kilowatt,
            },
            thd: ThdPanel {
                main: summary.thd_main,
                unit: Unit::Percent,
                details: ThdDetails {
                    thd_i1: value(Role::ThdI1),
                    thd_i2: value(Role::ThdI2),
                    thd_i3: value(Role::ThdI3),
                    thd_u1n: value(Role::ThdU1N),
                    thd_u2n: value(Role::ThdU2N),
                    thd_u3n: value(Role::ThdU3N),
                },
            },
            history,
            bound_channels,
            default_fills,
            updated_at,
            resolved,
        }
    }

    /// Resolved value of a single role for this tick.
    pub fn value(&self, role: Role) -> f64 {
        self.resolved.get(role)
    }

    pub fn resolved(&self) -> &ResolvedMetrics {
        &self.resolved
    }

    /// Header readouts in display order.
    pub fn headline(&self) -> [Readout; 4] {
        [
            Readout::new("U TOTAL", self.summary.u_total, Unit::Volt),
            Readout::new("I TOTAL", self.summary.i_total, Unit::Ampere),
            Readout::new("P MAX", self.summary.p_max, Unit::Kilowatt),
            Readout::new("P MIN", self.summary.p_min, Unit::Kilowatt),
        ]
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

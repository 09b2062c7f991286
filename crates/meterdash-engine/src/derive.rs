//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Telemetry binding and aggregation for the metering dashboard."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use serde::Serialize;

use crate::resolver::ResolvedMetrics;
use crate::roles::Role;

/// Where the published total active power came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TotalSource {
    /// Host-reported total (role `P total`).
    Reported,
    /// Reconstructed as `P1 + P2 + P3`.
    #[default]
    PhaseSum,
}

/// Headline figures recomputed from scratch on every update.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedSummary {
    pub u_total: f64,
    pub i_total: f64,
    pub p_total: f64,
    pub p_total_source: TotalSource,
    pub p_max: f64,
    pub p_min: f64,
    pub thd_main: f64,
}

/// Derive the summary from resolved role values. Pure and infallible.
pub fn derive(resolved: &ResolvedMetrics) -> DerivedSummary {
    let [u1, u2, u3] = resolved.triple([Role::U1, Role::U2, Role::U3]);
    let [i1, i2, i3] = resolved.triple([Role::I1, Role::I2, Role::I3]);
    let [p1, p2, p3] = resolved.triple([Role::P1, Role::P2, Role::P3]);
    let [thd_i1, thd_i2, thd_i3] = resolved.triple([Role::ThdI1, Role::ThdI2, Role::ThdI3]);

    let (p_total, p_total_source) = total_power(resolved.get(Role::PTotal), p1 + p2 + p3);

    DerivedSummary {
        u_total: (u1 + u2 + u3) / 3.0,
        i_total: i1 + i2 + i3,
        p_total,
        p_total_source,
        p_max: resolved.get(Role::PMax),
        p_min: resolved.get(Role::PMin),
        thd_main: nan_propagating_max(nan_propagating_max(thd_i1, thd_i2), thd_i3),
    }
}

/// A reported total of exactly zero cannot be told apart from an absent
/// channel, so it is replaced by the phase sum. NaN is treated the same way.
fn total_power(reported: f64, phase_sum: f64) -> (f64, TotalSource) {
    if reported == 0.0 || reported.is_nan() {
        (phase_sum, TotalSource::PhaseSum)
    } else {
        (reported, TotalSource::Reported)
    }
}

/// `f64::max` silently drops NaN; a corrupt distortion reading must stay visible.
fn nan_propagating_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

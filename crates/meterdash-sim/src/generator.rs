//! ---
//! ems_section: "11-simulation-test-harness"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulated meter host and scenario replay."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::f64::consts::PI;
use std::time::Duration;

use anyhow::{Context, Result};
use meterdash_engine::{
    ChannelDescriptor, ChannelId, ConfigurationEvent, Role, ValuesEvent, ROLE_COUNT,
};
use rand::prelude::*;
use rand_distr::Normal;

const NOMINAL_VOLTAGE: f64 = 230.0;
const NOMINAL_CURRENT: f64 = 12.0;
const POWER_FACTOR: f64 = 0.95;
/// First id handed out to simulated channels.
const FIRST_CHANNEL_ID: u64 = 1001;

/// Synthetic three-phase meter with seeded noise.
///
/// Readings follow slow sinusoids around nominal values; time advances by
/// `tick_interval` per tick so output is reproducible for a given seed.
#[derive(Debug)]
pub struct SyntheticMeter {
    channels: Vec<ChannelId>,
    rng: StdRng,
    noise: Normal<f64>,
    tick_interval: Duration,
    drop_probability: f64,
    p_max: Option<f64>,
    p_min: Option<f64>,
}

impl SyntheticMeter {
    pub fn new(
        seed: u64,
        channel_count: usize,
        tick_interval: Duration,
        drop_probability: f64,
    ) -> Result<Self> {
        let noise = Normal::new(0.0, 0.4).context("invalid noise distribution")?;
        Ok(Self {
            channels: (0..channel_count as u64)
                .map(|offset| ChannelId::from(FIRST_CHANNEL_ID + offset))
                .collect(),
            rng: StdRng::seed_from_u64(seed),
            noise,
            tick_interval,
            drop_probability: drop_probability.clamp(0.0, 1.0),
            p_max: None,
            p_min: None,
        })
    }

    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    /// Configuration listing every simulated channel, named after its role.
    pub fn configuration(&self) -> ConfigurationEvent {
        ConfigurationEvent {
            realtime_configs: self
                .channels
                .iter()
                .enumerate()
                .map(|(position, id)| ChannelDescriptor {
                    id: id.clone(),
                    name: Some(match Role::at(position) {
                        Some(role) => role.label().to_owned(),
                        None => format!("AUX {}", position - ROLE_COUNT + 1),
                    }),
                })
                .collect(),
        }
    }

    /// One reading per role for `tick`, before any drops are applied.
    pub fn sample(&mut self, tick: u64) -> [f64; ROLE_COUNT] {
        let t = self.tick_interval.as_secs_f64() * tick as f64;
        let mut values = [0.0; ROLE_COUNT];

        let mut phase_power = [0.0; 3];
        for phase in 0..3 {
            let shift = phase as f64 * 2.0 * PI / 3.0;
            let voltage = NOMINAL_VOLTAGE
                + 3.0 * (2.0 * PI * 0.02 * t + shift).sin()
                + self.noise.sample(&mut self.rng);
            let current = (NOMINAL_CURRENT
                + 4.0 * (2.0 * PI * 0.01 * t + shift).sin()
                + 0.1 * self.noise.sample(&mut self.rng))
            .max(0.0);
            let power = voltage * current * POWER_FACTOR / 1000.0;
            values[Role::U1.position() + phase] = voltage;
            values[Role::I1.position() + phase] = current;
            values[Role::P1.position() + phase] = power;
            values[Role::ThdI1.position() + phase] =
                (4.0 + 1.5 * (2.0 * PI * 0.005 * t + shift).cos()
                    + 0.2 * self.noise.sample(&mut self.rng))
                .max(0.0);
            values[Role::ThdU1N.position() + phase] =
                (1.5 + 0.05 * self.noise.sample(&mut self.rng)).max(0.0);
            phase_power[phase] = power;
        }

        let total: f64 = phase_power.iter().sum();
        let p_max = self.p_max.map_or(total, |max| max.max(total));
        let p_min = self.p_min.map_or(total, |min| min.min(total));
        self.p_max = Some(p_max);
        self.p_min = Some(p_min);
        values[Role::PTotal.position()] = total;
        values[Role::PMax.position()] = p_max;
        values[Role::PMin.position()] = p_min;
        values
    }

    /// Values event for `tick`; each channel is independently dropped with the
    /// configured probability. Channels past the role table report zero.
    pub fn next_values(&mut self, tick: u64) -> ValuesEvent {
        let sample = self.sample(tick);
        let mut event = ValuesEvent::new();
        for (position, id) in self.channels.iter().enumerate() {
            if self.drop_probability > 0.0 && self.rng.gen_bool(self.drop_probability) {
                continue;
            }
            let value = sample.get(position).copied().unwrap_or_default();
            event = event.with_value(id.clone(), value);
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meterdash_engine::TelemetryEngine;

    fn meter(channels: usize, drop_probability: f64) -> SyntheticMeter {
        SyntheticMeter::new(7, channels, Duration::from_secs(1), drop_probability).unwrap()
    }

    #[test]
    fn readings_stay_near_nominal() {
        let mut meter = meter(18, 0.0);
        for tick in 0..50 {
            let sample = meter.sample(tick);
            for role in [Role::U1, Role::U2, Role::U3] {
                let volts = sample[role.position()];
                assert!((220.0..240.0).contains(&volts), "{role} = {volts}");
            }
            let total = sample[Role::PTotal.position()];
            assert!(sample[Role::PMax.position()] >= total);
            assert!(sample[Role::PMin.position()] <= total);
            assert!(sample[Role::ThdI2.position()] >= 0.0);
        }
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = meter(18, 0.3);
        let mut b = meter(18, 0.3);
        for tick in 0..10 {
            assert_eq!(a.next_values(tick), b.next_values(tick));
        }
    }

    #[test]
    fn configuration_names_follow_roles() {
        let config = meter(20, 0.0).configuration();
        assert_eq!(config.realtime_configs.len(), 20);
        assert_eq!(config.realtime_configs[9].name.as_deref(), Some("P total"));
        assert_eq!(config.realtime_configs[19].name.as_deref(), Some("AUX 2"));
        assert_eq!(config.realtime_configs[0].id, ChannelId::from(1001u64));
    }

    #[test]
    fn full_drop_leaves_every_role_defaulted() {
        let mut meter = meter(18, 1.0);
        let event = meter.next_values(0);
        assert!(event.is_empty());

        let mut engine = TelemetryEngine::default();
        engine.on_configuration(&meter.configuration());
        engine.on_values(&event);
        let state = engine.snapshot();
        assert_eq!(state.summary.u_total, 0.0);
        assert_eq!(state.default_fills.len(), ROLE_COUNT);
        assert_eq!(state.bound_channels, meter.channels().len());
    }
}

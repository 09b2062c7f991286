//! ---
//! ems_section: "11-simulation-test-harness"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulated meter host and scenario replay."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use meterdash_common::SimulationConfig;
use meterdash_engine::{
    ConfigurationEvent, EngineError, HostAcquirer, HostEvent, HostRegistration, TelemetryHost,
};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::generator::SyntheticMeter;
use crate::replay::ScenarioReplay;

#[derive(Debug)]
enum Source {
    Synthetic(SyntheticMeter),
    Replay(ScenarioReplay),
}

impl Source {
    fn configuration(&self) -> ConfigurationEvent {
        match self {
            Source::Synthetic(meter) => meter.configuration(),
            Source::Replay(replay) => replay.configuration().clone(),
        }
    }
}

/// In-process stand-in for the host runtime: one configuration event, then a
/// values event per tick.
#[derive(Debug)]
pub struct SimulatedHost {
    source: Source,
    tick_interval: Duration,
    ticker: Option<Interval>,
    registration: Option<HostRegistration>,
    configured: bool,
    tick: u64,
    max_ticks: Option<u64>,
}

impl SimulatedHost {
    pub fn synthetic(meter: SyntheticMeter, tick_interval: Duration) -> Self {
        Self::with_source(Source::Synthetic(meter), tick_interval)
    }

    pub fn replay(replay: ScenarioReplay, tick_interval: Duration) -> Self {
        Self::with_source(Source::Replay(replay), tick_interval)
    }

    fn with_source(source: Source, tick_interval: Duration) -> Self {
        Self {
            source,
            tick_interval,
            ticker: None,
            registration: None,
            configured: false,
            tick: 0,
            max_ticks: None,
        }
    }

    /// Build from configuration: a scenario file when one is set, the
    /// synthetic meter otherwise.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        match &config.scenario_file {
            Some(path) => {
                let replay = ScenarioReplay::from_path(path)
                    .with_context(|| format!("unable to load scenario {}", path.display()))?;
                Ok(Self::replay(replay, config.tick_interval))
            }
            None => {
                let meter = SyntheticMeter::new(
                    config.random_seed,
                    config.channel_count,
                    config.tick_interval,
                    config.drop_probability,
                )?;
                Ok(Self::synthetic(meter, config.tick_interval))
            }
        }
    }

    /// Close the stream after `ticks` values events.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    pub fn registration(&self) -> Option<&HostRegistration> {
        self.registration.as_ref()
    }

    pub fn ticks_emitted(&self) -> u64 {
        self.tick
    }

    async fn next_values(&mut self) -> Option<HostEvent> {
        if self.max_ticks.is_some_and(|max| self.tick >= max) {
            return None;
        }
        let period = self.tick_interval;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        ticker.tick().await;

        let event = match &mut self.source {
            Source::Synthetic(meter) => meter.next_values(self.tick),
            Source::Replay(replay) => replay.next_values()?,
        };
        self.tick += 1;
        debug!(tick = self.tick, channels = event.len(), "simulated values emitted");
        Some(HostEvent::Values(event))
    }
}

#[async_trait]
impl TelemetryHost for SimulatedHost {
    async fn register(&mut self, registration: &HostRegistration) -> meterdash_engine::Result<()> {
        let channels = self.source.configuration().realtime_configs.len();
        if channels > registration.max_realtime_configs_count {
            return Err(EngineError::host(format!(
                "simulated host exposes {channels} channels, registration allows {}",
                registration.max_realtime_configs_count
            )));
        }
        info!(channels, "simulated host registered");
        self.registration = Some(*registration);
        Ok(())
    }

    async fn next_event(&mut self) -> meterdash_engine::Result<Option<HostEvent>> {
        if self.registration.is_none() {
            return Err(EngineError::host("event requested before registration"));
        }
        if !self.configured {
            self.configured = true;
            return Ok(Some(HostEvent::Configuration(self.source.configuration())));
        }
        Ok(self.next_values().await)
    }
}

/// Acquire `host` through `acquirer`, reporting it as unavailable for the
/// first `ready_after_attempts` probes.
pub async fn acquire_simulated(
    acquirer: &HostAcquirer,
    host: SimulatedHost,
    ready_after_attempts: u32,
) -> meterdash_engine::Result<SimulatedHost> {
    let mut slot = Some(host);
    acquirer
        .acquire(|attempt| {
            let handle = if attempt > ready_after_attempts {
                slot.take()
            } else {
                None
            };
            async move { handle }
        })
        .await
}

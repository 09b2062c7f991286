//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the dashboard runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

/// Upper bound on realtime channels a host may hand to the dashboard.
pub const MAX_REALTIME_CHANNELS: usize = 20;

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_max_attempts() -> u32 {
    120
}

fn default_max_realtime_configs() -> usize {
    MAX_REALTIME_CHANNELS
}

fn default_max_history_configs() -> usize {
    1
}

fn default_max_actions() -> usize {
    2
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9898))
}

fn default_simulation_seed() -> u64 {
    0xA11CEu64
}

fn default_channel_count() -> usize {
    18
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

/// Primary configuration object for the dashboard runtime.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "METERDASH_CONFIG";

    /// Load configuration from disk, respecting the `METERDASH_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// Unlike a controller deployment the dashboard runs fine on defaults, so an
    /// empty candidate list falls back to [`AppConfig::default`] with no source.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found; using defaults"
        );
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    /// Load and validate a single configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.host.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// How the dashboard waits for and registers with the telemetry host.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_poll_interval", rename = "poll_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub poll_interval: Duration,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_max_realtime_configs")]
    pub max_realtime_configs: usize,
    #[serde(default = "default_max_history_configs")]
    pub max_history_configs: usize,
    #[serde(default = "default_max_actions")]
    pub max_actions: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            max_attempts: default_max_attempts(),
            max_realtime_configs: default_max_realtime_configs(),
            max_history_configs: default_max_history_configs(),
            max_actions: default_max_actions(),
        }
    }
}

impl HostConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(anyhow!("host.poll_interval_ms must be greater than zero"));
        }
        if self.max_attempts == 0 {
            return Err(anyhow!("host.max_attempts must be at least 1"));
        }
        if self.max_realtime_configs > MAX_REALTIME_CHANNELS {
            return Err(anyhow!(
                "host.max_realtime_configs {} exceeds the supported maximum of {}",
                self.max_realtime_configs,
                MAX_REALTIME_CHANNELS
            ));
        }
        Ok(())
    }

    /// Upper bound on the time spent waiting for the host runtime.
    pub fn max_wait(&self) -> Duration {
        self.poll_interval.saturating_mul(self.max_attempts)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            listen: default_metrics_listen(),
        }
    }
}

/// Settings for the simulated meter host used in development and demos.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_simulation_seed")]
    pub random_seed: u64,
    #[serde(default = "default_channel_count")]
    pub channel_count: usize,
    #[serde(default = "default_tick_interval", rename = "tick_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub tick_interval: Duration,
    #[serde(default)]
    pub drop_probability: f64,
    #[serde(default)]
    pub ready_after_attempts: u32,
    #[serde(default)]
    pub scenario_file: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            random_seed: default_simulation_seed(),
            channel_count: default_channel_count(),
            tick_interval: default_tick_interval(),
            drop_probability: 0.0,
            ready_after_attempts: 0,
            scenario_file: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channel_count > MAX_REALTIME_CHANNELS {
            return Err(anyhow!(
                "simulation.channel_count {} exceeds the host maximum of {}",
                self.channel_count,
                MAX_REALTIME_CHANNELS
            ));
        }
        if self.tick_interval.is_zero() {
            return Err(anyhow!("simulation.tick_interval_ms must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.drop_probability) {
            return Err(anyhow!(
                "simulation.drop_probability must lie within 0.0..=1.0, got {}",
                self.drop_probability
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.host.poll_interval, Duration::from_millis(500));
        assert_eq!(config.host.max_attempts, 120);
        assert_eq!(config.host.max_realtime_configs, 20);
        assert_eq!(config.simulation.channel_count, 18);
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
    }

    #[test]
    fn durations_are_read_as_milliseconds() {
        let config: AppConfig = r#"
            [host]
            poll_interval_ms = 250
            max_attempts = 4

            [simulation]
            tick_interval_ms = 100
            channel_count = 3
        "#
        .parse()
        .unwrap();
        assert_eq!(config.host.poll_interval, Duration::from_millis(250));
        assert_eq!(config.host.max_wait(), Duration::from_secs(1));
        assert_eq!(config.simulation.tick_interval, Duration::from_millis(100));
        assert_eq!(config.simulation.channel_count, 3);
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let err = "[host]\npoll_interval_ms = 0\n".parse::<AppConfig>().unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn rejects_zero_attempts() {
        assert!("[host]\nmax_attempts = 0\n".parse::<AppConfig>().is_err());
    }

    #[test]
    fn rejects_oversized_simulation() {
        assert!("[simulation]\nchannel_count = 21\n"
            .parse::<AppConfig>()
            .is_err());
        assert!("[simulation]\ndrop_probability = 1.5\n"
            .parse::<AppConfig>()
            .is_err());
    }
}

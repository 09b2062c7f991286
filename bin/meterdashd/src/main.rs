//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Binary entrypoint for the metering dashboard daemon."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meterdash_common::time::duration_to_millis;
use meterdash_common::{init_tracing, AppConfig, ConsoleStream, LoadedAppConfig};
use meterdash_engine::{
    run_event_loop, run_event_loop_until, AcquisitionPolicy, EngineMetrics, HostAcquirer,
    DashboardState, HostRegistration, TelemetryEngine, TelemetryHost,
};
use meterdash_logging::{log_system_event, SystemEventOutcome};
use meterdash_metrics::{
    new_registry, spawn_http_server, DaemonMetrics, MetricsServer, SharedRegistry,
};
use meterdash_sim::{acquire_simulated, SimulatedHost};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "configs/meterdash.toml";

#[derive(Debug, Parser)]
#[command(author, version, about = "Metering dashboard daemon", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Drive the engine from the telemetry host until ctrl-c")]
    Run,
    #[command(about = "Apply a number of updates and print the resulting dashboard state")]
    Snapshot {
        #[arg(long, default_value_t = 1, help = "Published updates to wait for")]
        ticks: u64,
        #[arg(long, help = "Pretty-print the JSON snapshot")]
        pretty: bool,
    },
    #[command(about = "Validate the configuration and print the effective settings")]
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let load_started = Instant::now();
    let loaded = load_config(cli.config.as_ref())?;
    let load_duration = load_started.elapsed();
    let config = loaded.config;

    let command = cli.command.unwrap_or(Commands::Run);

    let metrics_registry = new_registry();
    let daemon_metrics = DaemonMetrics::new(metrics_registry.clone())?;
    daemon_metrics.observe_config_load(load_duration.as_secs_f64());
    daemon_metrics.inc_start();
    let profile = if cfg!(debug_assertions) { "debug" } else { "release" };
    daemon_metrics.set_build_info(env!("CARGO_PKG_VERSION"), profile);

    let console = console_stream(&command);
    match command {
        Commands::CheckConfig => {
            match &loaded.source {
                Some(path) => println!("configuration: {}", path.display()),
                None => println!("configuration: built-in defaults"),
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!(
                "host wait bound: {:?} ({} attempts)",
                config.host.max_wait(),
                config.host.max_attempts
            );
        }
        Commands::Snapshot { ticks, pretty } => {
            init_tracing("meterdashd", &config.logging, console)?;
            snapshot(&config, ticks, pretty).await?;
        }
        Commands::Run => {
            init_tracing("meterdashd", &config.logging, console)?;
            info!(
                source = ?loaded.source,
                elapsed_ms = duration_to_millis(load_duration),
                "configuration loaded"
            );
            run_daemon(config, metrics_registry).await?;
        }
    }

    Ok(())
}

/// `snapshot` owns stdout for the rendered state, so its logs go to stderr.
fn console_stream(command: &Commands) -> ConsoleStream {
    match command {
        Commands::Snapshot { .. } => ConsoleStream::Stderr,
        Commands::Run | Commands::CheckConfig => ConsoleStream::Stdout,
    }
}

/// An explicit `--config` must exist; otherwise `METERDASH_CONFIG` and the
/// default path are tried before falling back to built-in defaults.
fn load_config(explicit: Option<&PathBuf>) -> Result<LoadedAppConfig> {
    match explicit {
        Some(path) => Ok(LoadedAppConfig {
            config: AppConfig::from_path(path)?,
            source: Some(path.clone()),
        }),
        None => AppConfig::load_with_source(&[PathBuf::from(DEFAULT_CONFIG_PATH)]),
    }
}

/// Wait for the host and register with it.
async fn connect_host(config: &AppConfig, acquirer: &HostAcquirer) -> Result<SimulatedHost> {
    let host = SimulatedHost::from_config(&config.simulation)?;
    let mut host = match acquire_simulated(
        acquirer,
        host,
        config.simulation.ready_after_attempts,
    )
    .await
    {
        Ok(host) => {
            log_system_event(
                None,
                "host.acquired",
                "telemetry host ready",
                SystemEventOutcome::Success,
            );
            host
        }
        Err(err) => {
            log_system_event(
                None,
                "host.unavailable",
                &err.to_string(),
                SystemEventOutcome::Fault,
            );
            return Err(err).context("telemetry host could not be acquired");
        }
    };
    host.register(&HostRegistration::from_config(&config.host))
        .await
        .context("telemetry host rejected registration")?;
    Ok(host)
}

async fn run_daemon(config: AppConfig, metrics_registry: SharedRegistry) -> Result<()> {
    let metrics_server = if config.metrics.enabled {
        info!(address = %config.metrics.listen, "metrics exporter enabled");
        Some(spawn_http_server(metrics_registry.clone(), config.metrics.listen)?)
    } else {
        info!("metrics exporter disabled by configuration");
        None
    };

    let engine_metrics = EngineMetrics::new(metrics_registry)?;
    let acquirer = HostAcquirer::new(
        AcquisitionPolicy::from_config(&config.host),
        Some(engine_metrics.clone()),
    );
    let mut host = connect_host(&config, &acquirer).await?;
    let mut engine = TelemetryEngine::new(Some(engine_metrics));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => info!("ctrl-c received; shutting down"),
            Err(err) => warn!(error = %err, "unable to listen for ctrl-c; shutting down"),
        }
        let _ = shutdown_tx.send(());
    });

    info!("daemon running; waiting for host events");
    let outcome = run_event_loop(&mut host, &mut engine, shutdown_rx).await;
    let summary = finish_event_loop(outcome, metrics_server).await?;

    let state = engine.snapshot();
    for readout in state.headline() {
        info!(label = readout.label, value = %readout.text, "final readout");
    }
    info!(
        published = summary.published,
        ignored = summary.ignored,
        stop = ?summary.stop,
        "daemon stopped"
    );
    Ok(())
}

/// Stop the exporter before surfacing the loop result, so a failed loop
/// still shuts the server down cleanly.
async fn finish_event_loop<T, E>(
    outcome: std::result::Result<T, E>,
    metrics_server: Option<MetricsServer>,
) -> Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }
    outcome.context("event loop aborted")
}

async fn snapshot(config: &AppConfig, ticks: u64, pretty: bool) -> Result<()> {
    let acquirer = HostAcquirer::new(AcquisitionPolicy::from_config(&config.host), None);
    let mut host = connect_host(config, &acquirer).await?;
    let mut engine = TelemetryEngine::default();

    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let summary = run_event_loop_until(&mut host, &mut engine, shutdown_rx, Some(ticks)).await?;
    if summary.published < ticks {
        warn!(
            requested = ticks,
            published = summary.published,
            "host closed before the requested number of updates"
        );
    }

    let state = engine.snapshot();
    println!("{}", render_snapshot(&state, pretty)?);
    for readout in state.headline() {
        eprintln!("{:<8} {}", readout.label, readout.text);
    }
    Ok(())
}

fn render_snapshot(state: &DashboardState, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        state.to_json_pretty()?
    } else {
        state.to_json()?
    };
    Ok(rendered)
}

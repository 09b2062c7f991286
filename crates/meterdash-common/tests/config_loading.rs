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
use std::path::PathBuf;
use std::time::Duration;

use meterdash_common::{AppConfig, LogFormat};

#[test]
fn first_existing_candidate_wins() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.toml");
    let present = dir.path().join("meterdash.toml");
    fs::write(
        &present,
        r#"
        [host]
        poll_interval_ms = 100
        max_attempts = 10

        [logging]
        format = "pretty"
        directory = "target/test-logs"

        [metrics]
        enabled = false
        listen = "127.0.0.1:9000"
        "#,
    )
    .unwrap();

    let loaded = AppConfig::load_with_source(&[missing, present.clone()]).unwrap();
    assert_eq!(loaded.source, Some(present));
    assert_eq!(loaded.config.host.poll_interval, Duration::from_millis(100));
    assert_eq!(loaded.config.host.max_attempts, 10);
    assert_eq!(loaded.config.logging.format, LogFormat::Pretty);
    assert!(!loaded.config.metrics.enabled);
    assert_eq!(
        loaded.config.metrics.listen,
        "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
    );
}

#[test]
fn no_candidates_falls_back_to_defaults() {
    let loaded = AppConfig::load_with_source(&[PathBuf::from("does/not/exist.toml")]).unwrap();
    assert!(loaded.source.is_none());
    assert_eq!(loaded.config.simulation.channel_count, 18);
}

#[test]
fn invalid_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "[host]\nmax_attempts = \"many\"\n").unwrap();
    let err = AppConfig::load(&[broken.clone()]).unwrap_err();
    assert!(format!("{err:#}").contains(&broken.display().to_string()));
}

#[test]
fn shipped_configuration_is_valid() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../configs/meterdash.toml");
    let config = AppConfig::from_path(&path).unwrap();
    assert_eq!(config.host.max_wait(), Duration::from_secs(60));
    assert_eq!(config.host.max_realtime_configs, 20);
    assert_eq!(config.simulation.ready_after_attempts, 2);
    assert!(config.simulation.scenario_file.is_none());
}

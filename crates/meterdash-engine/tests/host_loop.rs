//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "tests"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Integration tests for the telemetry binding and aggregation engine."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use meterdash_engine::{
    run_event_loop, run_event_loop_until, AcquisitionPolicy, ConfigurationEvent, EngineError,
    EngineMetrics, HostAcquirer, HostEvent, HostRegistration, HostStatus, StopReason,
    TelemetryEngine, TelemetryHost, ValuesEvent,
};
use tokio::sync::broadcast;

/// Scripted host that replays a fixed event list and then closes.
struct ScriptedHost {
    registered: Option<HostRegistration>,
    events: VecDeque<HostEvent>,
    stall_when_empty: bool,
}

impl ScriptedHost {
    fn new(events: impl IntoIterator<Item = HostEvent>) -> Self {
        Self {
            registered: None,
            events: events.into_iter().collect(),
            stall_when_empty: false,
        }
    }
}

#[async_trait]
impl TelemetryHost for ScriptedHost {
    async fn register(&mut self, registration: &HostRegistration) -> meterdash_engine::Result<()> {
        self.registered = Some(*registration);
        Ok(())
    }

    async fn next_event(&mut self) -> meterdash_engine::Result<Option<HostEvent>> {
        match self.events.pop_front() {
            Some(event) => Ok(Some(event)),
            None if self.stall_when_empty => {
                std::future::pending::<()>().await;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

fn voltage_event(volts: f64) -> HostEvent {
    HostEvent::Values(
        ValuesEvent::new()
            .with_value("u1", volts)
            .with_value("u2", volts)
            .with_value("u3", volts),
    )
}

#[tokio::test]
async fn acquisition_returns_the_handle_once_the_probe_succeeds() {
    let acquirer = HostAcquirer::new(AcquisitionPolicy::new(Duration::from_millis(5), 10), None);
    let status = acquirer.status();
    let calls = AtomicU32::new(0);

    let host = acquirer
        .acquire(|attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { (attempt >= 3).then(|| ScriptedHost::new([])) }
        })
        .await
        .unwrap();

    assert!(host.events.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(*status.borrow(), HostStatus::Ready);
}

#[tokio::test]
async fn acquisition_gives_up_after_the_attempt_cap() {
    let registry = meterdash_metrics::new_registry();
    let metrics = EngineMetrics::new(registry.clone()).unwrap();
    let acquirer = HostAcquirer::new(
        AcquisitionPolicy::new(Duration::from_millis(2), 4),
        Some(metrics),
    );
    let status = acquirer.status();

    let result = acquirer
        .acquire(|_| async { None::<ScriptedHost> })
        .await;

    match result {
        Err(EngineError::HostUnavailable { attempts, waited }) => {
            assert_eq!(attempts, 4);
            assert!(waited >= Duration::from_millis(6));
        }
        other => panic!("expected HostUnavailable, got {:?}", other.map(|_| ())),
    }
    assert_eq!(*status.borrow(), HostStatus::Unavailable);
    let text = meterdash_metrics::encode_text(&registry).unwrap();
    assert!(text.contains(
        r#"meterdash_engine_host_acquisition_attempts_total{outcome="pending"} 4"#
    ));
}

#[tokio::test]
async fn event_loop_drains_the_host_until_it_closes() {
    let mut host = ScriptedHost::new([
        voltage_event(100.0),
        HostEvent::Configuration(ConfigurationEvent::from_ids(["u1", "u2", "u3"])),
        voltage_event(230.0),
        voltage_event(231.0),
    ]);
    host.register(&HostRegistration::default()).await.unwrap();
    let mut engine = TelemetryEngine::default();
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let summary = run_event_loop(&mut host, &mut engine, shutdown_rx)
        .await
        .unwrap();

    assert_eq!(summary.stop, StopReason::HostClosed);
    assert_eq!(summary.events, 4);
    assert_eq!(summary.configurations, 1);
    assert_eq!(summary.ignored, 1);
    assert_eq!(summary.published, 2);
    assert_eq!(host.registered.unwrap().max_realtime_configs_count, 20);
    let state = engine.snapshot();
    assert_eq!(state.tick, 2);
    assert!((state.summary.u_total - 231.0).abs() < 1e-9);
    assert_eq!(state.history.voltage.len(), 2);
}

#[tokio::test]
async fn event_loop_stops_on_shutdown() {
    let mut host = ScriptedHost::new([HostEvent::Configuration(ConfigurationEvent::from_ids([
        "u1",
    ]))]);
    host.stall_when_empty = true;
    let mut engine = TelemetryEngine::default();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = shutdown_tx.send(());
    });
    let summary = run_event_loop(&mut host, &mut engine, shutdown_rx)
        .await
        .unwrap();
    stopper.await.unwrap();

    assert_eq!(summary.stop, StopReason::Shutdown);
    assert_eq!(summary.configurations, 1);
}

#[tokio::test]
async fn event_loop_honours_the_update_limit() {
    let events = std::iter::once(HostEvent::Configuration(ConfigurationEvent::from_ids([
        "u1", "u2", "u3",
    ])))
    .chain((0..10).map(|i| voltage_event(220.0 + f64::from(i))));
    let mut host = ScriptedHost::new(events);
    let mut engine = TelemetryEngine::default();
    let handle = engine.handle();
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let summary = run_event_loop_until(&mut host, &mut engine, shutdown_rx, Some(3))
        .await
        .unwrap();

    assert_eq!(summary.stop, StopReason::UpdateLimit);
    assert_eq!(summary.published, 3);
    assert_eq!(handle.latest().tick, 3);
    assert_eq!(host.events.len(), 7);
}

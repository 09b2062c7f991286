//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "tests"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Integration tests for the telemetry binding and aggregation engine."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use chrono::NaiveTime;
use meterdash_engine::{
    resolve, ChannelRegistry, ConfigurationEvent, EngineState, HistoryBuffer, HistorySample,
    RawReading, Role, TelemetryEngine, UpdateOutcome, ValuesEvent, HISTORY_CAPACITY, ROLE_COUNT,
    ROLE_TABLE,
};

const CANONICAL_IDS: [u64; ROLE_COUNT] = [
    1001, 1002, 1003, 1004, 1005, 1006, 1007, 1008, 1009, 1010, 1011, 1012, 1013, 1014, 1015,
    1016, 1017, 1018,
];

fn at(seconds: u32) -> NaiveTime {
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap()
}

fn canonical_engine() -> TelemetryEngine {
    let mut engine = TelemetryEngine::default();
    engine.on_configuration(&ConfigurationEvent::from_ids(CANONICAL_IDS));
    engine
}

fn id_of(role: Role) -> u64 {
    CANONICAL_IDS[role.position()]
}

#[test]
fn currents_only_event_sums_to_twelve_amperes() {
    let mut engine = canonical_engine();
    let mut event = ValuesEvent::new();
    for role in ROLE_TABLE {
        let value = match role {
            Role::I1 => 3.0,
            Role::I2 => 4.0,
            Role::I3 => 5.0,
            _ => 0.0,
        };
        event = event.with_value(id_of(role), value);
    }
    engine.on_values_at(&event, at(36_000));

    let state = engine.snapshot();
    assert_eq!(state.summary.i_total, 12.0);
    assert_eq!(state.summary.u_total, 0.0);
    assert_eq!(state.summary.p_total, 0.0);
    assert_eq!(state.summary.p_max, 0.0);
    assert_eq!(state.summary.p_min, 0.0);
    assert_eq!(state.summary.thd_main, 0.0);
    assert!(state.default_fills.is_empty());
    assert_eq!(state.history.current.latest().unwrap().values(), [3.0, 4.0, 5.0]);
}

#[test]
fn voltage_only_configuration_defaults_everything_else() {
    let mut engine = TelemetryEngine::default();
    engine.on_configuration(&ConfigurationEvent::from_ids(["U1", "U2", "U3"]));
    let event = ValuesEvent::new()
        .with_value("U1", 100.0)
        .with_value("U2", 110.0)
        .with_value("U3", 105.0)
        .with_value("I1", 50.0);
    let outcome = engine.on_values_at(&event, at(1));
    assert_eq!(outcome, UpdateOutcome::Published { tick: 1 });

    let state = engine.snapshot();
    assert!((state.summary.u_total - 105.0).abs() < 1e-9);
    assert_eq!(state.summary.i_total, 0.0);
    assert_eq!(state.summary.p_total, 0.0);
    assert_eq!(state.summary.thd_main, 0.0);
    assert_eq!([state.current.i1, state.current.i2, state.current.i3], [0.0; 3]);
    assert_eq!([state.power.p1, state.power.p2, state.power.p3], [0.0; 3]);
    assert_eq!(state.thd.details.thd_u3n, 0.0);
    assert_eq!(state.default_fills.len(), ROLE_COUNT - 3);
}

#[test]
fn history_keeps_the_last_twenty_of_twenty_five() {
    let mut buffer = HistoryBuffer::new();
    for i in 1..=25u32 {
        buffer.append(HistorySample::new(at(i), [f64::from(i), 0.0, 0.0]));
    }
    assert_eq!(buffer.len(), HISTORY_CAPACITY);
    assert_eq!(buffer.oldest().unwrap().value1, 6.0);
    assert_eq!(buffer.latest().unwrap().value1, 25.0);
}

#[test]
fn resolution_is_pure() {
    let registry = ChannelRegistry::from_ids([7u64, 8, 9, 10, 11]);
    let reading: RawReading = [(7u64, 1.0), (9, f64::INFINITY), (11, -2.0), (99, 5.0)]
        .into_iter()
        .collect();
    assert_eq!(resolve(&registry, &reading), resolve(&registry, &reading));
}

#[test]
fn roles_past_a_short_registry_stay_zero() {
    for length in 0..ROLE_COUNT {
        let ids: Vec<String> = (0..length).map(|i| format!("ch{i}")).collect();
        let registry = ChannelRegistry::from_ids(ids);
        // Every id the registry could ever mention, plus the ones it does not.
        let reading: RawReading = (0..ROLE_COUNT + 2)
            .map(|i| (format!("ch{i}"), 42.0))
            .collect();
        let resolved = resolve(&registry, &reading);
        for role in ROLE_TABLE.iter().skip(length) {
            assert_eq!(resolved[*role], 0.0, "length {length}, role {role}");
        }
        for role in ROLE_TABLE.iter().take(length) {
            assert_eq!(resolved[*role], 42.0, "length {length}, role {role}");
        }
    }
}

#[test]
fn every_chart_advances_in_lockstep() {
    let mut engine = canonical_engine();
    for second in 0..30u32 {
        let event = ValuesEvent::new()
            .with_value(id_of(Role::U1), f64::from(second))
            .with_value(id_of(Role::ThdI3), 1.0);
        engine.on_values_at(&event, at(second));

        let state = engine.snapshot();
        let expected_len = (second as usize + 1).min(HISTORY_CAPACITY);
        for buffer in [
            &state.history.voltage,
            &state.history.current,
            &state.history.power,
            &state.history.thd,
        ] {
            assert_eq!(buffer.len(), expected_len);
            assert_eq!(buffer.latest().unwrap().time, at(second));
        }
        assert_eq!(state.updated_at, Some(at(second)));
        assert_eq!(state.tick, u64::from(second) + 1);
    }
    let state = engine.snapshot();
    assert_eq!(state.history.voltage.oldest().unwrap().value1, 10.0);
    assert_eq!(state.history.thd.latest().unwrap().value3, 1.0);
}

#[test]
fn rebinding_drops_roles_and_keeps_history() {
    let mut engine = canonical_engine();
    let full = ValuesEvent::new()
        .with_value(id_of(Role::U1), 230.0)
        .with_value(id_of(Role::P1), 2.0);
    engine.on_values_at(&full, at(10));
    assert_eq!(engine.snapshot().power.total, 2.0);

    engine.on_configuration(&ConfigurationEvent::from_ids([id_of(Role::U1)]));
    assert_eq!(engine.state(), EngineState::Configured);
    engine.on_values_at(&full, at(11));

    let state = engine.snapshot();
    assert_eq!(state.voltage.u1, 230.0);
    assert_eq!(state.power.p1, 0.0);
    assert_eq!(state.power.total, 0.0);
    assert_eq!(state.bound_channels, 1);
    assert_eq!(state.history.power.len(), 2);
}

#[test]
fn published_snapshots_are_immutable() {
    let mut engine = canonical_engine();
    let handle = engine.handle();
    engine.on_values_at(&ValuesEvent::new().with_value(id_of(Role::U2), 229.0), at(1));
    let first = handle.latest();
    engine.on_values_at(&ValuesEvent::new().with_value(id_of(Role::U2), 231.0), at(2));
    let second = handle.latest();

    assert_eq!(first.voltage.u2, 229.0);
    assert_eq!(first.history.voltage.len(), 1);
    assert_eq!(second.voltage.u2, 231.0);
    assert_eq!(second.history.voltage.len(), 2);
}

#[test]
fn malformed_and_numeric_string_entries_are_absent() {
    let mut engine = canonical_engine();
    let payload = serde_json::json!({
        "1001": {"value": 230.0},
        "1002": {"value": "231"},
        "1003": "garbage",
        "1004": {"value": 7.5}
    });
    engine.on_values_at(&ValuesEvent::from_value(payload), at(5));
    let state = engine.snapshot();
    assert_eq!(state.voltage.u1, 230.0);
    assert_eq!(state.voltage.u2, 0.0);
    assert_eq!(state.voltage.u3, 0.0);
    assert_eq!(state.current.i1, 7.5);
}

#[test]
fn configuration_json_accepts_numeric_and_string_ids() {
    let mut engine = TelemetryEngine::default();
    let configuration = ConfigurationEvent::from_json(
        r#"{"realtime_configs":[{"id":501},{"id":"502"},{"id":503}]}"#,
    )
    .unwrap();
    engine.on_configuration(&configuration);
    let values = ValuesEvent::from_json(
        r#"{"501":{"value":220},"502":{"value":221},"503":{"value":219}}"#,
    )
    .unwrap();
    engine.on_values_at(&values, at(0));
    assert!((engine.snapshot().summary.u_total - 220.0).abs() < 1e-9);
}

#[test]
fn snapshot_json_matches_renderer_contract() {
    let mut engine = canonical_engine();
    engine.on_values_at(
        &ValuesEvent::new()
            .with_value(id_of(Role::P1), 1.0)
            .with_value(id_of(Role::P2), 1.5)
            .with_value(id_of(Role::P3), 2.0),
        at(3_725),
    );
    let json = serde_json::to_value(&*engine.snapshot()).unwrap();
    assert_eq!(json["state"], "configured");
    assert_eq!(json["summary"]["pTotal"], 4.5);
    assert_eq!(json["power"]["total"], 4.5);
    assert_eq!(json["history"]["power"][0]["time"], "01:02:05");
    assert_eq!(json["history"]["power"][0]["value2"], 1.5);
    assert_eq!(json["updatedAt"], "01:02:05");
    assert_eq!(json["boundChannels"], 18);
}

//! Integration tests for the pump station
//!
//! These tests drive a real station actor through its public surface:
//! - Local free-running with pump alternation
//! - External control through the polling client (flag, setpoints, clamping)
//! - Handoff back to local control
//! - Client connection handling and shutdown

use std::time::Duration;

use pump_registers::map::{CONTROL_HR, TELEMETRY_BASE_IR, TELEMETRY_WORDS};
use pump_registers::{BankKind, PumpId, RegisterBank, RegisterError, TelemetryFrame};
use pump_station::{
    spawn_station_with_arbiter, ClientConfig, ClientError, ControlArbiter, ControlMode,
    LocalTransport, PollingClient, RegisterTransport, StationConfig, StationError, StationEvent,
    StationHandle, StationSnapshot, TickReport,
};
use tokio::sync::{broadcast, mpsc, oneshot};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("pump_station=debug")
            .with_test_writer()
            .try_init();
    }

    pub fn config(interval: u64) -> StationConfig {
        StationConfig {
            tick_interval_ms: 1000,
            alternation_interval_ticks: interval,
            ..Default::default()
        }
    }

    pub fn client_config() -> ClientConfig {
        ClientConfig {
            poll_interval_ms: 1000,
            max_attempts: 3,
            initial_backoff_ms: 10,
            max_backoff_ms: 40,
        }
    }

    /// Spawn a seeded station and subscribe before its first tick runs
    pub fn start(
        config: StationConfig,
        seed: u64,
    ) -> (StationHandle, broadcast::Receiver<StationEvent>) {
        init_tracing();
        let arbiter = ControlArbiter::with_seed(&config, seed);
        let (handle, _task) = spawn_station_with_arbiter(config, arbiter).unwrap();
        let events = handle.subscribe();
        (handle, events)
    }

    pub fn client(station: &StationHandle) -> PollingClient<LocalTransport> {
        PollingClient::new(LocalTransport::new(station.clone()), client_config())
    }

    /// Wait for the next completed tick
    pub async fn next_tick(events: &mut broadcast::Receiver<StationEvent>) -> TickReport {
        loop {
            match events.recv().await.unwrap() {
                StationEvent::Tick(report) => return report,
                _ => continue,
            }
        }
    }

    /// Collect every event up to and including the next tick
    pub async fn events_until_tick(
        events: &mut broadcast::Receiver<StationEvent>,
    ) -> Vec<StationEvent> {
        let mut seen = Vec::new();
        loop {
            let event = events.recv().await.unwrap();
            let done = matches!(event, StationEvent::Tick(_));
            seen.push(event);
            if done {
                return seen;
            }
        }
    }
}

// ============================================================================
// Local Control Tests
// ============================================================================

mod local_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn station_starts_local_with_pump_one_running() {
        let (station, mut events) = helpers::start(helpers::config(240), 11);
        let mut client = helpers::client(&station);

        let report = helpers::next_tick(&mut events).await;
        assert_eq!(report.tick, 0);
        assert_eq!(report.mode, ControlMode::Local);

        let snapshot = client.poll().await.unwrap();
        assert!(!snapshot.in_control);
        assert!((1000..=1400).contains(&snapshot.pump1_speed));
        assert_eq!(snapshot.pump2_speed, 0);
        assert_eq!(snapshot.pump2_power, 0.0);
        assert_eq!(snapshot.pump2_outflow, 0.0);
        assert_eq!(snapshot, StationSnapshot::from(report.frame));
    }

    #[tokio::test(start_paused = true)]
    async fn pumps_alternate_every_interval() {
        let (_station, mut events) = helpers::start(helpers::config(4), 12);

        let mut active = Vec::new();
        let mut alternations = Vec::new();
        for _ in 0..10 {
            for event in helpers::events_until_tick(&mut events).await {
                match event {
                    StationEvent::Tick(report) => active.push(report.active_pump.unwrap()),
                    StationEvent::PumpAlternated { active } => alternations.push(active),
                    _ => {}
                }
            }
        }

        use PumpId::{One, Two};
        assert_eq!(
            active,
            vec![One, One, One, One, Two, Two, Two, Two, One, One]
        );
        assert_eq!(alternations, vec![Two, One]);
    }

    #[tokio::test(start_paused = true)]
    async fn telemetry_block_decodes_after_each_tick() {
        let (station, mut events) = helpers::start(helpers::config(240), 13);

        for _ in 0..5 {
            let report = helpers::next_tick(&mut events).await;
            let words = station
                .read_registers(BankKind::Input, TELEMETRY_BASE_IR, TELEMETRY_WORDS)
                .await
                .unwrap();
            assert_eq!(TelemetryFrame::decode(&words).unwrap(), report.frame);
        }
    }
}

// ============================================================================
// External Control Tests
// ============================================================================

mod external_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn client_takes_control_and_setpoint_is_clamped() {
        let (station, mut events) = helpers::start(helpers::config(240), 21);
        let mut client = helpers::client(&station);
        helpers::next_tick(&mut events).await;

        client.set_pump_speed(PumpId::One, 1600).await.unwrap();
        assert!(client.toggle_control().await.unwrap());

        let seen = helpers::events_until_tick(&mut events).await;
        assert!(seen.iter().any(|e| matches!(
            e,
            StationEvent::ModeChanged {
                from: ControlMode::Local,
                to: ControlMode::External
            }
        )));

        let snapshot = client.poll().await.unwrap();
        assert!(snapshot.in_control);
        assert_eq!(snapshot.pump1_speed, 1500);
        assert_eq!(snapshot.pump2_speed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_setpoints_clamp_both_ways() {
        let (station, mut events) = helpers::start(helpers::config(240), 22);
        let mut client = helpers::client(&station);
        helpers::next_tick(&mut events).await;

        client.set_pump_speed(PumpId::One, 2000).await.unwrap();
        client.set_pump_speed(PumpId::Two, -50).await.unwrap();
        client.toggle_control().await.unwrap();

        let report = helpers::next_tick(&mut events).await;
        assert_eq!(report.samples[0].speed, 1500.0);
        assert_eq!(report.samples[1].speed, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn driven_speed_tracks_setpoint() {
        let (station, mut events) = helpers::start(helpers::config(240), 23);
        let mut client = helpers::client(&station);
        helpers::next_tick(&mut events).await;

        client.set_pump_speed(PumpId::One, 1200).await.unwrap();
        client.set_pump_speed(PumpId::Two, 1100).await.unwrap();
        client.toggle_control().await.unwrap();

        for _ in 0..5 {
            let report = helpers::next_tick(&mut events).await;
            assert_eq!(report.mode, ControlMode::External);
            assert!((report.samples[0].speed - 1200.0).abs() < 1.0);
            assert!((report.samples[1].speed - 1100.0).abs() < 1.0);
            assert_eq!(report.active_pump, None);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn releasing_control_restarts_local_cold() {
        let (station, mut events) = helpers::start(helpers::config(240), 24);
        let mut client = helpers::client(&station);
        helpers::next_tick(&mut events).await;

        client.set_pump_speed(PumpId::One, 1450).await.unwrap();
        client.set_pump_speed(PumpId::Two, 1450).await.unwrap();
        client.toggle_control().await.unwrap();
        for _ in 0..3 {
            helpers::next_tick(&mut events).await;
        }

        assert!(!client.toggle_control().await.unwrap());
        let report = helpers::next_tick(&mut events).await;

        assert_eq!(report.mode, ControlMode::Local);
        assert_eq!(report.previous_mode, ControlMode::External);
        assert_eq!(report.active_pump, Some(PumpId::One));
        let sample = report.samples[0];
        assert!((1000.0..=1400.0).contains(&sample.speed));
        assert!((sample.outflow - 0.80 * 0.35 * sample.speed).abs() < 1e-9);
        assert_eq!(report.frame.pumps[1].speed, 0);
    }
}

// ============================================================================
// Client Tests
// ============================================================================

mod client_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn input_bank_is_read_only_for_peers() {
        let (station, mut events) = helpers::start(helpers::config(240), 31);
        helpers::next_tick(&mut events).await;

        let err = station
            .write_registers(BankKind::Input, 0, &[1])
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            StationError::Register(RegisterError::ReadOnly(BankKind::Input)).to_string()
        );

        let mut transport = LocalTransport::new(station.clone());
        transport.connect().await.unwrap();
        let err = transport
            .write_registers(BankKind::Input, 0, &[1])
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn control_flag_written_by_client_is_visible_in_holding_bank() {
        let (station, _events) = helpers::start(helpers::config(240), 32);
        let mut client = helpers::client(&station);

        client.toggle_control().await.unwrap();
        let words = station
            .read_registers(BankKind::Holding, CONTROL_HR, 1)
            .await
            .unwrap();
        assert_eq!(words, vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn client_reports_unavailable_after_station_stops() {
        let (station, mut events) = helpers::start(helpers::config(240), 33);
        let mut client = helpers::client(&station);
        helpers::next_tick(&mut events).await;
        client.poll().await.unwrap();

        station.shutdown().await.unwrap();
        while !station.is_closed() {
            tokio::task::yield_now().await;
        }

        let err = client.poll().await.unwrap_err();
        assert!(matches!(err, ClientError::Unavailable { attempts: 3, .. }));
        assert_eq!(client.transient_failures(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn polling_loop_streams_snapshots_until_shutdown() {
        let (station, _events) = helpers::start(helpers::config(240), 34);
        let mut client = helpers::client(&station);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (snap_tx, mut snap_rx) = mpsc::channel(16);
        let runner = tokio::spawn(async move {
            client.run(shutdown_rx, snap_tx).await;
        });

        for _ in 0..3 {
            let snapshot = snap_rx.recv().await.unwrap();
            assert!(!snapshot.in_control);
        }

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .unwrap()
            .unwrap();
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod property_tests {
    use super::*;
    use pump_registers::map::{P1_SPEED_HR, P2_SPEED_HR};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn published_speeds_stay_within_limits(p1 in any::<i32>(), p2 in any::<i32>(), seed in any::<u64>()) {
            let config = helpers::config(240);
            let mut arbiter = ControlArbiter::with_seed(&config, seed);
            let mut bank = RegisterBank::default();
            bank.write_holding(CONTROL_HR, &[1]).unwrap();
            bank.set_holding_i32(P1_SPEED_HR, p1).unwrap();
            bank.set_holding_i32(P2_SPEED_HR, p2).unwrap();

            for _ in 0..3 {
                let report = arbiter.tick(&mut bank).unwrap();
                for pump in report.frame.pumps {
                    prop_assert!((0..=1500).contains(&pump.speed));
                }
            }
        }

        #[test]
        fn free_run_speeds_stay_in_walk_range(seed in any::<u64>(), interval in 1u64..8) {
            let config = helpers::config(interval);
            let mut arbiter = ControlArbiter::with_seed(&config, seed);
            let mut bank = RegisterBank::default();

            for _ in 0..40 {
                let report = arbiter.tick(&mut bank).unwrap();
                let active = report.active_pump.unwrap();
                let speed = report.samples[active.index()].speed;
                prop_assert!((900.0..=1500.0).contains(&speed));
                prop_assert_eq!(report.samples[active.other().index()].speed, 0.0);
            }
        }

        #[test]
        fn short_telemetry_blocks_are_rejected(len in 0usize..13) {
            let words = vec![0u16; len];
            prop_assert_eq!(
                TelemetryFrame::decode(&words).unwrap_err(),
                RegisterError::Format { expected: 13, actual: len }
            );
        }
    }
}

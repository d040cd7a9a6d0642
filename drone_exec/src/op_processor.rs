//! # Operator command processor module
//!
//! The operator command processor handles commands coming from the prompt or a script.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};

// Internal
use comms_if::cmd::{DroneCmd, RcCmd};
use drone_lib::{
    data_store::{DataStore, SafeModeCause},
    op_cmd::OpCmd,
    pilot::{Pilot, PilotError},
    tm_store::{ConnectionState, TmState},
};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute an operator command.
///
/// Mutates the datastore to send commands to different modules.
pub(crate) fn exec(ds: &mut DataStore, pilot: &Pilot, op: &OpCmd, speed_step: i32) {
    debug!("Executing operator command {:?}", op);

    match op {
        OpCmd::Takeoff => log_err("takeoff", pilot.takeoff()),
        OpCmd::Land => {
            ds.hold();
            log_err("land", pilot.land());
        }
        OpCmd::Stop => {
            ds.hold();
            ds.make_safe(SafeModeCause::OperatorStop);
            log_err("stop", pilot.stop());
        }
        OpCmd::Follow => {
            ds.make_unsafe(SafeModeCause::OperatorStop).ok();
            ds.follow_enabled = true;
            match ds.safe_cause {
                Some(c) => warn!("Line following enabled but suspended by safe mode ({:?})", c),
                None => info!("Line following enabled"),
            }
        }
        OpCmd::Hold => {
            ds.hold();
            info!("Line following disabled");
        }
        OpCmd::Faster => {
            let s = ds.motion_ctrl.base_speed() + speed_step;
            let s = ds.motion_ctrl.set_base_speed(s);
            info!("Base speed {}", s);
        }
        OpCmd::Slower => {
            let s = ds.motion_ctrl.base_speed() - speed_step;
            let s = ds.motion_ctrl.set_base_speed(s);
            info!("Base speed {}", s);
        }
        OpCmd::Speed { speed } => {
            let s = ds.motion_ctrl.set_base_speed(*speed);
            info!("Base speed {}", s);
        }
        OpCmd::Rc { lr, fb, ud, yaw } => {
            if ds.follow_enabled {
                info!("Manual RC demand, line following disabled");
            }
            ds.hold();
            ds.rc_dem = Some(RcCmd::new(*lr, *fb, *ud, *yaw));
        }
        OpCmd::Send { cmd } => {
            let text = cmd.join(" ");
            match text.parse::<DroneCmd>() {
                Ok(c) => log_err(&text, pilot.send_command(&c)),
                Err(e) => warn!("Not sending \"{}\": {}", text, e),
            }
        }
        OpCmd::Status => info!("{}", status_line(&pilot.tm_state())),
        OpCmd::Quit => {
            info!("Quit requested");
            ds.quit = true;
        }
    }
}

/// Format the telemetry state for display.
pub(crate) fn status_line(state: &TmState) -> String {
    if state.conn_state != ConnectionState::Connected {
        return format!("DRONE NOT CONNECTED ({:?})", state.conn_state);
    }

    let snap = &state.snapshot;

    let battery = match snap.battery_percent {
        Some(b) => format!("{}%", b),
        None => "?".into(),
    };
    let time = match &snap.flight_time {
        Some(t) => t.to_string(),
        None => "?".into(),
    };
    let age = match snap.last_updated {
        Some(t) => format!("{:.1} s ago", t.elapsed().as_secs_f64()),
        None => "never".into(),
    };

    format!(
        "Battery: {}, flight time: {}, status: \"{}\", last telemetry {}",
        battery, time, snap.status_text, age
    )
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn log_err(what: &str, result: Result<(), PilotError>) {
    if let Err(e) = result {
        warn!("Could not send \"{}\": {}", what, e);
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::tm::FlightTime;
    use drone_lib::{
        pilot::PilotParams,
        tm_store::TelemetrySnapshot,
    };
    use std::{net::UdpSocket, time::{Duration, Instant}};

    /// A pilot talking to a silent socket on localhost.
    fn test_pilot() -> (Pilot, UdpSocket) {
        let drone = UdpSocket::bind("127.0.0.1:0").unwrap();
        drone.set_read_timeout(Some(Duration::from_millis(300))).unwrap();

        let mut params = PilotParams::default();
        params.net.drone_ip = "127.0.0.1".into();
        params.net.cmd_port = drone.local_addr().unwrap().port();
        params.net.local_port = 0;
        params.net.recv_poll_ms = 20;

        (Pilot::start(params).unwrap(), drone)
    }

    fn recv_text(drone: &UdpSocket) -> Option<String> {
        let mut buf = [0u8; 256];
        drone
            .recv_from(&mut buf)
            .ok()
            .map(|(len, _)| String::from_utf8_lossy(&buf[..len]).into_owned())
    }

    #[test]
    fn test_follow_and_stop() {
        let (mut pilot, drone) = test_pilot();
        let mut ds = DataStore::default();

        exec(&mut ds, &pilot, &OpCmd::Follow, 10);
        assert!(ds.follow_enabled);

        exec(&mut ds, &pilot, &OpCmd::Stop, 10);
        assert!(!ds.follow_enabled);
        assert_eq!(ds.safe_cause, Some(SafeModeCause::OperatorStop));
        assert_eq!(ds.rc_dem, Some(RcCmd::zero()));
        assert_eq!(recv_text(&drone).as_deref(), Some("stop"));

        exec(&mut ds, &pilot, &OpCmd::Follow, 10);
        assert!(ds.follow_enabled);
        assert!(!ds.safe);

        pilot.shutdown();
    }

    #[test]
    fn test_speed_commands() {
        let (mut pilot, _drone) = test_pilot();
        let mut ds = DataStore::default();
        let base = ds.motion_ctrl.base_speed();

        exec(&mut ds, &pilot, &OpCmd::Faster, 10);
        assert_eq!(ds.motion_ctrl.base_speed(), base + 10);

        exec(&mut ds, &pilot, &OpCmd::Slower, 10);
        exec(&mut ds, &pilot, &OpCmd::Slower, 10);
        assert_eq!(ds.motion_ctrl.base_speed(), base - 10);

        exec(&mut ds, &pilot, &OpCmd::Speed { speed: 250 }, 10);
        assert_eq!(ds.motion_ctrl.base_speed(), 100);

        pilot.shutdown();
    }

    #[test]
    fn test_manual_commands() {
        let (mut pilot, drone) = test_pilot();
        let mut ds = DataStore::default();
        ds.follow_enabled = true;

        exec(&mut ds, &pilot, &OpCmd::Rc { lr: -50, fb: 0, ud: 25, yaw: 120 }, 10);
        assert!(!ds.follow_enabled);
        assert_eq!(ds.rc_dem, Some(RcCmd::new(-50, 0, 25, 100)));

        let send = |words: &[&str]| OpCmd::Send {
            cmd: words.iter().map(|w| w.to_string()).collect(),
        };

        exec(&mut ds, &pilot, &send(&["flip", "l"]), 10);
        assert_eq!(recv_text(&drone).as_deref(), Some("flip l"));

        // Out of range, never sent
        exec(&mut ds, &pilot, &send(&["cw", "720"]), 10);
        exec(&mut ds, &pilot, &send(&["up", "30"]), 10);
        assert_eq!(recv_text(&drone).as_deref(), Some("up 30"));

        exec(&mut ds, &pilot, &OpCmd::Quit, 10);
        assert!(ds.quit);

        pilot.shutdown();
    }

    #[test]
    fn test_status_line() {
        let state = TmState::default();
        assert!(status_line(&state).starts_with("DRONE NOT CONNECTED"));

        let state = TmState {
            snapshot: TelemetrySnapshot {
                battery_percent: Some(87),
                flight_time: Some(FlightTime::Seconds(12.0)),
                status_text: "ok".into(),
                last_updated: Some(Instant::now()),
            },
            conn_state: ConnectionState::Connected,
        };
        let line = status_line(&state);
        assert!(line.contains("Battery: 87%"));
        assert!(line.contains("flight time: 12s"));
        assert!(line.contains("status: \"ok\""));
    }
}

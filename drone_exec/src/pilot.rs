//! # Pilot
//!
//! Single entry point for everything which wants to fly the drone: the executable, a future UI,
//! or tests. It owns the socket, the telemetry store and the background threads.
//!
//! ```no_run
//! # use drone_lib::pilot::{Pilot, PilotParams};
//! let mut pilot = Pilot::start(PilotParams::default()).unwrap();
//! if pilot.connect() {
//!     pilot.takeoff().ok();
//!     pilot.send_rc(0, 20, 0, 0).ok();
//!     pilot.land().ok();
//! }
//! pilot.shutdown();
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use log::{info, warn};
use serde::Deserialize;

use comms_if::{
    cmd::{DroneCmd, RcCmd},
    net::{DroneSocket, NetError, NetParams},
};

use crate::{
    cmd_channel::{CmdChannelError, CommandChannel},
    conn_monitor::{self, ConnParams},
    tm_receiver,
    tm_store::{ConnectionState, TmState, TmStore},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the pilot, loaded from `pilot.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PilotParams {
    pub net: NetParams,
    pub conn: ConnParams,
}

pub struct Pilot {
    params: PilotParams,

    channel: CommandChannel,

    store: TmStore,

    shutdown: Arc<AtomicBool>,

    receiver: Option<JoinHandle<()>>,

    monitor: Option<JoinHandle<()>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PilotError {
    #[error("Could not open the link to the drone: {0}")]
    LinkError(NetError),

    #[error("Could not start the {0} thread: {1}")]
    ThreadSpawnError(&'static str, std::io::Error),

    #[error(transparent)]
    CmdError(#[from] CmdChannelError),

    #[error(transparent)]
    NetError(#[from] NetError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pilot {
    /// Open the link to the drone and start receiving telemetry.
    ///
    /// Nothing is sent to the drone until [`Pilot::connect`] is called.
    pub fn start(params: PilotParams) -> Result<Self, PilotError> {
        let socket = Arc::new(DroneSocket::bind(&params.net).map_err(PilotError::LinkError)?);

        let store = TmStore::new();

        let receiver = tm_receiver::spawn(socket.clone(), store.clone())
            .map_err(|e| PilotError::ThreadSpawnError("tm_receiver", e))?;

        info!("Pilot started, drone at {}", socket.drone_addr());

        Ok(Self {
            params,
            channel: CommandChannel::new(socket),
            store,
            shutdown: Arc::new(AtomicBool::new(false)),
            receiver: Some(receiver),
            monitor: None,
        })
    }

    /// Put the drone into SDK mode and start monitoring the connection.
    ///
    /// Returns `false` if the drone didn't acknowledge within the connection window. The
    /// monitor is started by the first attempt, whatever its outcome, since the receiver may
    /// already have promoted the link on a reply other than `ok`.
    pub fn connect(&mut self) -> bool {
        let connected = conn_monitor::connect(&self.channel, &self.store, &self.params.conn);

        if self.monitor.is_none() {
            match conn_monitor::spawn(
                self.channel.clone(),
                self.store.clone(),
                self.params.conn.clone(),
                self.shutdown.clone(),
            ) {
                Ok(h) => self.monitor = Some(h),
                Err(e) => warn!("Could not start the connection monitor: {}", e),
            }
        }

        connected
    }

    /// Send a command to the drone.
    ///
    /// Commands are sent whatever the connection state.
    pub fn send_command(&self, cmd: &DroneCmd) -> Result<(), PilotError> {
        self.channel.send_cmd(cmd).map_err(PilotError::from)
    }

    /// Send raw text to the drone.
    pub fn send_text(&self, text: &str) -> Result<(), PilotError> {
        self.channel.send(text).map_err(PilotError::from)
    }

    pub fn takeoff(&self) -> Result<(), PilotError> {
        self.send_command(&DroneCmd::Takeoff)
    }

    pub fn land(&self) -> Result<(), PilotError> {
        self.send_command(&DroneCmd::Land)
    }

    /// Hover in place.
    pub fn stop(&self) -> Result<(), PilotError> {
        self.send_command(&DroneCmd::Stop)
    }

    /// Send an RC demand, each channel is clamped to `[-100, 100]`.
    pub fn send_rc(&self, lr: i32, fb: i32, ud: i32, yaw: i32) -> Result<(), PilotError> {
        self.send_rc_cmd(RcCmd::new(lr, fb, ud, yaw))
    }

    pub fn send_rc_cmd(&self, rc: RcCmd) -> Result<(), PilotError> {
        self.channel.send_rc(rc).map_err(PilotError::from)
    }

    /// A consistent copy of the telemetry and connection state.
    pub fn tm_state(&self) -> TmState {
        self.store.get()
    }

    pub fn is_connected(&self) -> bool {
        self.store.conn_state() == ConnectionState::Connected
    }

    pub fn store(&self) -> &TmStore {
        &self.store
    }

    /// Stop the background threads and close the link.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.channel.socket().close();

        if let Some(h) = self.monitor.take() {
            join("conn_monitor", h);
        }
        if let Some(h) = self.receiver.take() {
            join("tm_receiver", h);
        }

        info!("Pilot shut down");
    }
}

impl Drop for Pilot {
    fn drop(&mut self) {
        if self.receiver.is_some() || self.monitor.is_some() {
            self.shutdown();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn join(name: &str, handle: JoinHandle<()>) {
    if handle.join().is_err() {
        warn!("The {} thread panicked", name);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::FakeDrone;
    use std::{net::UdpSocket, thread, time::Duration};

    fn params_for(drone: &UdpSocket) -> PilotParams {
        PilotParams {
            net: FakeDrone::params_for(drone.local_addr().unwrap().port()),
            conn: ConnParams {
                conn_timeout_s: 0.5,
                poll_interval_s: 0.05,
                connect_wait_s: 0.5,
                connect_poll_s: 0.02,
                max_consec_send_failures: 5,
            },
        }
    }

    /// A drone which answers `ok` to `command`, a battery level to `battery?` and a time to
    /// `time?`, and records everything else.
    fn spawn_drone(drone: UdpSocket) -> thread::JoinHandle<Vec<String>> {
        thread::spawn(move || {
            drone
                .set_read_timeout(Some(Duration::from_millis(500)))
                .unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1518];

            while let Ok((len, from)) = drone.recv_from(&mut buf) {
                let text = String::from_utf8_lossy(&buf[..len]).into_owned();
                let reply = match text.as_str() {
                    "command" => Some("ok"),
                    "battery?" => Some("76"),
                    "time?" => Some("3s"),
                    _ => None,
                };
                if let Some(r) = reply {
                    drone.send_to(r.as_bytes(), from).unwrap();
                }
                received.push(text);
            }

            received
        })
    }

    #[test]
    fn test_pilot_session() {
        let drone = UdpSocket::bind("127.0.0.1:0").unwrap();
        let params = params_for(&drone);
        let drone_thread = spawn_drone(drone);

        let mut pilot = Pilot::start(params).unwrap();
        assert!(!pilot.is_connected());

        assert!(pilot.connect());
        assert!(pilot.is_connected());

        pilot.takeoff().unwrap();
        pilot.send_rc(-50, 0, 25, 150).unwrap();

        // Let the monitor poll telemetry
        let mut battery = None;
        for _ in 0..100 {
            battery = pilot.tm_state().snapshot.battery_percent;
            if battery.is_some() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(battery, Some(76));

        pilot.land().unwrap();
        pilot.shutdown();

        let received = drone_thread.join().unwrap();
        assert_eq!(received[0], "command");
        assert!(received.contains(&"takeoff".to_string()));
        assert!(received.contains(&"rc -50 0 25 100".to_string()));
        assert!(received.contains(&"land".to_string()));
        assert!(received.contains(&"battery?".to_string()));
    }

    #[test]
    fn test_connect_fails_without_drone() {
        // Bound but never answers
        let drone = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut pilot = Pilot::start(params_for(&drone)).unwrap();

        assert!(!pilot.connect());
        assert_eq!(pilot.tm_state().conn_state, ConnectionState::Disconnected);

        pilot.shutdown();
    }

    #[test]
    fn test_rejected_connect_still_times_out() {
        // Answers `error` to `command` once, then goes silent
        let drone = UdpSocket::bind("127.0.0.1:0").unwrap();
        let params = params_for(&drone);
        let timeout = params.conn.conn_timeout();

        let drone_thread = thread::spawn(move || {
            drone
                .set_read_timeout(Some(Duration::from_millis(500)))
                .unwrap();
            let mut buf = [0u8; 64];
            if let Ok((len, from)) = drone.recv_from(&mut buf) {
                assert_eq!(&buf[..len], b"command");
                drone.send_to(b"error", from).unwrap();
            }
            drone
        });

        let mut pilot = Pilot::start(params).unwrap();
        assert!(!pilot.connect());

        // The reply alone promoted the link, the monitor must take it down again
        let mut state = pilot.tm_state();
        for _ in 0..200 {
            state = pilot.tm_state();
            if state.conn_state == ConnectionState::Disconnected {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(state.conn_state, ConnectionState::Disconnected);
        assert!(state.snapshot.last_updated.unwrap().elapsed() > timeout);

        pilot.shutdown();
        let _drone = drone_thread.join().unwrap();
    }
}

//! # Telemetry store
//!
//! Holds the latest telemetry received from the drone together with the connection state. Both
//! live in one [`TmState`] behind a single mutex, so every update of the pair is atomic and
//! readers always get a consistent copy.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use log::{info, warn};

use comms_if::tm::{FlightTime, TmMessage, TmParseError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Status text set when the link times out.
pub const DISCONNECTED_STATUS: &str = "Disconnected";

/// Status text set while the connection bootstrap is running.
pub const CONNECTING_STATUS: &str = "Connecting";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Latest values of each kind of telemetry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    /// Battery charge in percent, `None` until first reported.
    pub battery_percent: Option<u8>,

    /// Flight time, `None` until first reported.
    pub flight_time: Option<FlightTime>,

    /// Last free-form status response (`ok`, `error`, ...) or a local status marker.
    pub status_text: String,

    /// Time the last datagram was received, `None` if nothing has ever been received.
    pub last_updated: Option<Instant>,
}

/// Snapshot and connection state, always read and written together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TmState {
    pub snapshot: TelemetrySnapshot,
    pub conn_state: ConnectionState,
}

/// Shared handle to the telemetry store.
#[derive(Debug, Clone, Default)]
pub struct TmStore {
    inner: Arc<Mutex<TmState>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Liveness of the link to the drone.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

impl TmStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the current state.
    pub fn get(&self) -> TmState {
        self.lock().clone()
    }

    pub fn conn_state(&self) -> ConnectionState {
        self.lock().conn_state
    }

    pub fn status_text(&self) -> String {
        self.lock().snapshot.status_text.clone()
    }

    /// Record the arrival of a datagram at `now`.
    ///
    /// Any datagram, even one which couldn't be classified, proves the drone is alive, so the
    /// receive time is always updated and the state promoted to `Connected`. Classified
    /// messages then update the matching snapshot field.
    pub fn record_rx(&self, msg: Result<TmMessage, TmParseError>, now: Instant) {
        let mut state = self.lock();

        state.snapshot.last_updated = Some(now);

        if state.conn_state != ConnectionState::Connected {
            info!("Drone connected");
            state.conn_state = ConnectionState::Connected;
        }

        match msg {
            Ok(TmMessage::Battery(b)) => state.snapshot.battery_percent = Some(b),
            Ok(TmMessage::FlightTime(t)) => state.snapshot.flight_time = Some(t),
            Ok(TmMessage::Status(s)) => state.snapshot.status_text = s,
            Err(e) => warn!("Could not parse telemetry: {}", e),
        }
    }

    /// Demote a `Connected` link to `Disconnected` if nothing has been received for longer
    /// than `timeout`.
    ///
    /// Returns `true` if the link was demoted by this call.
    pub fn check_timeout(&self, now: Instant, timeout: Duration) -> bool {
        let mut state = self.lock();

        if state.conn_state != ConnectionState::Connected {
            return false;
        }

        let silent_for = match state.snapshot.last_updated {
            Some(t) => now.saturating_duration_since(t),
            None => Duration::MAX,
        };

        if silent_for > timeout {
            state.conn_state = ConnectionState::Disconnected;
            state.snapshot.status_text = DISCONNECTED_STATUS.into();
            warn!(
                "No telemetry for {:.1} s, drone disconnected",
                silent_for.as_secs_f64().min(1e9)
            );
            true
        } else {
            false
        }
    }

    /// Enter the `Connecting` state at the start of the connection bootstrap.
    pub fn begin_connect(&self) {
        let mut state = self.lock();
        state.conn_state = ConnectionState::Connecting;
        state.snapshot.status_text = CONNECTING_STATUS.into();
    }

    /// Mark the link as connected at `now`, as the end of a successful bootstrap.
    pub fn mark_connected(&self, now: Instant) {
        let mut state = self.lock();
        state.snapshot.last_updated = Some(now);
        state.conn_state = ConnectionState::Connected;
    }

    /// Fall back to `Disconnected` after a failed bootstrap.
    ///
    /// Only applies if still `Connecting`, a datagram which arrived in the meantime may already
    /// have promoted the link.
    pub fn abort_connect(&self) {
        let mut state = self.lock();
        if state.conn_state == ConnectionState::Connecting {
            state.conn_state = ConnectionState::Disconnected;
        }
    }

    /// Lock the state.
    ///
    /// A writer panicking can't leave the state half-written (every update is a plain field
    /// assignment) so a poisoned lock is recovered.
    fn lock(&self) -> MutexGuard<'_, TmState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

//! # Connection monitor
//!
//! Keeps the link to the drone alive and watches its health:
//!
//! - [`connect`] runs the one-shot bootstrap, putting the drone into SDK mode.
//! - [`spawn`] starts the periodic monitor thread, which alternately requests the battery level
//!   and flight time, and demotes the link to `Disconnected` once nothing has been received for
//!   longer than the connection timeout.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, error, info, warn};
use serde::Deserialize;

use comms_if::cmd::DroneCmd;

use crate::{cmd_channel::CommandChannel, tm_store::TmStore};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Connection monitoring parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnParams {
    /// Time without any received datagram after which the link is considered lost.
    ///
    /// Units: seconds
    pub conn_timeout_s: f64,

    /// Pause after each telemetry request.
    ///
    /// Units: seconds
    pub poll_interval_s: f64,

    /// Maximum time to wait for `ok` during the bootstrap.
    ///
    /// Units: seconds
    pub connect_wait_s: f64,

    /// Period at which the status is checked during the bootstrap.
    ///
    /// Units: seconds
    pub connect_poll_s: f64,

    /// Number of consecutive failed requests after which an error is logged.
    pub max_consec_send_failures: u32,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ConnParams {
    fn default() -> Self {
        Self {
            conn_timeout_s: 5.0,
            poll_interval_s: 0.5,
            connect_wait_s: 5.0,
            connect_poll_s: 0.1,
            max_consec_send_failures: 5,
        }
    }
}

impl ConnParams {
    pub fn conn_timeout(&self) -> Duration {
        secs(self.conn_timeout_s)
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Put the drone into SDK mode.
///
/// Sends `command` and waits up to `connect_wait_s` for the drone to answer `ok`. On success the
/// link is marked `Connected` and `true` is returned. Otherwise (including if `command` couldn't
/// be sent) the link falls back to `Disconnected` and `false` is returned.
pub fn connect(channel: &CommandChannel, store: &TmStore, params: &ConnParams) -> bool {
    store.begin_connect();

    info!("Connecting to the drone...");

    if let Err(e) = channel.send_cmd(&DroneCmd::Command) {
        error!("Could not send the SDK mode command: {}", e);
        store.abort_connect();
        return false;
    }

    let start = Instant::now();
    let wait = secs(params.connect_wait_s);
    let poll = secs(params.connect_poll_s);

    loop {
        if store.status_text().eq_ignore_ascii_case("ok") {
            store.mark_connected(Instant::now());
            info!("Drone accepted SDK mode");
            return true;
        }

        let elapsed = start.elapsed();
        if elapsed >= wait {
            break;
        }

        // Don't sleep past the end of the wait window
        thread::sleep(poll.min(wait - elapsed));
    }

    warn!(
        "No \"ok\" from the drone within {:.1} s, connection failed",
        params.connect_wait_s
    );
    store.abort_connect();

    false
}

/// Spawn the monitor thread, which runs until `shutdown` is set.
pub fn spawn(
    channel: CommandChannel,
    store: TmStore,
    params: ConnParams,
    shutdown: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("conn_monitor".into())
        .spawn(move || run(&channel, &store, &params, &shutdown))
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn run(channel: &CommandChannel, store: &TmStore, params: &ConnParams, shutdown: &AtomicBool) {
    debug!("Connection monitor started");

    let timeout = params.conn_timeout();
    let interval = secs(params.poll_interval_s);
    let mut num_consec_failures = 0u32;

    'outer: loop {
        for query in [DroneCmd::Battery, DroneCmd::Time].iter() {
            if shutdown.load(Ordering::Relaxed) {
                break 'outer;
            }

            store.check_timeout(Instant::now(), timeout);

            // Requests are sent whatever the state, a reply re-promotes a drone which has come
            // back
            match channel.send_cmd(query) {
                Ok(()) => num_consec_failures = 0,
                Err(e) => {
                    num_consec_failures += 1;
                    debug!("Telemetry request failed: {}", e);

                    if num_consec_failures == params.max_consec_send_failures + 1 {
                        error!(
                            "More than {} consecutive telemetry requests have failed",
                            params.max_consec_send_failures
                        );
                    }
                }
            }

            thread::sleep(interval);
        }
    }

    info!("Connection monitor stopped");
}

/// Build a duration from seconds, negative or non-finite values giving zero.
fn secs(s: f64) -> Duration {
    if s.is_finite() && s > 0.0 {
        Duration::from_secs_f64(s)
    } else {
        Duration::from_secs(0)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

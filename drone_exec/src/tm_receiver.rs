//! # Telemetry receiver
//!
//! Background thread which receives every datagram sent back by the drone, classifies it and
//! records it in the [`TmStore`]. The thread only stops once the socket is closed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Instant,
};

use log::{debug, info, trace, warn};

use comms_if::{
    net::{DroneSocket, NetError},
    tm::TmMessage,
};

use crate::tm_store::TmStore;

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Spawn the receiver thread.
pub fn spawn(socket: Arc<DroneSocket>, store: TmStore) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("tm_receiver".into())
        .spawn(move || run(&socket, &store))
}

/// Classify one datagram received at `now` and record it in the store.
pub fn handle_datagram(data: &[u8], store: &TmStore, now: Instant) {
    let msg = TmMessage::from_datagram(data);
    trace!("Received {:?}", msg);
    store.record_rx(msg, now);
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn run(socket: &DroneSocket, store: &TmStore) {
    debug!("Telemetry receiver started");

    loop {
        match socket.recv() {
            Ok(Some(data)) => handle_datagram(&data, store, Instant::now()),
            Ok(None) => (),
            Err(NetError::Closed) => break,
            Err(e) => warn!("Telemetry receive error: {}", e),
        }
    }

    info!("Telemetry receiver stopped");
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{test_utils::FakeDrone, tm_store::ConnectionState};
    use comms_if::tm::FlightTime;
    use std::time::Duration;

    #[test]
    fn test_handle_datagram() {
        let store = TmStore::new();
        let now = Instant::now();

        handle_datagram(b"87", &store, now);
        handle_datagram(b"12s\r\n", &store, now);
        handle_datagram(b"ok", &store, now);

        let state = store.get();
        assert_eq!(state.conn_state, ConnectionState::Connected);
        assert_eq!(state.snapshot.battery_percent, Some(87));
        assert_eq!(state.snapshot.flight_time, Some(FlightTime::Seconds(12.0)));
        assert_eq!(state.snapshot.status_text, "ok");
        assert_eq!(state.snapshot.last_updated, Some(now));
    }

    #[test]
    fn test_out_of_range_battery_still_alive() {
        let store = TmStore::new();
        let now = Instant::now();

        handle_datagram(b"300", &store, now);

        let state = store.get();
        assert_eq!(state.conn_state, ConnectionState::Connected);
        assert_eq!(state.snapshot.battery_percent, None);
        assert_eq!(state.snapshot.last_updated, Some(now));
    }

    #[test]
    fn test_receiver_thread() {
        let drone = FakeDrone::new();
        let socket = drone.socket();
        let store = TmStore::new();

        let handle = spawn(socket.clone(), store.clone()).unwrap();

        drone.reply("64");

        let mut battery = None;
        for _ in 0..100 {
            battery = store.get().snapshot.battery_percent;
            if battery.is_some() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(battery, Some(64));
        assert_eq!(store.conn_state(), ConnectionState::Connected);

        // Closing the socket ends the thread
        socket.close();
        handle.join().unwrap();
    }
}

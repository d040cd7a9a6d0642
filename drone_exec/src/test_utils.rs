//! Helpers shared by the unit tests of this crate.

use std::{
    net::{SocketAddr, UdpSocket},
    sync::Arc,
    time::Duration,
};

use comms_if::net::{DroneSocket, NetParams};

/// A stand-in for the drone, listening on a localhost port.
pub struct FakeDrone {
    socket: UdpSocket,
    drone_socket: Arc<DroneSocket>,
}

impl FakeDrone {
    pub fn new() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(300)))
            .unwrap();

        let params = Self::params_for(socket.local_addr().unwrap().port());
        let drone_socket = Arc::new(DroneSocket::bind(&params).unwrap());

        Self {
            socket,
            drone_socket,
        }
    }

    /// Network parameters pointing at a fake drone on the given port.
    pub fn params_for(port: u16) -> NetParams {
        NetParams {
            drone_ip: "127.0.0.1".into(),
            cmd_port: port,
            local_port: 0,
            recv_buffer_len: 1518,
            recv_poll_ms: 20,
        }
    }

    /// The socket the software under test should use to reach this drone.
    pub fn socket(&self) -> Arc<DroneSocket> {
        self.drone_socket.clone()
    }

    /// Receive the next command sent to the drone, or `None` after a short timeout.
    pub fn recv_text(&self) -> Option<String> {
        let mut buf = [0u8; 1518];
        match self.socket.recv_from(&mut buf) {
            Ok((len, _)) => Some(String::from_utf8_lossy(&buf[..len]).into_owned()),
            Err(_) => None,
        }
    }

    /// Send a response back to the software under test.
    pub fn reply(&self, text: &str) {
        let local = self.drone_socket.local_addr().unwrap();
        let to = SocketAddr::from(([127, 0, 0, 1], local.port()));
        self.socket.send_to(text.as_bytes(), to).unwrap();
    }
}

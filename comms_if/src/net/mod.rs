//! # Network Module
//!
//! This module provides the networking abstraction used to talk to the drone. The drone speaks
//! plain text over UDP, so there are no delivery, ordering or duplication guarantees, and a
//! datagram larger than the receive buffer is truncated.
//!
//! A single [`DroneSocket`] is shared (behind an `Arc`) by everything which sends to the drone.
//! Exactly one thread should receive from it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io::ErrorKind,
    net::{SocketAddr, ToSocketAddrs, UdpSocket},
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use log::debug;
use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct NetParams {
    /// IP address (or host name) of the drone.
    pub drone_ip: String,

    /// UDP port the drone listens for commands on.
    pub cmd_port: u16,

    /// Local UDP port to bind to. Responses from the drone are sent back to this port. `0` lets
    /// the OS pick a free port.
    pub local_port: u16,

    /// Size of the receive buffer, datagrams longer than this are truncated.
    pub recv_buffer_len: usize,

    /// Maximum time a receive call blocks for before giving the caller the chance to check
    /// whether the socket has been closed.
    ///
    /// Units: milliseconds
    pub recv_poll_ms: u64,
}

/// A UDP socket connected to the drone's command endpoint.
///
/// The socket can be closed from any thread with [`DroneSocket::close`], after which every send
/// and receive returns [`NetError::Closed`]. This is the only way to stop a thread which is
/// blocked receiving from the socket.
#[derive(Debug)]
pub struct DroneSocket {
    socket: UdpSocket,

    drone_addr: SocketAddr,

    recv_buffer_len: usize,

    closed: AtomicBool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum NetError {
    #[error("Could not resolve the drone address \"{0}\"")]
    InvalidAddress(String),

    #[error("Could not bind the local socket: {0}")]
    BindError(std::io::Error),

    #[error("Could not configure the socket: {0}")]
    SocketOptionError(std::io::Error),

    #[error("Could not send to the drone: {0}")]
    SendError(std::io::Error),

    #[error("Could not receive from the drone: {0}")]
    RecvError(std::io::Error),

    #[error("The socket has been closed")]
    Closed,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DroneSocket {
    /// Bind a new socket according to the given parameters.
    pub fn bind(params: &NetParams) -> Result<Self, NetError> {
        let endpoint = format!("{}:{}", params.drone_ip, params.cmd_port);

        // Resolve the drone's address, the first result is used
        let drone_addr = endpoint
            .to_socket_addrs()
            .map_err(|_| NetError::InvalidAddress(endpoint.clone()))?
            .next()
            .ok_or_else(|| NetError::InvalidAddress(endpoint.clone()))?;

        let socket = UdpSocket::bind(("0.0.0.0", params.local_port))
            .map_err(NetError::BindError)?;

        // A zero duration is rejected by set_read_timeout, use 1 ms as the minimum
        let poll = Duration::from_millis(params.recv_poll_ms.max(1));
        socket
            .set_read_timeout(Some(poll))
            .map_err(NetError::SocketOptionError)?;

        debug!(
            "DroneSocket bound to {:?}, drone at {}",
            socket.local_addr().ok(),
            drone_addr
        );

        Ok(Self {
            socket,
            drone_addr,
            recv_buffer_len: params.recv_buffer_len.max(1),
            closed: AtomicBool::new(false),
        })
    }

    /// Send a single datagram containing the UTF-8 encoding of `text` to the drone.
    pub fn send_str(&self, text: &str) -> Result<(), NetError> {
        if self.is_closed() {
            return Err(NetError::Closed);
        }

        self.socket
            .send_to(text.as_bytes(), self.drone_addr)
            .map(|_| ())
            .map_err(NetError::SendError)
    }

    /// Receive a single datagram from the drone.
    ///
    /// Returns `Ok(None)` if nothing arrived within the poll period, in which case the caller
    /// should simply try again. Datagrams from any host other than the drone are dropped and
    /// also give `Ok(None)`. Once the socket is closed `Err(NetError::Closed)` is returned.
    pub fn recv(&self) -> Result<Option<Vec<u8>>, NetError> {
        if self.is_closed() {
            return Err(NetError::Closed);
        }

        let mut buf = vec![0u8; self.recv_buffer_len];

        match self.socket.recv_from(&mut buf) {
            Ok((len, from)) => {
                // Closed while we were blocked, drop the datagram
                if self.is_closed() {
                    return Err(NetError::Closed);
                }
                if !self.is_from_drone(&from) {
                    debug!("Dropped {} byte datagram from {}", len, from);
                    return Ok(None);
                }
                buf.truncate(len);
                Ok(Some(buf))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                match self.is_closed() {
                    true => Err(NetError::Closed),
                    false => Ok(None),
                }
            }
            Err(e) => Err(NetError::RecvError(e)),
        }
    }

    /// Return if a datagram from `addr` came from the drone. Only the IP is compared, the
    /// drone may answer from any port.
    pub fn is_from_drone(&self, addr: &SocketAddr) -> bool {
        addr.ip() == self.drone_addr.ip()
    }

    /// Close the socket.
    ///
    /// Any thread blocked in [`DroneSocket::recv`] will return [`NetError::Closed`] within one
    /// poll period.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    /// Return if the socket has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Address of the drone's command endpoint.
    pub fn drone_addr(&self) -> SocketAddr {
        self.drone_addr
    }

    /// The local address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        self.socket.local_addr().map_err(NetError::SocketOptionError)
    }
}

impl Default for NetParams {
    fn default() -> Self {
        Self {
            drone_ip: String::from("192.168.10.1"),
            cmd_port: 8889,
            local_port: 9010,
            recv_buffer_len: 1518,
            recv_poll_ms: 200,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

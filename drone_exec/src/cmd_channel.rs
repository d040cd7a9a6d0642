//! # Command channel
//!
//! Outbound-only path to the drone. Every command is a single fire-and-forget datagram, no
//! acknowledgement is awaited and nothing is retried. Responses (if any) arrive through the
//! telemetry receiver.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;

use log::{debug, trace};

use comms_if::{
    cmd::{CmdParseError, DroneCmd, RcCmd},
    net::{DroneSocket, NetError},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Sends commands to the drone.
///
/// The channel is cheap to clone, all clones share the same socket.
#[derive(Debug, Clone)]
pub struct CommandChannel {
    socket: Arc<DroneSocket>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CmdChannelError {
    #[error("Refusing to send an invalid command: {0}")]
    InvalidCmd(CmdParseError),

    #[error(transparent)]
    Net(#[from] NetError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CommandChannel {
    pub fn new(socket: Arc<DroneSocket>) -> Self {
        Self { socket }
    }

    /// Send raw text to the drone as one datagram.
    pub fn send(&self, text: &str) -> Result<(), NetError> {
        debug!("Sending \"{}\"", text);
        self.socket.send_str(text)
    }

    /// Send a command, after checking its arguments are in range.
    pub fn send_cmd(&self, cmd: &DroneCmd) -> Result<(), CmdChannelError> {
        cmd.validate().map_err(CmdChannelError::InvalidCmd)?;

        let text = cmd.to_string();

        // RC commands go out every frame, keep them out of the debug log
        match cmd {
            DroneCmd::Rc(_) => trace!("Sending \"{}\"", text),
            _ => debug!("Sending \"{}\"", text),
        }

        self.socket.send_str(&text)?;

        Ok(())
    }

    /// Send a continuous RC demand.
    pub fn send_rc(&self, rc: RcCmd) -> Result<(), CmdChannelError> {
        self.send_cmd(&DroneCmd::Rc(rc))
    }

    /// The socket shared by this channel.
    pub fn socket(&self) -> &Arc<DroneSocket> {
        &self.socket
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::FakeDrone;

    #[test]
    fn test_send_cmd() {
        let drone = FakeDrone::new();
        let channel = CommandChannel::new(drone.socket());

        channel.send_cmd(&DroneCmd::Takeoff).unwrap();
        assert_eq!(drone.recv_text().as_deref(), Some("takeoff"));

        channel.send_rc(RcCmd::new(-50, 0, 25, 100)).unwrap();
        assert_eq!(drone.recv_text().as_deref(), Some("rc -50 0 25 100"));

        channel.send("streamon").unwrap();
        assert_eq!(drone.recv_text().as_deref(), Some("streamon"));
    }

    #[test]
    fn test_invalid_cmd_not_sent() {
        let drone = FakeDrone::new();
        let channel = CommandChannel::new(drone.socket());

        assert!(matches!(
            channel.send_cmd(&DroneCmd::Speed(0)),
            Err(CmdChannelError::InvalidCmd(CmdParseError::SpeedOutOfRange(0)))
        ));
        assert!(matches!(
            channel.send_cmd(&DroneCmd::Speed(100)),
            Err(CmdChannelError::InvalidCmd(_))
        ));
        assert_eq!(drone.recv_text(), None);
    }

    #[test]
    fn test_send_after_close() {
        let drone = FakeDrone::new();
        let channel = CommandChannel::new(drone.socket());

        channel.socket().close();
        assert!(matches!(
            channel.send_cmd(&DroneCmd::Land),
            Err(CmdChannelError::Net(NetError::Closed))
        ));
    }
}

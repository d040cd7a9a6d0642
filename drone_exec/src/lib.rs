//! # Drone library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items
//! defined inside the drone crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command channel - sends commands to the drone
pub mod cmd_channel;

/// Connection monitor - requests telemetry and tracks the health of the link
pub mod conn_monitor;

/// Data store - global data for the executable's main loop
pub mod data_store;

/// Frame sources - provide camera frames to the line detector
pub mod frame_source;

/// Line detection module - finds the line to follow in a camera frame
pub mod line_det;

/// Motion control module - steers the drone onto the line
pub mod motion_ctrl;

/// Operator commands - manual commands from the keyboard or a script
pub mod op_cmd;

/// Pilot - the interface used to fly the drone
pub mod pilot;

/// Telemetry receiver - receives and classifies responses from the drone
pub mod tm_receiver;

/// Telemetry store - latest telemetry and connection state
pub mod tm_store;

#[cfg(test)]
mod test_utils;

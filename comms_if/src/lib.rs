//! # Communications interface crate.
//!
//! Provides the wire protocol used to talk to the drone: the outbound command grammar, the
//! classification of inbound telemetry, and the UDP socket shared by everything which sends to
//! the drone.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Outbound command definitions
pub mod cmd;

/// Inbound telemetry definitions
pub mod tm;

/// Network module
pub mod net;

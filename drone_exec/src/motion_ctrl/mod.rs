//! # Motion control module
//!
//! Turns line observations into RC demands. The lateral offset of the line from the image
//! centre is normalised into `[-1, 1]` and passed through a PID controller whose output is the
//! yaw demand, while the drone keeps flying forward at the base speed.
//!
//! When the line is lost the controller keeps steering towards where it was last seen for a few
//! frames, then stops the drone.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controllers;
mod params;
mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use controllers::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during MotionCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum MotionCtrlError {
    #[error("Could not load the parameters: {0}")]
    ParamLoadError(#[from] util::params::LoadError),

    #[error("Invalid parameter {0} = {1}, expected {2}")]
    InvalidParam(&'static str, f64, &'static str),

    #[error("The observation's frame width is zero")]
    ZeroFrameWidth,
}

//! # Drone Executable Parameters
//!
//! This module provide parameters for the drone executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use std::path::PathBuf;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DroneExecParams {

    /// Target period of one cycle of the main loop
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Period at which the status line is logged
    ///
    /// Units: seconds
    pub status_period_s: f64,

    /// Directory of frames to play back to the line detector. If not set there is no frame
    /// source and line following is unavailable.
    pub frame_dir: Option<PathBuf>,

    /// Replay the frames forever
    pub frame_loop: bool,

    /// Change in the forward speed for each `faster` or `slower` command
    pub speed_step: i32,
}

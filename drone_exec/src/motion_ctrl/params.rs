//! Parameters structure for MotionCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for motion control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- GAINS ----

    /// Proportional gain, in yaw demand per unit of normalised error.
    pub k_p: f64,

    /// Integral gain.
    pub k_i: f64,

    /// Derivative gain.
    pub k_d: f64,

    /// Limit of the integral accumulator, which is kept in `[-integral_limit, integral_limit]`.
    pub integral_limit: f64,

    /// Errors smaller than this (in normalised units) are treated as zero.
    pub error_deadband: f64,

    // ---- DEMANDS ----

    /// Maximum magnitude of the yaw demand, in `[0, 100]`.
    pub max_turn_speed: f64,

    /// Forward speed demand while following, in `[0, 100]`.
    pub base_speed: i32,

    /// Factor applied to the forward speed when a sharp turn is ahead, in `[0, 1]`.
    pub corner_slowdown: f64,

    // ---- LINE LOSS ----

    /// Number of consecutive frames without a line after which the drone is stopped.
    pub lost_frame_ceiling: u32,

    // ---- TIMING ----

    /// Ticks arriving sooner than this after the last processed tick are skipped.
    ///
    /// Units: seconds
    pub min_tick_period_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    /// Proportional-only steering, giving full turn rate once the line is 70 px off centre in a
    /// 480 px wide frame.
    fn default() -> Self {
        Self {
            k_p: 240.0,
            k_i: 0.0,
            k_d: 0.0,
            integral_limit: 100.0,
            error_deadband: 50.0 / 240.0,
            max_turn_speed: 70.0,
            base_speed: 20,
            corner_slowdown: 0.5,
            lost_frame_ceiling: 10,
            min_tick_period_s: 1.0 / 30.0,
        }
    }
}

//! # Motion controllers module
//!
//! This module provides the PID controller used to steer onto the line.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use util::maths::clamp_abs;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller.
///
/// The controller is stepped once per processed frame so the integral and derivative are taken
/// per step rather than per second.
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Limit on the magnitude of the integral
    integral_limit: f64,

    /// Previous error
    last_error: f64,

    /// The integral accumulation
    integral: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64, integral_limit: f64) -> Self {
        Self {
            k_p, k_i, k_d,
            integral_limit: integral_limit.abs(),
            last_error: 0f64,
            integral: 0f64
        }
    }

    /// Get the value of the controller for the given error.
    pub fn get(&mut self, error: f64) -> f64 {
        // Accumulate the integral term, clamping it to prevent windup
        self.integral = clamp_abs(self.integral + error, self.integral_limit);

        let deriv = error - self.last_error;
        self.last_error = error;

        self.k_p * error
            + self.k_i * self.integral
            + self.k_d * deriv
    }

    /// Clear the integral and previous error.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.last_error = 0f64;
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn last_error(&self) -> f64 {
        self.last_error
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pid_terms() {
        let mut pid = PidController::new(2.0, 0.5, 1.0, 100.0);

        // integral = 0.5, deriv = 0.5
        assert_eq!(pid.get(0.5), 2.0 * 0.5 + 0.5 * 0.5 + 1.0 * 0.5);

        // integral = 0.75, deriv = -0.25
        assert_eq!(pid.get(0.25), 2.0 * 0.25 + 0.5 * 0.75 + 1.0 * -0.25);
        assert_eq!(pid.last_error(), 0.25);

        pid.reset();
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.last_error(), 0.0);
    }

    #[test]
    fn test_anti_windup() {
        let mut pid = PidController::new(0.0, 1.0, 0.0, 100.0);

        for _ in 0..500 {
            pid.get(1.0);
            assert!(pid.integral() <= 100.0);
        }
        assert_eq!(pid.integral(), 100.0);
        assert_eq!(pid.get(1.0), 100.0);

        for _ in 0..500 {
            pid.get(-1.0);
            assert!(pid.integral() >= -100.0);
        }
        assert_eq!(pid.integral(), -100.0);
    }
}

//! Implementations for the MotionCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::time::{Duration, Instant};
use log::{debug, trace, warn};
use nalgebra::Point2;
use serde::Serialize;

// Internal
use super::{MotionCtrlError, Params, PidController};
use crate::line_det::LineObservation;
use comms_if::cmd::RcCmd;
use util::{
    maths::{clamp, clamp_abs, lin_map},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Motion control module state
#[derive(Debug, Clone)]
pub struct MotionCtrl {
    params: Params,

    pid: PidController,

    lost: LostLineState,

    /// Current forward speed demand, initially the base speed parameter
    base_speed: i32,

    /// Time of the last processed tick
    last_tick: Option<Instant>,
}

/// Memory of where the line was last seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LostLineState {
    /// Number of consecutive processed ticks without a line
    pub consec_lost_frames: u32,

    /// Centre of the line on the last tick it was seen
    pub last_valid_center: Option<Point2<f64>>,
}

/// Input data to MotionCtrl.
#[derive(Debug, Clone)]
pub struct InputData {
    /// Line observation for this frame
    pub obs: LineObservation,

    /// Time the frame was processed
    pub time: Instant,
}

/// Status report for MotionCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// The tick came too soon after the previous one and was ignored
    pub skipped: bool,

    /// The line was seen on this tick
    pub found: bool,

    /// Steering towards the last known line position
    pub dead_reckoning: bool,

    /// The line has been lost for too long and the drone was stopped
    pub stopped: bool,

    /// A sharp turn is ahead and the speed was reduced
    pub corner: bool,

    pub consec_lost_frames: u32,

    /// Normalised lateral error, positive when the line is right of centre
    pub error: f64,

    pub integral: f64,

    pub pid_output: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for MotionCtrl {
    fn default() -> Self {
        Self::from_valid_params(Params::default())
    }
}

impl MotionCtrl {
    /// Create a new controller, checking the parameters.
    pub fn new(params: Params) -> Result<Self, MotionCtrlError> {
        validate(&params)?;
        Ok(Self::from_valid_params(params))
    }

    fn from_valid_params(params: Params) -> Self {
        Self {
            pid: PidController::new(params.k_p, params.k_i, params.k_d, params.integral_limit),
            lost: LostLineState::default(),
            base_speed: params.base_speed,
            last_tick: None,
            params,
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn lost_line_state(&self) -> &LostLineState {
        &self.lost
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    pub fn base_speed(&self) -> i32 {
        self.base_speed
    }

    /// Set the forward speed demand, clamped to `[0, 100]`. Returns the new speed.
    pub fn set_base_speed(&mut self, speed: i32) -> i32 {
        self.base_speed = clamp(&speed, &0, &RC_MAX);
        debug!("MotionCtrl base speed set to {}", self.base_speed);
        self.base_speed
    }

    /// True if a tick at `now` would be processed rather than skipped.
    pub fn tick_due(&self, now: Instant) -> bool {
        match self.last_tick {
            Some(t) => now.saturating_duration_since(t) >= self.min_tick_period(),
            None => true,
        }
    }

    /// Clear all controller memory and return the demand which stops the drone.
    pub fn make_safe(&mut self) -> RcCmd {
        self.pid.reset();
        self.lost = LostLineState::default();
        self.last_tick = None;
        RcCmd::zero()
    }

    fn min_tick_period(&self) -> Duration {
        Duration::from_secs_f64(self.params.min_tick_period_s.max(0.0))
    }
}

impl State for MotionCtrl {
    type InitData = &'static str;
    type InitError = MotionCtrlError;

    type InputData = InputData;
    type OutputData = Option<RcCmd>;
    type StatusReport = StatusReport;
    type ProcError = MotionCtrlError;

    /// Initialise the MotionCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params = params::load(init_data)?;
        validate(&params)?;

        *self = Self::from_valid_params(params);

        Ok(())
    }

    /// Process one frame's observation.
    ///
    /// Outputs the RC demand to send, or `None` if nothing should be sent this tick (the tick
    /// was skipped, or the line was never seen).
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let mut report = StatusReport::default();
        let obs = &input_data.obs;

        // Frame budget
        if !self.tick_due(input_data.time) {
            report.skipped = true;
            report.consec_lost_frames = self.lost.consec_lost_frames;
            return Ok((None, report));
        }
        self.last_tick = Some(input_data.time);

        // Pick the line position to steer on
        let center = match (obs.found, obs.center) {
            (true, Some(c)) => {
                report.found = true;
                self.lost.consec_lost_frames = 0;
                self.lost.last_valid_center = Some(c);
                c
            }
            _ => {
                self.lost.consec_lost_frames = self.lost.consec_lost_frames.saturating_add(1);
                report.consec_lost_frames = self.lost.consec_lost_frames;

                if self.lost.consec_lost_frames > self.params.lost_frame_ceiling {
                    if self.lost.consec_lost_frames == self.params.lost_frame_ceiling + 1 {
                        warn!(
                            "Line lost for {} frames, stopping",
                            self.lost.consec_lost_frames
                        );
                    }
                    self.pid.reset();
                    report.stopped = true;
                    return Ok((Some(RcCmd::zero()), report));
                }

                match self.lost.last_valid_center {
                    Some(c) => {
                        report.dead_reckoning = true;
                        c
                    }
                    None => return Ok((None, report)),
                }
            }
        };

        if obs.frame_width == 0 {
            return Err(MotionCtrlError::ZeroFrameWidth);
        }

        // Normalised lateral error, positive when the line is right of centre
        let w = obs.frame_width as f64;
        let mut error = clamp(&lin_map((0.0, w), (-1.0, 1.0), center.x), &-1.0, &1.0);
        if error.abs() < self.params.error_deadband {
            error = 0.0;
        }

        let out = self.pid.get(error);

        // Slow down for sharp turns
        let speed = if report.found && obs.corner {
            report.corner = true;
            (self.base_speed as f64 * self.params.corner_slowdown).round() as i32
        } else {
            self.base_speed
        };

        let yaw = clamp_abs(out, self.params.max_turn_speed).round() as i32;

        report.error = error;
        report.integral = self.pid.integral();
        report.pid_output = out;

        trace!("MotionCtrl report: {:?}", report);

        Ok((Some(RcCmd::new(0, speed, 0, yaw)), report))
    }
}

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Maximum magnitude of an RC channel
const RC_MAX: i32 = comms_if::cmd::RC_LIMIT;

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Check that the parameters are usable.
fn validate(p: &Params) -> Result<(), MotionCtrlError> {
    let rc_max = RC_MAX as f64;

    let checks: [(&'static str, f64, bool, &'static str); 8] = [
        ("k_p", p.k_p, p.k_p.is_finite(), "a finite number"),
        ("k_i", p.k_i, p.k_i.is_finite(), "a finite number"),
        ("k_d", p.k_d, p.k_d.is_finite(), "a finite number"),
        (
            "integral_limit",
            p.integral_limit,
            p.integral_limit >= 0.0 && p.integral_limit.is_finite(),
            "a finite number >= 0",
        ),
        (
            "error_deadband",
            p.error_deadband,
            p.error_deadband >= 0.0 && p.error_deadband <= 1.0,
            "a number in [0, 1]",
        ),
        (
            "max_turn_speed",
            p.max_turn_speed,
            p.max_turn_speed >= 0.0 && p.max_turn_speed <= rc_max,
            "a number in [0, 100]",
        ),
        (
            "base_speed",
            p.base_speed as f64,
            p.base_speed >= 0 && p.base_speed <= RC_MAX,
            "an integer in [0, 100]",
        ),
        (
            "corner_slowdown",
            p.corner_slowdown,
            p.corner_slowdown >= 0.0 && p.corner_slowdown <= 1.0,
            "a number in [0, 1]",
        ),
    ];

    for &(name, value, ok, expected) in checks.iter() {
        if !ok {
            return Err(MotionCtrlError::InvalidParam(name, value, expected));
        }
    }

    if !(p.min_tick_period_s >= 0.0 && p.min_tick_period_s.is_finite()) {
        return Err(MotionCtrlError::InvalidParam(
            "min_tick_period_s",
            p.min_tick_period_s,
            "a finite number >= 0",
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const W: u32 = 480;

    fn test_params() -> Params {
        Params {
            k_p: 100.0,
            k_i: 1.0,
            k_d: 10.0,
            error_deadband: 0.0,
            ..Default::default()
        }
    }

    /// Feeds observations 50 ms apart, well over the frame budget.
    struct Ticker {
        ctrl: MotionCtrl,
        time: Instant,
    }

    impl Ticker {
        fn new(params: Params) -> Self {
            Self {
                ctrl: MotionCtrl::new(params).unwrap(),
                time: Instant::now(),
            }
        }

        fn tick(&mut self, obs: LineObservation) -> (Option<RcCmd>, StatusReport) {
            self.time += Duration::from_millis(50);
            self.ctrl
                .proc(&InputData {
                    obs,
                    time: self.time,
                })
                .unwrap()
        }
    }

    fn seen_at(x: f64) -> LineObservation {
        LineObservation::at(Point2::new(x, 300.0), W)
    }

    #[test]
    fn test_centred_line() {
        let mut t = Ticker::new(test_params());
        let (rc, report) = t.tick(seen_at(240.0));

        assert!(report.found);
        assert_eq!(report.error, 0.0);
        assert_eq!(rc, Some(RcCmd::new(0, 20, 0, 0)));
    }

    #[test]
    fn test_yaw_sign() {
        let mut t = Ticker::new(test_params());

        // Line to the right, turn clockwise
        let (rc, _) = t.tick(seen_at(360.0));
        assert!(rc.unwrap().yaw() > 0);

        let mut t = Ticker::new(test_params());

        // Line to the left, turn counter-clockwise
        let (rc, report) = t.tick(seen_at(120.0));
        assert!(rc.unwrap().yaw() < 0);
        assert_eq!(report.error, -0.5);
    }

    #[test]
    fn test_deadband() {
        let mut t = Ticker::new(Params::default());

        // 40 px off centre is inside the 50 px dead zone
        let (rc, report) = t.tick(seen_at(280.0));
        assert_eq!(report.error, 0.0);
        assert_eq!(rc.unwrap().yaw(), 0);

        // 60 px is not, P gain of 240 gives 60
        let (rc, _) = t.tick(seen_at(300.0));
        assert_eq!(rc.unwrap().yaw(), 60);

        // Saturates at the max turn speed
        let (rc, _) = t.tick(seen_at(479.0));
        assert_eq!(rc.unwrap().yaw(), 70);
    }

    #[test]
    fn test_output_always_in_range() {
        let mut params = test_params();
        params.k_p = 1e6;
        params.k_i = 1e4;
        params.k_d = 1e5;
        params.max_turn_speed = 100.0;
        params.base_speed = 100;
        let mut t = Ticker::new(params);

        let xs = [0.0, 480.0, -100.0, 1000.0, 240.0, 13.0, 470.0];
        for i in 0..200 {
            let obs = match i % 9 {
                8 => LineObservation::not_found(W),
                n => seen_at(xs[n % xs.len()]),
            };
            let (rc, report) = t.tick(obs);

            assert!(report.integral.abs() <= 100.0);

            if let Some(rc) = rc {
                for v in [rc.lateral(), rc.longitudinal(), rc.vertical(), rc.yaw()].iter() {
                    assert!(*v >= -100 && *v <= 100);
                }
            }
        }
    }

    #[test]
    fn test_lost_line_stop() {
        let mut t = Ticker::new(test_params());

        t.tick(seen_at(300.0));

        // Dead reckoning on the last known centre up to the ceiling
        for i in 1..=10 {
            let (rc, report) = t.tick(LineObservation::not_found(W));
            assert!(report.dead_reckoning, "tick {}", i);
            assert_eq!(report.consec_lost_frames, i);
            let rc = rc.unwrap();
            assert_eq!(rc.longitudinal(), 20);
            assert!(rc.yaw() > 0);
        }

        // 11th lost tick stops the drone
        let (rc, report) = t.tick(LineObservation::not_found(W));
        assert!(report.stopped);
        assert_eq!(rc, Some(RcCmd::zero()));
        assert_eq!(t.ctrl.pid().integral(), 0.0);

        // And it stays stopped
        let (rc, _) = t.tick(LineObservation::not_found(W));
        assert_eq!(rc, Some(RcCmd::zero()));

        // Finding the line again resumes following
        let (rc, report) = t.tick(seen_at(240.0));
        assert!(report.found);
        assert_eq!(report.consec_lost_frames, 0);
        assert_eq!(rc, Some(RcCmd::new(0, 20, 0, 0)));
    }

    #[test]
    fn test_never_seen() {
        let mut t = Ticker::new(test_params());

        let (rc, report) = t.tick(LineObservation::not_found(W));
        assert_eq!(rc, None);
        assert!(!report.dead_reckoning);
        assert_eq!(report.consec_lost_frames, 1);
    }

    #[test]
    fn test_frame_budget() {
        let mut ctrl = MotionCtrl::new(test_params()).unwrap();
        let t0 = Instant::now();

        let input = |time| InputData {
            obs: seen_at(300.0),
            time,
        };

        let (rc, report) = ctrl.proc(&input(t0)).unwrap();
        assert!(rc.is_some() && !report.skipped);
        let integral = ctrl.pid().integral();

        // 10 ms later is inside the 33 ms budget
        assert!(!ctrl.tick_due(t0 + Duration::from_millis(10)));
        let (rc, report) = ctrl.proc(&input(t0 + Duration::from_millis(10))).unwrap();
        assert_eq!(rc, None);
        assert!(report.skipped);
        assert_eq!(ctrl.pid().integral(), integral);

        assert!(ctrl.tick_due(t0 + Duration::from_millis(40)));
        let (rc, _) = ctrl.proc(&input(t0 + Duration::from_millis(40))).unwrap();
        assert!(rc.is_some());
    }

    #[test]
    fn test_corner_slowdown() {
        let mut t = Ticker::new(test_params());

        let mut obs = seen_at(240.0);
        obs.corner = true;

        let (rc, report) = t.tick(obs);
        assert!(report.corner);
        assert_eq!(rc.unwrap().longitudinal(), 10);
    }

    #[test]
    fn test_speed_and_make_safe() {
        let mut t = Ticker::new(test_params());

        assert_eq!(t.ctrl.set_base_speed(150), 100);
        assert_eq!(t.ctrl.set_base_speed(-5), 0);
        t.ctrl.set_base_speed(30);

        let (rc, _) = t.tick(seen_at(400.0));
        assert_eq!(rc.unwrap().longitudinal(), 30);

        assert_eq!(t.ctrl.make_safe(), RcCmd::zero());
        assert_eq!(t.ctrl.pid().integral(), 0.0);
        assert_eq!(t.ctrl.lost_line_state(), &LostLineState::default());
        assert_eq!(t.ctrl.base_speed(), 30);
    }

    #[test]
    fn test_params_validation() {
        let mut p = Params::default();
        p.max_turn_speed = 150.0;
        assert!(matches!(
            MotionCtrl::new(p),
            Err(MotionCtrlError::InvalidParam("max_turn_speed", ..))
        ));

        let mut p = Params::default();
        p.corner_slowdown = 1.5;
        assert!(MotionCtrl::new(p).is_err());

        let mut p = Params::default();
        p.k_p = f64::NAN;
        assert!(MotionCtrl::new(p).is_err());

        let mut p = Params::default();
        p.min_tick_period_s = -1.0;
        assert!(MotionCtrl::new(p).is_err());

        assert!(MotionCtrl::new(Params::default()).is_ok());
    }

    #[test]
    fn test_zero_frame_width() {
        let mut ctrl = MotionCtrl::new(test_params()).unwrap();
        let input = InputData {
            obs: LineObservation::at(Point2::new(10.0, 10.0), 0),
            time: Instant::now(),
        };
        assert!(matches!(ctrl.proc(&input), Err(MotionCtrlError::ZeroFrameWidth)));
    }
}

//! # Drone command definitions
//!
//! Commands are sent to the drone as plain UTF-8 text, one command per datagram. This module
//! defines the full set of commands understood by the drone along with their text grammar.
//! `DroneCmd` implements `Display` to produce the wire text and `FromStr` to parse it back,
//! so scripts, operators and tests can all speak the same grammar.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum absolute value of any RC channel.
pub const RC_LIMIT: i32 = 100;

/// Lowest speed accepted by the `speed` command (exclusive bound is 0).
pub const MIN_SPEED_CM_S: u8 = 1;

/// Highest speed accepted by the `speed` command (exclusive bound is 100).
pub const MAX_SPEED_CM_S: u8 = 99;

/// Shortest distance accepted by a discrete move command.
pub const MIN_MOVE_CM: u16 = 20;

/// Longest distance accepted by a discrete move command.
pub const MAX_MOVE_CM: u16 = 500;

/// Smallest rotation accepted by `cw`/`ccw`.
pub const MIN_ROTATE_DEG: u16 = 1;

/// Largest rotation accepted by `cw`/`ccw`.
pub const MAX_ROTATE_DEG: u16 = 360;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A continuous four axis actuation demand.
///
/// Every channel is clamped into `[-100, 100]` on construction, the fields are private so this
/// cannot be bypassed.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct RcCmd {
    lateral: i32,
    longitudinal: i32,
    vertical: i32,
    yaw: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Direction of a flip manouvre.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FlipDir {
    Left,
    Right,
    Forward,
    Back,
}

/// Direction of a discrete move-by-distance command.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MoveDir {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
}

/// Every command which can be sent to the drone.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DroneCmd {
    /// Enter SDK (command) mode. The drone answers `ok` when it accepts.
    Command,
    Takeoff,
    Land,
    /// Hover in place.
    Stop,
    /// Cut the motors immediately.
    Emergency,
    StreamOn,
    StreamOff,
    /// Query the battery percentage.
    Battery,
    /// Query the flight time.
    Time,
    /// Set the discrete move speed, in cm/s, in `(0, 100)`.
    Speed(u8),
    /// Continuous RC demand.
    Rc(RcCmd),
    Flip(FlipDir),
    /// Move by the given distance in cm.
    Move(MoveDir, u16),
    /// Rotate clockwise by the given angle in degrees.
    Cw(u16),
    /// Rotate counter-clockwise by the given angle in degrees.
    Ccw(u16),
}

/// Errors produced while building or parsing a command.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CmdParseError {
    #[error("The command is empty")]
    Empty,

    #[error("Unknown command \"{0}\"")]
    UnknownCommand(String),

    #[error("Command \"{0}\" expects {1} argument(s), found {2}")]
    WrongArgCount(String, usize, usize),

    #[error("Invalid argument \"{1}\" for command \"{0}\"")]
    InvalidArg(String, String),

    #[error("Speed must be between {} and {}, found {0}", MIN_SPEED_CM_S, MAX_SPEED_CM_S)]
    SpeedOutOfRange(i64),

    #[error("Move distance must be between {} and {} cm, found {0}", MIN_MOVE_CM, MAX_MOVE_CM)]
    DistanceOutOfRange(i64),

    #[error(
        "Rotation must be between {} and {} degrees, found {0}",
        MIN_ROTATE_DEG,
        MAX_ROTATE_DEG
    )]
    AngleOutOfRange(i64),

    #[error("RC channel must be between -{} and {}, found {0}", RC_LIMIT, RC_LIMIT)]
    RcOutOfRange(i64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RcCmd {
    /// Build a new RC demand, clamping each channel into `[-100, 100]`.
    pub fn new(lateral: i32, longitudinal: i32, vertical: i32, yaw: i32) -> Self {
        Self {
            lateral: clamp_rc(lateral),
            longitudinal: clamp_rc(longitudinal),
            vertical: clamp_rc(vertical),
            yaw: clamp_rc(yaw),
        }
    }

    /// The all-zero demand, which brings the drone to a hover.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Left (-ve) / right (+ve) channel.
    pub fn lateral(&self) -> i32 {
        self.lateral
    }

    /// Back (-ve) / forward (+ve) channel.
    pub fn longitudinal(&self) -> i32 {
        self.longitudinal
    }

    /// Down (-ve) / up (+ve) channel.
    pub fn vertical(&self) -> i32 {
        self.vertical
    }

    /// Counter-clockwise (-ve) / clockwise (+ve) channel.
    pub fn yaw(&self) -> i32 {
        self.yaw
    }
}

impl DroneCmd {
    /// Build a speed command, checking that the speed is in `(0, 100)`.
    pub fn speed(speed_cm_s: i64) -> Result<Self, CmdParseError> {
        if speed_cm_s < MIN_SPEED_CM_S as i64 || speed_cm_s > MAX_SPEED_CM_S as i64 {
            return Err(CmdParseError::SpeedOutOfRange(speed_cm_s));
        }

        Ok(DroneCmd::Speed(speed_cm_s as u8))
    }

    /// Build a move command, checking the distance is in the range accepted by the drone.
    pub fn move_by(dir: MoveDir, dist_cm: i64) -> Result<Self, CmdParseError> {
        if dist_cm < MIN_MOVE_CM as i64 || dist_cm > MAX_MOVE_CM as i64 {
            return Err(CmdParseError::DistanceOutOfRange(dist_cm));
        }

        Ok(DroneCmd::Move(dir, dist_cm as u16))
    }

    /// Check that all arguments of the command are within the ranges accepted by the drone.
    ///
    /// Commands built through the checked constructors or `FromStr` are always valid, but the
    /// enum variants themselves can be built directly.
    pub fn validate(&self) -> Result<(), CmdParseError> {
        match *self {
            DroneCmd::Speed(s) => DroneCmd::speed(s as i64).map(|_| ()),
            DroneCmd::Move(d, cm) => DroneCmd::move_by(d, cm as i64).map(|_| ()),
            DroneCmd::Cw(deg) | DroneCmd::Ccw(deg) => check_angle(deg as i64).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// True for commands which query telemetry rather than actuate the drone.
    pub fn is_query(&self) -> bool {
        matches!(self, DroneCmd::Battery | DroneCmd::Time)
    }
}

impl FlipDir {
    fn as_str(&self) -> &'static str {
        match self {
            FlipDir::Left => "l",
            FlipDir::Right => "r",
            FlipDir::Forward => "f",
            FlipDir::Back => "b",
        }
    }
}

impl MoveDir {
    fn as_str(&self) -> &'static str {
        match self {
            MoveDir::Forward => "forward",
            MoveDir::Back => "back",
            MoveDir::Left => "left",
            MoveDir::Right => "right",
            MoveDir::Up => "up",
            MoveDir::Down => "down",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "forward" => Some(MoveDir::Forward),
            "back" => Some(MoveDir::Back),
            "left" => Some(MoveDir::Left),
            "right" => Some(MoveDir::Right),
            "up" => Some(MoveDir::Up),
            "down" => Some(MoveDir::Down),
            _ => None,
        }
    }
}

impl fmt::Display for RcCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rc {} {} {} {}",
            self.lateral, self.longitudinal, self.vertical, self.yaw
        )
    }
}

impl fmt::Display for DroneCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DroneCmd::Command => write!(f, "command"),
            DroneCmd::Takeoff => write!(f, "takeoff"),
            DroneCmd::Land => write!(f, "land"),
            DroneCmd::Stop => write!(f, "stop"),
            DroneCmd::Emergency => write!(f, "emergency"),
            DroneCmd::StreamOn => write!(f, "streamon"),
            DroneCmd::StreamOff => write!(f, "streamoff"),
            DroneCmd::Battery => write!(f, "battery?"),
            DroneCmd::Time => write!(f, "time?"),
            DroneCmd::Speed(s) => write!(f, "speed {}", s),
            DroneCmd::Rc(rc) => write!(f, "{}", rc),
            DroneCmd::Flip(d) => write!(f, "flip {}", d.as_str()),
            DroneCmd::Move(d, cm) => write!(f, "{} {}", d.as_str(), cm),
            DroneCmd::Cw(deg) => write!(f, "cw {}", deg),
            DroneCmd::Ccw(deg) => write!(f, "ccw {}", deg),
        }
    }
}

impl FromStr for DroneCmd {
    type Err = CmdParseError;

    /// Parse a command from its wire text.
    ///
    /// Leading/trailing whitespace is ignored and arguments may be separated by any amount of
    /// whitespace. Numeric arguments are range checked.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();

        let name = match words.next() {
            Some(n) => n,
            None => return Err(CmdParseError::Empty),
        };
        let args: Vec<&str> = words.collect();

        // Commands without arguments
        let no_arg_cmd = match name {
            "command" => Some(DroneCmd::Command),
            "takeoff" => Some(DroneCmd::Takeoff),
            "land" => Some(DroneCmd::Land),
            "stop" => Some(DroneCmd::Stop),
            "emergency" => Some(DroneCmd::Emergency),
            "streamon" => Some(DroneCmd::StreamOn),
            "streamoff" => Some(DroneCmd::StreamOff),
            "battery?" => Some(DroneCmd::Battery),
            "time?" => Some(DroneCmd::Time),
            _ => None,
        };
        if let Some(cmd) = no_arg_cmd {
            expect_args(name, &args, 0)?;
            return Ok(cmd);
        }

        match name {
            "speed" => {
                expect_args(name, &args, 1)?;
                DroneCmd::speed(parse_int(name, args[0])?)
            }
            "rc" => {
                expect_args(name, &args, 4)?;
                let mut chans = [0i32; 4];
                for (chan, arg) in chans.iter_mut().zip(args.iter()) {
                    let val = parse_int(name, arg)?;
                    if val.abs() > RC_LIMIT as i64 {
                        return Err(CmdParseError::RcOutOfRange(val));
                    }
                    *chan = val as i32;
                }
                Ok(DroneCmd::Rc(RcCmd::new(chans[0], chans[1], chans[2], chans[3])))
            }
            "flip" => {
                expect_args(name, &args, 1)?;
                let dir = match args[0] {
                    "l" => FlipDir::Left,
                    "r" => FlipDir::Right,
                    "f" => FlipDir::Forward,
                    "b" => FlipDir::Back,
                    a => return Err(CmdParseError::InvalidArg(name.into(), a.into())),
                };
                Ok(DroneCmd::Flip(dir))
            }
            "cw" | "ccw" => {
                expect_args(name, &args, 1)?;
                let deg = check_angle(parse_int(name, args[0])?)?;
                match name {
                    "cw" => Ok(DroneCmd::Cw(deg)),
                    _ => Ok(DroneCmd::Ccw(deg)),
                }
            }
            _ => match MoveDir::from_str(name) {
                Some(dir) => {
                    expect_args(name, &args, 1)?;
                    DroneCmd::move_by(dir, parse_int(name, args[0])?)
                }
                None => Err(CmdParseError::UnknownCommand(name.into())),
            },
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn clamp_rc(value: i32) -> i32 {
    value.clamp(-RC_LIMIT, RC_LIMIT)
}

fn expect_args(name: &str, args: &[&str], num: usize) -> Result<(), CmdParseError> {
    if args.len() != num {
        return Err(CmdParseError::WrongArgCount(name.into(), num, args.len()));
    }
    Ok(())
}

fn parse_int(name: &str, arg: &str) -> Result<i64, CmdParseError> {
    arg.parse::<i64>()
        .map_err(|_| CmdParseError::InvalidArg(name.into(), arg.into()))
}

fn check_angle(deg: i64) -> Result<u16, CmdParseError> {
    if deg < MIN_ROTATE_DEG as i64 || deg > MAX_ROTATE_DEG as i64 {
        return Err(CmdParseError::AngleOutOfRange(deg));
    }
    Ok(deg as u16)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

//! # Operator commands
//!
//! Commands typed by the operator at the prompt, or listed in a timed script. They use the same
//! shell-like syntax in both cases, for example `rc 0 20 0 -15` or `send flip l`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::str::FromStr;

use structopt::{clap::AppSettings, StructOpt};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command from the operator.
#[derive(Debug, Clone, PartialEq, StructOpt)]
#[structopt(name = "op")]
pub enum OpCmd {
    /// Take off and hover.
    #[structopt(name = "takeoff")]
    Takeoff,

    /// Stop following and land.
    #[structopt(name = "land")]
    Land,

    /// Hover in place and stop following the line until `follow` is given.
    #[structopt(name = "stop")]
    Stop,

    /// Start following the line.
    #[structopt(name = "follow")]
    Follow,

    /// Stop following the line and hover.
    #[structopt(name = "hold")]
    Hold,

    /// Increase the forward speed used while following.
    #[structopt(name = "faster")]
    Faster,

    /// Decrease the forward speed used while following.
    #[structopt(name = "slower")]
    Slower,

    /// Set the forward speed used while following, in [0, 100].
    #[structopt(name = "speed")]
    Speed {
        speed: i32
    },

    /// Send a manual RC demand, this stops line following.
    ///
    /// Each channel is in [-100, 100].
    #[structopt(name = "rc", setting = AppSettings::AllowNegativeNumbers)]
    Rc {
        /// Left (-) / right (+)
        lr: i32,

        /// Back (-) / forward (+)
        fb: i32,

        /// Down (-) / up (+)
        ud: i32,

        /// Counter-clockwise (-) / clockwise (+)
        yaw: i32,
    },

    /// Send any drone command, for example `send flip l` or `send cw 90`.
    #[structopt(
        name = "send",
        settings = &[AppSettings::TrailingVarArg, AppSettings::AllowLeadingHyphen]
    )]
    Send {
        #[structopt(required = true)]
        cmd: Vec<String>,
    },

    /// Log the latest telemetry.
    #[structopt(name = "status")]
    Status,

    /// Land and exit.
    #[structopt(name = "quit")]
    Quit,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FromStr for OpCmd {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let args = std::iter::once("op").chain(s.split_whitespace());

        OpCmd::from_iter_safe(args).map_err(|e| e.to_string())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

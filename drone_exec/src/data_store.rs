//! # Data Store

use comms_if::cmd::RcCmd;
use log::{info, warn};

use crate::motion_ctrl;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason the drone has been put into safe mode
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SafeModeCause {
    /// The operator asked the drone to stop
    OperatorStop,

    /// The link to the drone has been lost
    NotConnected,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if the status line should be logged on this cycle
    pub is_status_cycle: bool,

    /// Set when the executable should stop
    pub quit: bool,

    // Safe mode variables
    /// Determines if the drone is in safe mode.
    pub safe: bool,

    /// Gives the reason for the drone being in safe mode.
    pub safe_cause: Option<SafeModeCause>,

    // Line following
    /// True if the drone should follow the line
    pub follow_enabled: bool,

    pub motion_ctrl: motion_ctrl::MotionCtrl,
    pub motion_ctrl_input: Option<motion_ctrl::InputData>,
    pub motion_ctrl_status_rpt: motion_ctrl::StatusReport,

    /// RC demand to send to the drone this cycle
    pub rc_dem: Option<RcCmd>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Puts the drone into safe mode with the given cause.
    ///
    /// Line following is suspended and a zero RC demand is issued, so the drone hovers.
    pub fn make_safe(&mut self, cause: SafeModeCause) {
        if !self.safe {
            warn!("Make safe requested, cause: {:?}", cause);
            self.safe = true;
            self.safe_cause = Some(cause);

            // Make motion_ctrl safe
            self.rc_dem = Some(self.motion_ctrl.make_safe());
            self.motion_ctrl_input = None;
        }
    }

    /// Attempts to disable the safe mode by clearing the given cause.
    ///
    /// Returns `Ok(())` if this cause was cleared and safe mode was disabled, or `Err(())`
    /// otherwise. To remove safe mode the provided cause must match the initial reason for safe
    /// mode being enabled.
    ///
    /// If safe mode was not enabled `Ok(())` is returned
    pub fn make_unsafe(&mut self, cause: SafeModeCause) -> Result<(), ()> {
        if !self.safe {
            return Ok(());
        }

        match self.safe_cause {
            Some(root_cause) => {
                if cause == root_cause {
                    self.safe = false;
                    self.safe_cause = None;
                    info!("Make unsafe requested, root cause match, safe mode disabled");
                    Ok(())
                } else {
                    Err(())
                }
            }
            None => Ok(()),
        }
    }

    /// Stop following the line and hover.
    pub fn hold(&mut self) {
        self.follow_enabled = false;
        self.rc_dem = Some(self.motion_ctrl.make_safe());
        self.motion_ctrl_input = None;
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the status cycle
    /// flag every `cycles_per_status` cycles.
    pub fn cycle_start(&mut self, cycles_per_status: u128) {
        self.is_status_cycle = self.num_cycles % cycles_per_status.max(1) == 0;

        self.rc_dem = None;
        self.motion_ctrl_input = None;
        self.motion_ctrl_status_rpt = motion_ctrl::StatusReport::default();
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_safe_mode_causes() {
        let mut ds = DataStore::default();

        ds.make_safe(SafeModeCause::NotConnected);
        assert!(ds.safe);
        assert_eq!(ds.rc_dem, Some(RcCmd::zero()));

        // A second cause doesn't replace the first
        ds.make_safe(SafeModeCause::OperatorStop);
        assert_eq!(ds.safe_cause, Some(SafeModeCause::NotConnected));

        assert!(ds.make_unsafe(SafeModeCause::OperatorStop).is_err());
        assert!(ds.safe);

        assert!(ds.make_unsafe(SafeModeCause::NotConnected).is_ok());
        assert!(!ds.safe);
        assert_eq!(ds.safe_cause, None);
    }

    #[test]
    fn test_cycle_start() {
        let mut ds = DataStore::default();
        ds.rc_dem = Some(RcCmd::new(0, 10, 0, 0));

        ds.num_cycles = 60;
        ds.cycle_start(30);
        assert!(ds.is_status_cycle);
        assert_eq!(ds.rc_dem, None);

        ds.num_cycles = 61;
        ds.cycle_start(30);
        assert!(!ds.is_status_cycle);
    }
}

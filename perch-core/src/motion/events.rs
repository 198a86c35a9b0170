//! Motion events, reports and errors

use crate::traits::{Direction, SwitchDiagnostics};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Last notable thing the motion loop did, for the status surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MotionEvent {
    /// Driver enabled, boot sequence running
    Started,
    /// Calibration found both switches
    Calibrated,
    /// A calibration leg ran out of steps
    CalibrationFailed,
    /// Deploy move finished
    Deployed,
    /// Retract move finished
    Retracted,
    /// Homing reached the retracted switch
    Homed,
    /// Homing ran out of steps
    HomingFailed,
    /// The deployed switch fired away from the stored endpoint
    DriftCorrected,
    /// A command was refused (not calibrated)
    Rejected,
}

/// The two legs of a calibration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CalibrationLeg {
    /// Searching backward for the retracted switch
    Retracted,
    /// Counting forward to the deployed switch
    Deployed,
}

impl CalibrationLeg {
    /// Direction of travel for this leg
    pub fn direction(self) -> Direction {
        match self {
            CalibrationLeg::Retracted => Direction::Backward,
            CalibrationLeg::Deployed => Direction::Forward,
        }
    }
}

/// Motion errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MotionError {
    /// Deploy/retract requested without a calibrated range
    NotCalibrated,
    /// A calibration leg did not find its switch within the step ceiling
    CalibrationTimeout { leg: CalibrationLeg },
    /// Homing did not find the retracted switch within the step ceiling
    HomingTimeout { steps: u32 },
}

/// Record of an in-place drift correction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DriftCorrection {
    /// Deployed endpoint before the switch fired
    pub previous: i32,
    /// Position at which the switch fired
    pub corrected: i32,
    /// Whether the persistence layer accepted the corrected range
    ///
    /// A queued writer accepts before the flash write completes.
    pub persisted: bool,
}

/// Why a move stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StopReason {
    /// Already at the target, no pulses emitted
    AlreadyAtTarget,
    /// All requested steps were taken
    TargetReached,
    /// Retracted switch fired while moving backward
    RetractedLimit,
    /// Deployed switch fired while moving forward
    ///
    /// `correction` is set when the switch fired away from the stored
    /// deployed endpoint and the calibration was adjusted.
    DeployedLimit { correction: Option<DriftCorrection> },
}

/// Outcome of a point-to-point move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MoveReport {
    /// Position when the move began
    pub start: i32,
    /// Requested target
    pub target: i32,
    /// Position when the move ended
    pub end: i32,
    /// Pulses emitted
    pub steps: u32,
    /// Why the move ended
    pub stop: StopReason,
}

impl MoveReport {
    /// Move ended early on a limit switch
    pub fn stopped_by_limit(&self) -> bool {
        matches!(
            self.stop,
            StopReason::RetractedLimit | StopReason::DeployedLimit { .. }
        )
    }

    /// Drift correction applied during the move, if any
    pub fn drift_correction(&self) -> Option<DriftCorrection> {
        match self.stop {
            StopReason::DeployedLimit { correction } => correction,
            _ => None,
        }
    }
}

/// Outcome of a successful calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationReport {
    /// Steps counted from the retracted to the deployed switch
    pub deployed_position: i32,
    pub safety_buffer: i32,
    pub safe_deployed_position: i32,
    /// Whether the persistence layer accepted the new range
    ///
    /// A queued writer accepts before the flash write completes.
    pub persisted: bool,
    /// The trailing return to the retracted end
    pub return_move: MoveReport,
}

/// How the boot sequence established a known position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StartupOutcome {
    /// Stored calibration loaded and the carriage homed
    Homed { steps: u32 },
    /// No usable stored calibration, a fresh calibration ran
    Calibrated(CalibrationReport),
    /// Stored calibration loaded but homing failed, a fresh calibration ran
    Recalibrated(CalibrationReport),
}

/// Result of [`MotionEngine::startup`](super::MotionEngine::startup)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StartupReport {
    /// Switch states read right after enabling the driver
    pub diagnostics: SwitchDiagnostics,
    pub outcome: StartupOutcome,
}

/// Result of executing one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CommandOutcome {
    Calibrated(CalibrationReport),
    Moved(MoveReport),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(stop: StopReason) -> MoveReport {
        MoveReport {
            start: 0,
            target: 100,
            end: 40,
            steps: 40,
            stop,
        }
    }

    #[test]
    fn test_leg_directions() {
        assert_eq!(CalibrationLeg::Retracted.direction(), Direction::Backward);
        assert_eq!(CalibrationLeg::Deployed.direction(), Direction::Forward);
    }

    #[test]
    fn test_stopped_by_limit() {
        assert!(!report(StopReason::TargetReached).stopped_by_limit());
        assert!(!report(StopReason::AlreadyAtTarget).stopped_by_limit());
        assert!(report(StopReason::RetractedLimit).stopped_by_limit());
        assert!(report(StopReason::DeployedLimit { correction: None }).stopped_by_limit());
    }

    #[test]
    fn test_drift_correction_accessor() {
        let correction = DriftCorrection {
            previous: 12_500,
            corrected: 12_505,
            persisted: true,
        };
        let moved = report(StopReason::DeployedLimit {
            correction: Some(correction),
        });
        assert_eq!(moved.drift_correction(), Some(correction));
        assert_eq!(report(StopReason::RetractedLimit).drift_correction(), None);
    }
}

//! Limit switch trait
//!
//! Two endpoint switches bound the physical travel. Reads are polled once
//! per step; worst-case latency is one pulse period, far below the
//! mechanical response time of the blind.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Snapshot of both switch states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SwitchDiagnostics {
    /// Retracted-end switch is triggered
    pub retracted: bool,
    /// Deployed-end switch is triggered
    pub deployed: bool,
}

impl SwitchDiagnostics {
    /// Both switches reading triggered at once is physically impossible
    /// for a working rig: normally-closed switches or a wiring fault.
    pub fn likely_miswired(&self) -> bool {
        self.retracted && self.deployed
    }
}

/// Trait for the two endpoint switches
///
/// Reads are direct (non-latching): a switch reports triggered only while
/// it is physically actuated.
pub trait LimitSensors {
    /// Check if the retracted-end switch is triggered
    fn retracted_hit(&mut self) -> bool;

    /// Check if the deployed-end switch is triggered
    fn deployed_hit(&mut self) -> bool;

    /// Read both switches
    fn diagnostics(&mut self) -> SwitchDiagnostics {
        SwitchDiagnostics {
            retracted: self.retracted_hit(),
            deployed: self.deployed_hit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSwitches(bool, bool);

    impl LimitSensors for FixedSwitches {
        fn retracted_hit(&mut self) -> bool {
            self.0
        }

        fn deployed_hit(&mut self) -> bool {
            self.1
        }
    }

    #[test]
    fn test_diagnostics_reads_both() {
        let diag = FixedSwitches(true, false).diagnostics();
        assert!(diag.retracted);
        assert!(!diag.deployed);
        assert!(!diag.likely_miswired());
    }

    #[test]
    fn test_both_triggered_is_miswired() {
        assert!(FixedSwitches(true, true).diagnostics().likely_miswired());
        assert!(!FixedSwitches(false, false).diagnostics().likely_miswired());
    }
}

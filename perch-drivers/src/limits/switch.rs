//! Limit switch inputs
//!
//! Each switch is a digital input with configurable polarity. The usual
//! wiring is a normally-open switch to ground with the internal pull-up
//! enabled, so a triggered switch reads low.
//!
//! With `debounce_reads > 1` a switch only reports triggered when that many
//! consecutive reads agree. This filters single-sample glitches from long
//! cable runs without adding latency to the common single-read case.

use core::convert::Infallible;

use embedded_hal::digital::InputPin;
use perch_core::config::LimitConfig;
use perch_core::traits::LimitSensors;

/// Retracted and deployed limit switches on two input pins
pub struct SwitchLimitSensors<R, D> {
    retracted: R,
    deployed: D,
    config: LimitConfig,
}

impl<R, D> SwitchLimitSensors<R, D>
where
    R: InputPin<Error = Infallible>,
    D: InputPin<Error = Infallible>,
{
    /// Create from two input pins
    pub fn new(retracted: R, deployed: D, config: LimitConfig) -> Self {
        Self {
            retracted,
            deployed,
            config,
        }
    }
}

impl<R, D> LimitSensors for SwitchLimitSensors<R, D>
where
    R: InputPin<Error = Infallible>,
    D: InputPin<Error = Infallible>,
{
    fn retracted_hit(&mut self) -> bool {
        sample(
            &mut self.retracted,
            self.config.retracted_active_low,
            self.config.debounce_reads,
        )
    }

    fn deployed_hit(&mut self) -> bool {
        sample(
            &mut self.deployed,
            self.config.deployed_active_low,
            self.config.debounce_reads,
        )
    }
}

/// Read a switch, requiring `reads` consecutive active samples
fn sample<P: InputPin<Error = Infallible>>(pin: &mut P, active_low: bool, reads: u8) -> bool {
    (0..reads.max(1)).all(|_| {
        let high = pin.is_high().unwrap_or_else(|e| match e {});
        high != active_low
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use embedded_hal::digital::ErrorType;
    use std::vec::Vec;

    /// Input pin replaying a fixed sequence of levels, then holding the last
    struct ScriptedPin {
        levels: Vec<bool>,
        reads: Cell<usize>,
    }

    impl ScriptedPin {
        fn constant(high: bool) -> Self {
            Self::script(&[high])
        }

        fn script(levels: &[bool]) -> Self {
            Self {
                levels: levels.to_vec(),
                reads: Cell::new(0),
            }
        }
    }

    impl ErrorType for ScriptedPin {
        type Error = Infallible;
    }

    impl InputPin for ScriptedPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            let n = self.reads.get();
            self.reads.set(n + 1);
            Ok(self.levels[n.min(self.levels.len() - 1)])
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    #[test]
    fn test_active_low_switches() {
        // Pull-ups: idle high, triggered low
        let mut limits = SwitchLimitSensors::new(
            ScriptedPin::constant(false),
            ScriptedPin::constant(true),
            LimitConfig::default(),
        );

        assert!(limits.retracted_hit());
        assert!(!limits.deployed_hit());
    }

    #[test]
    fn test_active_high_switch() {
        let config = LimitConfig {
            deployed_active_low: false,
            ..Default::default()
        };
        let mut limits = SwitchLimitSensors::new(
            ScriptedPin::constant(true),
            ScriptedPin::constant(true),
            config,
        );

        assert!(!limits.retracted_hit());
        assert!(limits.deployed_hit());
    }

    #[test]
    fn test_single_read_by_default() {
        let mut limits = SwitchLimitSensors::new(
            ScriptedPin::script(&[false, true]),
            ScriptedPin::constant(true),
            LimitConfig::default(),
        );

        assert!(limits.retracted_hit());
        assert_eq!(limits.retracted.reads.get(), 1);
        assert!(!limits.retracted_hit());
    }

    #[test]
    fn test_debounce_rejects_glitch() {
        let config = LimitConfig {
            debounce_reads: 3,
            ..Default::default()
        };
        let mut limits = SwitchLimitSensors::new(
            // One low glitch, then idle
            ScriptedPin::script(&[false, true, true]),
            // Solidly triggered
            ScriptedPin::constant(false),
            config,
        );

        assert!(!limits.retracted_hit());
        assert!(limits.deployed_hit());
        assert_eq!(limits.deployed.reads.get(), 3);
    }

    #[test]
    fn test_diagnostics_reads_both_pins() {
        let mut limits = SwitchLimitSensors::new(
            ScriptedPin::constant(false),
            ScriptedPin::constant(false),
            LimitConfig::default(),
        );

        let diagnostics = limits.diagnostics();
        assert!(diagnostics.retracted);
        assert!(diagnostics.deployed);
        assert!(diagnostics.likely_miswired());
    }
}

//! GPIO step/direction driver
//!
//! Drives standalone stepper drivers through three lines: STEP, DIR and
//! ENABLE. A pulse is STEP high for `T`, then low for `T`. Direction changes
//! are followed by the setup delay before the next pulse can be emitted.

use core::convert::Infallible;

use embedded_hal::digital::{OutputPin, PinState};
use embedded_hal_async::delay::DelayNs;
use perch_core::config::{MotionConfig, StepperConfig};
use perch_core::traits::{Direction, StepPulseDriver};

/// Pulse timing for the STEP line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepTiming {
    /// STEP high time and low time in microseconds
    pub half_period_us: u32,
    /// DIR setup time before the next STEP edge in microseconds
    pub direction_setup_us: u32,
}

impl From<&MotionConfig> for StepTiming {
    fn from(config: &MotionConfig) -> Self {
        Self {
            half_period_us: config.pulse_half_period_us,
            direction_setup_us: config.direction_setup_us,
        }
    }
}

/// STEP/DIR/ENABLE driver over `embedded-hal` output pins
///
/// The driver starts disabled with STEP low.
pub struct GpioStepDriver<STEP, DIR, EN, D> {
    step: STEP,
    dir: DIR,
    enable: EN,
    delay: D,
    timing: StepTiming,
    config: StepperConfig,
}

impl<STEP, DIR, EN, D> GpioStepDriver<STEP, DIR, EN, D>
where
    STEP: OutputPin<Error = Infallible>,
    DIR: OutputPin<Error = Infallible>,
    EN: OutputPin<Error = Infallible>,
    D: DelayNs,
{
    /// Create a new driver
    pub fn new(
        step: STEP,
        dir: DIR,
        enable: EN,
        delay: D,
        timing: StepTiming,
        config: StepperConfig,
    ) -> Self {
        let mut driver = Self {
            step,
            dir,
            enable,
            delay,
            timing,
            config,
        };
        drive(&mut driver.step, false);
        driver.write_direction(Direction::Forward);
        driver.enable(false);
        driver
    }

    fn write_direction(&mut self, direction: Direction) {
        // Normal: forward = high
        // Inverted: forward = low
        let forward = direction == Direction::Forward;
        drive(&mut self.dir, forward != self.config.direction_inverted);
    }
}

impl<STEP, DIR, EN, D> StepPulseDriver for GpioStepDriver<STEP, DIR, EN, D>
where
    STEP: OutputPin<Error = Infallible>,
    DIR: OutputPin<Error = Infallible>,
    EN: OutputPin<Error = Infallible>,
    D: DelayNs,
{
    fn enable(&mut self, enabled: bool) {
        drive(&mut self.enable, enabled != self.config.enable_inverted);
    }

    async fn set_direction(&mut self, direction: Direction) {
        self.write_direction(direction);
        self.delay.delay_us(self.timing.direction_setup_us).await;
    }

    async fn step_once(&mut self) {
        drive(&mut self.step, true);
        self.delay.delay_us(self.timing.half_period_us).await;
        drive(&mut self.step, false);
        self.delay.delay_us(self.timing.half_period_us).await;
    }

    async fn dwell(&mut self, ms: u32) {
        self.delay.delay_ms(ms).await;
    }
}

fn drive<P: OutputPin<Error = Infallible>>(pin: &mut P, high: bool) {
    pin.set_state(PinState::from(high))
        .unwrap_or_else(|e| match e {});
}

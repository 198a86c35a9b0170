//! Step pulse driver trait
//!
//! Abstracts the STEP/DIR/ENABLE interface of standalone stepper drivers
//! (TMC2209 in STEP/DIR mode, A4988, DRV8825, ...). This is the only
//! component that touches actuator outputs.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Direction of travel along the blind's axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Toward the deployed limit switch (position increases)
    Forward,
    /// Toward the retracted limit switch (position decreases)
    Backward,
}

impl Direction {
    /// Direction implied by a signed step delta
    ///
    /// Returns `None` for a zero delta.
    pub fn from_delta(delta: i64) -> Option<Self> {
        match delta {
            d if d > 0 => Some(Direction::Forward),
            d if d < 0 => Some(Direction::Backward),
            _ => None,
        }
    }

    /// Position change produced by one step in this direction
    pub fn unit(self) -> i32 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// Trait for step/direction pulse generation
///
/// Every call to [`step_once`](StepPulseDriver::step_once) moves the
/// actuator exactly one step. Timing is a deployment constant of the
/// implementation: the step line is held high for `T` and low for `T`.
pub trait StepPulseDriver {
    /// Enable or disable the driver output stage
    ///
    /// The motion engine enables the driver once at startup and keeps it
    /// enabled so the motor holds position.
    fn enable(&mut self, enabled: bool);

    /// Set the direction line
    ///
    /// Completes only after the direction setup time has elapsed, so the
    /// next pulse is safe to emit immediately.
    fn set_direction(&mut self, direction: Direction) -> impl core::future::Future<Output = ()>;

    /// Emit one symmetric step pulse
    fn step_once(&mut self) -> impl core::future::Future<Output = ()>;

    /// Hold the output stage idle for a number of milliseconds
    fn dwell(&mut self, ms: u32) -> impl core::future::Future<Output = ()>;
}

//! Device configuration types
//!
//! Timing constants, step ceilings and switch polarity. All values are
//! deployment-time constants; nothing here is computed at runtime.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default half-period of a step pulse in microseconds
pub const DEFAULT_PULSE_HALF_PERIOD_US: u32 = 500;

/// Minimum direction setup time required by common STEP/DIR drivers
pub const MIN_DIRECTION_SETUP_US: u32 = 10;

/// Default ceiling on steps searched for a limit switch
pub const DEFAULT_STEP_CEILING: u32 = 50_000;

/// Default number of steps to stop short of the deployed switch
pub const DEFAULT_SAFETY_BUFFER: i32 = 200;

/// Motion timing and calibration parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotionConfig {
    /// Step line high time and low time in microseconds (T)
    ///
    /// Lower values move faster but miss steps once below the driver's
    /// minimum pulse width.
    pub pulse_half_period_us: u32,
    /// Delay after changing the direction line before the first pulse
    pub direction_setup_us: u32,
    /// Maximum steps searched for a switch during calibration/homing (C)
    pub step_ceiling: u32,
    /// Steps kept between the deploy target and the deployed switch
    pub safety_buffer: i32,
    /// Pause between the two calibration legs
    pub calibration_settle_ms: u32,
    /// Settle time after enabling the driver at startup
    pub enable_settle_ms: u32,
    /// Limit switch refresh cadence while the motion loop is idle
    pub idle_poll_ms: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            pulse_half_period_us: DEFAULT_PULSE_HALF_PERIOD_US,
            direction_setup_us: MIN_DIRECTION_SETUP_US,
            step_ceiling: DEFAULT_STEP_CEILING,
            safety_buffer: DEFAULT_SAFETY_BUFFER,
            calibration_settle_ms: 500,
            enable_settle_ms: 100,
            idle_poll_ms: 50,
        }
    }
}

impl MotionConfig {
    /// Duration of one full step pulse (high + low) in microseconds
    pub fn step_period_us(&self) -> u32 {
        self.pulse_half_period_us.saturating_mul(2)
    }

    /// Approximate step rate in steps per second
    pub fn steps_per_second(&self) -> u32 {
        match self.step_period_us() {
            0 => 0,
            period => 1_000_000 / period,
        }
    }
}

/// Limit switch input configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LimitConfig {
    /// Retracted switch pulls the line low when triggered
    pub retracted_active_low: bool,
    /// Deployed switch pulls the line low when triggered
    pub deployed_active_low: bool,
    /// Consecutive active reads required to report triggered (1 = direct read)
    pub debounce_reads: u8,
}

impl Default for LimitConfig {
    fn default() -> Self {
        // Normally-open switches to ground with internal pull-ups
        Self {
            retracted_active_low: true,
            deployed_active_low: true,
            debounce_reads: 1,
        }
    }
}

/// Stepper driver output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepperConfig {
    /// Enable line is active-low (LOW = driver enabled)
    pub enable_inverted: bool,
    /// Swap the meaning of the direction line (HIGH = toward retracted)
    pub direction_inverted: bool,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            enable_inverted: true,
            direction_inverted: false,
        }
    }
}

/// Complete device configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceConfig {
    pub motion: MotionConfig,
    pub limits: LimitConfig,
    pub stepper: StepperConfig,
}

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Pulse half-period must be non-zero
    ZeroPulsePeriod,
    /// Direction setup shorter than the driver minimum
    DirectionSetupTooShort,
    /// Step ceiling must be non-zero
    ZeroStepCeiling,
    /// Safety buffer cannot be negative
    NegativeSafetyBuffer,
    /// At least one read is needed per switch sample
    ZeroDebounceReads,
}

impl DeviceConfig {
    /// Check the configuration for values the motion engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.motion.pulse_half_period_us == 0 {
            return Err(ConfigError::ZeroPulsePeriod);
        }
        if self.motion.direction_setup_us < MIN_DIRECTION_SETUP_US {
            return Err(ConfigError::DirectionSetupTooShort);
        }
        if self.motion.step_ceiling == 0 {
            return Err(ConfigError::ZeroStepCeiling);
        }
        if self.motion.safety_buffer < 0 {
            return Err(ConfigError::NegativeSafetyBuffer);
        }
        if self.limits.debounce_reads == 0 {
            return Err(ConfigError::ZeroDebounceReads);
        }
        Ok(())
    }
}

//! Calibration persistence trait
//!
//! The engine only ever stores two numbers: the deployed endpoint and the
//! safety buffer. How they are encoded in non-volatile memory is up to the
//! implementation.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Calibration values as loaded from persistent storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoredCalibration {
    /// Deployed endpoint in steps from the retracted switch
    pub deployed_position: i32,
    /// Margin kept short of the deployed switch
    pub safety_buffer: i32,
}

/// Errors when persisting calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PersistError {
    /// Underlying storage rejected the write
    Storage,
}

/// Trait for calibration storage
pub trait CalibrationPersistence {
    /// Persist the calibrated range
    ///
    /// `Ok` means the range was accepted. Implementations that defer the
    /// write to another task return before it reaches flash.
    fn persist(
        &mut self,
        deployed_position: i32,
        safety_buffer: i32,
    ) -> impl core::future::Future<Output = Result<(), PersistError>>;

    /// Load a previously persisted range
    ///
    /// Missing, corrupt or out-of-range records all yield `None`; the
    /// caller reacts by running a fresh calibration.
    fn load(&mut self) -> impl core::future::Future<Output = Option<StoredCalibration>>;
}

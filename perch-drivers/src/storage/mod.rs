//! Persistent storage implementations

pub mod calibration;

pub use calibration::{FlashCalibrationStore, LoadError};

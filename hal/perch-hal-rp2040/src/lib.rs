//! RP2040-specific HAL for the blinds controller firmware
//!
//! Provides the RP2040 implementation of the shared `perch-hal` storage
//! trait. Step/dir/enable outputs and limit switch inputs use
//! `embassy_rp::gpio` directly through `embedded-hal`.

#![no_std]

pub mod flash;

// Re-export shared traits from perch-hal for convenience
pub use perch_hal::{FlashStorage as FlashStorageTrait, StorageKey};

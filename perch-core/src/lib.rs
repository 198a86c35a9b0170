//! Board-agnostic core logic for the blinds controller firmware
//!
//! This crate contains all motion and calibration logic that does not
//! depend on specific hardware implementations:
//!
//! - Hardware abstraction traits (step pulses, limit switches, persistence)
//! - Motion engine: calibration, homing and point-to-point moves
//! - Shared position/calibration store for the motion and control loops
//! - Single-slot command channel
//! - Configuration types and the persisted calibration record

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod command;
pub mod config;
pub mod motion;
pub mod traits;

#[cfg(test)]
pub(crate) mod sim;

//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in perch-core on top of `embedded-hal` pins and delays:
//!
//! - Step/direction/enable pulse driver (A4988, DRV8825, TMC2209 in STEP/DIR mode)
//! - Limit switch inputs with polarity and glitch filtering
//! - Calibration record storage on a `perch-hal` flash map

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod limits;
pub mod stepper;
pub mod storage;

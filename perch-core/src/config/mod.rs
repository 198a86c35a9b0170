//! Configuration types
//!
//! Board-agnostic configuration structures, the TOML subset they are
//! parsed from, and the persisted calibration record layout.

pub mod calibration;
pub mod device;
pub mod toml;

pub use calibration::*;
pub use device::*;
pub use toml::ParseError;

//! Motion engine and shared motion state
//!
//! The engine runs on the motion loop and owns the hardware. Everything the
//! control loop may look at is published through a [`PositionStore`].

pub mod engine;
pub mod events;
pub mod store;

pub use engine::MotionEngine;
pub use events::{
    CalibrationLeg, CalibrationReport, CommandOutcome, DriftCorrection, MotionError, MotionEvent,
    MoveReport, StartupOutcome, StartupReport, StopReason,
};
pub use store::{CalibrationSnapshot, PositionStore, StatusReport, LOCK_ATTEMPTS};

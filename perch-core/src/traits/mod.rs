//! Hardware abstraction traits
//!
//! These traits define the interface between the motion engine and
//! hardware-specific implementations.

pub mod limits;
pub mod persistence;
pub mod stepper;

pub use limits::{LimitSensors, SwitchDiagnostics};
pub use persistence::{CalibrationPersistence, PersistError, StoredCalibration};
pub use stepper::{Direction, StepPulseDriver};

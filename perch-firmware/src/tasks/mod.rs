//! Embassy async tasks
//!
//! The motion task runs alone on core 1. Flash writes and status reporting
//! run on core 0 and talk to it only through the statics in `channels`.

pub mod calibration;
pub mod motion;
pub mod status;

pub use calibration::{calibration_task, CalibrationStore};
pub use motion::motion_task;
pub use status::status_task;

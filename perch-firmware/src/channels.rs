//! Shared state between the motion core and the control core
//!
//! Defines the static channels and stores used across tasks. Uses
//! embassy-sync primitives so both RP2040 cores can touch them safely.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use perch_core::command::CommandChannel;
use perch_core::motion::PositionStore;
use perch_core::traits::StoredCalibration;

/// Latest command from the control side (deploy/retract/calibrate)
pub static COMMANDS: CommandChannel<CriticalSectionRawMutex> = CommandChannel::new();

/// Position, calibration and limit state published by the motion task
pub static POSITION: PositionStore<CriticalSectionRawMutex> = PositionStore::new();

/// Calibration waiting to be written to flash by the calibration task
pub static CALIBRATION_SAVE: Signal<CriticalSectionRawMutex, StoredCalibration> = Signal::new();

//! Calibration persistence for the motion core
//!
//! Flash belongs to the calibration task on core 0. The motion engine gets
//! the record loaded at boot and hands new ranges over through
//! [`CALIBRATION_SAVE`], so a flash write never runs inside a move.

use perch_core::traits::{CalibrationPersistence, PersistError, StoredCalibration};

use crate::channels::CALIBRATION_SAVE;

/// Persistence adapter that queues writes for the calibration task
pub struct QueuedPersistence {
    current: Option<StoredCalibration>,
}

impl QueuedPersistence {
    /// Create with the record loaded from flash at boot
    pub fn new(loaded: Option<StoredCalibration>) -> Self {
        Self { current: loaded }
    }
}

impl CalibrationPersistence for QueuedPersistence {
    async fn persist(
        &mut self,
        deployed_position: i32,
        safety_buffer: i32,
    ) -> Result<(), PersistError> {
        let calibration = StoredCalibration {
            deployed_position,
            safety_buffer,
        };
        // Accepted once queued; a pending write is replaced by the latest range
        CALIBRATION_SAVE.signal(calibration);
        self.current = Some(calibration);
        Ok(())
    }

    async fn load(&mut self) -> Option<StoredCalibration> {
        self.current
    }
}

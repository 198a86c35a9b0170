//! Calibration persistence task
//!
//! Owns the flash storage and writes calibration records on request from
//! the motion task. Runs on core 0.

use defmt::*;

use perch_core::config::CalibrationRecord;
use perch_drivers::storage::FlashCalibrationStore;
use perch_hal_rp2040::flash::Rp2040FlashStorage;

use crate::channels::CALIBRATION_SAVE;

/// Calibration record store on the RP2040 flash partition
pub type CalibrationStore = FlashCalibrationStore<Rp2040FlashStorage<'static>>;

/// Calibration task - handles flash writes for the calibrated range
#[embassy_executor::task]
pub async fn calibration_task(mut store: CalibrationStore) {
    info!("Calibration task started");

    loop {
        let request = CALIBRATION_SAVE.wait().await;

        info!(
            "Saving calibration: deployed={} buffer={}",
            request.deployed_position, request.safety_buffer
        );

        let record = CalibrationRecord::new(request.deployed_position, request.safety_buffer);
        match store.save_record(&record).await {
            Ok(()) => info!("Calibration saved"),
            Err(e) => error!("Failed to save calibration: {:?}", e),
        }
    }
}

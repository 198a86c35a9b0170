//! Perch - Bird Blinds Controller Firmware
//!
//! Main firmware binary for RP2040-based boards driving a stepper blind
//! between two limit switches. The motion loop runs alone on core 1; the
//! control side (flash writes, status) runs on core 0.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::{Executor, Spawner};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::multicore::{spawn_core1, Stack};
use embassy_time::Delay;
use static_cell::{ConstStaticCell, StaticCell};
use {defmt_rtt as _, panic_probe as _};

use perch_core::config::DeviceConfig;
use perch_core::motion::MotionEngine;
use perch_core::traits::StoredCalibration;
use perch_drivers::limits::SwitchLimitSensors;
use perch_drivers::stepper::{GpioStepDriver, StepTiming};
use perch_drivers::storage::FlashCalibrationStore;
use perch_hal_rp2040::flash::Rp2040FlashStorage;

use crate::channels::POSITION;
use crate::persistence::QueuedPersistence;

mod channels;
mod persistence;
mod tasks;

/// Embedded configuration (compiled into firmware)
/// Edit perch.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../perch.toml");

static CORE1_STACK: ConstStaticCell<Stack<8192>> = ConstStaticCell::new(Stack::new());
static CORE1_EXECUTOR: StaticCell<Executor> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Perch blinds controller starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();
    info!(
        "Motion: {} steps/s, ceiling {}, safety buffer {}",
        config.motion.steps_per_second(),
        config.motion.step_ceiling,
        config.motion.safety_buffer
    );

    // Flash stays on core 0; the motion core only sees the loaded record
    let flash = Rp2040FlashStorage::new(p.FLASH, p.DMA_CH0);
    let mut calibration_store = FlashCalibrationStore::new(flash);
    let stored = load_calibration(&mut calibration_store).await;

    // Pin assignments are board-specific (SKR Pico X driver: STEP=GPIO11,
    // DIR=GPIO10, ENABLE=GPIO12; X-STOP=GPIO4, Y-STOP=GPIO3)
    let stepper = GpioStepDriver::new(
        Output::new(p.PIN_11, Level::Low),
        Output::new(p.PIN_10, Level::Low),
        Output::new(p.PIN_12, Level::High),
        Delay,
        StepTiming::from(&config.motion),
        config.stepper,
    );

    let limits = SwitchLimitSensors::new(
        Input::new(p.PIN_4, pull_for(config.limits.retracted_active_low)),
        Input::new(p.PIN_3, pull_for(config.limits.deployed_active_low)),
        config.limits,
    );

    let engine = MotionEngine::new(
        &POSITION,
        stepper,
        limits,
        QueuedPersistence::new(stored),
        config.motion,
    );
    info!("Motion engine initialized");

    spawn_core1(p.CORE1, CORE1_STACK.take(), move || {
        let executor = CORE1_EXECUTOR.init(Executor::new());
        executor.run(|spawner| spawner.spawn(tasks::motion_task(engine)).unwrap())
    });

    spawner.spawn(tasks::calibration_task(calibration_store)).unwrap();
    spawner.spawn(tasks::status_task()).unwrap();

    info!("All tasks spawned, firmware running");

    // Commands reach the motion core through channels::COMMANDS
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Parse the embedded configuration
///
/// Falls back to built-in defaults if perch.toml was broken in a way the
/// build script did not catch.
fn load_config() -> DeviceConfig {
    match DeviceConfig::from_toml(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration");
            config
        }
        Err(e) => {
            error!("Failed to parse embedded config: {:?}", e);
            error!("Using default configuration");
            DeviceConfig::default()
        }
    }
}

/// Load the calibration record from flash
///
/// Any problem with the record means "not calibrated"; the motion task will
/// run a fresh calibration.
async fn load_calibration(store: &mut tasks::CalibrationStore) -> Option<StoredCalibration> {
    match store.load_record().await {
        Ok(Some(record)) => {
            info!(
                "Stored calibration: deployed={} buffer={}",
                record.deployed_position, record.safety_buffer
            );
            Some(record.into())
        }
        Ok(None) => {
            info!("No stored calibration");
            None
        }
        Err(e) => {
            warn!("Ignoring stored calibration: {:?}", e);
            None
        }
    }
}

/// Pull the idle level away from the triggered level
fn pull_for(active_low: bool) -> Pull {
    if active_low {
        Pull::Up
    } else {
        Pull::Down
    }
}

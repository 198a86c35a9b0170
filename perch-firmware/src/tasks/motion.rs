//! Motion task
//!
//! Boots the engine, then executes one command at a time to completion.
//! While idle it keeps the published limit switch states fresh.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::{Input, Output};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Delay, Duration, Timer};

use perch_core::motion::{CommandOutcome, MotionEngine, StartupOutcome, StartupReport, StopReason};
use perch_core::traits::SwitchDiagnostics;
use perch_drivers::limits::SwitchLimitSensors;
use perch_drivers::stepper::GpioStepDriver;

use crate::channels::{COMMANDS, POSITION};
use crate::persistence::QueuedPersistence;

/// STEP, DIR and ENABLE on plain GPIO outputs
pub type Stepper = GpioStepDriver<Output<'static>, Output<'static>, Output<'static>, Delay>;

/// Retracted and deployed switches on pulled-up inputs
pub type Limits = SwitchLimitSensors<Input<'static>, Input<'static>>;

pub type Engine =
    MotionEngine<'static, CriticalSectionRawMutex, Stepper, Limits, QueuedPersistence>;

/// Motion task for the blind axis
#[embassy_executor::task]
pub async fn motion_task(mut engine: Engine) {
    info!("Motion task started");

    match engine.startup().await {
        Ok(report) => log_startup(&report),
        Err(e) => {
            log_diagnostics(&POSITION.limits());
            error!("Startup failed: {:?}", e);
            error!("Check switch wiring, then send calibrate");
        }
    }

    let idle = Duration::from_millis(u64::from(engine.config().idle_poll_ms));

    loop {
        match select(COMMANDS.wait(), Timer::after(idle)).await {
            Either::First(command) => {
                info!("Executing {}", command.name());
                match engine.execute(command).await {
                    Ok(outcome) => log_outcome(&outcome),
                    Err(e) => warn!("{} failed: {:?}", command.name(), e),
                }
            }
            Either::Second(()) => {
                engine.refresh_limits();
            }
        }
    }
}

fn log_startup(report: &StartupReport) {
    log_diagnostics(&report.diagnostics);

    match report.outcome {
        StartupOutcome::Homed { steps } => {
            info!("Loaded stored calibration, homed in {} steps", steps)
        }
        StartupOutcome::Calibrated(cal) => info!(
            "Calibrated: deployed={} safe={}",
            cal.deployed_position, cal.safe_deployed_position
        ),
        StartupOutcome::Recalibrated(cal) => warn!(
            "Homing failed, recalibrated: deployed={} safe={}",
            cal.deployed_position, cal.safe_deployed_position
        ),
    }
}

fn log_diagnostics(diagnostics: &SwitchDiagnostics) {
    info!(
        "Limit switches: retracted={} deployed={}",
        diagnostics.retracted, diagnostics.deployed
    );
    if diagnostics.likely_miswired() {
        warn!("Both switches read triggered: normally-closed switches or a wiring fault");
    }
}

fn log_outcome(outcome: &CommandOutcome) {
    match outcome {
        CommandOutcome::Calibrated(cal) => {
            info!(
                "Calibration complete: deployed={} safe={}",
                cal.deployed_position, cal.safe_deployed_position
            );
            if !cal.persisted {
                warn!("Calibration was not persisted");
            }
        }
        CommandOutcome::Moved(report) => match report.stop {
            StopReason::AlreadyAtTarget => debug!("Already at {}", report.target),
            StopReason::TargetReached => {
                info!("Reached {} in {} steps", report.end, report.steps)
            }
            StopReason::RetractedLimit => {
                info!("Retracted switch at {}, position reset", report.end)
            }
            StopReason::DeployedLimit { correction: None } => {
                info!("Deployed switch at endpoint {}", report.end)
            }
            StopReason::DeployedLimit {
                correction: Some(c),
            } => warn!(
                "Deployed switch fired at {} (expected {}), range corrected",
                c.corrected, c.previous
            ),
        },
    }
}

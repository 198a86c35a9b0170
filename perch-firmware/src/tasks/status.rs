//! Control loop status reporting
//!
//! Reads the shared store without touching hardware and logs the status
//! surface whenever something other than the moving position changes.

use defmt::*;
use embassy_time::{Duration, Ticker};

use perch_core::motion::StatusReport;

use crate::channels::POSITION;

/// Status refresh interval in milliseconds
pub const STATUS_INTERVAL_MS: u64 = 250;

/// Status task - runs on core 0 alongside flash writes
#[embassy_executor::task]
pub async fn status_task() {
    info!("Status task started");

    let mut ticker = Ticker::every(Duration::from_millis(STATUS_INTERVAL_MS));
    let mut last: Option<StatusReport> = None;

    loop {
        ticker.next().await;

        let status = POSITION.status();
        let changed = match last {
            Some(prev) => !same_state(&prev, &status),
            None => true,
        };

        if changed {
            log_status(&status);
        }
        last = Some(status);
    }
}

/// Compare everything except position while a move is in flight
fn same_state(a: &StatusReport, b: &StatusReport) -> bool {
    let position_settled = a.busy || b.busy || a.position == b.position;
    position_settled
        && a.busy == b.busy
        && a.calibration_version == b.calibration_version
        && a.calibrated == b.calibrated
        && a.retracted_limit_triggered == b.retracted_limit_triggered
        && a.deployed_limit_triggered == b.deployed_limit_triggered
        && a.last_event == b.last_event
}

fn log_status(status: &StatusReport) {
    info!(
        "Status: position={} calibrated={} busy={} last={:?}",
        status.position, status.calibrated, status.busy, status.last_event
    );
    if status.calibrated {
        info!(
            "Range: 0 to {} (safe {}, buffer {})",
            status.deployed_position, status.safe_deployed_position, status.safety_buffer
        );
    }
    info!(
        "Limits: retracted={} deployed={}",
        status.retracted_limit_triggered, status.deployed_limit_triggered
    );
    if status.lock_timeouts > 0 {
        debug!("Position lock timeouts: {}", status.lock_timeouts);
    }
}

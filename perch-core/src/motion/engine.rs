//! Motion engine
//!
//! Runs calibration, homing and point-to-point moves to completion on the
//! motion loop. Every step is gated by a limit switch read taken right
//! before the pulse, so the carriage can overrun a switch by at most the
//! one step already in flight.

use embassy_sync::blocking_mutex::raw::RawMutex;

use super::events::{
    CalibrationLeg, CalibrationReport, CommandOutcome, DriftCorrection, MotionError, MotionEvent,
    MoveReport, StartupOutcome, StartupReport, StopReason,
};
use super::store::{CalibrationSnapshot, PositionStore};
use crate::command::MotorCommand;
use crate::config::MotionConfig;
use crate::traits::{
    CalibrationPersistence, Direction, LimitSensors, StepPulseDriver, StoredCalibration,
    SwitchDiagnostics,
};

/// Motion engine for a single blind axis
///
/// Owns the step driver, the switches and the persistence handle; shares
/// position and calibration with the control loop through the store.
pub struct MotionEngine<'a, M, S, L, P>
where
    M: RawMutex,
    S: StepPulseDriver,
    L: LimitSensors,
    P: CalibrationPersistence,
{
    store: &'a PositionStore<M>,
    stepper: S,
    limits: L,
    persistence: P,
    config: MotionConfig,
    /// Authoritative step count; the store holds the last published copy
    position: i32,
    calibration: CalibrationSnapshot,
}

impl<'a, M, S, L, P> MotionEngine<'a, M, S, L, P>
where
    M: RawMutex,
    S: StepPulseDriver,
    L: LimitSensors,
    P: CalibrationPersistence,
{
    /// Create an engine, adopting whatever the store already holds
    pub fn new(
        store: &'a PositionStore<M>,
        stepper: S,
        limits: L,
        persistence: P,
        config: MotionConfig,
    ) -> Self {
        store.set_uncalibrated_buffer(config.safety_buffer);
        Self {
            store,
            stepper,
            limits,
            persistence,
            config,
            position: store.get_position(),
            calibration: store.calibration(),
        }
    }

    /// Current step count as tracked by the engine
    pub fn position(&self) -> i32 {
        self.position
    }

    /// Current calibration
    pub fn calibration(&self) -> CalibrationSnapshot {
        self.calibration
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.calibrated
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Boot sequence
    ///
    /// Enables the driver for the rest of the process lifetime, then either
    /// homes against a stored calibration or calibrates from scratch. A
    /// stored range is worthless without a known zero, so a homing timeout
    /// falls back to a full calibration.
    pub async fn startup(&mut self) -> Result<StartupReport, MotionError> {
        self.store.set_busy(true);
        let result = self.run_startup().await;
        self.store.set_busy(false);
        result
    }

    async fn run_startup(&mut self) -> Result<StartupReport, MotionError> {
        self.stepper.enable(true);
        self.stepper.dwell(self.config.enable_settle_ms).await;
        self.store.record_event(MotionEvent::Started);

        let diagnostics = self.refresh_limits();

        let outcome = match self.load_calibration().await {
            Some(_) => match self.home_to_retracted().await {
                Ok(steps) => StartupOutcome::Homed { steps },
                Err(_) => StartupOutcome::Recalibrated(self.calibrate().await?),
            },
            None => StartupOutcome::Calibrated(self.calibrate().await?),
        };

        Ok(StartupReport {
            diagnostics,
            outcome,
        })
    }

    /// Execute one command to completion
    pub async fn execute(&mut self, command: MotorCommand) -> Result<CommandOutcome, MotionError> {
        self.store.set_busy(true);
        let result = match command {
            MotorCommand::Deploy => self.deploy().await.map(CommandOutcome::Moved),
            MotorCommand::Retract => self.retract().await.map(CommandOutcome::Moved),
            MotorCommand::Calibrate => self.calibrate().await.map(CommandOutcome::Calibrated),
        };
        self.store.set_busy(false);
        result
    }

    /// Load and install a persisted calibration
    ///
    /// Does not move the carriage; the position stays unknown until homed.
    pub async fn load_calibration(&mut self) -> Option<StoredCalibration> {
        let stored = self.persistence.load().await?;
        self.install(stored.deployed_position, stored.safety_buffer);
        Some(stored)
    }

    /// Discover the travel range between both switches
    ///
    /// Seeks the retracted switch, then counts steps to the deployed switch.
    /// If either leg runs out of steps the previous calibration stays in
    /// place and nothing is persisted. On success the new range is
    /// installed and persisted with the safety buffer already in effect,
    /// and the carriage returns to the retracted end.
    pub async fn calibrate(&mut self) -> Result<CalibrationReport, MotionError> {
        match self.measure_range().await {
            Ok(deployed) => {
                let buffer = self.calibration.safety_buffer;
                self.install(deployed, buffer);
                self.position = deployed;
                self.publish_position();

                let persisted = self.persistence.persist(deployed, buffer).await.is_ok();

                let return_move = self.move_to_position(self.calibration.retracted_position()).await;
                self.store.record_event(MotionEvent::Calibrated);

                Ok(CalibrationReport {
                    deployed_position: self.calibration.deployed_position,
                    safety_buffer: self.calibration.safety_buffer,
                    safe_deployed_position: self.calibration.safe_deployed_position,
                    persisted,
                    return_move,
                })
            }
            Err(e) => {
                self.store.record_event(MotionEvent::CalibrationFailed);
                Err(e)
            }
        }
    }

    async fn measure_range(&mut self) -> Result<i32, MotionError> {
        self.seek_limit(CalibrationLeg::Retracted).await?;
        self.position = 0;
        self.publish_position();

        self.stepper.dwell(self.config.calibration_settle_ms).await;

        let steps = self.seek_limit(CalibrationLeg::Deployed).await?;
        Ok(i32::try_from(steps).unwrap_or(i32::MAX))
    }

    /// Step toward a leg's switch until it fires or the ceiling is reached
    async fn seek_limit(&mut self, leg: CalibrationLeg) -> Result<u32, MotionError> {
        let direction = leg.direction();
        self.stepper.set_direction(direction).await;

        let mut steps = 0;
        loop {
            if self.limit_hit(direction) {
                return Ok(steps);
            }
            if steps >= self.config.step_ceiling {
                return Err(MotionError::CalibrationTimeout { leg });
            }
            self.stepper.step_once().await;
            steps += 1;
        }
    }

    /// Move to the safe deployed position
    pub async fn deploy(&mut self) -> Result<MoveReport, MotionError> {
        self.require_calibration()?;
        let report = self
            .move_to_position(self.calibration.safe_deployed_position)
            .await;
        if report.drift_correction().is_none() {
            self.store.record_event(MotionEvent::Deployed);
        }
        Ok(report)
    }

    /// Move to the retracted end
    pub async fn retract(&mut self) -> Result<MoveReport, MotionError> {
        self.require_calibration()?;
        let report = self
            .move_to_position(self.calibration.retracted_position())
            .await;
        self.store.record_event(MotionEvent::Retracted);
        Ok(report)
    }

    /// Step backward until the retracted switch fires, then zero the count
    ///
    /// Ignores the tracked position entirely; used after a power cycle to
    /// bring the logical zero back in line with the physical one.
    pub async fn home_to_retracted(&mut self) -> Result<u32, MotionError> {
        self.stepper.set_direction(Direction::Backward).await;

        let mut steps = 0;
        loop {
            if self.limit_hit(Direction::Backward) {
                self.position = 0;
                self.publish_position();
                self.store.record_event(MotionEvent::Homed);
                return Ok(steps);
            }
            if steps >= self.config.step_ceiling {
                self.store.record_event(MotionEvent::HomingFailed);
                return Err(MotionError::HomingTimeout { steps });
            }
            self.stepper.step_once().await;
            steps += 1;
        }
    }

    /// Move to an absolute step position with per-step limit checks
    ///
    /// The target is not clamped to the calibrated range; the switches are
    /// what bound the travel.
    pub async fn move_to_position(&mut self, target: i32) -> MoveReport {
        let start = self.position;
        let delta = i64::from(target) - i64::from(start);

        let mut report = MoveReport {
            start,
            target,
            end: start,
            steps: 0,
            stop: StopReason::AlreadyAtTarget,
        };

        let Some(direction) = Direction::from_delta(delta) else {
            return report;
        };

        self.stepper.set_direction(direction).await;

        report.stop = StopReason::TargetReached;
        for _ in 0..delta.unsigned_abs() {
            if let Some(stop) = self.bounded_step(direction).await {
                report.stop = stop;
                break;
            }
            report.steps += 1;
        }

        report.end = self.position;
        report
    }

    /// One limit-checked step
    ///
    /// Returns the reason for stopping if a switch fired instead.
    async fn bounded_step(&mut self, direction: Direction) -> Option<StopReason> {
        match direction {
            Direction::Forward if self.limit_hit(Direction::Forward) => {
                let mut correction = None;
                if self.calibration.calibrated {
                    if self.position != self.calibration.deployed_position {
                        correction = Some(self.correct_drift().await);
                    }
                    self.position = self.calibration.deployed_position;
                    self.publish_position();
                }
                Some(StopReason::DeployedLimit { correction })
            }
            Direction::Backward if self.limit_hit(Direction::Backward) => {
                self.position = 0;
                self.publish_position();
                Some(StopReason::RetractedLimit)
            }
            _ => {
                self.stepper.step_once().await;
                self.position = self.position.saturating_add(direction.unit());
                self.publish_position();
                None
            }
        }
    }

    /// The deployed switch fired at the current position: adopt it as the
    /// new endpoint and persist the corrected range
    async fn correct_drift(&mut self) -> DriftCorrection {
        let previous = self.calibration.deployed_position;
        let corrected = self.position;

        self.install(corrected, self.calibration.safety_buffer);
        let persisted = self
            .persistence
            .persist(corrected, self.calibration.safety_buffer)
            .await
            .is_ok();
        self.store.record_event(MotionEvent::DriftCorrected);

        DriftCorrection {
            previous,
            corrected,
            persisted,
        }
    }

    /// Read both switches and publish their states
    pub fn refresh_limits(&mut self) -> SwitchDiagnostics {
        let diagnostics = self.limits.diagnostics();
        self.store.set_limits(diagnostics);
        diagnostics
    }

    fn limit_hit(&mut self, direction: Direction) -> bool {
        match direction {
            Direction::Forward => {
                let hit = self.limits.deployed_hit();
                self.store.set_deployed_limit(hit);
                hit
            }
            Direction::Backward => {
                let hit = self.limits.retracted_hit();
                self.store.set_retracted_limit(hit);
                hit
            }
        }
    }

    fn require_calibration(&self) -> Result<(), MotionError> {
        if self.calibration.calibrated {
            Ok(())
        } else {
            self.store.record_event(MotionEvent::Rejected);
            Err(MotionError::NotCalibrated)
        }
    }

    fn install(&mut self, deployed_position: i32, safety_buffer: i32) {
        self.calibration = self
            .store
            .install_calibration(deployed_position, safety_buffer);
    }

    fn publish_position(&self) {
        // A skipped write is picked up by the next publish
        self.store.set_position(self.position);
    }
}

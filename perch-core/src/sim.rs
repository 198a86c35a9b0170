//! Simulated blind rig for engine tests
//!
//! A carriage moves one unit per pulse between two switches placed at fixed
//! physical positions. Handles borrow the rig so a test can inspect it while
//! the engine owns the handles.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;

use crate::config::{CalibrationRecord, CALIBRATION_RECORD_LEN};
use crate::motion::PositionStore;
use crate::traits::{
    CalibrationPersistence, Direction, LimitSensors, PersistError, StepPulseDriver,
    StoredCalibration,
};

pub(crate) type TestStore = PositionStore<NoopRawMutex>;

#[derive(Debug)]
pub(crate) struct RigState {
    /// Physical carriage position in steps
    pub carriage: i32,
    /// Retracted switch actuated at or below this position (`None` = broken)
    pub retracted_at: Option<i32>,
    /// Deployed switch actuated at or above this position (`None` = broken)
    pub deployed_at: Option<i32>,
    pub enabled: bool,
    pub direction: Direction,
    pub pulses: u32,
    /// Pulses still to be swallowed without moving (jam or missed steps)
    pub stall: u32,
    pub dwell_ms: u32,
    pub stored: Option<[u8; CALIBRATION_RECORD_LEN]>,
    pub persist_writes: u32,
    pub fail_persist: bool,
}

pub(crate) struct Rig {
    state: RefCell<RigState>,
}

impl Rig {
    pub fn new(retracted_at: i32, deployed_at: i32, carriage: i32) -> Self {
        Self {
            state: RefCell::new(RigState {
                carriage,
                retracted_at: Some(retracted_at),
                deployed_at: Some(deployed_at),
                enabled: false,
                direction: Direction::Forward,
                pulses: 0,
                stall: 0,
                dwell_ms: 0,
                stored: None,
                persist_writes: 0,
                fail_persist: false,
            }),
        }
    }

    /// Preload storage with a raw record, as if written by an earlier boot
    pub fn with_stored(self, deployed_position: i32, safety_buffer: i32) -> Self {
        self.state.borrow_mut().stored =
            Some(CalibrationRecord::new(deployed_position, safety_buffer).encode());
        self
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut RigState) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }

    pub fn pulses(&self) -> u32 {
        self.state.borrow().pulses
    }

    pub fn carriage(&self) -> i32 {
        self.state.borrow().carriage
    }

    pub fn persist_writes(&self) -> u32 {
        self.state.borrow().persist_writes
    }

    pub fn stepper<'r>(&'r self, watch: Option<&'r TestStore>) -> SimStepper<'r> {
        SimStepper { rig: self, watch }
    }

    pub fn limits(&self) -> SimLimits<'_> {
        SimLimits { rig: self }
    }

    pub fn storage(&self) -> SimStorage<'_> {
        SimStorage { rig: self }
    }
}

/// Step driver that moves the simulated carriage
///
/// With a store to watch, every pulse first asserts that the last published
/// position lies inside the calibrated range.
pub(crate) struct SimStepper<'r> {
    rig: &'r Rig,
    watch: Option<&'r TestStore>,
}

impl StepPulseDriver for SimStepper<'_> {
    fn enable(&mut self, enabled: bool) {
        self.rig.with(|s| s.enabled = enabled);
    }

    async fn set_direction(&mut self, direction: Direction) {
        self.rig.with(|s| s.direction = direction);
    }

    async fn step_once(&mut self) {
        if let Some(store) = self.watch {
            let calibration = store.calibration();
            let position = store.get_position();
            assert!(
                calibration.contains(position),
                "position {} outside [0, {}]",
                position,
                calibration.deployed_position
            );
        }
        self.rig.with(|s| {
            s.pulses += 1;
            if s.stall > 0 {
                s.stall -= 1;
            } else {
                s.carriage += s.direction.unit();
            }
        });
    }

    async fn dwell(&mut self, ms: u32) {
        self.rig.with(|s| s.dwell_ms += ms);
    }
}

pub(crate) struct SimLimits<'r> {
    rig: &'r Rig,
}

impl LimitSensors for SimLimits<'_> {
    fn retracted_hit(&mut self) -> bool {
        let s = self.rig.state.borrow();
        s.retracted_at.is_some_and(|at| s.carriage <= at)
    }

    fn deployed_hit(&mut self) -> bool {
        let s = self.rig.state.borrow();
        s.deployed_at.is_some_and(|at| s.carriage >= at)
    }
}

/// Storage that keeps the encoded record, so loads go through validation
pub(crate) struct SimStorage<'r> {
    rig: &'r Rig,
}

impl CalibrationPersistence for SimStorage<'_> {
    async fn persist(
        &mut self,
        deployed_position: i32,
        safety_buffer: i32,
    ) -> Result<(), PersistError> {
        self.rig.with(|s| {
            if s.fail_persist {
                return Err(PersistError::Storage);
            }
            s.stored = Some(CalibrationRecord::new(deployed_position, safety_buffer).encode());
            s.persist_writes += 1;
            Ok(())
        })
    }

    async fn load(&mut self) -> Option<StoredCalibration> {
        let stored = self.rig.state.borrow().stored?;
        CalibrationRecord::decode(&stored).ok().map(Into::into)
    }
}

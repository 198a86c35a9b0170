//! Position and calibration state shared between the motion and control loops
//!
//! The motion engine is the only writer. Readers on the control side never
//! block for long:
//!
//! - Position sits behind an async mutex that is only ever polled with a
//!   bounded number of `try_lock` attempts. A reader that loses the race
//!   gets the last value published, a writer that loses it skips the write
//!   (the engine republishes on its next step).
//! - The calibration snapshot is copied whole under a critical section and
//!   carries a version stamp, so a reader sees either the old or the new
//!   record, never a mix of both.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use portable_atomic::{AtomicI32, AtomicU32, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::events::MotionEvent;
use crate::config::DEFAULT_SAFETY_BUFFER;
use crate::traits::SwitchDiagnostics;

/// Number of `try_lock` attempts before a position access gives up
pub const LOCK_ATTEMPTS: u32 = 64;

/// Calibrated travel range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationSnapshot {
    pub calibrated: bool,
    /// Steps from the retracted switch to the deployed switch
    pub deployed_position: i32,
    pub safety_buffer: i32,
    /// `deployed_position - safety_buffer`
    pub safe_deployed_position: i32,
    /// Incremented on every install
    pub version: u32,
}

impl CalibrationSnapshot {
    /// An uncalibrated range carrying the configured safety buffer
    pub const fn uncalibrated(safety_buffer: i32) -> Self {
        Self {
            calibrated: false,
            deployed_position: 0,
            safety_buffer,
            safe_deployed_position: 0,
            version: 0,
        }
    }

    /// A calibrated range; the safe position is derived
    pub const fn calibrated(deployed_position: i32, safety_buffer: i32, version: u32) -> Self {
        Self {
            calibrated: true,
            deployed_position,
            safety_buffer,
            safe_deployed_position: deployed_position.wrapping_sub(safety_buffer),
            version,
        }
    }

    /// The retracted end is the origin of the step count
    pub const fn retracted_position(&self) -> i32 {
        0
    }

    /// Check a position against the calibrated range
    ///
    /// Always true while uncalibrated.
    pub fn contains(&self, position: i32) -> bool {
        !self.calibrated || (0..=self.deployed_position).contains(&position)
    }
}

/// Everything the status surface reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StatusReport {
    pub calibrated: bool,
    pub position: i32,
    pub deployed_position: i32,
    pub safe_deployed_position: i32,
    pub safety_buffer: i32,
    pub retracted_limit_triggered: bool,
    pub deployed_limit_triggered: bool,
    /// A command is executing on the motion loop
    pub busy: bool,
    pub last_event: Option<MotionEvent>,
    pub calibration_version: u32,
    pub lock_timeouts: u32,
}

#[derive(Debug, Clone, Copy)]
struct Flags {
    limits: SwitchDiagnostics,
    busy: bool,
    last_event: Option<MotionEvent>,
}

impl Flags {
    const IDLE: Self = Self {
        limits: SwitchDiagnostics {
            retracted: false,
            deployed: false,
        },
        busy: false,
        last_event: None,
    };
}

/// Shared position and calibration state
pub struct PositionStore<M: RawMutex> {
    position: Mutex<M, i32>,
    last_position: AtomicI32,
    lock_timeouts: AtomicU32,
    calibration: BlockingMutex<M, Cell<CalibrationSnapshot>>,
    flags: BlockingMutex<M, Cell<Flags>>,
}

impl<M: RawMutex> PositionStore<M> {
    /// Create a store at position 0, uncalibrated
    pub const fn new() -> Self {
        Self {
            position: Mutex::new(0),
            last_position: AtomicI32::new(0),
            lock_timeouts: AtomicU32::new(0),
            calibration: BlockingMutex::new(Cell::new(CalibrationSnapshot::uncalibrated(
                DEFAULT_SAFETY_BUFFER,
            ))),
            flags: BlockingMutex::new(Cell::new(Flags::IDLE)),
        }
    }

    /// Read the position
    ///
    /// Falls back to the last published value if the lock stays contended.
    pub fn get_position(&self) -> i32 {
        for _ in 0..LOCK_ATTEMPTS {
            if let Ok(guard) = self.position.try_lock() {
                return *guard;
            }
            core::hint::spin_loop();
        }
        self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
        self.last_position.load(Ordering::Acquire)
    }

    /// Write the position
    ///
    /// Returns `false` if the lock stayed contended and the write was skipped.
    pub fn set_position(&self, position: i32) -> bool {
        for _ in 0..LOCK_ATTEMPTS {
            if let Ok(mut guard) = self.position.try_lock() {
                *guard = position;
                self.last_position.store(position, Ordering::Release);
                return true;
            }
            core::hint::spin_loop();
        }
        self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
        false
    }

    /// Number of position accesses that gave up on the lock
    pub fn lock_timeouts(&self) -> u32 {
        self.lock_timeouts.load(Ordering::Relaxed)
    }

    /// Copy of the current calibration
    pub fn calibration(&self) -> CalibrationSnapshot {
        self.calibration.lock(|cell| cell.get())
    }

    /// Install a calibrated range, returning the stamped snapshot
    pub(crate) fn install_calibration(
        &self,
        deployed_position: i32,
        safety_buffer: i32,
    ) -> CalibrationSnapshot {
        self.calibration.lock(|cell| {
            let version = cell.get().version.wrapping_add(1);
            let snapshot = CalibrationSnapshot::calibrated(deployed_position, safety_buffer, version);
            cell.set(snapshot);
            snapshot
        })
    }

    /// Set the buffer shown while no range is calibrated
    pub(crate) fn set_uncalibrated_buffer(&self, safety_buffer: i32) {
        self.calibration.lock(|cell| {
            let current = cell.get();
            if !current.calibrated {
                cell.set(CalibrationSnapshot {
                    safety_buffer,
                    ..current
                });
            }
        });
    }

    /// Last switch states read by the motion loop
    pub fn limits(&self) -> SwitchDiagnostics {
        self.flags.lock(|cell| cell.get().limits)
    }

    pub(crate) fn set_limits(&self, limits: SwitchDiagnostics) {
        self.update_flags(|flags| flags.limits = limits);
    }

    pub(crate) fn set_retracted_limit(&self, triggered: bool) {
        self.update_flags(|flags| flags.limits.retracted = triggered);
    }

    pub(crate) fn set_deployed_limit(&self, triggered: bool) {
        self.update_flags(|flags| flags.limits.deployed = triggered);
    }

    /// Check if the motion loop is executing a command
    pub fn is_busy(&self) -> bool {
        self.flags.lock(|cell| cell.get().busy)
    }

    pub(crate) fn set_busy(&self, busy: bool) {
        self.update_flags(|flags| flags.busy = busy);
    }

    /// Most recent motion event
    pub fn last_event(&self) -> Option<MotionEvent> {
        self.flags.lock(|cell| cell.get().last_event)
    }

    pub(crate) fn record_event(&self, event: MotionEvent) {
        self.update_flags(|flags| flags.last_event = Some(event));
    }

    /// Assemble a status report without touching hardware
    pub fn status(&self) -> StatusReport {
        let calibration = self.calibration();
        let flags = self.flags.lock(|cell| cell.get());
        StatusReport {
            calibrated: calibration.calibrated,
            position: self.get_position(),
            deployed_position: calibration.deployed_position,
            safe_deployed_position: calibration.safe_deployed_position,
            safety_buffer: calibration.safety_buffer,
            retracted_limit_triggered: flags.limits.retracted,
            deployed_limit_triggered: flags.limits.deployed,
            busy: flags.busy,
            last_event: flags.last_event,
            calibration_version: calibration.version,
            lock_timeouts: self.lock_timeouts(),
        }
    }

    fn update_flags(&self, f: impl FnOnce(&mut Flags)) {
        self.flags.lock(|cell| {
            let mut flags = cell.get();
            f(&mut flags);
            cell.set(flags);
        });
    }
}

impl<M: RawMutex> Default for PositionStore<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};

    #[test]
    fn test_new_store_is_uncalibrated() {
        let store: PositionStore<NoopRawMutex> = PositionStore::new();
        let status = store.status();

        assert!(!status.calibrated);
        assert_eq!(status.position, 0);
        assert_eq!(status.safety_buffer, DEFAULT_SAFETY_BUFFER);
        assert_eq!(status.last_event, None);
        assert!(!status.busy);
        assert_eq!(status.lock_timeouts, 0);
    }

    #[test]
    fn test_position_round_trip() {
        let store: PositionStore<NoopRawMutex> = PositionStore::new();
        assert!(store.set_position(4_321));
        assert_eq!(store.get_position(), 4_321);
        assert!(store.set_position(-3));
        assert_eq!(store.get_position(), -3);
    }

    #[test]
    fn test_contended_read_is_stale_not_blocking() {
        let store: PositionStore<NoopRawMutex> = PositionStore::new();
        store.set_position(100);

        let guard = store.position.try_lock().unwrap();
        assert_eq!(store.get_position(), 100);
        assert_eq!(store.lock_timeouts(), 1);
        drop(guard);

        assert_eq!(store.get_position(), 100);
        assert_eq!(store.lock_timeouts(), 1);
    }

    #[test]
    fn test_contended_write_is_skipped() {
        let store: PositionStore<NoopRawMutex> = PositionStore::new();
        store.set_position(100);

        let guard = store.position.try_lock().unwrap();
        assert!(!store.set_position(101));
        drop(guard);

        assert_eq!(store.get_position(), 100);
        assert_eq!(store.lock_timeouts(), 1);
        assert!(store.set_position(101));
        assert_eq!(store.get_position(), 101);
    }

    #[test]
    fn test_install_calibration_stamps_version() {
        let store: PositionStore<NoopRawMutex> = PositionStore::new();

        let first = store.install_calibration(12_500, 200);
        assert!(first.calibrated);
        assert_eq!(first.safe_deployed_position, 12_300);
        assert_eq!(first.version, 1);

        let second = store.install_calibration(12_505, 200);
        assert_eq!(second.safe_deployed_position, 12_305);
        assert_eq!(second.version, 2);
        assert_eq!(store.calibration(), second);
    }

    #[test]
    fn test_uncalibrated_buffer_does_not_touch_calibration() {
        let store: PositionStore<NoopRawMutex> = PositionStore::new();
        store.set_uncalibrated_buffer(50);
        assert_eq!(store.calibration().safety_buffer, 50);

        store.install_calibration(1_000, 100);
        store.set_uncalibrated_buffer(50);
        assert_eq!(store.calibration().safety_buffer, 100);
    }

    #[test]
    fn test_snapshot_contains() {
        let uncalibrated = CalibrationSnapshot::uncalibrated(200);
        assert!(uncalibrated.contains(-10));

        let range = CalibrationSnapshot::calibrated(1_000, 100, 1);
        assert!(range.contains(0));
        assert!(range.contains(1_000));
        assert!(!range.contains(-1));
        assert!(!range.contains(1_001));
        assert_eq!(range.retracted_position(), 0);
    }

    #[test]
    fn test_flags_in_status() {
        let store: PositionStore<NoopRawMutex> = PositionStore::new();
        store.set_limits(SwitchDiagnostics {
            retracted: true,
            deployed: false,
        });
        store.set_deployed_limit(true);
        store.set_retracted_limit(false);
        store.set_busy(true);
        store.record_event(MotionEvent::Homed);

        let status = store.status();
        assert!(!status.retracted_limit_triggered);
        assert!(status.deployed_limit_triggered);
        assert!(status.busy);
        assert_eq!(status.last_event, Some(MotionEvent::Homed));
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_snapshot() {
        let store: PositionStore<CriticalSectionRawMutex> = PositionStore::new();
        store.install_calibration(1, 0);

        std::thread::scope(|s| {
            s.spawn(|| {
                for deployed in 2..5_000 {
                    store.install_calibration(deployed, deployed / 4);
                    store.set_position(deployed);
                }
            });

            for _ in 0..2 {
                s.spawn(|| {
                    let mut last_version = 0;
                    for _ in 0..5_000 {
                        let snapshot = store.calibration();
                        assert!(snapshot.calibrated);
                        assert_eq!(snapshot.safety_buffer, snapshot.deployed_position / 4);
                        assert_eq!(
                            snapshot.safe_deployed_position,
                            snapshot.deployed_position - snapshot.safety_buffer
                        );
                        assert!(snapshot.version >= last_version);
                        last_version = snapshot.version;

                        let position = store.get_position();
                        assert!((0..5_000).contains(&position));
                    }
                });
            }
        });

        assert_eq!(store.calibration().deployed_position, 4_999);
    }
}

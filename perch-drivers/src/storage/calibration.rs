//! Calibration record storage
//!
//! Keeps the fixed-layout calibration record under
//! [`StorageKey::Calibration`] in a `perch-hal` flash map.

use perch_core::config::{CalibrationRecord, RecordError, CALIBRATION_RECORD_LEN};
use perch_core::traits::{CalibrationPersistence, PersistError, StoredCalibration};
use perch_hal::{FlashError, FlashStorage, StorageKey};

/// Why a stored record could not be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// Flash read failed
    Flash(FlashError),
    /// Record present but rejected
    Record(RecordError),
}

impl From<FlashError> for LoadError {
    fn from(e: FlashError) -> Self {
        LoadError::Flash(e)
    }
}

impl From<RecordError> for LoadError {
    fn from(e: RecordError) -> Self {
        LoadError::Record(e)
    }
}

/// Calibration persistence on top of a flash key-value store
pub struct FlashCalibrationStore<F> {
    flash: F,
}

impl<F: FlashStorage> FlashCalibrationStore<F> {
    pub fn new(flash: F) -> Self {
        Self { flash }
    }

    /// Load the stored record
    ///
    /// `Ok(None)` means nothing was ever stored. Unlike
    /// [`CalibrationPersistence::load`], a corrupt record is reported so the
    /// caller can log why it was ignored.
    pub async fn load_record(&mut self) -> Result<Option<CalibrationRecord>, LoadError> {
        let mut buffer = [0u8; CALIBRATION_RECORD_LEN];
        let len = match self.flash.read(StorageKey::Calibration, &mut buffer).await {
            Ok(len) => len,
            Err(FlashError::NotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record = CalibrationRecord::decode(&buffer[..len])?;
        Ok(Some(record))
    }

    /// Store a record, replacing the previous one
    pub async fn save_record(&mut self, record: &CalibrationRecord) -> Result<(), FlashError> {
        self.flash
            .write(StorageKey::Calibration, &record.encode())
            .await
    }
}

impl<F: FlashStorage> CalibrationPersistence for FlashCalibrationStore<F> {
    async fn persist(
        &mut self,
        deployed_position: i32,
        safety_buffer: i32,
    ) -> Result<(), PersistError> {
        let record = CalibrationRecord::new(deployed_position, safety_buffer);
        self.save_record(&record)
            .await
            .map_err(|_| PersistError::Storage)
    }

    async fn load(&mut self) -> Option<StoredCalibration> {
        self.load_record().await.ok().flatten().map(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use std::vec::Vec;

    /// RAM-backed map holding a single calibration slot
    #[derive(Default)]
    struct RamFlash {
        slot: Option<Vec<u8>>,
        writes: usize,
        fail: bool,
    }

    impl FlashStorage for RamFlash {
        async fn read(&mut self, _key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
            if self.fail {
                return Err(FlashError::Flash);
            }
            let data = self.slot.as_ref().ok_or(FlashError::NotFound)?;
            if buffer.len() < data.len() {
                return Err(FlashError::BufferTooSmall);
            }
            buffer[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }

        async fn write(&mut self, _key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
            if self.fail {
                return Err(FlashError::Storage);
            }
            self.slot = Some(data.to_vec());
            self.writes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_empty_flash_has_no_calibration() {
        let mut store = FlashCalibrationStore::new(RamFlash::default());
        assert_eq!(block_on(store.load_record()), Ok(None));
        assert_eq!(block_on(store.load()), None);
    }

    #[test]
    fn test_persist_then_load() {
        let mut store = FlashCalibrationStore::new(RamFlash::default());

        assert_eq!(block_on(store.persist(12_500, 200)), Ok(()));
        let loaded = block_on(store.load()).unwrap();

        assert_eq!(loaded.deployed_position, 12_500);
        assert_eq!(loaded.safety_buffer, 200);
        assert_eq!(loaded.deployed_position - loaded.safety_buffer, 12_300);

        assert_eq!(store.flash.writes, 1);
        assert_eq!(
            store.flash.slot.as_deref(),
            Some(&CalibrationRecord::new(12_500, 200).encode()[..])
        );
    }

    #[test]
    fn test_corrupt_record_is_ignored() {
        let mut bytes = CalibrationRecord::new(12_500, 200).encode();
        bytes[0] ^= 0xFF;
        let flash = RamFlash {
            slot: Some(bytes.to_vec()),
            ..Default::default()
        };
        let mut store = FlashCalibrationStore::new(flash);

        assert!(matches!(
            block_on(store.load_record()),
            Err(LoadError::Record(RecordError::BadMagic(_)))
        ));
        assert_eq!(block_on(store.load()), None);
    }

    #[test]
    fn test_out_of_range_record_is_ignored() {
        let flash = RamFlash {
            slot: Some(CalibrationRecord::new(150_000, 200).encode().to_vec()),
            ..Default::default()
        };
        let mut store = FlashCalibrationStore::new(flash);

        assert_eq!(
            block_on(store.load_record()),
            Err(LoadError::Record(RecordError::OutOfRange(150_000)))
        );
        assert_eq!(block_on(store.load()), None);
    }

    #[test]
    fn test_short_record_is_truncated() {
        let flash = RamFlash {
            slot: Some(std::vec![0x01, 0xBD, 0, 0]),
            ..Default::default()
        };
        let mut store = FlashCalibrationStore::new(flash);

        assert_eq!(
            block_on(store.load_record()),
            Err(LoadError::Record(RecordError::Truncated))
        );
    }

    #[test]
    fn test_flash_failure_maps_to_persist_error() {
        let flash = RamFlash {
            fail: true,
            ..Default::default()
        };
        let mut store = FlashCalibrationStore::new(flash);

        assert_eq!(
            block_on(store.persist(12_500, 200)),
            Err(PersistError::Storage)
        );
        assert_eq!(
            block_on(store.load_record()),
            Err(LoadError::Flash(FlashError::Flash))
        );
        assert_eq!(block_on(store.load()), None);
    }
}

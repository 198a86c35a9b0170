//! Persisted calibration record
//!
//! Fixed little-endian layout, readable by every firmware version:
//!
//! | Offset | Size | Field                          |
//! |--------|------|--------------------------------|
//! | 0      | 2    | magic `0xBD01` (little-endian) |
//! | 2      | 2    | reserved, zero                 |
//! | 4      | 4    | deployed position (`i32`)      |
//! | 8      | 4    | safety buffer (`i32`)          |

use crate::traits::StoredCalibration;

/// Magic number identifying a calibration record ("Bird blinds v1")
pub const CALIBRATION_MAGIC: u16 = 0xBD01;

/// Size of the encoded record in bytes
pub const CALIBRATION_RECORD_LEN: usize = 12;

/// Largest deployed position accepted on load
///
/// A sanity bound, not a hardware limit.
pub const MAX_STORED_DEPLOYED_POSITION: i32 = 100_000;

const OFFSET_MAGIC: usize = 0;
const OFFSET_DEPLOYED: usize = 4;
const OFFSET_SAFETY_BUFFER: usize = 8;

/// Reasons a stored record is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    /// Fewer bytes than a full record
    Truncated,
    /// Magic number does not match
    BadMagic(u16),
    /// Deployed position outside `1..=MAX_STORED_DEPLOYED_POSITION`
    OutOfRange(i32),
}

/// Calibration record as stored in non-volatile memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationRecord {
    /// Deployed endpoint in steps from the retracted switch
    pub deployed_position: i32,
    /// Margin kept short of the deployed switch
    pub safety_buffer: i32,
}

impl CalibrationRecord {
    /// Create a record
    pub const fn new(deployed_position: i32, safety_buffer: i32) -> Self {
        Self {
            deployed_position,
            safety_buffer,
        }
    }

    /// Encode into the fixed on-flash layout
    pub fn encode(&self) -> [u8; CALIBRATION_RECORD_LEN] {
        let mut bytes = [0u8; CALIBRATION_RECORD_LEN];
        bytes[OFFSET_MAGIC..OFFSET_MAGIC + 2].copy_from_slice(&CALIBRATION_MAGIC.to_le_bytes());
        bytes[OFFSET_DEPLOYED..OFFSET_DEPLOYED + 4]
            .copy_from_slice(&self.deployed_position.to_le_bytes());
        bytes[OFFSET_SAFETY_BUFFER..OFFSET_SAFETY_BUFFER + 4]
            .copy_from_slice(&self.safety_buffer.to_le_bytes());
        bytes
    }

    /// Decode and validate a stored record
    ///
    /// Trailing bytes beyond the record length are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.len() < CALIBRATION_RECORD_LEN {
            return Err(RecordError::Truncated);
        }

        let magic = u16::from_le_bytes([bytes[OFFSET_MAGIC], bytes[OFFSET_MAGIC + 1]]);
        if magic != CALIBRATION_MAGIC {
            return Err(RecordError::BadMagic(magic));
        }

        let record = Self {
            deployed_position: read_i32(bytes, OFFSET_DEPLOYED),
            safety_buffer: read_i32(bytes, OFFSET_SAFETY_BUFFER),
        };
        record.validate()?;
        Ok(record)
    }

    /// Check the stored range against the load-time sanity bounds
    ///
    /// The safety buffer is deliberately not range-checked.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.deployed_position <= 0 || self.deployed_position > MAX_STORED_DEPLOYED_POSITION {
            return Err(RecordError::OutOfRange(self.deployed_position));
        }
        Ok(())
    }
}

impl From<CalibrationRecord> for StoredCalibration {
    fn from(record: CalibrationRecord) -> Self {
        StoredCalibration {
            deployed_position: record.deployed_position,
            safety_buffer: record.safety_buffer,
        }
    }
}

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

//! Firmware load records

use crate::error::{Result, UnpackFault};

/// Maximum payload bytes in one record
pub const RECORD_CAPACITY: usize = 16;

/// Record type of a data record
pub const RECORD_TYPE_DATA: u8 = 0;

/// Record type of the end-of-image record
pub const RECORD_TYPE_EOF: u8 = 1;

/// One load record: `byte_count` bytes of `data` destined for `load_address`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareRecord {
    /// Number of meaningful bytes in `data`
    pub byte_count: u8,
    /// Controller RAM address of the first byte
    pub load_address: u16,
    /// [`RECORD_TYPE_DATA`] or [`RECORD_TYPE_EOF`]
    pub record_type: u8,
    /// Payload; bytes past `byte_count` are padding
    pub data: [u8; RECORD_CAPACITY],
}

impl FirmwareRecord {
    /// The end-of-image record
    pub const SENTINEL: Self = Self {
        byte_count: 0,
        load_address: 0,
        record_type: RECORD_TYPE_EOF,
        data: [0; RECORD_CAPACITY],
    };

    /// Create a data record from a payload of at most [`RECORD_CAPACITY`] bytes
    pub fn new(load_address: u16, payload: &[u8]) -> Result<Self> {
        Self::with_type(load_address, RECORD_TYPE_DATA, payload)
    }

    pub(crate) fn with_type(load_address: u16, record_type: u8, payload: &[u8]) -> Result<Self> {
        if payload.len() > RECORD_CAPACITY {
            return Err(UnpackFault::RecordOverflow.into());
        }
        let mut data = [0u8; RECORD_CAPACITY];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            byte_count: payload.len() as u8,
            load_address,
            record_type,
            data,
        })
    }

    /// True for the end-of-image record
    pub fn is_sentinel(&self) -> bool {
        self.byte_count == 0 && self.record_type == RECORD_TYPE_EOF
    }

    /// The meaningful bytes of `data`
    pub fn payload(&self) -> &[u8] {
        &self.data[..(self.byte_count as usize).min(RECORD_CAPACITY)]
    }
}

/// Table entry used to build an image
///
/// Mirrors the layout of hand-maintained record tables: `data` may be
/// longer than `count` (trailing padding), never shorter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordDef<'a> {
    /// Meaningful bytes
    pub count: u8,
    /// Load address
    pub address: u16,
    /// Record type
    pub kind: u8,
    /// Payload bytes
    pub data: &'a [u8],
}

impl<'a> RecordDef<'a> {
    /// Create a table entry
    pub const fn new(count: u8, address: u16, kind: u8, data: &'a [u8]) -> Self {
        Self {
            count,
            address,
            kind,
            data,
        }
    }

    pub(crate) fn is_sentinel(&self) -> bool {
        self.count == 0 && self.kind == RECORD_TYPE_EOF
    }

    pub(crate) fn to_record(self) -> Result<FirmwareRecord> {
        let count = self.count as usize;
        if count > RECORD_CAPACITY || count > self.data.len() {
            return Err(UnpackFault::RecordOverflow.into());
        }
        FirmwareRecord::with_type(self.address, self.kind, &self.data[..count])
    }
}

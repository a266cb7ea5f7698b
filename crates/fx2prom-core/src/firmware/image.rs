//! Firmware images

use alloc::vec::Vec;

use crate::error::{Result, UnpackFault};

use super::record::{FirmwareRecord, RecordDef, RECORD_CAPACITY};

/// Record header on the wire: count, address (big-endian), type
const RECORD_HEADER_LEN: usize = 4;

/// An ordered record list ending in exactly one end-of-image record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    records: Vec<FirmwareRecord>,
}

/// Build an image from a record table
///
/// Table order is preserved. The first end-of-image entry terminates the
/// image and anything after it is ignored. A table without one is rejected.
pub fn build_record_sequence(table: &[RecordDef<'_>]) -> Result<FirmwareImage> {
    let mut records = Vec::with_capacity(table.len());
    for def in table {
        if def.is_sentinel() {
            records.push(FirmwareRecord::SENTINEL);
            log::debug!("Built firmware image with {} records", records.len() - 1);
            return Ok(FirmwareImage { records });
        }
        records.push(def.to_record()?);
    }
    Err(UnpackFault::MissingSentinel.into())
}

impl FirmwareImage {
    /// Decode the wire record stream
    ///
    /// Each record is `count | address (BE) | type | data[count]`. Decoding
    /// stops at the end-of-image record; trailing bytes are ignored.
    pub fn decode(mut bytes: &[u8]) -> Result<Self> {
        let mut records = Vec::new();
        loop {
            if bytes.is_empty() {
                return Err(UnpackFault::MissingSentinel.into());
            }
            if bytes.len() < RECORD_HEADER_LEN {
                return Err(UnpackFault::Truncated.into());
            }
            let count = bytes[0] as usize;
            let address = u16::from_be_bytes([bytes[1], bytes[2]]);
            let kind = bytes[3];
            if count > RECORD_CAPACITY {
                return Err(UnpackFault::RecordOverflow.into());
            }
            let end = RECORD_HEADER_LEN + count;
            if bytes.len() < end {
                return Err(UnpackFault::Truncated.into());
            }
            let record = FirmwareRecord::with_type(address, kind, &bytes[RECORD_HEADER_LEN..end])?;
            bytes = &bytes[end..];
            if record.is_sentinel() {
                records.push(FirmwareRecord::SENTINEL);
                return Ok(Self { records });
            }
            records.push(record);
        }
    }

    /// Encode to the wire record stream
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.records.len() * (RECORD_HEADER_LEN + 8));
        for record in &self.records {
            out.push(record.byte_count);
            out.extend_from_slice(&record.load_address.to_be_bytes());
            out.push(record.record_type);
            out.extend_from_slice(record.payload());
        }
        out
    }

    /// All records, including the end-of-image record
    pub fn records(&self) -> &[FirmwareRecord] {
        &self.records
    }

    /// Records to load, without the end-of-image record
    pub fn data_records(&self) -> &[FirmwareRecord] {
        &self.records[..self.records.len().saturating_sub(1)]
    }

    /// Total payload bytes across all records
    pub fn payload_len(&self) -> usize {
        self.records.iter().map(|r| r.payload().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::firmware::record::{RECORD_TYPE_DATA, RECORD_TYPE_EOF};
    use alloc::vec;

    const TABLE: &[RecordDef<'static>] = &[
        RecordDef::new(3, 0x0000, RECORD_TYPE_DATA, &[0x02, 0x01, 0x00]),
        RecordDef::new(2, 0x0EDB, RECORD_TYPE_DATA, &[0x90, 0xE6, 0x00, 0x00]),
        RecordDef::new(0, 0x0000, RECORD_TYPE_EOF, &[0]),
    ];

    #[test]
    fn test_build_preserves_order() {
        let image = build_record_sequence(TABLE).unwrap();
        assert_eq!(image.records().len(), 3);
        assert_eq!(image.data_records().len(), 2);
        assert_eq!(image.records()[0].load_address, 0x0000);
        assert_eq!(image.records()[1].load_address, 0x0EDB);
        assert_eq!(image.records()[1].payload(), &[0x90, 0xE6]);
        assert!(image.records()[2].is_sentinel());
        assert_eq!(image.payload_len(), 5);
    }

    #[test]
    fn test_sentinel_terminates_build() {
        let mut table = TABLE.to_vec();
        table.push(RecordDef::new(4, 0x2000, RECORD_TYPE_DATA, &[1, 2, 3, 4]));
        table.push(RecordDef::new(40, 0x3000, RECORD_TYPE_DATA, &[]));
        assert_eq!(build_record_sequence(&table).unwrap(), build_record_sequence(TABLE).unwrap());
    }

    #[test]
    fn test_missing_sentinel() {
        assert_eq!(
            build_record_sequence(&TABLE[..2]),
            Err(Error::Unpack(UnpackFault::MissingSentinel))
        );
        assert_eq!(
            build_record_sequence(&[]),
            Err(Error::Unpack(UnpackFault::MissingSentinel))
        );
    }

    #[test]
    fn test_sentinel_only() {
        let image = build_record_sequence(&TABLE[2..]).unwrap();
        assert!(image.data_records().is_empty());
    }

    #[test]
    fn test_wire_layout() {
        let image = build_record_sequence(TABLE).unwrap();
        assert_eq!(
            image.encode(),
            vec![
                3, 0x00, 0x00, 0, 0x02, 0x01, 0x00, //
                2, 0x0E, 0xDB, 0, 0x90, 0xE6, //
                0, 0x00, 0x00, 1,
            ]
        );
        assert_eq!(FirmwareImage::decode(&image.encode()).unwrap(), image);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            FirmwareImage::decode(&[]),
            Err(Error::Unpack(UnpackFault::MissingSentinel))
        );
        assert_eq!(
            FirmwareImage::decode(&[2, 0, 0]),
            Err(Error::Unpack(UnpackFault::Truncated))
        );
        assert_eq!(
            FirmwareImage::decode(&[4, 0, 0, 0, 1, 2]),
            Err(Error::Unpack(UnpackFault::Truncated))
        );
        assert_eq!(
            FirmwareImage::decode(&[17, 0, 0, 0]),
            Err(Error::Unpack(UnpackFault::RecordOverflow))
        );
        assert_eq!(
            FirmwareImage::decode(&[1, 0, 0, 0, 0xAA]),
            Err(Error::Unpack(UnpackFault::MissingSentinel))
        );
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let image = FirmwareImage::decode(&[0, 0x12, 0x34, 1, 0xFF, 0xFF]).unwrap();
        assert_eq!(image.records(), &[FirmwareRecord::SENTINEL]);
    }
}

//! EEPROM header record
//!
//! The header is the last thing written when programming a device. It
//! records which regions hold valid content and carries an 8-bit additive
//! checksum over its other bytes.

use bitflags::bitflags;

use crate::error::{Error, HeaderFault, Result};
use crate::transport::VendorTransport;

use super::address::{EepromAddress, EepromGeometry};
use super::transfer::{read_eeprom_into, write_eeprom};

/// Encoded header length in bytes
pub const HEADER_LEN: usize = 9;

/// Header layout version written by this crate
pub const HEADER_VERSION: u8 = 1;

bitflags! {
    /// Regions recorded as valid in the header
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HeaderFields: u16 {
        /// FPGA configuration image present
        const BUF_CON_VALID = 1 << 0;
        /// Controller boot image present
        const BOOTROM_VALID = 1 << 1;
        /// USB descriptor table present
        const DESCRIPTOR_VALID = 1 << 2;
    }
}

/// Decoded EEPROM header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EepromHeader {
    /// Self-describing record length
    pub size: u8,
    /// Layout version
    pub version: u8,
    /// Valid-region bits
    pub fields: HeaderFields,
    /// Size of the FPGA image in bytes
    pub buf_con_size: u32,
    /// Additive checksum over the preceding bytes
    pub check_sum: u8,
}

impl Default for EepromHeader {
    fn default() -> Self {
        Self {
            size: HEADER_LEN as u8,
            version: HEADER_VERSION,
            fields: HeaderFields::empty(),
            buf_con_size: 0,
            check_sum: 0,
        }
    }
}

impl EepromHeader {
    /// Encode to the little-endian wire layout
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0] = self.size;
        out[1] = self.version;
        out[2..4].copy_from_slice(&self.fields.bits().to_le_bytes());
        out[4..8].copy_from_slice(&self.buf_con_size.to_le_bytes());
        out[8] = self.check_sum;
        out
    }

    /// Decode from the wire layout without validating
    pub fn from_bytes(bytes: &[u8; HEADER_LEN]) -> Self {
        Self {
            size: bytes[0],
            version: bytes[1],
            fields: HeaderFields::from_bits_retain(u16::from_le_bytes([bytes[2], bytes[3]])),
            buf_con_size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            check_sum: bytes[8],
        }
    }

    /// Return a copy with `check_sum` recomputed; every other field is kept
    pub fn finalized(&self) -> Self {
        let mut header = *self;
        header.check_sum = calc_header_checksum(&header);
        header
    }

    /// Check the stored checksum and size
    pub fn validate(&self) -> Result<()> {
        let computed = calc_header_checksum(self);
        if computed != self.check_sum {
            return Err(Error::HeaderCorrupt(HeaderFault::Checksum {
                stored: self.check_sum,
                computed,
            }));
        }
        if self.size as usize != HEADER_LEN {
            return Err(Error::HeaderCorrupt(HeaderFault::Size(self.size)));
        }
        Ok(())
    }
}

/// Compute the header checksum
///
/// Wrapping 8-bit sum of every encoded byte except `check_sum` itself.
pub fn calc_header_checksum(header: &EepromHeader) -> u8 {
    header.to_bytes()[..HEADER_LEN - 1]
        .iter()
        .fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// Read and validate the header at `addr`
pub fn read_header<T: VendorTransport + ?Sized>(
    transport: &mut T,
    geometry: EepromGeometry,
    addr: EepromAddress,
) -> Result<EepromHeader> {
    let mut raw = [0u8; HEADER_LEN];
    read_eeprom_into(transport, geometry, addr, &mut raw)?;
    let header = EepromHeader::from_bytes(&raw);
    header.validate()?;

    if header.version != HEADER_VERSION {
        log::warn!(
            "EEPROM header version {} (expected {}), continuing",
            header.version,
            HEADER_VERSION
        );
    }

    log::debug!(
        "EEPROM header: fields {:?}, FPGA image {} bytes",
        header.fields,
        header.buf_con_size
    );
    Ok(header)
}

/// Checksum and write `header` at `addr`
///
/// Only `check_sum` is filled in; `size` and `version` are written as given.
/// Returns the header exactly as written.
pub fn write_header<T: VendorTransport + ?Sized>(
    transport: &mut T,
    geometry: EepromGeometry,
    header: &EepromHeader,
    addr: EepromAddress,
) -> Result<EepromHeader> {
    let header = header.finalized();
    log::debug!(
        "Writing EEPROM header at {} (checksum 0x{:02X})",
        addr,
        header.check_sum
    );
    write_eeprom(transport, geometry, addr, &header.to_bytes())?;
    Ok(header)
}

/// Whether a device has been programmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromState {
    /// A valid header is present
    Programmed(EepromHeader),
    /// No valid header (blank or corrupt EEPROM)
    Unprogrammed,
}

impl PromState {
    /// Get the header if the device is programmed
    pub fn header(&self) -> Option<&EepromHeader> {
        match self {
            Self::Programmed(header) => Some(header),
            Self::Unprogrammed => None,
        }
    }
}

/// Read the header, mapping a corrupt header to [`PromState::Unprogrammed`]
pub fn read_state<T: VendorTransport + ?Sized>(
    transport: &mut T,
    geometry: EepromGeometry,
    addr: EepromAddress,
) -> Result<PromState> {
    match read_header(transport, geometry, addr) {
        Ok(header) => Ok(PromState::Programmed(header)),
        Err(Error::HeaderCorrupt(fault)) => {
            log::info!("No valid EEPROM header ({})", fault);
            Ok(PromState::Unprogrammed)
        }
        Err(e) => Err(e),
    }
}

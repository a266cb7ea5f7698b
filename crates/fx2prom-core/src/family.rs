//! Device family constants
//!
//! Every device of a family shares one EEPROM geometry and one layout of
//! regions inside it.

use crate::eeprom::{EepromAddress, EepromGeometry, BLOCK_SIZE};

/// Vendor ID of a factory-fresh FX2 controller (Cypress)
pub const CYPRESS_VENDOR_ID: u16 = 0x04B4;

/// EEPROM geometry and region map of one device family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFamily {
    /// Family name
    pub name: &'static str,
    /// Vendor ID reported by an unprogrammed controller
    pub default_vendor_id: u16,
    /// EEPROM banks and blocks
    pub geometry: EepromGeometry,
    /// Header record
    pub header: EepromAddress,
    /// FPGA configuration image
    pub fpga_image: EepromAddress,
    /// Bytes reserved for the FPGA image
    pub fpga_image_len: u32,
    /// Controller boot image
    pub controller_image: EepromAddress,
    /// Bytes reserved for the controller image
    pub controller_image_len: u32,
    /// USB descriptor table
    pub descriptors: EepromAddress,
    /// Bytes reserved for the descriptor table
    pub descriptors_len: u32,
    /// String database
    pub string_db: EepromAddress,
}

impl DeviceFamily {
    /// The standard two-bank, four-block camera family
    pub const STANDARD: Self = Self {
        name: "standard",
        default_vendor_id: CYPRESS_VENDOR_ID,
        geometry: EepromGeometry::new(2, 4),
        header: EepromAddress::new(0, 0, 0x4000),
        fpga_image: EepromAddress::new(0, 1, 0x0000),
        // Block 1 of bank 0 through the last block of bank 1
        fpga_image_len: 7 * BLOCK_SIZE,
        controller_image: EepromAddress::new(0, 0, 0x0000),
        controller_image_len: 0x4000,
        descriptors: EepromAddress::new(0, 0, 0x4200),
        descriptors_len: 0x0E00,
        string_db: EepromAddress::new(0, 0, 0x5000),
    };

    /// Whether a device reporting `vendor_id` still needs bootstrap firmware
    pub fn needs_bootstrap(&self, vendor_id: u16) -> bool {
        vendor_id == self.default_vendor_id
    }
}

impl Default for DeviceFamily {
    fn default() -> Self {
        Self::STANDARD
    }
}

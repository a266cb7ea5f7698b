//! Device-level EEPROM operations
//!
//! [`Prom`] borrows a transport for its whole lifetime, so no other code can
//! issue requests to the same device while an operation is in progress.

use alloc::string::String;
use alloc::vec::Vec;

use crate::eeprom::{self, EepromAddress, EepromHeader, PromState, StrDb, STR_DB_LEN};
use crate::error::Result;
use crate::family::DeviceFamily;
use crate::firmware::{self, FirmwareImage};
use crate::program::{self, ProgramOptions, ProgramProgress, ProgramReport, ProgramSources};
use crate::transport::{VendorInfo, VendorTransport};

/// EEPROM programmer bound to one device
pub struct Prom<'t, T: VendorTransport + ?Sized> {
    transport: &'t mut T,
    family: DeviceFamily,
}

impl<'t, T: VendorTransport + ?Sized> Prom<'t, T> {
    /// Wrap a transport
    pub fn new(transport: &'t mut T, family: DeviceFamily) -> Self {
        Self { transport, family }
    }

    /// Get the device family
    pub fn family(&self) -> &DeviceFamily {
        &self.family
    }

    /// Get the underlying transport
    pub fn transport(&mut self) -> &mut T {
        self.transport
    }

    /// Get the USB identity of the device
    pub fn vendor_info(&mut self) -> Result<VendorInfo> {
        self.transport.vendor_info()
    }

    /// Program FPGA, controller and descriptor images, then the header
    ///
    /// See [`program::program`].
    pub fn program<P: ProgramProgress + ?Sized>(
        &mut self,
        sources: &ProgramSources<'_>,
        bootstrap: Option<&FirmwareImage>,
        options: &ProgramOptions,
        progress: &mut P,
    ) -> Result<ProgramReport> {
        program::program(
            self.transport,
            &self.family,
            sources,
            bootstrap,
            options,
            progress,
        )
    }

    /// Read and validate the header
    pub fn read_header(&mut self) -> Result<EepromHeader> {
        eeprom::read_header(self.transport, self.family.geometry, self.family.header)
    }

    /// Write the header, returning it with the checksum filled in
    pub fn write_header(&mut self, header: &EepromHeader) -> Result<EepromHeader> {
        eeprom::write_header(self.transport, self.family.geometry, header, self.family.header)
    }

    /// Read the header, treating a corrupt one as unprogrammed
    pub fn read_state(&mut self) -> Result<PromState> {
        eeprom::read_state(self.transport, self.family.geometry, self.family.header)
    }

    /// Read the raw string database
    pub fn read_string_db(&mut self) -> Result<Vec<String>> {
        let raw = self.read_eeprom(self.family.string_db, STR_DB_LEN)?;
        eeprom::unpack_strings(&raw)
    }

    /// Pack and write the string database
    pub fn write_string_db<S: AsRef<str>>(&mut self, strings: &[S]) -> Result<()> {
        let packed = eeprom::pack_strings(strings)?;
        self.write_eeprom(self.family.string_db, &packed)
    }

    /// Read the string database into named slots
    pub fn read_str_db(&mut self) -> Result<StrDb> {
        Ok(StrDb::from_strings(self.read_string_db()?))
    }

    /// Get the customer serial number
    pub fn serial_number(&mut self) -> Result<String> {
        Ok(self.read_str_db()?.customer_sn)
    }

    /// Set the customer serial number, keeping every other entry
    ///
    /// A blank or malformed database is replaced by one holding only the
    /// serial number.
    pub fn set_serial_number(&mut self, serial: &str) -> Result<()> {
        let mut db = match self.read_str_db() {
            Ok(db) => db,
            Err(e) if matches!(e, crate::Error::Unpack(_)) => {
                log::warn!("String database unreadable ({}), starting from empty", e);
                StrDb::default()
            }
            Err(e) => return Err(e),
        };
        db.customer_sn = String::from(serial);
        log::info!("Setting serial number to '{}'", serial);
        self.write_string_db(&db.to_strings())
    }

    /// Read `len` bytes at `addr`
    pub fn read_eeprom(&mut self, addr: EepromAddress, len: usize) -> Result<Vec<u8>> {
        eeprom::read_eeprom(self.transport, self.family.geometry, addr, len)
    }

    /// Write `data` at `addr`
    pub fn write_eeprom(&mut self, addr: EepromAddress, data: &[u8]) -> Result<()> {
        eeprom::write_eeprom(self.transport, self.family.geometry, addr, data)
    }

    /// Compare the EEPROM contents at `addr` with `expected`
    pub fn verify_eeprom(&mut self, addr: EepromAddress, expected: &[u8]) -> Result<()> {
        eeprom::verify_eeprom(self.transport, self.family.geometry, addr, expected)
    }

    /// Download `image` into controller RAM and start it
    pub fn download_firmware(&mut self, image: &FirmwareImage) -> Result<()> {
        firmware::download_firmware(self.transport, image)
    }
}

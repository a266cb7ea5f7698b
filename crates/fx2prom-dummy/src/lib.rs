//! fx2prom-dummy - Simulated FX2 camera controller
//!
//! This crate provides an in-memory controller that answers the same vendor
//! requests as the real device: banked EEPROM access, RAM loads and the
//! CPUCS reset latch. It's useful for testing and development without real
//! hardware, and can inject transport faults at chosen points.
//!
//! A controller enumerating with the factory vendor ID refuses EEPROM
//! requests until firmware has been loaded into RAM and the CPU released
//! from reset, mirroring a fresh device that has only its boot ROM.

use std::ops::Range;
use std::path::{Path, PathBuf};

use fx2prom_core::eeprom::{EepromAddress, EepromGeometry, BLOCK_SIZE};
use fx2prom_core::error::{Error, Result, TransportFault};
use fx2prom_core::family::{CYPRESS_VENDOR_ID, DeviceFamily};
use fx2prom_core::firmware::{CPUCS_RESET, CPUCS_RUN};
use fx2prom_core::transport::{
    VendorInfo, VendorTransport, CPUCS_ADDR, DEFAULT_MAX_TRANSFER, REQ_EEPROM, REQ_RAM_LOAD,
};

/// Size of the controller's RAM address space
pub const RAM_SIZE: usize = 0x1_0000;

/// Configuration for the simulated controller
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Identity reported by `vendor_info`
    pub info: VendorInfo,
    /// EEPROM banks and blocks
    pub geometry: EepromGeometry,
    /// Largest request payload the device accepts
    pub max_transfer: usize,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            info: VendorInfo {
                vendor_id: 0x125C,
                product_id: 0x0020,
                device_id: 0x0001,
            },
            geometry: DeviceFamily::STANDARD.geometry,
            max_transfer: DEFAULT_MAX_TRANSFER,
        }
    }
}

impl DummyConfig {
    /// A factory-fresh controller that still enumerates as Cypress
    pub fn unprogrammed() -> Self {
        Self {
            info: VendorInfo {
                vendor_id: CYPRESS_VENDOR_ID,
                product_id: 0x8613,
                device_id: 0xA001,
            },
            ..Default::default()
        }
    }
}

/// Faults to inject into the request stream
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Fail the Nth EEPROM write request (0-based)
    pub eeprom_write_fail_at: Option<usize>,
    /// Fail any EEPROM write touching this linear byte range
    pub eeprom_write_fail_range: Option<Range<u32>>,
    /// Return at most this many bytes from every EEPROM read
    pub short_read: Option<usize>,
    /// Fail the Nth RAM load request (0-based, CPUCS writes included)
    pub ram_load_fail_at: Option<usize>,
    /// Time out every request after this many have succeeded
    pub timeout_after: Option<usize>,
}

/// One request as seen by the simulated device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// EEPROM read
    EepromRead {
        /// First byte
        addr: EepromAddress,
        /// Bytes requested
        len: usize,
    },
    /// EEPROM write
    EepromWrite {
        /// First byte
        addr: EepromAddress,
        /// Bytes written
        len: usize,
    },
    /// RAM load outside the CPUCS register
    RamWrite {
        /// RAM address
        address: u16,
        /// Bytes written
        len: usize,
    },
    /// CPUCS write; `true` holds the CPU in reset
    CpuReset(bool),
}

/// Simulated FX2 camera controller
pub struct DummyDevice {
    config: DummyConfig,
    eeprom: Vec<u8>,
    ram: Vec<u8>,
    in_reset: bool,
    firmware_running: bool,
    ram_loaded: bool,
    faults: Faults,
    eeprom_writes: usize,
    ram_loads: usize,
    requests: usize,
    journal: Vec<Operation>,
    backing: Option<PathBuf>,
}

impl DummyDevice {
    /// Create a device with a blank (all 0xFF) EEPROM
    pub fn new(config: DummyConfig) -> Self {
        let eeprom = vec![0xFF; config.geometry.capacity() as usize];
        let firmware_running = config.info.vendor_id != CYPRESS_VENDOR_ID;
        Self {
            config,
            eeprom,
            ram: vec![0; RAM_SIZE],
            in_reset: false,
            firmware_running,
            ram_loaded: false,
            faults: Faults::default(),
            eeprom_writes: 0,
            ram_loads: 0,
            requests: 0,
            journal: Vec::new(),
            backing: None,
        }
    }

    /// Create a device with default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a device whose EEPROM starts with `initial_data`
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut device = Self::new(config);
        let len = initial_data.len().min(device.eeprom.len());
        device.eeprom[..len].copy_from_slice(&initial_data[..len]);
        device
    }

    /// Back the EEPROM with a file
    ///
    /// Existing contents are loaded now and the EEPROM is written back when
    /// the device is dropped, so state survives across processes.
    pub fn with_backing_file(config: DummyConfig, path: &Path) -> Result<Self> {
        let mut device = if path.exists() {
            let data = std::fs::read(path)?;
            log::debug!("Loaded dummy EEPROM from {}", path.display());
            Self::with_data(config, &data)
        } else {
            Self::new(config)
        };
        device.backing = Some(path.to_path_buf());
        Ok(device)
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Get the full EEPROM contents, linearised by the configured geometry
    pub fn eeprom(&self) -> &[u8] {
        &self.eeprom
    }

    /// Get mutable access to the EEPROM contents
    pub fn eeprom_mut(&mut self) -> &mut [u8] {
        &mut self.eeprom
    }

    /// Get `len` EEPROM bytes starting at `addr`
    pub fn region(&self, addr: EepromAddress, len: usize) -> Result<&[u8]> {
        self.config.geometry.check_span(addr, len)?;
        let start = self.config.geometry.linear(addr)? as usize;
        Ok(&self.eeprom[start..start + len])
    }

    /// Get the controller RAM
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    /// Whether the CPU is currently held in reset
    pub fn in_reset(&self) -> bool {
        self.in_reset
    }

    /// Whether firmware able to serve EEPROM requests is running
    pub fn firmware_running(&self) -> bool {
        self.firmware_running
    }

    /// Get the fault configuration
    pub fn faults_mut(&mut self) -> &mut Faults {
        &mut self.faults
    }

    /// Get every request seen so far
    pub fn journal(&self) -> &[Operation] {
        &self.journal
    }

    /// Forget the recorded requests
    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// Number of EEPROM write requests seen (including failed ones)
    pub fn eeprom_write_count(&self) -> usize {
        self.eeprom_writes
    }

    fn begin_request(&mut self) -> Result<()> {
        if let Some(limit) = self.faults.timeout_after {
            if self.requests >= limit {
                return Err(TransportFault::Timeout.into());
            }
        }
        self.requests += 1;
        Ok(())
    }

    fn eeprom_span(&self, index: u16, value: u16, len: usize) -> Result<(EepromAddress, usize)> {
        if !self.firmware_running {
            log::trace!("dummy: EEPROM request while boot ROM is running");
            return Err(TransportFault::NotReady.into());
        }
        if len > self.config.max_transfer || value as u32 + len as u32 > BLOCK_SIZE {
            return Err(TransportFault::RequestFailed.into());
        }
        let addr = EepromAddress::new((index >> 8) as u8, index as u8, value);
        let start = self
            .config
            .geometry
            .linear(addr)
            .map_err(|_| Error::from(TransportFault::RequestFailed))?;
        Ok((addr, start as usize))
    }

    fn eeprom_read(&mut self, index: u16, value: u16, buf: &mut [u8]) -> Result<usize> {
        let (addr, start) = self.eeprom_span(index, value, buf.len())?;
        self.journal.push(Operation::EepromRead {
            addr,
            len: buf.len(),
        });
        let len = self
            .faults
            .short_read
            .map_or(buf.len(), |limit| limit.min(buf.len()));
        buf[..len].copy_from_slice(&self.eeprom[start..start + len]);
        Ok(len)
    }

    fn eeprom_write(&mut self, index: u16, value: u16, data: &[u8]) -> Result<()> {
        let (addr, start) = self.eeprom_span(index, value, data.len())?;
        let nth = self.eeprom_writes;
        self.eeprom_writes += 1;

        if self.faults.eeprom_write_fail_at == Some(nth) {
            log::trace!("dummy: injected failure on EEPROM write #{}", nth);
            return Err(TransportFault::RequestFailed.into());
        }
        if let Some(range) = &self.faults.eeprom_write_fail_range {
            let end = (start + data.len()) as u32;
            if (start as u32) < range.end && range.start < end {
                log::trace!("dummy: injected failure on EEPROM write at {}", addr);
                return Err(TransportFault::RequestFailed.into());
            }
        }

        self.journal.push(Operation::EepromWrite {
            addr,
            len: data.len(),
        });
        self.eeprom[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn ram_write(&mut self, value: u16, data: &[u8]) -> Result<()> {
        let nth = self.ram_loads;
        self.ram_loads += 1;
        if self.faults.ram_load_fail_at == Some(nth) {
            return Err(TransportFault::RequestFailed.into());
        }
        if data.len() > self.config.max_transfer || value as usize + data.len() > RAM_SIZE {
            return Err(TransportFault::RequestFailed.into());
        }

        if value == CPUCS_ADDR && data.len() == 1 {
            match data[0] {
                CPUCS_RESET => {
                    self.in_reset = true;
                    self.firmware_running = false;
                    self.ram_loaded = false;
                }
                CPUCS_RUN => {
                    self.in_reset = false;
                    self.firmware_running = self.ram_loaded;
                }
                _ => return Err(TransportFault::RequestFailed.into()),
            }
            self.journal.push(Operation::CpuReset(self.in_reset));
            return Ok(());
        }

        self.journal.push(Operation::RamWrite {
            address: value,
            len: data.len(),
        });
        let start = value as usize;
        self.ram[start..start + data.len()].copy_from_slice(data);
        if self.in_reset {
            self.ram_loaded = true;
        }
        Ok(())
    }

    fn ram_read(&mut self, value: u16, buf: &mut [u8]) -> Result<usize> {
        let start = value as usize;
        if start + buf.len() > RAM_SIZE {
            return Err(TransportFault::RequestFailed.into());
        }
        buf.copy_from_slice(&self.ram[start..start + buf.len()]);
        Ok(buf.len())
    }
}

impl VendorTransport for DummyDevice {
    fn vendor_read(
        &mut self,
        request: u8,
        index: u16,
        value: u16,
        buf: &mut [u8],
    ) -> Result<usize> {
        self.begin_request()?;
        match request {
            REQ_EEPROM => self.eeprom_read(index, value, buf),
            REQ_RAM_LOAD => self.ram_read(value, buf),
            _ => Err(TransportFault::RequestFailed.into()),
        }
    }

    fn vendor_write(&mut self, request: u8, index: u16, value: u16, data: &[u8]) -> Result<()> {
        self.begin_request()?;
        match request {
            REQ_EEPROM => self.eeprom_write(index, value, data),
            REQ_RAM_LOAD => self.ram_write(value, data),
            _ => Err(TransportFault::RequestFailed.into()),
        }
    }

    fn vendor_info(&mut self) -> Result<VendorInfo> {
        Ok(self.config.info)
    }

    fn max_transfer_len(&self) -> usize {
        self.config.max_transfer
    }
}

impl Drop for DummyDevice {
    fn drop(&mut self) {
        if let Some(path) = &self.backing {
            if let Err(e) = std::fs::write(path, &self.eeprom) {
                log::warn!("Failed to save dummy EEPROM to {}: {}", path.display(), e);
            }
        }
    }
}

fn parse_hex_u16(key: &str, value: &str) -> std::result::Result<u16, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u16::from_str_radix(digits, 16).map_err(|_| format!("Invalid {}: {}", key, value))
}

/// Parse options from key=value pairs
///
/// Recognised keys: `vid`, `pid`, `did` (hex), `chunk` (decimal maximum
/// request size) and `image` (EEPROM backing file).
pub fn parse_options(
    options: &[(&str, &str)],
) -> std::result::Result<(DummyConfig, Option<PathBuf>), String> {
    let mut config = DummyConfig::default();
    let mut image = None;

    for (key, value) in options {
        match *key {
            "vid" => config.info.vendor_id = parse_hex_u16(key, value)?,
            "pid" => config.info.product_id = parse_hex_u16(key, value)?,
            "did" => config.info.device_id = parse_hex_u16(key, value)?,
            "chunk" => {
                config.max_transfer = value
                    .parse()
                    .ok()
                    .filter(|&n: &usize| n > 0)
                    .ok_or_else(|| format!("Invalid chunk: {}", value))?;
            }
            "image" => image = Some(PathBuf::from(value)),
            _ => return Err(format!("Unknown dummy option: {}", key)),
        }
    }

    Ok((config, image))
}

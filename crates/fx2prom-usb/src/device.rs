//! FX2 USB device
//!
//! Opens a camera controller with `nusb` and forwards vendor requests to
//! the default control pipe.

use std::time::Duration;

use fx2prom_core::error::{Result as CoreResult, TransportFault};
use fx2prom_core::family::CYPRESS_VENDOR_ID;
use fx2prom_core::transport::{VendorInfo, VendorTransport, DEFAULT_MAX_TRANSFER};
use nusb::transfer::{ControlIn, ControlOut, ControlType, Recipient, TransferError};
use nusb::{Interface, MaybeFuture};

use crate::error::{Result, UsbError};

/// Vendor IDs a camera controller may enumerate with
///
/// An unprogrammed controller reports the Cypress ID; a programmed one
/// reports the camera vendor's ID.
pub const KNOWN_VENDOR_IDS: &[u16] = &[CYPRESS_VENDOR_ID, 0x125C];

const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Options for opening a device
#[derive(Debug, Clone)]
pub struct Fx2UsbConfig {
    /// Vendor ID filter (None = any of [`KNOWN_VENDOR_IDS`])
    pub vendor_id: Option<u16>,
    /// Product ID filter
    pub product_id: Option<u16>,
    /// Index among matching devices
    pub device_index: usize,
    /// Timeout for each control transfer
    pub timeout: Duration,
}

impl Default for Fx2UsbConfig {
    fn default() -> Self {
        Self {
            vendor_id: None,
            product_id: None,
            device_index: 0,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl Fx2UsbConfig {
    fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        let vid_ok = match self.vendor_id {
            Some(vid) => vid == vendor_id,
            None => KNOWN_VENDOR_IDS.contains(&vendor_id),
        };
        vid_ok && self.product_id.map_or(true, |pid| pid == product_id)
    }
}

fn parse_hex_u16(key: &str, value: &str) -> Result<u16> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u16::from_str_radix(digits, 16)
        .map_err(|_| UsbError::InvalidParameter(format!("{}: {}", key, value)))
}

/// Parse options from key=value pairs
pub fn parse_options(options: &[(&str, &str)]) -> Result<Fx2UsbConfig> {
    let mut config = Fx2UsbConfig::default();

    for (key, value) in options {
        match *key {
            "vid" => config.vendor_id = Some(parse_hex_u16(key, value)?),
            "pid" => config.product_id = Some(parse_hex_u16(key, value)?),
            "device" | "index" => {
                config.device_index = value
                    .parse()
                    .map_err(|_| UsbError::InvalidParameter(format!("index: {}", value)))?;
            }
            "timeout" => {
                let ms: u64 = value
                    .parse()
                    .map_err(|_| UsbError::InvalidParameter(format!("timeout: {}", value)))?;
                config.timeout = Duration::from_millis(ms);
            }
            _ => {
                return Err(UsbError::InvalidParameter(format!(
                    "unknown option: {}",
                    key
                )));
            }
        }
    }

    Ok(config)
}

/// Summary of a connected device
#[derive(Debug, Clone)]
pub struct Fx2UsbDeviceInfo {
    /// USB bus number
    pub bus: u8,
    /// USB device address
    pub address: u8,
    /// Enumerated identity
    pub info: VendorInfo,
}

impl std::fmt::Display for Fx2UsbDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04X}:{:04X} at bus {} address {}",
            self.info.vendor_id, self.info.product_id, self.bus, self.address
        )
    }
}

fn vendor_info_of(device_info: &nusb::DeviceInfo) -> VendorInfo {
    VendorInfo {
        vendor_id: device_info.vendor_id(),
        product_id: device_info.product_id(),
        device_id: device_info.device_version(),
    }
}

fn map_transfer_error(e: TransferError) -> fx2prom_core::Error {
    log::debug!("Control transfer failed: {}", e);
    match e {
        TransferError::Cancelled => TransportFault::Timeout.into(),
        _ => TransportFault::RequestFailed.into(),
    }
}

/// FX2 camera controller reached over USB
pub struct Fx2Usb {
    interface: Interface,
    info: VendorInfo,
    timeout: Duration,
}

impl Fx2Usb {
    /// Open the first matching device
    pub fn open_first() -> Result<Self> {
        Self::open_with_config(Fx2UsbConfig::default())
    }

    /// Open a device with the specified configuration
    pub fn open_with_config(config: Fx2UsbConfig) -> Result<Self> {
        let devices: Vec<_> = nusb::list_devices()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?
            .filter(|d| config.matches(d.vendor_id(), d.product_id()))
            .collect();

        let device_info = devices
            .get(config.device_index)
            .ok_or(UsbError::DeviceNotFound)?;

        Self::try_open_device(device_info, &config)
    }

    fn try_open_device(device_info: &nusb::DeviceInfo, config: &Fx2UsbConfig) -> Result<Self> {
        let info = vendor_info_of(device_info);
        log::info!(
            "Opening {:04X}:{:04X} at bus {} address {}",
            info.vendor_id,
            info.product_id,
            device_info.busnum(),
            device_info.device_address()
        );

        let device = device_info
            .open()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?;

        let interface = device
            .claim_interface(0)
            .wait()
            .map_err(|e| UsbError::ClaimFailed(e.to_string()))?;

        Ok(Self {
            interface,
            info,
            timeout: config.timeout,
        })
    }

    /// List connected devices matching `config` (the index is ignored)
    pub fn list_devices(config: &Fx2UsbConfig) -> Result<Vec<Fx2UsbDeviceInfo>> {
        let devices = nusb::list_devices()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?
            .filter(|d| config.matches(d.vendor_id(), d.product_id()))
            .map(|d| Fx2UsbDeviceInfo {
                bus: d.busnum(),
                address: d.device_address(),
                info: vendor_info_of(&d),
            })
            .collect();

        Ok(devices)
    }
}

impl VendorTransport for Fx2Usb {
    fn vendor_read(
        &mut self,
        request: u8,
        index: u16,
        value: u16,
        buf: &mut [u8],
    ) -> CoreResult<usize> {
        let data = self
            .interface
            .control_in(
                ControlIn {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    length: buf.len() as u16,
                },
                self.timeout,
            )
            .wait()
            .map_err(map_transfer_error)?;

        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn vendor_write(&mut self, request: u8, index: u16, value: u16, data: &[u8]) -> CoreResult<()> {
        self.interface
            .control_out(
                ControlOut {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    data,
                },
                self.timeout,
            )
            .wait()
            .map_err(map_transfer_error)?;

        Ok(())
    }

    fn vendor_info(&mut self) -> CoreResult<VendorInfo> {
        Ok(self.info)
    }

    fn max_transfer_len(&self) -> usize {
        DEFAULT_MAX_TRANSFER
    }
}

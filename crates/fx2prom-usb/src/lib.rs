//! fx2prom-usb - USB transport for FX2-based imaging devices
//!
//! This crate opens the camera's FX2 controller through `nusb` and exposes
//! it as a [`VendorTransport`](fx2prom_core::transport::VendorTransport).
//! Every EEPROM and RAM access is a vendor control transfer on the default
//! pipe; no bulk endpoints are used.
//!
//! # Example
//!
//! ```no_run
//! use fx2prom_core::family::DeviceFamily;
//! use fx2prom_core::prom::Prom;
//! use fx2prom_usb::Fx2Usb;
//!
//! let mut usb = Fx2Usb::open_first()?;
//! let mut prom = Prom::new(&mut usb, DeviceFamily::STANDARD);
//! println!("Serial: {}", prom.serial_number()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Configuration Options
//!
//! - `vid=XXXX`: USB vendor ID in hex (default: any known camera VID)
//! - `pid=XXXX`: USB product ID in hex (default: any)
//! - `index=N` or `device=N`: Select the Nth matching device (0-indexed)
//! - `timeout=MS`: Per-request timeout in milliseconds (default: 5000)

mod device;
mod error;

pub use device::{parse_options, Fx2Usb, Fx2UsbConfig, Fx2UsbDeviceInfo, KNOWN_VENDOR_IDS};
pub use error::{Result, UsbError};

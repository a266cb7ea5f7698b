//! fx2prom-core - EEPROM and firmware programming for FX2-based imaging devices
//!
//! This crate implements the non-volatile-memory programming layer of a
//! USB-attached camera whose USB controller is an FX2-class microcontroller.
//! It is `no_std` (with `alloc`) so the same logic can run against any
//! [`VendorTransport`](transport::VendorTransport) implementation.
//!
//! # Layers
//!
//! - [`eeprom`] - bank/block/offset addressing, chunked transfers, the
//!   checksummed header and the packed string database
//! - [`firmware`] - firmware record images and RAM download
//! - [`program`] - the end-to-end programming sequence
//! - [`prom`] - a borrowing handle exposing the public device operations
//!
//! # Features
//!
//! - `std` - file loading, RON firmware tables and `std::error::Error`
//!
//! # Example
//!
//! ```ignore
//! use fx2prom_core::family::DeviceFamily;
//! use fx2prom_core::prom::Prom;
//!
//! fn show_serial<T: VendorTransport>(transport: &mut T) -> fx2prom_core::Result<()> {
//!     let mut prom = Prom::new(transport, DeviceFamily::STANDARD);
//!     println!("Serial: {}", prom.serial_number()?);
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod eeprom;
pub mod error;
pub mod family;
pub mod firmware;
pub mod program;
pub mod prom;
pub mod transport;

pub use error::{Error, Result};

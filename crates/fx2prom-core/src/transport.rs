//! Transport capability definitions
//!
//! The core never opens, enumerates or closes devices. Everything it needs
//! from the USB layer is expressed by [`VendorTransport`]: synchronous vendor
//! control requests in both directions plus the enumerated identity.

use crate::error::Result;

/// Vendor request that writes controller RAM (`value` = load address)
pub const REQ_RAM_LOAD: u8 = 0xA0;

/// Vendor request that reads or writes the on-board EEPROM
///
/// `index` carries `(bank << 8) | block`, `value` the block-local offset.
pub const REQ_EEPROM: u8 = 0xC6;

/// Controller CPU control/status register in RAM space
pub const CPUCS_ADDR: u16 = 0xE600;

/// Default maximum payload of a single vendor request
pub const DEFAULT_MAX_TRANSFER: usize = 4096;

/// USB identity reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VendorInfo {
    /// USB vendor ID (idVendor)
    pub vendor_id: u16,
    /// USB product ID (idProduct)
    pub product_id: u16,
    /// Device release number (bcdDevice)
    pub device_id: u16,
}

/// Vendor-request transport (blocking)
///
/// Implementations issue one USB control transfer per call and block until
/// it completes. Failures and timeouts are reported as
/// [`Error::Transport`](crate::Error::Transport).
///
/// ## Example: forwarding to a USB handle
///
/// ```ignore
/// impl VendorTransport for MyUsb {
///     fn vendor_read(&mut self, request: u8, index: u16, value: u16, buf: &mut [u8]) -> Result<usize> {
///         self.control_in(request, value, index, buf)
///             .map_err(|_| TransportFault::RequestFailed.into())
///     }
///     // ...
/// }
/// ```
pub trait VendorTransport {
    /// Issue a device-to-host vendor request
    ///
    /// Returns the number of bytes placed in `buf`, which may be less than
    /// `buf.len()`. Callers decide whether a short transfer is an error.
    fn vendor_read(&mut self, request: u8, index: u16, value: u16, buf: &mut [u8])
        -> Result<usize>;

    /// Issue a host-to-device vendor request carrying `data`
    fn vendor_write(&mut self, request: u8, index: u16, value: u16, data: &[u8]) -> Result<()>;

    /// Get the enumerated vendor/product/device identifiers
    fn vendor_info(&mut self) -> Result<VendorInfo>;

    /// Get the maximum number of bytes a single request may carry
    fn max_transfer_len(&self) -> usize {
        DEFAULT_MAX_TRANSFER
    }
}

impl<T: VendorTransport + ?Sized> VendorTransport for &mut T {
    fn vendor_read(
        &mut self,
        request: u8,
        index: u16,
        value: u16,
        buf: &mut [u8],
    ) -> Result<usize> {
        (**self).vendor_read(request, index, value, buf)
    }

    fn vendor_write(&mut self, request: u8, index: u16, value: u16, data: &[u8]) -> Result<()> {
        (**self).vendor_write(request, index, value, data)
    }

    fn vendor_info(&mut self) -> Result<VendorInfo> {
        (**self).vendor_info()
    }

    fn max_transfer_len(&self) -> usize {
        (**self).max_transfer_len()
    }
}

impl<T: VendorTransport + ?Sized> VendorTransport for alloc::boxed::Box<T> {
    fn vendor_read(
        &mut self,
        request: u8,
        index: u16,
        value: u16,
        buf: &mut [u8],
    ) -> Result<usize> {
        (**self).vendor_read(request, index, value, buf)
    }

    fn vendor_write(&mut self, request: u8, index: u16, value: u16, data: &[u8]) -> Result<()> {
        (**self).vendor_write(request, index, value, data)
    }

    fn vendor_info(&mut self) -> Result<VendorInfo> {
        (**self).vendor_info()
    }

    fn max_transfer_len(&self) -> usize {
        (**self).max_transfer_len()
    }
}

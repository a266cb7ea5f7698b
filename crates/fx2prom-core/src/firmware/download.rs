//! RAM download of firmware images

use crate::error::Result;
use crate::transport::{VendorTransport, CPUCS_ADDR, REQ_RAM_LOAD};

use super::image::FirmwareImage;

/// CPUCS value that holds the controller CPU in reset
pub const CPUCS_RESET: u8 = 0x01;

/// CPUCS value that lets the controller CPU run
pub const CPUCS_RUN: u8 = 0x00;

fn set_cpucs<T: VendorTransport + ?Sized>(transport: &mut T, value: u8) -> Result<()> {
    transport.vendor_write(REQ_RAM_LOAD, 0, CPUCS_ADDR, &[value])
}

/// Download `image` into controller RAM and start it
///
/// The CPU is held in reset while the records are written in order, then
/// released. The first failing request aborts the download and leaves the
/// controller in reset; the download is not resumable.
pub fn download_firmware<T: VendorTransport + ?Sized>(
    transport: &mut T,
    image: &FirmwareImage,
) -> Result<()> {
    let records = image.data_records();
    log::debug!(
        "Downloading firmware: {} records, {} bytes",
        records.len(),
        image.payload_len()
    );

    set_cpucs(transport, CPUCS_RESET)?;
    for record in records {
        log::trace!(
            "RAM load 0x{:04X} len {}",
            record.load_address,
            record.byte_count
        );
        transport.vendor_write(REQ_RAM_LOAD, 0, record.load_address, record.payload())?;
    }
    set_cpucs(transport, CPUCS_RUN)?;

    log::debug!("Firmware download complete, controller released from reset");
    Ok(())
}

//! Chunked EEPROM reads and writes

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Error, Result, TransportFault};
use crate::transport::{VendorTransport, REQ_EEPROM};

use super::address::{EepromAddress, EepromGeometry};

/// Walk `[addr, addr + len)` in transfer-sized pieces
///
/// Each piece is at most `max_transfer` bytes and never crosses a block
/// boundary. Yields `(address, start, end)` where `start..end` indexes the
/// caller's buffer.
struct Chunks {
    geometry: EepromGeometry,
    next: EepromAddress,
    done: usize,
    len: usize,
    max_transfer: usize,
}

impl Chunks {
    fn new(
        geometry: EepromGeometry,
        addr: EepromAddress,
        len: usize,
        max_transfer: usize,
    ) -> Result<Self> {
        geometry.check_span(addr, len)?;
        Ok(Self {
            geometry,
            next: addr,
            done: 0,
            len,
            // A zero limit would never make progress
            max_transfer: max_transfer.max(1),
        })
    }
}

impl Iterator for Chunks {
    type Item = (EepromAddress, usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done >= self.len {
            return None;
        }
        let addr = self.next;
        let chunk = (self.len - self.done)
            .min(self.max_transfer)
            .min(addr.block_remaining() as usize);
        let start = self.done;
        self.done += chunk;
        if self.done < self.len {
            // The span was checked up front, so only the final chunk can
            // end exactly at the top of the EEPROM.
            self.next = self.geometry.advance(addr, chunk as u32).ok()?;
        }
        Some((addr, start, start + chunk))
    }
}

/// Read `buf.len()` bytes starting at `addr`
///
/// Chunks are issued sequentially. A failed or short transfer aborts the
/// read; the contents of `buf` are unspecified afterwards.
pub fn read_eeprom_into<T: VendorTransport + ?Sized>(
    transport: &mut T,
    geometry: EepromGeometry,
    addr: EepromAddress,
    buf: &mut [u8],
) -> Result<()> {
    let chunks = Chunks::new(geometry, addr, buf.len(), transport.max_transfer_len())?;
    for (at, start, end) in chunks {
        log::trace!("EEPROM read {} len {}", at, end - start);
        let piece = &mut buf[start..end];
        let actual = transport.vendor_read(
            REQ_EEPROM,
            at.request_index(),
            at.request_value(),
            piece,
        )?;
        if actual != piece.len() {
            return Err(TransportFault::ShortTransfer {
                requested: piece.len(),
                actual,
            }
            .into());
        }
    }
    Ok(())
}

/// Read `len` bytes starting at `addr` into a new buffer
pub fn read_eeprom<T: VendorTransport + ?Sized>(
    transport: &mut T,
    geometry: EepromGeometry,
    addr: EepromAddress,
    len: usize,
) -> Result<Vec<u8>> {
    // Range check before allocating
    geometry.check_span(addr, len)?;
    let mut buf = vec![0u8; len];
    read_eeprom_into(transport, geometry, addr, &mut buf)?;
    Ok(buf)
}

/// Write `data` starting at `addr`
///
/// The write is not atomic: if a chunk fails, earlier chunks stay written
/// and the rest of the region is left as it was.
pub fn write_eeprom<T: VendorTransport + ?Sized>(
    transport: &mut T,
    geometry: EepromGeometry,
    addr: EepromAddress,
    data: &[u8],
) -> Result<()> {
    let chunks = Chunks::new(geometry, addr, data.len(), transport.max_transfer_len())?;
    for (at, start, end) in chunks {
        log::trace!("EEPROM write {} len {}", at, end - start);
        transport.vendor_write(
            REQ_EEPROM,
            at.request_index(),
            at.request_value(),
            &data[start..end],
        )?;
    }
    Ok(())
}

/// Read back `expected.len()` bytes at `addr` and compare
pub fn verify_eeprom<T: VendorTransport + ?Sized>(
    transport: &mut T,
    geometry: EepromGeometry,
    addr: EepromAddress,
    expected: &[u8],
) -> Result<()> {
    let actual = read_eeprom(transport, geometry, addr, expected.len())?;
    match actual.iter().zip(expected).position(|(a, e)| a != e) {
        Some(offset) => Err(Error::VerifyMismatch { offset }),
        None => Ok(()),
    }
}

/// Read a region image from a file in full
#[cfg(feature = "std")]
pub fn load_region_file(path: &std::path::Path) -> Result<Vec<u8>> {
    let data = std::fs::read(path)?;
    log::debug!("Read {} ({} bytes)", path.display(), data.len());
    Ok(data)
}

/// Write the whole of a file starting at `addr`
///
/// Returns the number of bytes written.
#[cfg(feature = "std")]
pub fn write_file_to_eeprom<T: VendorTransport + ?Sized>(
    transport: &mut T,
    geometry: EepromGeometry,
    path: &std::path::Path,
    addr: EepromAddress,
) -> Result<u32> {
    let data = load_region_file(path)?;
    log::debug!("Writing {} to EEPROM at {}", path.display(), addr);
    write_eeprom(transport, geometry, addr, &data)?;
    Ok(data.len() as u32)
}

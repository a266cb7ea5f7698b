//! Banked EEPROM addressing
//!
//! The EEPROM is organised as banks of blocks; each block spans the full
//! 16-bit offset range. Offsets are block-local, so a transfer that runs
//! past the end of a block continues at offset 0 of the next block, and a
//! transfer that runs past the last block continues in the next bank.

use core::fmt;

use crate::error::{Error, Result};

/// Bytes addressable inside one block (the full `u16` offset range)
pub const BLOCK_SIZE: u32 = 0x1_0000;

/// A (bank, block, offset) location inside the EEPROM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EepromAddress {
    /// Bank number
    pub bank: u8,
    /// Block number within the bank
    pub block: u8,
    /// Byte offset within the block
    pub offset: u16,
}

impl EepromAddress {
    /// Create an address
    pub const fn new(bank: u8, block: u8, offset: u16) -> Self {
        Self {
            bank,
            block,
            offset,
        }
    }

    /// `wIndex` of the vendor request that targets this address
    pub const fn request_index(&self) -> u16 {
        ((self.bank as u16) << 8) | self.block as u16
    }

    /// `wValue` of the vendor request that targets this address
    pub const fn request_value(&self) -> u16 {
        self.offset
    }

    /// Bytes left in this address's block
    pub const fn block_remaining(&self) -> u32 {
        BLOCK_SIZE - self.offset as u32
    }
}

impl fmt::Display for EepromAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:0x{:04X}", self.bank, self.block, self.offset)
    }
}

/// Bank and block counts of one EEPROM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EepromGeometry {
    /// Number of banks
    pub banks: u8,
    /// Number of blocks per bank
    pub blocks: u8,
}

impl EepromGeometry {
    /// Create a geometry
    pub const fn new(banks: u8, blocks: u8) -> Self {
        Self { banks, blocks }
    }

    /// Total addressable bytes
    pub const fn capacity(&self) -> u32 {
        self.banks as u32 * self.blocks as u32 * BLOCK_SIZE
    }

    /// Check that `addr` names an existing bank and block
    pub fn contains(&self, addr: EepromAddress) -> bool {
        addr.bank < self.banks && addr.block < self.blocks
    }

    /// Position of `addr` counted from bank 0, block 0, offset 0
    pub fn linear(&self, addr: EepromAddress) -> Result<u32> {
        if !self.contains(addr) {
            return Err(Error::AddressOutOfRange);
        }
        let block_index = addr.bank as u32 * self.blocks as u32 + addr.block as u32;
        Ok(block_index * BLOCK_SIZE + addr.offset as u32)
    }

    /// Inverse of [`linear`](Self::linear)
    pub fn from_linear(&self, pos: u32) -> Result<EepromAddress> {
        if pos >= self.capacity() {
            return Err(Error::AddressOutOfRange);
        }
        let block_index = pos / BLOCK_SIZE;
        Ok(EepromAddress {
            bank: (block_index / self.blocks as u32) as u8,
            block: (block_index % self.blocks as u32) as u8,
            offset: (pos % BLOCK_SIZE) as u16,
        })
    }

    /// Check that `len` bytes starting at `addr` fit in the EEPROM
    pub fn check_span(&self, addr: EepromAddress, len: usize) -> Result<()> {
        let start = self.linear(addr)? as u64;
        if start + len as u64 > self.capacity() as u64 {
            return Err(Error::AddressOutOfRange);
        }
        Ok(())
    }

    /// Advance `addr` by `count` bytes, carrying offset into block into bank
    ///
    /// Advancing exactly to the end of the EEPROM is an error, since the
    /// result would not name a byte.
    pub fn advance(&self, addr: EepromAddress, count: u32) -> Result<EepromAddress> {
        let pos = self.linear(addr)? as u64 + count as u64;
        if pos >= self.capacity() as u64 {
            return Err(Error::AddressOutOfRange);
        }
        self.from_linear(pos as u32)
    }
}

//! EEPROM access
//!
//! This module provides banked addressing, chunked vendor-request transfers,
//! the checksummed EEPROM header and the packed string database.

mod address;
mod header;
mod strdb;
mod transfer;

pub use address::{EepromAddress, EepromGeometry, BLOCK_SIZE};
pub use header::{
    calc_header_checksum, read_header, read_state, write_header, EepromHeader, HeaderFields,
    PromState, HEADER_LEN, HEADER_VERSION,
};
pub use strdb::{pack_strings, unpack_strings, StrDb, MAX_STRINGS, MAX_STRING_LEN, STR_DB_LEN};
pub use transfer::*;

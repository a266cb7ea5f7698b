//! Error types for fx2prom-core
//!
//! This module provides a no_std compatible error type that is shared by the
//! transfer, firmware, header and orchestration layers. Transport backends
//! map their own failures onto [`Error::Transport`].

use core::fmt;

/// Details about a failed vendor request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFault {
    /// The request was rejected or the USB transfer failed
    RequestFailed,
    /// The device returned fewer bytes than were requested
    ShortTransfer {
        /// Bytes asked for
        requested: usize,
        /// Bytes actually transferred
        actual: usize,
    },
    /// The request timed out or was cancelled by the transport
    Timeout,
    /// The device is not in a state where it accepts the request
    /// (e.g. EEPROM access before the bootstrap firmware is running)
    NotReady,
}

/// Why a stored header was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFault {
    /// Stored checksum does not match the recomputed one
    Checksum {
        /// Checksum byte read from the EEPROM
        stored: u8,
        /// Checksum computed over the bytes read
        computed: u8,
    },
    /// The self-describing size field does not match the header length
    Size(u8),
}

/// Why a packed structure could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpackFault {
    /// Input ended in the middle of a record or string
    Truncated,
    /// String count exceeds the database limit
    TooManyStrings,
    /// A string is longer than its length prefix allows
    StringTooLong,
    /// String bytes are not valid UTF-8
    InvalidUtf8,
    /// A firmware record claims more bytes than it can hold
    RecordOverflow,
    /// A firmware image has no end-of-image record
    MissingSentinel,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A USB vendor request failed or transferred too few bytes
    Transport(TransportFault),
    /// A file could not be opened or read
    Io,
    /// The EEPROM header failed validation
    HeaderCorrupt(HeaderFault),
    /// A string database or firmware record table is malformed
    Unpack(UnpackFault),
    /// The bank/block/offset span does not fit the EEPROM geometry
    AddressOutOfRange,
    /// The packed string database does not fit its reserved area
    StringDbOverflow,
    /// Read-back data differs from what was written
    VerifyMismatch {
        /// Byte offset (relative to the start of the region) of the first difference
        offset: usize,
    },
    /// The device needs bootstrap firmware but none was supplied
    MissingFirmware,
    /// An image is larger than the region reserved for it
    ImageTooLarge {
        /// Image length in bytes
        len: usize,
        /// Region capacity in bytes
        max: usize,
    },
}

impl Error {
    /// Returns true for any member of the transport error family
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if the error only means "no valid header present"
    pub fn is_header_corrupt(&self) -> bool {
        matches!(self, Self::HeaderCorrupt(_))
    }
}

impl From<TransportFault> for Error {
    fn from(fault: TransportFault) -> Self {
        Self::Transport(fault)
    }
}

impl From<UnpackFault> for Error {
    fn from(fault: UnpackFault) -> Self {
        Self::Unpack(fault)
    }
}

impl fmt::Display for TransportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed => write!(f, "vendor request failed"),
            Self::ShortTransfer { requested, actual } => write!(
                f,
                "short transfer: requested {} bytes, got {}",
                requested, actual
            ),
            Self::Timeout => write!(f, "vendor request timed out"),
            Self::NotReady => write!(f, "device not ready for request"),
        }
    }
}

impl fmt::Display for HeaderFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checksum { stored, computed } => write!(
                f,
                "checksum mismatch (stored 0x{:02X}, computed 0x{:02X})",
                stored, computed
            ),
            Self::Size(size) => write!(f, "unexpected header size {}", size),
        }
    }
}

impl fmt::Display for UnpackFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "truncated data"),
            Self::TooManyStrings => write!(f, "too many strings"),
            Self::StringTooLong => write!(f, "string too long"),
            Self::InvalidUtf8 => write!(f, "invalid UTF-8 in string"),
            Self::RecordOverflow => write!(f, "record byte count exceeds capacity"),
            Self::MissingSentinel => write!(f, "missing end-of-image record"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(fault) => write!(f, "transport error: {}", fault),
            Self::Io => write!(f, "I/O error"),
            Self::HeaderCorrupt(fault) => write!(f, "EEPROM header corrupt: {}", fault),
            Self::Unpack(fault) => write!(f, "unpack error: {}", fault),
            Self::AddressOutOfRange => write!(f, "EEPROM address out of range"),
            Self::StringDbOverflow => write!(f, "string database does not fit"),
            Self::VerifyMismatch { offset } => {
                write!(f, "verify failed: data mismatch at offset 0x{:X}", offset)
            }
            Self::MissingFirmware => write!(f, "bootstrap firmware required but not provided"),
            Self::ImageTooLarge { len, max } => {
                write!(f, "image of {} bytes exceeds its {}-byte region", len, max)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        log::error!("I/O error: {}", e);
        Self::Io
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

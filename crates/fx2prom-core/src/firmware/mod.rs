//! Firmware record images
//!
//! A firmware image is an ordered list of load records, each carrying up to
//! [`RECORD_CAPACITY`] bytes for one RAM address, terminated by a single
//! end-of-image record. Images are built once from an injected table and
//! then downloaded into controller RAM while the CPU is held in reset.

mod download;
mod image;
mod record;

#[cfg(feature = "std")]
mod table;

pub use download::{download_firmware, CPUCS_RESET, CPUCS_RUN};
pub use image::{build_record_sequence, FirmwareImage};
pub use record::{FirmwareRecord, RecordDef, RECORD_CAPACITY, RECORD_TYPE_DATA, RECORD_TYPE_EOF};

#[cfg(feature = "std")]
pub use table::{load_image_file, FirmwareTable, FirmwareTableError};

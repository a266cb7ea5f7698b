//! CLI command implementations
//!
//! Every command takes an already-opened transport and drives it through
//! [`fx2prom_core::prom::Prom`] for the standard device family.

pub mod eeprom;
mod list;
pub mod program;
pub mod strdb;

use indicatif::ProgressStyle;

pub use list::{list_devices, list_transports};

/// Byte-count progress bar style shared by read, write and verify
fn bytes_style() -> Result<ProgressStyle, Box<dyn std::error::Error>> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}")?
        .progress_chars("#>-"))
}

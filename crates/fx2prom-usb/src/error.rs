//! Error types for the USB transport

use thiserror::Error;

/// Result type for USB transport operations
pub type Result<T> = std::result::Result<T, UsbError>;

/// Errors that can occur when opening or configuring a device
#[derive(Debug, Error)]
pub enum UsbError {
    /// No matching device
    #[error("No matching FX2 device found")]
    DeviceNotFound,

    /// Failed to enumerate or open the device
    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    /// Failed to claim the interface
    #[error("Failed to claim interface: {0}")]
    ClaimFailed(String),

    /// Bad `key=value` option
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

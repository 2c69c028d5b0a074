//! Error types for the Art Box display controller.

use std::path::PathBuf;

/// Errors that can occur while driving the display and its hardware.
#[derive(Debug, thiserror::Error)]
pub enum ArtboxError {
    /// A bus transfer failed (channel select, expander read, or LCD write).
    #[error("I2C error on channel {channel} at 0x{address:02X}: {kind:?}")]
    Bus {
        /// The multiplexer channel in use.
        channel: u8,
        /// The 7-bit device address.
        address: u8,
        /// The embedded-hal error classification.
        kind: embedded_hal::i2c::ErrorKind,
    },

    /// A multiplexer channel outside 0-7 was requested.
    #[error("Invalid multiplexer channel {0} (expected 0-7)")]
    InvalidChannel(u8),

    /// Reading a GPIO input failed.
    #[error("GPIO read failed: {0:?}")]
    Gpio(embedded_hal::digital::ErrorKind),

    /// The frame surface rejected a frame.
    #[error("Failed to present frame: {0}")]
    Present(String),

    /// A configuration value was outside its valid range.
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig {
        /// The offending field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// A labels file is not in a recognized form.
    #[error("Invalid labels: {0}")]
    InvalidLabels(String),

    /// A configuration or labels file could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error occurred (e.g., reading the config file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An image could not be made available for display.
///
/// This is the "not available" result of an image lookup; it is never fatal.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// No file exists at the resolved path.
    #[error("Image not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be decoded.
    #[error("Failed to decode {}: {reason}", path.display())]
    Decode {
        /// The file that failed to decode.
        path: PathBuf,
        /// The decoder's description of the failure.
        reason: String,
    },
}

impl ImageError {
    /// The path this error refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            ImageError::NotFound(path) => path,
            ImageError::Decode { path, .. } => path,
        }
    }
}

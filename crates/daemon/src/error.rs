//! Adapter error types
//!
//! Every variant ends only the adapter task that hit it; the hotplug
//! supervisor starts a fresh adapter if the device shows up again.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// Device vanished or refused access between detection and open
    #[error("Failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No USB device matched the requested location or ids
    #[error("Device not found: {0}")]
    NotFound(String),

    /// Device has no usable bulk endpoints
    #[error("Unsupported device: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

//! Protocol error types

use thiserror::Error;

/// Protocol-level errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Vendor/product filter string could not be parsed
    #[error("Invalid device identity '{input}': {reason}")]
    InvalidIdentity { input: String, reason: String },

    /// Frame did not start with the `00 00 FF` preamble
    #[error("Invalid frame preamble")]
    InvalidPreamble,

    /// Length checksum (LCS) mismatch
    #[error("Length checksum mismatch: len={len:#04x}, lcs={lcs:#04x}")]
    LengthChecksum { len: u8, lcs: u8 },

    /// Data checksum (DCS) mismatch
    #[error("Data checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    DataChecksum { expected: u8, actual: u8 },

    /// Payload exceeds what a normal information frame can carry
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Incomplete frame data
    #[error("Incomplete frame: expected {expected} bytes, got {actual}")]
    IncompleteFrame { expected: usize, actual: usize },

    /// Controller answered with the syntax error frame
    #[error("Controller reported an application-level error")]
    ErrorFrame,

    /// Controller did not acknowledge a command
    #[error("Command {code:#04x} was not acknowledged")]
    MissingAck { code: u8 },

    /// Controller answered with an unexpected frame identifier or command
    #[error("Unexpected response: tfi={tfi:#04x}, code={code:#04x}")]
    UnexpectedResponse { tfi: u8, code: u8 },

    /// Controller status byte was non-zero
    #[error("Controller status error: {0:#04x}")]
    Status(u8),
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;

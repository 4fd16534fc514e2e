//! Scan events and the published line format
//!
//! Every scan is published as one line:
//! ```text
//! <identity> found <label> : <payload>
//! ```
//! An unset identity is written as `None` so downstream parsers always see
//! four fields before the colon.

use std::fmt;

/// Identity written when `CB_BARCODE_IDENTITY` is not set
pub const UNSET_IDENTITY: &str = "None";

/// Which kind of reader produced a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLabel {
    /// Contactless tag identifier
    Nfc,
    /// Barcode from a keyboard-style scanner or stdin
    Barcode,
}

impl SourceLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceLabel::Nfc => "NFC",
            SourceLabel::Barcode => "bar",
        }
    }
}

impl fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub source: SourceLabel,
    pub payload: String,
}

impl ScanEvent {
    pub fn barcode(payload: impl Into<String>) -> Self {
        Self {
            source: SourceLabel::Barcode,
            payload: payload.into(),
        }
    }

    /// Tag identifier, hex-encoded lowercase
    pub fn nfc(identifier: &[u8]) -> Self {
        Self {
            source: SourceLabel::Nfc,
            payload: hex::encode(identifier),
        }
    }

    /// Render the published line (without trailing newline)
    pub fn to_line(&self, identity: Option<&str>) -> String {
        format!(
            "{} found {} : {}",
            identity.unwrap_or(UNSET_IDENTITY),
            self.source,
            self.payload
        )
    }
}

//! Vendor/product identity filters
//!
//! Scanners are selected by their USB vendor id and, optionally, product
//! id, written as `vvvv` or `vvvv:pppp` in hexadecimal. Ids are kept as
//! zero-padded, lowercase 4-digit strings because that is how udev reports
//! `ID_VENDOR_ID` and `ID_MODEL_ID`.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A vendor id with an optional product id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceIdentity {
    pub vendor_id: String,
    pub product_id: Option<String>,
}

impl DeviceIdentity {
    /// Identity matching every product of a vendor
    pub fn vendor(vendor_id: impl Into<String>) -> Self {
        Self {
            vendor_id: vendor_id.into().to_ascii_lowercase(),
            product_id: None,
        }
    }

    /// Identity matching a single vendor/product pair
    pub fn vendor_product(vendor_id: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            vendor_id: vendor_id.into().to_ascii_lowercase(),
            product_id: Some(product_id.into().to_ascii_lowercase()),
        }
    }

    /// Vendor id as a number, for transports that address devices numerically
    pub fn vendor_u16(&self) -> Option<u16> {
        u16::from_str_radix(&self.vendor_id, 16).ok()
    }

    /// Product id as a number
    pub fn product_u16(&self) -> Option<u16> {
        self.product_id
            .as_deref()
            .and_then(|p| u16::from_str_radix(p, 16).ok())
    }

    fn parse_part(input: &str, part: &str, name: &str) -> Result<String> {
        if part.is_empty() || part.len() > 4 {
            return Err(ProtocolError::InvalidIdentity {
                input: input.to_string(),
                reason: format!("{} id must be 1-4 hex digits", name),
            });
        }
        if !part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ProtocolError::InvalidIdentity {
                input: input.to_string(),
                reason: format!("{} id is not hexadecimal", name),
            });
        }
        Ok(format!("{:0>4}", part.to_ascii_lowercase()))
    }
}

impl FromStr for DeviceIdentity {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let mut parts = trimmed.split(':');

        let vendor = parts.next().unwrap_or_default();
        let vendor_id = Self::parse_part(s, vendor, "vendor")?;

        let product_id = match parts.next() {
            Some(product) => Some(Self::parse_part(s, product, "product")?),
            None => None,
        };

        if parts.next().is_some() {
            return Err(ProtocolError::InvalidIdentity {
                input: s.to_string(),
                reason: "expected vvvv or vvvv:pppp".to_string(),
            });
        }

        Ok(Self {
            vendor_id,
            product_id,
        })
    }
}

impl TryFrom<String> for DeviceIdentity {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DeviceIdentity> for String {
    fn from(identity: DeviceIdentity) -> Self {
        identity.to_string()
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.product_id {
            Some(product) => write!(f, "{}:{}", self.vendor_id, product),
            None => write!(f, "{}", self.vendor_id),
        }
    }
}

//! Protocol library for barcode-daemon
//!
//! This crate defines the data that flows through the daemon, independent of
//! any I/O:
//!
//! - [`DeviceIdentity`]: vendor/product filters selecting scanner hardware
//! - [`DeviceEvent`]: owned snapshots of hotplug notifications
//! - [`ScanEvent`]: normalized scans and the line format they are published in
//! - [`pn533`]: the frame codec for PN533 contactless controllers
//!
//! # Example
//!
//! ```
//! use protocol::{DeviceIdentity, ScanEvent};
//!
//! let filter: DeviceIdentity = "05e0:1200".parse().unwrap();
//! assert_eq!(filter.product_id.as_deref(), Some("1200"));
//!
//! let scan = ScanEvent::barcode("4006381333931");
//! assert_eq!(scan.to_line(Some("till")), "till found bar : 4006381333931");
//! ```

pub mod device;
pub mod error;
pub mod identity;
pub mod pn533;
pub mod scan;

pub use device::{DeviceAction, DeviceEvent, Subsystem};
pub use error::{ProtocolError, Result};
pub use identity::DeviceIdentity;
pub use scan::{ScanEvent, SourceLabel, UNSET_IDENTITY};

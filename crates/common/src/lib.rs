//! Common utilities for barcode-daemon
//!
//! This crate provides functionality shared by the daemon's components:
//! error handling, logging setup, the scan event sink, and the async
//! channel bridge between the hotplug monitor thread and the Tokio runtime.

pub mod channel;
pub mod error;
pub mod logging;
pub mod sink;
pub mod test_utils;

pub use channel::{HotplugFeed, HotplugPublisher, create_hotplug_bridge};
pub use error::{Error, Result};
pub use logging::setup_logging;
pub use sink::{IDENTITY_ENV, LineSink, ScanSink, StdoutSink};

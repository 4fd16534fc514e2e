//! barcode-daemon
//!
//! Watches for barcode scanners and NFC readers as they are plugged in,
//! starts a reader task for each one that matches the configured
//! vendor/product filters, and prints every scan to stdout as
//! `<identity> found <label> : <payload>`.

#[cfg(not(target_os = "linux"))]
compile_error!("barcode-daemon relies on udev and evdev and only builds on Linux");

pub mod adapters;
pub mod config;
pub mod error;
pub mod hotplug;
pub mod registry;
pub mod supervisor;

pub use adapters::{AdapterKind, AdapterLauncher, DeviceLauncher, SpawnRequest};
pub use config::{DaemonConfig, NfcSettings};
pub use error::{AdapterError, AdapterResult};
pub use hotplug::Filters;
pub use registry::{AdapterTask, TaskRegistry};
pub use supervisor::Supervisor;

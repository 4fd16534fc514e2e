//! Hotplug subsystem
//!
//! Finds scanners as they come and go:
//! - the monitor thread turns udev records into [`protocol::DeviceEvent`]s
//! - the matcher decides which events start an adapter
//!
//! Supervision of the adapters themselves lives in [`crate::supervisor`].

pub mod matcher;
pub mod monitor;

pub use matcher::{Filters, matches, spawn_decision};
pub use monitor::{list_devices, spawn_hotplug_monitor};

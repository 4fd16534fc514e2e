//! Device notifications as seen by the hotplug supervisor
//!
//! These are owned snapshots of platform device records, so they can cross
//! from the monitor thread into the async runtime.

use std::fmt;
use std::path::PathBuf;

/// What happened to a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceAction {
    /// Device was already attached when the daemon started
    Enumerate,
    /// Device was plugged in
    Add,
    /// Device was unplugged
    Remove,
    /// Any other notification (change, bind, unbind, ...)
    Change,
}

impl DeviceAction {
    /// Whether this action announces a device that is now present
    pub fn is_arrival(self) -> bool {
        matches!(self, DeviceAction::Enumerate | DeviceAction::Add)
    }

    /// Map a udev action string
    pub fn from_udev(action: &str) -> Self {
        match action {
            "add" => DeviceAction::Add,
            "remove" => DeviceAction::Remove,
            _ => DeviceAction::Change,
        }
    }
}

impl fmt::Display for DeviceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceAction::Enumerate => "enumerate",
            DeviceAction::Add => "add",
            DeviceAction::Remove => "remove",
            DeviceAction::Change => "change",
        };
        f.write_str(s)
    }
}

/// Kernel subsystem a device belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subsystem {
    /// Input devices (`/dev/input/event*`)
    Input,
    /// Raw USB devices (`/dev/bus/usb/BBB/DDD`)
    Usb,
    Other(String),
}

impl Subsystem {
    pub fn as_str(&self) -> &str {
        match self {
            Subsystem::Input => "input",
            Subsystem::Usb => "usb",
            Subsystem::Other(name) => name,
        }
    }
}

impl From<&str> for Subsystem {
    fn from(name: &str) -> Self {
        match name {
            "input" => Subsystem::Input,
            "usb" => Subsystem::Usb,
            other => Subsystem::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single device notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEvent {
    pub action: DeviceAction,
    pub subsystem: Subsystem,
    /// `ID_VENDOR_ID`, lowercase hex
    pub vendor_id: Option<String>,
    /// `ID_MODEL_ID`, lowercase hex
    pub product_id: Option<String>,
    /// Device node, absent for nodes udev has not assigned a path to
    pub device_path: Option<PathBuf>,
}

impl DeviceEvent {
    pub fn new(action: DeviceAction, subsystem: Subsystem) -> Self {
        Self {
            action,
            subsystem,
            vendor_id: None,
            product_id: None,
            device_path: None,
        }
    }

    pub fn with_ids(mut self, vendor_id: &str, product_id: &str) -> Self {
        self.vendor_id = Some(vendor_id.to_ascii_lowercase());
        self.product_id = Some(product_id.to_ascii_lowercase());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.device_path = Some(path.into());
        self
    }
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}:{} {}",
            self.action,
            self.subsystem,
            self.vendor_id.as_deref().unwrap_or("????"),
            self.product_id.as_deref().unwrap_or("????"),
            self.device_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string())
        )
    }
}

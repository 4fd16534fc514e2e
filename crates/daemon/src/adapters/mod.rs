//! Input adapters
//!
//! Each adapter owns one scan source and turns its raw protocol into
//! [`ScanEvent`]s handed to the sink:
//! - [`keyboard`]: keyboard-emulation scanners read through evdev
//! - [`nfc`]: contactless readers, with tag debouncing
//! - [`stdin`]: newline-delimited barcodes on standard input
//!
//! Device adapters block on their device, so they run on Tokio's blocking
//! pool; each ends on its own when its device errors or disappears.

pub mod keyboard;
pub mod keymap;
pub mod nfc;
pub mod pn533;
pub mod stdin;

use crate::config::NfcSettings;
use crate::error::AdapterResult;
use common::ScanSink;
use protocol::{DeviceIdentity, ScanEvent};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Registry path used for the stdin reader
pub const STDIN_PATH: &str = "-";

/// Kind of scan source an adapter reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    Keyboard,
    Nfc,
    Stdin,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdapterKind::Keyboard => "HID",
            AdapterKind::Nfc => "NFC",
            AdapterKind::Stdin => "stdin",
        };
        f.write_str(s)
    }
}

/// An adapter the supervisor has decided to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub kind: AdapterKind,
    pub device_path: PathBuf,
}

impl SpawnRequest {
    pub fn stdin() -> Self {
        Self {
            kind: AdapterKind::Stdin,
            device_path: PathBuf::from(STDIN_PATH),
        }
    }
}

/// Starts adapter tasks
///
/// The supervisor only decides *what* to start; the launcher owns *how*,
/// which lets tests substitute adapters that need no hardware.
pub trait AdapterLauncher: Send + Sync {
    fn launch(&self, request: &SpawnRequest) -> JoinHandle<()>;
}

/// Launcher for the real devices
pub struct DeviceLauncher {
    sink: Arc<dyn ScanSink>,
    nfc_settings: NfcSettings,
    nfc_filter: Option<DeviceIdentity>,
}

impl DeviceLauncher {
    pub fn new(
        sink: Arc<dyn ScanSink>,
        nfc_settings: NfcSettings,
        nfc_filter: Option<DeviceIdentity>,
    ) -> Self {
        Self {
            sink,
            nfc_settings,
            nfc_filter,
        }
    }
}

impl AdapterLauncher for DeviceLauncher {
    fn launch(&self, request: &SpawnRequest) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        let kind = request.kind;
        let path = request.device_path.clone();

        match kind {
            AdapterKind::Keyboard => tokio::task::spawn_blocking(move || {
                let result = keyboard::run(&path, sink.as_ref());
                report_exit(kind, &path, result);
            }),
            AdapterKind::Nfc => {
                let settings = self.nfc_settings.clone();
                let filter = self.nfc_filter.clone();
                tokio::task::spawn_blocking(move || {
                    let result = nfc::run_usb(&path, filter.as_ref(), &settings, sink.as_ref());
                    report_exit(kind, &path, result);
                })
            }
            AdapterKind::Stdin => tokio::spawn(async move {
                let result = stdin::run(sink.as_ref()).await;
                report_exit(kind, &path, result);
            }),
        }
    }
}

/// Publish a scan; a failing sink is logged and the adapter carries on
pub(crate) fn emit(sink: &dyn ScanSink, event: ScanEvent) {
    if let Err(e) = sink.publish(&event) {
        error!(
            "Failed to publish {} scan '{}': {}",
            event.source, event.payload, e
        );
    }
}

fn report_exit(kind: AdapterKind, path: &Path, result: AdapterResult<()>) {
    match result {
        Ok(()) => info!("{} adapter on {} finished", kind, path.display()),
        Err(e) => warn!("{} adapter on {} stopped: {}", kind, path.display(), e),
    }
}

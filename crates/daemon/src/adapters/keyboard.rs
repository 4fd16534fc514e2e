//! Keyboard-emulation (HID) scanner adapter
//!
//! Such scanners "type" each barcode followed by ENTER. The device is
//! grabbed so the keystrokes are not also delivered to a console or desktop
//! session; the grab ends when the device is dropped with the task.

use super::emit;
use super::keymap::{is_shift, is_terminator, key_symbol};
use crate::error::{AdapterError, AdapterResult};
use common::ScanSink;
use evdev::{Device, InputEventKind, Key};
use protocol::ScanEvent;
use std::path::Path;
use tracing::{debug, info};

/// Key transition reported by evdev
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Up,
    Down,
    Repeat,
}

impl KeyState {
    pub fn from_value(value: i32) -> Self {
        match value {
            0 => KeyState::Up,
            1 => KeyState::Down,
            _ => KeyState::Repeat,
        }
    }
}

/// Assembles barcodes from key transitions
#[derive(Debug, Default)]
pub struct KeyDecoder {
    shifted: bool,
    buffer: String,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one key transition; returns a barcode when a terminator is pressed
    pub fn feed(&mut self, key: Key, state: KeyState) -> Option<String> {
        if is_shift(key) {
            match state {
                KeyState::Down => self.shifted = true,
                KeyState::Up => self.shifted = false,
                KeyState::Repeat => {}
            }
            return None;
        }

        if state != KeyState::Down {
            return None;
        }

        if is_terminator(key) {
            return Some(std::mem::take(&mut self.buffer));
        }

        if let Some((plain, shifted)) = key_symbol(key) {
            self.buffer.push(if self.shifted { shifted } else { plain });
        }
        None
    }

    pub fn is_shifted(&self) -> bool {
        self.shifted
    }

    /// Characters typed since the last terminator
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

/// Read a keyboard-style scanner until it disconnects
pub fn run(path: &Path, sink: &dyn ScanSink) -> AdapterResult<()> {
    let mut device = Device::open(path).map_err(|source| AdapterError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    device.grab().map_err(|source| AdapterError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        "OPENED: HID scanner {} opened and grabbed on {}",
        device.name().unwrap_or("(unnamed)"),
        path.display()
    );

    let mut decoder = KeyDecoder::new();
    loop {
        // A read error here is almost always the scanner being unplugged
        for event in device.fetch_events()? {
            let InputEventKind::Key(key) = event.kind() else {
                continue;
            };
            if let Some(barcode) = decoder.feed(key, KeyState::from_value(event.value())) {
                debug!("Assembled barcode of {} characters", barcode.len());
                emit(sink, ScanEvent::barcode(barcode));
            }
        }
    }
}

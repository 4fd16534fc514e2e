//! Contactless (NFC) reader adapter
//!
//! Polling goes through two explicit steps: [`ContactlessFrontend::connect`]
//! waits for a tag to enter the field and returns a handle, then
//! [`ContactlessFrontend::read_identifier`] reads the tag's id. A tag left on
//! the reader is detected again on every round, so ids pass through a
//! [`Debouncer`] before being published.

use super::emit;
use super::pn533::{Pn533Frontend, UsbLocation, UsbTransport};
use crate::config::NfcSettings;
use crate::error::AdapterResult;
use common::ScanSink;
use protocol::pn533::PassiveTarget;
use protocol::{DeviceIdentity, ScanEvent};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Cool-down before the same tag is reported again
pub const DEBOUNCE_TIME: Duration = Duration::from_secs(5);

/// A tag activated by the reader, not yet read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHandle {
    /// Reader-assigned target number
    pub target: u8,
    pub(crate) uid: Vec<u8>,
}

impl TagHandle {
    pub fn new(target: u8, uid: Vec<u8>) -> Self {
        Self { target, uid }
    }
}

impl From<PassiveTarget> for TagHandle {
    fn from(target: PassiveTarget) -> Self {
        Self {
            target: target.target,
            uid: target.nfcid,
        }
    }
}

/// A contactless reader
pub trait ContactlessFrontend {
    /// Block until a tag is in the field
    ///
    /// `Ok(None)` means the reader itself is gone.
    fn connect(&mut self) -> AdapterResult<Option<TagHandle>>;

    /// Read the identifier of a connected tag
    fn read_identifier(&mut self, tag: &TagHandle) -> AdapterResult<Vec<u8>>;
}

/// Suppresses repeats of a tag that stays in the field
///
/// An id is reported when it differs from the previous one, or when the
/// window has elapsed since the last report.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    previous: Option<Vec<u8>>,
    last_scan: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            previous: None,
            last_scan: None,
        }
    }

    pub fn should_emit(&mut self, id: &[u8], now: Instant) -> bool {
        let changed = self.previous.as_deref() != Some(id);
        let expired = self
            .last_scan
            .is_none_or(|last| now > last + self.window);

        if changed || expired {
            self.previous = Some(id.to_vec());
            self.last_scan = Some(now);
            true
        } else {
            false
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE_TIME)
    }
}

/// Poll a frontend until it disappears or fails, using `now` as the clock
pub fn poll_tags<F, C>(
    frontend: &mut F,
    debouncer: &mut Debouncer,
    sink: &dyn ScanSink,
    mut now: C,
) -> AdapterResult<()>
where
    F: ContactlessFrontend,
    C: FnMut() -> Instant,
{
    loop {
        let Some(tag) = frontend.connect()? else {
            info!("NFC reader went away");
            return Ok(());
        };

        let id = frontend.read_identifier(&tag)?;
        if debouncer.should_emit(&id, now()) {
            emit(sink, ScanEvent::nfc(&id));
        } else {
            debug!("Suppressed repeat of tag {}", hex_preview(&id));
        }
    }
}

/// Open the PN533 reader at `path` and poll it until it goes away
pub fn run_usb(
    path: &Path,
    filter: Option<&DeviceIdentity>,
    settings: &NfcSettings,
    sink: &dyn ScanSink,
) -> AdapterResult<()> {
    let location = UsbLocation::from_devnode(path);
    let transport = UsbTransport::open(location, filter)?;
    let mut frontend = Pn533Frontend::new(transport, settings);
    frontend.initialize()?;
    info!("OPENED: NFC reader opened on {}", path.display());

    let mut debouncer = Debouncer::new(settings.debounce());
    poll_tags(&mut frontend, &mut debouncer, sink, Instant::now)
}

fn hex_preview(id: &[u8]) -> String {
    ScanEvent::nfc(id).payload
}

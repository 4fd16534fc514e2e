//! Test utilities for barcode-daemon
//!
//! Provides a recording sink and device event helpers for testing across
//! crates.
//!
//! # Example
//!
//! ```
//! use common::ScanSink;
//! use common::test_utils::{MemorySink, mock_input_device};
//! use protocol::{DeviceAction, ScanEvent};
//!
//! # fn main() {
//! let sink = MemorySink::new();
//! sink.publish(&ScanEvent::barcode("42")).unwrap();
//! assert_eq!(sink.payloads(), vec!["42".to_string()]);
//!
//! let event = mock_input_device(DeviceAction::Add, "05e0", "1200", Some(7));
//! assert!(event.device_path.is_some());
//! # }
//! ```

use crate::sink::ScanSink;
use protocol::{DeviceAction, DeviceEvent, ScanEvent, Subsystem};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Sink that records every published scan in memory
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<ScanEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far, in publish order
    pub fn events(&self) -> Vec<ScanEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn payloads(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.payload).collect()
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScanSink for MemorySink {
    fn publish(&self, event: &ScanEvent) -> crate::Result<()> {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
        Ok(())
    }
}

/// Sink that rejects every scan, for exercising publish failures
pub struct FailingSink;

impl ScanSink for FailingSink {
    fn publish(&self, _event: &ScanEvent) -> crate::Result<()> {
        Err(crate::Error::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "stdout closed",
        )))
    }
}

/// Create an input-subsystem event, with `/dev/input/event{node}` when given
pub fn mock_input_device(
    action: DeviceAction,
    vendor_id: &str,
    product_id: &str,
    node: Option<u32>,
) -> DeviceEvent {
    let event = DeviceEvent::new(action, Subsystem::Input).with_ids(vendor_id, product_id);
    match node {
        Some(n) => event.with_path(format!("/dev/input/event{}", n)),
        None => event,
    }
}

/// Create a usb-subsystem event, with `/dev/bus/usb/{bus}/{address}` when given
pub fn mock_usb_device(
    action: DeviceAction,
    vendor_id: &str,
    product_id: &str,
    location: Option<(u8, u8)>,
) -> DeviceEvent {
    let event = DeviceEvent::new(action, Subsystem::Usb).with_ids(vendor_id, product_id);
    match location {
        Some((bus, address)) => {
            event.with_path(format!("/dev/bus/usb/{:03}/{:03}", bus, address))
        }
        None => event,
    }
}

/// Run a future with a timeout
///
/// # Example
/// ```
/// use common::test_utils::{with_timeout, DEFAULT_TEST_TIMEOUT};
///
/// # #[tokio::main]
/// # async fn main() {
/// let result = with_timeout(DEFAULT_TEST_TIMEOUT, async { 42 }).await;
/// assert_eq!(result.unwrap(), 42);
/// # }
/// ```
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError { duration })
}

/// Error returned when a test future exceeds its timeout
#[derive(Debug)]
pub struct TimeoutError {
    pub duration: Duration,
}

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Operation timed out after {:?}", self.duration)
    }
}

impl std::error::Error for TimeoutError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        sink.publish(&ScanEvent::barcode("first")).unwrap();
        sink.publish(&ScanEvent::nfc(&[0x01])).unwrap();
        assert_eq!(sink.payloads(), vec!["first", "01"]);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_mock_usb_device_path() {
        let event = mock_usb_device(DeviceAction::Enumerate, "04CC", "2533", Some((1, 9)));
        assert_eq!(event.vendor_id.as_deref(), Some("04cc"));
        assert_eq!(
            event.device_path.unwrap().to_str(),
            Some("/dev/bus/usb/001/009")
        );
    }

    #[test]
    fn test_failing_sink() {
        assert!(FailingSink.publish(&ScanEvent::barcode("x")).is_err());
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
        })
        .await;
        assert!(result.is_err());
    }
}

//! PN533 contactless reader over libusb
//!
//! Drives the controller with the frames from [`protocol::pn533`] on the
//! first bulk IN/OUT endpoint pair of interface 0. The kernel's own `pn533`
//! driver is detached while the reader is claimed.

use super::nfc::{ContactlessFrontend, TagHandle};
use crate::config::NfcSettings;
use crate::error::{AdapterError, AdapterResult};
use protocol::pn533::{
    self, ACK_FRAME, Command, FirmwareVersion, Frame, PassiveTarget, decode_frame,
    encode_command, expect_response,
};
use protocol::{DeviceIdentity, ProtocolError};
use rusb::{Context, Device, DeviceHandle, Direction, TransferType, UsbContext};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Largest frame the controller sends (normal frame plus padding)
const READ_BUFFER_SIZE: usize = 272;

/// Timeout for writes and for the ACK that follows every command
const ACK_TIMEOUT: Duration = Duration::from_millis(100);

/// Passive activation retries per `InListPassiveTarget`
const PASSIVE_ACTIVATION_RETRIES: u8 = 0x02;

/// Where a USB device sits on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsbLocation {
    pub bus: Option<u8>,
    pub address: Option<u8>,
}

impl UsbLocation {
    /// Parse a usbfs node such as `/dev/bus/usb/001/009`
    pub fn from_devnode(path: &Path) -> Self {
        let mut components = path.iter().rev().filter_map(|c| c.to_str());
        let address = components.next().and_then(|a| a.parse().ok());
        let bus = components.next().and_then(|b| b.parse().ok());
        match (bus, address) {
            (Some(bus), Some(address)) => Self {
                bus: Some(bus),
                address: Some(address),
            },
            _ => Self::default(),
        }
    }

    fn matches<T: UsbContext>(&self, device: &Device<T>) -> bool {
        match (self.bus, self.address) {
            (Some(bus), Some(address)) => {
                device.bus_number() == bus && device.address() == address
            }
            _ => false,
        }
    }
}

/// Bulk pipe to the controller
///
/// Errors are libusb's, so callers can tell a timeout from a vanished device.
pub trait BulkTransport {
    fn write_bulk(&mut self, data: &[u8], timeout: Duration) -> rusb::Result<usize>;
    fn read_bulk(&mut self, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize>;
}

/// Interface 0 of a claimed USB reader
pub struct UsbTransport {
    handle: DeviceHandle<Context>,
    interface: u8,
    endpoint_in: u8,
    endpoint_out: u8,
}

impl UsbTransport {
    /// Find and claim the reader
    ///
    /// The device at `location` is preferred; without one, the first device
    /// matching `filter` is used.
    pub fn open(location: UsbLocation, filter: Option<&DeviceIdentity>) -> AdapterResult<Self> {
        let context = Context::new()?;
        let device = Self::find_device(&context, location, filter)?;
        let (endpoint_in, endpoint_out) = Self::find_bulk_endpoints(&device)?;

        let mut handle = device.open()?;
        // Not supported on every platform; claiming fails later if it mattered
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            debug!("Auto-detach of kernel driver unavailable: {}", e);
        }
        handle.claim_interface(0)?;

        Ok(Self {
            handle,
            interface: 0,
            endpoint_in,
            endpoint_out,
        })
    }

    fn find_device(
        context: &Context,
        location: UsbLocation,
        filter: Option<&DeviceIdentity>,
    ) -> AdapterResult<Device<Context>> {
        let devices = context.devices()?;

        if let Some(device) = devices.iter().find(|d| location.matches(d)) {
            return Ok(device);
        }

        let vendor = filter.and_then(DeviceIdentity::vendor_u16);
        let product = filter.and_then(DeviceIdentity::product_u16);
        devices
            .iter()
            .find(|device| {
                let Ok(desc) = device.device_descriptor() else {
                    return false;
                };
                vendor == Some(desc.vendor_id())
                    && product.is_none_or(|p| p == desc.product_id())
            })
            .ok_or_else(|| AdapterError::NotFound(format!("{:?} / {:?}", location, filter)))
    }

    fn find_bulk_endpoints(device: &Device<Context>) -> AdapterResult<(u8, u8)> {
        let config = device.active_config_descriptor()?;
        let mut endpoint_in = None;
        let mut endpoint_out = None;

        for interface in config.interfaces().filter(|i| i.number() == 0) {
            for descriptor in interface.descriptors() {
                for endpoint in descriptor.endpoint_descriptors() {
                    if endpoint.transfer_type() != TransferType::Bulk {
                        continue;
                    }
                    match endpoint.direction() {
                        Direction::In => {
                            endpoint_in.get_or_insert(endpoint.address());
                        }
                        Direction::Out => {
                            endpoint_out.get_or_insert(endpoint.address());
                        }
                    }
                }
            }
        }

        match (endpoint_in, endpoint_out) {
            (Some(i), Some(o)) => Ok((i, o)),
            _ => Err(AdapterError::Unsupported(
                "no bulk endpoint pair on interface 0".to_string(),
            )),
        }
    }
}

impl BulkTransport for UsbTransport {
    fn write_bulk(&mut self, data: &[u8], timeout: Duration) -> rusb::Result<usize> {
        self.handle.write_bulk(self.endpoint_out, data, timeout)
    }

    fn read_bulk(&mut self, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize> {
        self.handle.read_bulk(self.endpoint_in, buf, timeout)
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(self.interface) {
            debug!("Release of interface {} failed: {}", self.interface, e);
        }
    }
}

/// A PN533 reader driven over a bulk transport
pub struct Pn533Frontend<T: BulkTransport> {
    transport: T,
    response_timeout: Duration,
    poll_interval: Duration,
}

impl<T: BulkTransport> Pn533Frontend<T> {
    pub fn new(transport: T, settings: &NfcSettings) -> Self {
        Self {
            transport,
            response_timeout: settings.poll_timeout(),
            poll_interval: settings.poll_interval(),
        }
    }

    /// Reset the controller and limit passive activation retries
    pub fn initialize(&mut self) -> AdapterResult<FirmwareVersion> {
        // Abort whatever a previous owner left running
        self.abort();
        self.drain();

        let data = self.command(Command::GetFirmwareVersion, &[])?;
        let firmware = FirmwareVersion::parse(&data)?;
        info!(
            "PN53x firmware: ic={:#04x} v{}.{} support={:#04x}",
            firmware.ic, firmware.version, firmware.revision, firmware.support
        );

        self.command(
            Command::RfConfiguration,
            &pn533::max_retries_config(PASSIVE_ACTIVATION_RETRIES),
        )?;
        Ok(firmware)
    }

    /// Send a command and wait for its ACK and response
    fn command(&mut self, command: Command, data: &[u8]) -> AdapterResult<Vec<u8>> {
        let frame = encode_command(command, data)?;
        self.transport.write_bulk(&frame, ACK_TIMEOUT)?;

        match self.read_frame(ACK_TIMEOUT)? {
            Frame::Ack => {}
            other => {
                warn!("Expected ACK for {:?}, got {:?}", command, other);
                return Err(ProtocolError::MissingAck {
                    code: command.code(),
                }
                .into());
            }
        }

        let response = self.read_frame(self.response_timeout)?;
        Ok(expect_response(response, command)?)
    }

    fn read_frame(&mut self, timeout: Duration) -> AdapterResult<Frame> {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        let n = self.transport.read_bulk(&mut buf, timeout)?;
        Ok(decode_frame(&buf[..n])?)
    }

    fn abort(&mut self) {
        if let Err(e) = self.transport.write_bulk(&ACK_FRAME, ACK_TIMEOUT) {
            debug!("Abort write failed: {}", e);
        }
    }

    /// Discard frames left over from an aborted command
    fn drain(&mut self) {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        while let Ok(n) = self
            .transport
            .read_bulk(&mut buf, Duration::from_millis(10))
        {
            if n == 0 {
                break;
            }
        }
    }
}

impl<T: BulkTransport> ContactlessFrontend for Pn533Frontend<T> {
    fn connect(&mut self) -> AdapterResult<Option<TagHandle>> {
        loop {
            match self.command(
                Command::InListPassiveTarget,
                &pn533::list_passive_target_request(),
            ) {
                Ok(data) => {
                    if let Some(target) = PassiveTarget::parse(&data)? {
                        return Ok(Some(TagHandle::from(target)));
                    }
                }
                // No tag answered within the response timeout
                Err(AdapterError::Usb(rusb::Error::Timeout)) => {
                    self.abort();
                    self.drain();
                }
                Err(AdapterError::Usb(rusb::Error::NoDevice)) => return Ok(None),
                Err(e) => return Err(e),
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    fn read_identifier(&mut self, tag: &TagHandle) -> AdapterResult<Vec<u8>> {
        let uid = tag.uid.clone();
        // Release so the next round activates the tag afresh
        let status = self.command(Command::InRelease, &pn533::release_request(tag.target))?;
        pn533::check_status(&status)?;
        Ok(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[test]
    fn test_location_from_devnode() {
        let location = UsbLocation::from_devnode(Path::new("/dev/bus/usb/001/009"));
        assert_eq!(location.bus, Some(1));
        assert_eq!(location.address, Some(9));
    }

    #[test]
    fn test_location_from_other_path() {
        let location = UsbLocation::from_devnode(Path::new("/dev/input/event3"));
        assert_eq!(location, UsbLocation::default());
    }

    const UID: [u8; 4] = [0x04, 0xA1, 0xB2, 0xC3];

    /// Transport replaying canned reads and recording every write
    #[derive(Default)]
    struct ScriptedTransport {
        reads: VecDeque<rusb::Result<Vec<u8>>>,
        writes: Vec<Vec<u8>>,
    }

    impl ScriptedTransport {
        fn new(reads: Vec<rusb::Result<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into(),
                writes: Vec::new(),
            }
        }
    }

    impl BulkTransport for ScriptedTransport {
        fn write_bulk(&mut self, data: &[u8], _timeout: Duration) -> rusb::Result<usize> {
            self.writes.push(data.to_vec());
            Ok(data.len())
        }

        fn read_bulk(&mut self, buf: &mut [u8], _timeout: Duration) -> rusb::Result<usize> {
            // An exhausted script behaves like an unplugged reader
            let bytes = self.reads.pop_front().unwrap_or(Err(rusb::Error::NoDevice))?;
            buf[..bytes.len()].copy_from_slice(&bytes);
            Ok(bytes.len())
        }
    }

    fn ack() -> rusb::Result<Vec<u8>> {
        Ok(ACK_FRAME.to_vec())
    }

    /// Controller-to-host normal frame
    fn response(code: u8, data: &[u8]) -> rusb::Result<Vec<u8>> {
        let mut body = vec![0xD5, code];
        body.extend_from_slice(data);
        let len = body.len() as u8;
        let dcs = body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)).wrapping_neg();

        let mut frame = vec![0x00, 0x00, 0xFF, len, len.wrapping_neg()];
        frame.extend_from_slice(&body);
        frame.extend_from_slice(&[dcs, 0x00]);
        Ok(frame)
    }

    fn tag_found() -> rusb::Result<Vec<u8>> {
        let mut data = vec![0x01, 0x01, 0x00, 0x04, 0x08, UID.len() as u8];
        data.extend_from_slice(&UID);
        response(0x4B, &data)
    }

    fn frontend(reads: Vec<rusb::Result<Vec<u8>>>) -> Pn533Frontend<ScriptedTransport> {
        let settings = NfcSettings {
            poll_interval_ms: 0,
            ..NfcSettings::default()
        };
        Pn533Frontend::new(ScriptedTransport::new(reads), &settings)
    }

    fn list_requests(frontend: &Pn533Frontend<ScriptedTransport>) -> usize {
        let request = encode_command(
            Command::InListPassiveTarget,
            &pn533::list_passive_target_request(),
        )
        .unwrap();
        frontend
            .transport
            .writes
            .iter()
            .filter(|w| **w == request)
            .count()
    }

    #[test]
    fn test_initialize_sequence() {
        let mut frontend = frontend(vec![
            // Ends the drain after the abort
            Err(rusb::Error::Timeout),
            ack(),
            response(0x03, &[0x33, 0x01, 0x06, 0x07]),
            ack(),
            response(0x33, &[]),
        ]);

        let firmware = frontend.initialize().unwrap();
        assert_eq!(firmware.ic, 0x33);
        assert_eq!(firmware.version, 1);

        let writes = &frontend.transport.writes;
        assert_eq!(writes[0], ACK_FRAME.to_vec());
        assert_eq!(writes[1], encode_command(Command::GetFirmwareVersion, &[]).unwrap());
        assert_eq!(
            writes[2],
            encode_command(
                Command::RfConfiguration,
                &pn533::max_retries_config(PASSIVE_ACTIVATION_RETRIES)
            )
            .unwrap()
        );
    }

    #[test]
    fn test_connect_returns_none_when_device_gone() {
        let mut frontend = frontend(vec![Err(rusb::Error::NoDevice)]);
        assert_eq!(frontend.connect().unwrap(), None);
    }

    #[test]
    fn test_connect_retries_after_timeout() {
        let mut frontend = frontend(vec![
            ack(),
            Err(rusb::Error::Timeout),
            // Ends the drain after the abort
            Err(rusb::Error::Timeout),
            ack(),
            tag_found(),
        ]);

        let tag = frontend.connect().unwrap().unwrap();
        assert_eq!(tag, TagHandle::new(1, UID.to_vec()));
        assert_eq!(list_requests(&frontend), 2);
        assert!(frontend.transport.writes.contains(&ACK_FRAME.to_vec()));
    }

    #[test]
    fn test_connect_keeps_polling_without_targets() {
        let mut frontend = frontend(vec![ack(), response(0x4B, &[0x00]), ack(), tag_found()]);

        let tag = frontend.connect().unwrap().unwrap();
        assert_eq!(tag.target, 1);
        assert_eq!(list_requests(&frontend), 2);
        // A round with no target is not a timeout, so nothing is aborted
        assert!(!frontend.transport.writes.contains(&ACK_FRAME.to_vec()));
    }

    #[test]
    fn test_connect_rejects_missing_ack() {
        let mut frontend = frontend(vec![Ok(pn533::NACK_FRAME.to_vec())]);

        let err = frontend.connect().unwrap_err();
        assert!(matches!(
            err,
            AdapterError::Protocol(ProtocolError::MissingAck { code: 0x4A })
        ));
    }

    #[test]
    fn test_read_identifier_releases_target() {
        let mut frontend = frontend(vec![ack(), response(0x53, &[0x00])]);
        let tag = TagHandle::new(1, UID.to_vec());

        assert_eq!(frontend.read_identifier(&tag).unwrap(), UID.to_vec());
        assert_eq!(
            frontend.transport.writes.last(),
            Some(&encode_command(Command::InRelease, &pn533::release_request(1)).unwrap())
        );
    }

    #[test]
    fn test_read_identifier_reports_status_error() {
        let mut frontend = frontend(vec![ack(), response(0x53, &[0x01])]);
        let tag = TagHandle::new(1, UID.to_vec());

        assert!(matches!(
            frontend.read_identifier(&tag),
            Err(AdapterError::Protocol(_))
        ));
    }
}

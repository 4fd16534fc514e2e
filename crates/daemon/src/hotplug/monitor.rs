//! udev monitor thread
//!
//! Dedicated thread that enumerates attached `input` and `usb` devices and
//! then follows the kernel's add/remove notifications, forwarding every
//! device as an owned [`DeviceEvent`] over the hotplug bridge.
//!
//! The netlink socket is subscribed before enumeration starts, so a device
//! plugged in while enumerating is reported at least once. A device seen in
//! both passes is filtered by the supervisor's duplicate guard.

use common::HotplugPublisher;
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use protocol::{DeviceAction, DeviceEvent, Subsystem};
use std::ffi::OsStr;
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::path::Path;
use tracing::{debug, info, warn};

/// Subsystems scanners show up on
pub const WATCHED_SUBSYSTEMS: [&str; 2] = ["input", "usb"];

/// How long to wait on the socket before checking whether the feed closed
const POLL_INTERVAL_MS: u16 = 1000;

/// Spawn the monitor thread
pub fn spawn_hotplug_monitor(
    publisher: HotplugPublisher,
) -> io::Result<std::thread::JoinHandle<common::Result<()>>> {
    std::thread::Builder::new()
        .name("hotplug-monitor".to_string())
        .spawn(move || run_monitor(publisher))
}

/// Enumerate then monitor until the receiving side of the bridge closes
fn run_monitor(publisher: HotplugPublisher) -> common::Result<()> {
    let mut builder = udev::MonitorBuilder::new()?;
    for subsystem in WATCHED_SUBSYSTEMS {
        builder = builder.match_subsystem(subsystem)?;
    }
    let socket = builder.listen()?;
    info!("Hotplug monitor listening on {:?}", WATCHED_SUBSYSTEMS);

    for event in list_devices()? {
        if publisher.send_event(event).is_err() {
            return Ok(());
        }
    }

    // SAFETY: the socket outlives every use of the borrowed descriptor below.
    let fd = unsafe { BorrowedFd::borrow_raw(socket.as_raw_fd()) };

    loop {
        if publisher.is_closed() {
            debug!("Hotplug feed closed, monitor exiting");
            return Ok(());
        }

        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(POLL_INTERVAL_MS)) {
            Ok(0) => continue,
            Ok(_) => {}
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(io::Error::from(e).into()),
        }

        for event in socket.iter() {
            let device = event.device();
            let action = device
                .action()
                .and_then(OsStr::to_str)
                .map(DeviceAction::from_udev)
                .unwrap_or(DeviceAction::Change);
            let device_event = to_device_event(action, &device);
            debug!("Hotplug event: {}", device_event);

            if publisher.send_event(device_event).is_err() {
                return Ok(());
            }
        }
    }
}

/// Snapshot every attached device of the watched subsystems
pub fn list_devices() -> io::Result<Vec<DeviceEvent>> {
    let mut events = Vec::new();

    for subsystem in WATCHED_SUBSYSTEMS {
        let mut enumerator = udev::Enumerator::new()?;
        enumerator.match_subsystem(subsystem)?;

        for device in enumerator.scan_devices()? {
            events.push(to_device_event(DeviceAction::Enumerate, &device));
        }
    }

    debug!("Enumerated {} devices", events.len());
    Ok(events)
}

fn to_device_event(action: DeviceAction, device: &udev::Device) -> DeviceEvent {
    let subsystem = device
        .subsystem()
        .and_then(OsStr::to_str)
        .map(Subsystem::from)
        .unwrap_or_else(|| Subsystem::Other(String::new()));

    // usb_device nodes carry idVendor/idProduct even before udev rules
    // have imported ID_VENDOR_ID
    let vendor_id = property(device, "ID_VENDOR_ID").or_else(|| attribute(device, "idVendor"));
    let product_id = property(device, "ID_MODEL_ID").or_else(|| attribute(device, "idProduct"));

    if vendor_id.is_none() && subsystem == Subsystem::Usb && device.devnode().is_some() {
        warn!(
            "USB device {} has no vendor id",
            device.syspath().display()
        );
    }

    DeviceEvent {
        action,
        subsystem,
        vendor_id,
        product_id,
        device_path: device.devnode().map(Path::to_path_buf),
    }
}

fn property(device: &udev::Device, name: &str) -> Option<String> {
    device
        .property_value(name)
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
}

fn attribute(device: &udev::Device, name: &str) -> Option<String> {
    device
        .attribute_value(name)
        .and_then(OsStr::to_str)
        .map(|v| v.trim().to_ascii_lowercase())
}

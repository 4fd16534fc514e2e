//! Async channel bridge between the hotplug monitor thread and Tokio
//!
//! The platform device monitor blocks on a netlink socket, so it runs on a
//! dedicated OS thread and pushes owned [`DeviceEvent`]s across this bridge
//! to the supervisor running on the Tokio runtime.

use async_channel::{Receiver, Sender, bounded};
use protocol::DeviceEvent;

/// Capacity of the bridge; enumeration of a busy host fits comfortably
pub const HOTPLUG_CHANNEL_CAPACITY: usize = 256;

/// Handle for the Tokio runtime (async)
#[derive(Clone)]
pub struct HotplugFeed {
    event_rx: Receiver<DeviceEvent>,
}

impl HotplugFeed {
    /// Receive the next device event
    ///
    /// Fails once the monitor thread has exited and the queue is drained.
    pub async fn recv_event(&self) -> crate::Result<DeviceEvent> {
        self.event_rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Handle for the monitor thread (blocking)
#[derive(Clone)]
pub struct HotplugPublisher {
    event_tx: Sender<DeviceEvent>,
}

impl HotplugPublisher {
    /// Send an event to the Tokio runtime (blocking)
    pub fn send_event(&self, event: DeviceEvent) -> crate::Result<()> {
        self.event_tx
            .send_blocking(event)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Whether the receiving side has gone away
    pub fn is_closed(&self) -> bool {
        self.event_tx.is_closed()
    }
}

/// Create the channel bridge between Tokio and the monitor thread
///
/// Returns (HotplugFeed for Tokio, HotplugPublisher for the monitor thread)
pub fn create_hotplug_bridge() -> (HotplugFeed, HotplugPublisher) {
    let (event_tx, event_rx) = bounded(HOTPLUG_CHANNEL_CAPACITY);

    (HotplugFeed { event_rx }, HotplugPublisher { event_tx })
}

//! Adapter supervisor
//!
//! Consumes device events from the hotplug monitor, applies the spawn
//! decision and records every started adapter in the [`TaskRegistry`].

use crate::adapters::{AdapterKind, AdapterLauncher, SpawnRequest};
use crate::hotplug::{Filters, spawn_decision};
use crate::registry::{AdapterTask, TaskRegistry};
use common::HotplugFeed;
use protocol::DeviceEvent;
use tracing::{debug, info};

pub struct Supervisor<L: AdapterLauncher> {
    filters: Filters,
    registry: TaskRegistry,
    launcher: L,
}

impl<L: AdapterLauncher> Supervisor<L> {
    pub fn new(filters: Filters, registry: TaskRegistry, launcher: L) -> Self {
        Self {
            filters,
            registry,
            launcher,
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Start an adapter outside the hotplug path (stdin)
    pub fn start(&self, request: &SpawnRequest) {
        let handle = self.launcher.launch(request);
        self.registry.register(AdapterTask::new(
            request.device_path.clone(),
            request.kind,
            handle,
        ));
    }

    /// Act on one device event; returns the kind of adapter started, if any
    pub fn handle_event(&self, event: &DeviceEvent) -> Option<AdapterKind> {
        let Some(request) = spawn_decision(event, &self.filters) else {
            debug!("Ignoring {}", event);
            return None;
        };

        if self.registry.is_active(&request.device_path) {
            debug!(
                "{} adapter already running on {}, skipping {}",
                request.kind,
                request.device_path.display(),
                event
            );
            return None;
        }

        info!(
            "Starting {} adapter on {} ({})",
            request.kind,
            request.device_path.display(),
            event
        );
        self.start(&request);
        Some(request.kind)
    }

    /// Handle events until the monitor goes away
    pub async fn run(&self, feed: HotplugFeed) {
        while let Ok(event) = feed.recv_event().await {
            let pruned = self.registry.prune();
            if pruned > 0 {
                debug!("Pruned {} finished adapter(s)", pruned);
            }
            self.handle_event(&event);
        }
        info!("Hotplug feed closed, no more adapters will be started");
    }
}

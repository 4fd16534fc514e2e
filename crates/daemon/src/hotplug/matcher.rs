//! Device matching and the spawn decision
//!
//! Enumerated and hotplugged devices go through the same
//! [`spawn_decision`], so both passes start adapters under identical rules.

use crate::adapters::{AdapterKind, SpawnRequest};
use protocol::{DeviceEvent, DeviceIdentity, Subsystem};

/// The vendor/product filters configured at startup, one per device kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    /// Keyboard-style barcode scanner (input subsystem)
    pub hid: Option<DeviceIdentity>,
    /// Contactless reader (usb subsystem)
    pub nfc: Option<DeviceIdentity>,
}

impl Filters {
    pub fn new(hid: Option<DeviceIdentity>, nfc: Option<DeviceIdentity>) -> Self {
        Self { hid, nfc }
    }

    /// No device kind is enabled; the hotplug monitor is not needed
    pub fn is_empty(&self) -> bool {
        self.hid.is_none() && self.nfc.is_none()
    }
}

/// Check a device's vendor/product ids against a filter
///
/// An absent filter disables the device kind and never matches. A filter
/// without a product id matches every product of the vendor.
pub fn matches(device: &DeviceEvent, filter: Option<&DeviceIdentity>) -> bool {
    let Some(filter) = filter else {
        return false;
    };

    if device.vendor_id.as_deref() != Some(filter.vendor_id.as_str()) {
        return false;
    }

    match &filter.product_id {
        Some(product) => device.product_id.as_deref() == Some(product.as_str()),
        None => true,
    }
}

/// Decide whether a device event should start an adapter
///
/// Removal is never acted on here: an adapter notices its own device going
/// away through a failed read.
pub fn spawn_decision(event: &DeviceEvent, filters: &Filters) -> Option<SpawnRequest> {
    if !event.action.is_arrival() {
        return None;
    }

    let kind = match event.subsystem {
        Subsystem::Input if matches(event, filters.hid.as_ref()) => AdapterKind::Keyboard,
        Subsystem::Usb if matches(event, filters.nfc.as_ref()) => AdapterKind::Nfc,
        _ => return None,
    };

    // Transient entries without an assigned node cannot be opened
    let device_path = event.device_path.clone()?;

    Some(SpawnRequest { kind, device_path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::test_utils::{mock_input_device, mock_usb_device};
    use protocol::DeviceAction;

    fn hid_filters(filter: &str) -> Filters {
        Filters::new(Some(filter.parse().unwrap()), None)
    }

    #[test]
    fn test_absent_filter_never_matches() {
        let device = mock_input_device(DeviceAction::Add, "05e0", "1200", Some(3));
        assert!(!matches(&device, None));
    }

    #[test]
    fn test_vendor_only_filter_matches_any_product() {
        let filter = DeviceIdentity::vendor("05e0");
        for product in ["1200", "0600", "ffff"] {
            let device = mock_input_device(DeviceAction::Add, "05e0", product, Some(3));
            assert!(matches(&device, Some(&filter)));
        }
        let other = mock_input_device(DeviceAction::Add, "0c2e", "1200", Some(3));
        assert!(!matches(&other, Some(&filter)));
    }

    #[test]
    fn test_vendor_product_filter() {
        let filter = DeviceIdentity::vendor_product("05e0", "1200");
        let exact = mock_input_device(DeviceAction::Add, "05e0", "1200", Some(3));
        let wrong_product = mock_input_device(DeviceAction::Add, "05e0", "1300", Some(3));
        assert!(matches(&exact, Some(&filter)));
        assert!(!matches(&wrong_product, Some(&filter)));
    }

    #[test]
    fn test_short_filter_matches_padded_udev_ids() {
        let filters = hid_filters("5e0:1200");
        let device = mock_input_device(DeviceAction::Add, "05e0", "1200", Some(3));
        assert!(matches(&device, filters.hid.as_ref()));
        assert!(spawn_decision(&device, &filters).is_some());
    }

    #[test]
    fn test_device_without_ids_never_matches() {
        let device = DeviceEvent::new(DeviceAction::Add, Subsystem::Input);
        assert!(!matches(&device, Some(&DeviceIdentity::vendor("05e0"))));
    }

    #[test]
    fn test_decision_by_subsystem() {
        let filters = Filters::new(
            Some(DeviceIdentity::vendor("05e0")),
            Some(DeviceIdentity::vendor_product("04cc", "2533")),
        );

        let hid = mock_input_device(DeviceAction::Enumerate, "05e0", "1200", Some(4));
        assert_eq!(
            spawn_decision(&hid, &filters).map(|r| r.kind),
            Some(AdapterKind::Keyboard)
        );

        let nfc = mock_usb_device(DeviceAction::Add, "04cc", "2533", Some((1, 7)));
        assert_eq!(
            spawn_decision(&nfc, &filters).map(|r| r.kind),
            Some(AdapterKind::Nfc)
        );

        // NFC ids on the input subsystem are not an NFC reader
        let crossed = mock_input_device(DeviceAction::Add, "04cc", "2533", Some(5));
        assert!(spawn_decision(&crossed, &filters).is_none());
    }

    #[test]
    fn test_remove_never_spawns() {
        let filters = hid_filters("05e0");
        let removed = mock_input_device(DeviceAction::Remove, "05e0", "1200", Some(4));
        assert!(spawn_decision(&removed, &filters).is_none());

        let changed = mock_input_device(DeviceAction::Change, "05e0", "1200", Some(4));
        assert!(spawn_decision(&changed, &filters).is_none());
    }

    #[test]
    fn test_missing_device_path_never_spawns() {
        let filters = hid_filters("05e0:1200");
        let no_node = mock_input_device(DeviceAction::Add, "05e0", "1200", None);
        assert!(spawn_decision(&no_node, &filters).is_none());
    }

    #[test]
    fn test_filters_is_empty() {
        assert!(Filters::default().is_empty());
        assert!(!hid_filters("05e0").is_empty());
    }
}

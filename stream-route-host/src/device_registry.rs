//! In-memory device registry.
//!
//! Stands in for the platform device manager: devices are plugged and
//! unplugged by the host, and the policy engine reads snapshots and flips
//! activation through the [`DeviceRegistry`] trait. Clones share state, so
//! the host can keep a handle after moving one into `RoutePolicy`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use stream_route_core::{DeviceId, DeviceInfo, DeviceRegistry, EndpointHandle, RouteError};

use crate::error::HostError;

#[derive(Debug, Default)]
struct Inner {
    devices: Vec<DeviceInfo>,
    endpoints: HashMap<(DeviceId, String), EndpointHandle>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDeviceRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: impl IntoIterator<Item = DeviceInfo>) -> Self {
        let registry = Self::new();
        for device in devices {
            registry.plug(device);
        }
        registry
    }

    /// Add or replace a device and mark it connected. Activation starts off.
    pub fn plug(&self, mut device: DeviceInfo) -> DeviceInfo {
        device.connected = true;
        device.activated = false;
        let mut inner = self.inner.lock();
        inner.devices.retain(|d| d.id != device.id);
        inner.devices.push(device.clone());
        log::debug!("plugged {} ({})", device.id, device.device_type);
        device
    }

    /// Reconnect a known device with a fresh connection timestamp.
    pub fn connect(&self, id: DeviceId) -> Result<DeviceInfo, HostError> {
        let mut inner = self.inner.lock();
        let device = inner
            .devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| HostError::UnknownDevice(id.to_string()))?;
        device.connected = true;
        device.connected_at = Utc::now();
        Ok(device.clone())
    }

    /// Mark a device disconnected. Its activation is cleared.
    pub fn unplug(&self, id: DeviceId) -> Result<DeviceInfo, HostError> {
        let mut inner = self.inner.lock();
        let device = inner
            .devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| HostError::UnknownDevice(id.to_string()))?;
        device.connected = false;
        device.activated = false;
        log::debug!("unplugged {} ({})", device.id, device.device_type);
        Ok(device.clone())
    }

    /// Override the endpoint a role attaches to on a device.
    pub fn set_endpoint(&self, id: DeviceId, role: &str, endpoint: EndpointHandle) {
        self.inner.lock().endpoints.insert((id, role.to_string()), endpoint);
    }

    pub fn is_activated(&self, id: DeviceId) -> bool {
        self.inner.lock().devices.iter().any(|d| d.id == id && d.activated)
    }

    pub fn activated(&self) -> Vec<DeviceId> {
        self.inner
            .lock()
            .devices
            .iter()
            .filter(|d| d.activated)
            .map(|d| d.id)
            .collect()
    }
}

impl DeviceRegistry for MemoryDeviceRegistry {
    fn devices(&self) -> Vec<DeviceInfo> {
        self.inner.lock().devices.clone()
    }

    fn device(&self, id: DeviceId) -> Option<DeviceInfo> {
        self.inner.lock().devices.iter().find(|d| d.id == id).cloned()
    }

    fn set_activated(&mut self, id: DeviceId, activated: bool) -> Result<(), RouteError> {
        let mut inner = self.inner.lock();
        let device = inner
            .devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| RouteError::DeviceUnavailable(id.to_string()))?;
        if activated && !device.connected {
            return Err(RouteError::DeviceUnavailable(format!("{} is disconnected", id)));
        }
        if !device.uses_internal_codec {
            return Err(RouteError::DeviceUnavailable(format!("{} has no internal codec path", id)));
        }
        device.activated = activated;
        Ok(())
    }

    fn endpoint(&self, id: DeviceId, role: &str) -> Option<EndpointHandle> {
        let inner = self.inner.lock();
        if let Some(endpoint) = inner.endpoints.get(&(id, role.to_string())) {
            return Some(endpoint.clone());
        }
        inner
            .devices
            .iter()
            .find(|d| d.id == id)
            .map(|d| EndpointHandle(d.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_route_core::{DeviceType, Direction};

    #[test]
    fn clones_share_state() {
        let registry = MemoryDeviceRegistry::new();
        let mut handle = registry.clone();
        registry.plug(DeviceInfo::new(1, DeviceType::Speaker, Direction::Playback, true));

        handle.set_activated(DeviceId(1), true).unwrap();
        assert!(registry.is_activated(DeviceId(1)));
        assert_eq!(registry.activated(), vec![DeviceId(1)]);
    }

    #[test]
    fn unplug_clears_activation() {
        let mut registry =
            MemoryDeviceRegistry::with_devices([DeviceInfo::new(1, DeviceType::Speaker, Direction::Playback, true)]);
        registry.set_activated(DeviceId(1), true).unwrap();

        let device = registry.unplug(DeviceId(1)).unwrap();
        assert!(!device.connected);
        assert!(!registry.is_activated(DeviceId(1)));
        assert!(registry.set_activated(DeviceId(1), true).is_err());
        assert!(registry.unplug(DeviceId(9)).is_err());
    }

    #[test]
    fn external_devices_cannot_be_activated() {
        let mut registry =
            MemoryDeviceRegistry::with_devices([DeviceInfo::new(3, DeviceType::BtA2dp, Direction::Playback, false)]);
        assert!(registry.set_activated(DeviceId(3), true).is_err());
    }

    #[test]
    fn endpoint_overrides_take_precedence() {
        let registry =
            MemoryDeviceRegistry::with_devices([DeviceInfo::new(1, DeviceType::Speaker, Direction::Playback, true)]);
        registry.set_endpoint(DeviceId(1), "voip", EndpointHandle("speaker.voip".into()));

        assert_eq!(registry.endpoint(DeviceId(1), "voip").unwrap().0, "speaker.voip");
        assert_eq!(registry.endpoint(DeviceId(1), "media").unwrap().0, "builtin-speaker-playback");
        assert!(registry.endpoint(DeviceId(2), "media").is_none());
    }
}

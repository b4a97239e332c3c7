use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::device::{DeviceId, Direction};
use crate::models::route::{CombinedId, RouteType};

/// Which selector owns a combined device. Pools never share instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CombinePool {
    AutoAll,
    ManualExt,
}

impl CombinePool {
    pub fn for_route_type(route_type: RouteType) -> Option<Self> {
        match route_type {
            RouteType::AutoAll => Some(Self::AutoAll),
            RouteType::ManualExt => Some(Self::ManualExt),
            _ => None,
        }
    }
}

/// A virtual endpoint that duplicates a stream to two physical devices.
///
/// Construction is pure; the HAL instantiates the actual mix when the
/// engine first acquires it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedDevice {
    pub id: CombinedId,
    pub pool: CombinePool,
    pub direction: Direction,
    pub members: [DeviceId; 2],
    refs: usize,
}

impl CombinedDevice {
    pub fn new(id: CombinedId, pool: CombinePool, direction: Direction, members: [DeviceId; 2]) -> Self {
        Self {
            id,
            pool,
            direction,
            members,
            refs: 0,
        }
    }

    pub fn refs(&self) -> usize {
        self.refs
    }

    /// Endpoint name streams on this device report.
    pub fn name(&self) -> String {
        let pool = match self.pool {
            CombinePool::AutoAll => "auto-all",
            CombinePool::ManualExt => "manual-ext",
        };
        format!("combined-{}-{}-{}", pool, self.members[0].0, self.members[1].0)
    }

    fn has_members(&self, members: [DeviceId; 2]) -> bool {
        (self.members[0] == members[0] && self.members[1] == members[1])
            || (self.members[0] == members[1] && self.members[1] == members[0])
    }
}

/// Result of acquiring a combined device for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquired {
    pub id: CombinedId,
    /// True when this acquisition created the device.
    pub created: bool,
}

/// Ref-counted set of live combined devices.
#[derive(Debug, Default)]
pub struct CombinedDevices {
    devices: BTreeMap<CombinedId, CombinedDevice>,
    next_id: u32,
}

impl CombinedDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, pool: CombinePool, direction: Direction, members: [DeviceId; 2]) -> Option<CombinedId> {
        self.devices
            .values()
            .find(|d| d.pool == pool && d.direction == direction && d.has_members(members))
            .map(|d| d.id)
    }

    /// Take one reference, creating the device if none matches.
    pub fn acquire(&mut self, pool: CombinePool, direction: Direction, members: [DeviceId; 2]) -> Acquired {
        if let Some(id) = self.find(pool, direction, members) {
            if let Some(device) = self.devices.get_mut(&id) {
                device.refs += 1;
                return Acquired { id, created: false };
            }
        }

        // Ids wrap; skip any still held by a live device.
        loop {
            self.next_id = self.next_id.wrapping_add(1);
            if !self.devices.contains_key(&CombinedId(self.next_id)) {
                break;
            }
        }
        let id = CombinedId(self.next_id);
        let mut device = CombinedDevice::new(id, pool, direction, members);
        device.refs = 1;
        self.devices.insert(id, device);
        log::debug!("created {} for {:?} {:?}", id, pool, members);
        Acquired { id, created: true }
    }

    /// Drop one reference. Returns the device once the last one is gone.
    pub fn release(&mut self, id: CombinedId) -> Option<CombinedDevice> {
        let device = self.devices.get_mut(&id)?;
        device.refs = device.refs.saturating_sub(1);
        if device.refs > 0 {
            return None;
        }
        log::debug!("tearing down {}", id);
        self.devices.remove(&id)
    }

    pub fn get(&self, id: CombinedId) -> Option<&CombinedDevice> {
        self.devices.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CombinedDevice> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPK: DeviceId = DeviceId(1);
    const HDMI: DeviceId = DeviceId(2);

    #[test]
    fn acquire_reuses_matching_device() {
        let mut combined = CombinedDevices::new();
        let first = combined.acquire(CombinePool::AutoAll, Direction::Playback, [SPK, HDMI]);
        let second = combined.acquire(CombinePool::AutoAll, Direction::Playback, [HDMI, SPK]);

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(combined.get(first.id).unwrap().refs(), 2);
    }

    #[test]
    fn pools_do_not_share() {
        let mut combined = CombinedDevices::new();
        let auto = combined.acquire(CombinePool::AutoAll, Direction::Playback, [SPK, HDMI]);
        let ext = combined.acquire(CombinePool::ManualExt, Direction::Playback, [SPK, HDMI]);
        assert_ne!(auto.id, ext.id);
        assert_eq!(combined.len(), 2);
    }

    #[test]
    fn release_tears_down_on_last_reference() {
        let mut combined = CombinedDevices::new();
        let a = combined.acquire(CombinePool::AutoAll, Direction::Playback, [SPK, HDMI]);
        combined.acquire(CombinePool::AutoAll, Direction::Playback, [SPK, HDMI]);

        assert!(combined.release(a.id).is_none());
        assert_eq!(combined.len(), 1);

        let gone = combined.release(a.id).unwrap();
        assert_eq!(gone.members, [SPK, HDMI]);
        assert!(combined.is_empty());
        assert!(combined.release(a.id).is_none());
    }

    #[test]
    fn ids_wrap_around_live_devices() {
        let mut combined = CombinedDevices::new();
        let first = combined.acquire(CombinePool::AutoAll, Direction::Playback, [SPK, HDMI]);
        assert_eq!(first.id, CombinedId(1));

        combined.next_id = u32::MAX;
        let wrapped = combined.acquire(CombinePool::ManualExt, Direction::Playback, [SPK, HDMI]);
        assert_eq!(wrapped.id, CombinedId(0));

        let next = combined.acquire(CombinePool::AutoAll, Direction::Capture, [SPK, HDMI]);
        assert_eq!(next.id, CombinedId(2));
        assert_eq!(combined.len(), 3);
    }

    #[test]
    fn name_encodes_pool_and_members() {
        let device = CombinedDevice::new(CombinedId(5), CombinePool::ManualExt, Direction::Playback, [SPK, HDMI]);
        assert_eq!(device.name(), "combined-manual-ext-1-2");
    }
}

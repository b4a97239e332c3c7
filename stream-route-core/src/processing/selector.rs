use std::collections::HashSet;

use crate::models::device::{DeviceId, DeviceInfo, DeviceType, Direction};
use crate::models::route::{RouteTarget, RouteType};

use super::combined::{CombinePool, CombinedDevice, CombinedDevices};

/// Outcome of a pure device selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Nothing routable; use the neutral device.
    Null,
    Single(DeviceId),
    /// Several devices at once, without combining (MANUAL).
    Multiple(Vec<DeviceId>),
    /// Two devices to be fanned out through a combined device.
    Combine([DeviceId; 2]),
}

impl Selection {
    /// Whether `target` already realises this selection.
    pub fn matches(&self, target: &RouteTarget) -> bool {
        match (self, target) {
            (Self::Null, RouteTarget::Null) => true,
            (Self::Single(a), RouteTarget::Device { id }) => a == id,
            (Self::Multiple(a), RouteTarget::Devices { ids }) => a == ids,
            (Self::Combine(a), RouteTarget::Combined { members, .. }) => {
                (a[0] == members[0] && a[1] == members[1]) || (a[0] == members[1] && a[1] == members[0])
            }
            _ => false,
        }
    }
}

impl From<&RouteTarget> for Selection {
    /// The selection that `target` realises, used to put a stream back.
    fn from(target: &RouteTarget) -> Self {
        match target {
            RouteTarget::Null => Self::Null,
            RouteTarget::Device { id } => Self::Single(*id),
            RouteTarget::Devices { ids } => Self::Multiple(ids.clone()),
            RouteTarget::Combined { members, .. } => Self::Combine(*members),
        }
    }
}

/// Inputs for one selection.
#[derive(Debug, Clone, Copy)]
pub struct SelectionRequest<'a> {
    pub direction: Direction,
    pub route_type: RouteType,
    /// Role affinity list for `direction`, in preference order.
    pub avail: &'a [DeviceType],
    /// Parent group's manual list for `direction` (MANUAL / MANUAL_EXT only).
    pub manual: &'a [DeviceId],
    /// Devices to treat as gone, e.g. one being disconnected right now.
    pub exclude: &'a HashSet<DeviceId>,
}

/// A target ready to be attached to a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub target: RouteTarget,
    /// Combined device created by this placement; the HAL must instantiate it.
    pub created: Option<CombinedDevice>,
}

/// Position of `device_type` in an affinity list; lower is preferred.
pub fn affinity_rank(avail: &[DeviceType], device_type: DeviceType) -> Option<usize> {
    avail.iter().position(|t| *t == device_type)
}

/// Picks devices per route type and owns the combined devices it synthesizes.
#[derive(Debug, Default)]
pub struct RouteSelector {
    combined: CombinedDevices,
}

impl RouteSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure selection: no activation or ref-count side effects.
    pub fn select(&self, request: &SelectionRequest<'_>, devices: &[DeviceInfo]) -> Selection {
        let candidates: Vec<&DeviceInfo> = devices
            .iter()
            .filter(|d| d.is_eligible_for(request.direction) && !request.exclude.contains(&d.id))
            .collect();

        match request.route_type {
            RouteType::Auto => Self::select_auto(request.avail, &candidates),
            RouteType::AutoLastConnected => Self::select_last_connected(request.avail, &candidates),
            RouteType::AutoAll => Self::select_all(request.direction, request.avail, &candidates),
            RouteType::Manual => Self::select_manual(request, &candidates, false),
            RouteType::ManualExt => Self::select_manual(request, &candidates, true),
        }
    }

    fn best_of_type<'d>(candidates: &[&'d DeviceInfo], device_type: DeviceType) -> Option<&'d DeviceInfo> {
        candidates
            .iter()
            .filter(|d| d.device_type == device_type)
            .max_by_key(|d| d.connected_at)
            .copied()
    }

    fn select_auto(avail: &[DeviceType], candidates: &[&DeviceInfo]) -> Selection {
        avail
            .iter()
            .find_map(|t| Self::best_of_type(candidates, *t))
            .map_or(Selection::Null, |d| Selection::Single(d.id))
    }

    fn select_last_connected(avail: &[DeviceType], candidates: &[&DeviceInfo]) -> Selection {
        candidates
            .iter()
            .filter_map(|d| affinity_rank(avail, d.device_type).map(|rank| (d, rank)))
            // Latest connection wins; on equal timestamps prefer the better rank.
            .max_by(|(a, ra), (b, rb)| a.connected_at.cmp(&b.connected_at).then(rb.cmp(ra)))
            .map_or(Selection::Null, |(d, _)| Selection::Single(d.id))
    }

    fn select_all(direction: Direction, avail: &[DeviceType], candidates: &[&DeviceInfo]) -> Selection {
        let picked: Vec<DeviceId> = avail
            .iter()
            .filter_map(|t| Self::best_of_type(candidates, *t))
            .map(|d| d.id)
            .take(2)
            .collect();

        match picked.as_slice() {
            [] => Selection::Null,
            [a, b] if direction == Direction::Playback => Selection::Combine([*a, *b]),
            [a, ..] => Selection::Single(*a),
        }
    }

    fn select_manual(request: &SelectionRequest<'_>, candidates: &[&DeviceInfo], external_only: bool) -> Selection {
        let mut picked: Vec<DeviceId> = Vec::new();
        for id in request.manual {
            if picked.contains(id) {
                continue;
            }
            let Some(device) = candidates.iter().find(|d| d.id == *id) else {
                continue;
            };
            if affinity_rank(request.avail, device.device_type).is_none() {
                log::debug!("manual device {} ({}) not permitted for role", id, device.device_type);
                continue;
            }
            if external_only && device.uses_internal_codec {
                continue;
            }
            picked.push(*id);
        }

        match picked.len() {
            0 => Selection::Null,
            1 => Selection::Single(picked[0]),
            _ if external_only => {
                if request.direction == Direction::Playback {
                    Selection::Combine([picked[0], picked[1]])
                } else {
                    Selection::Single(picked[0])
                }
            }
            _ => Selection::Multiple(picked),
        }
    }

    /// Turn a selection into a stream target, taking a combined-device
    /// reference when needed.
    pub fn place(&mut self, route_type: RouteType, direction: Direction, selection: &Selection) -> Placement {
        let target = match selection {
            Selection::Null => RouteTarget::Null,
            Selection::Single(id) => RouteTarget::Device { id: *id },
            Selection::Multiple(ids) => RouteTarget::Devices { ids: ids.clone() },
            Selection::Combine(members) => {
                let Some(pool) = CombinePool::for_route_type(route_type) else {
                    // Only AUTO_ALL and MANUAL_EXT combine; fall back to the first device.
                    return Placement {
                        target: RouteTarget::Device { id: members[0] },
                        created: None,
                    };
                };
                let acquired = self.combined.acquire(pool, direction, *members);
                let created = if acquired.created {
                    self.combined.get(acquired.id).cloned()
                } else {
                    None
                };
                return Placement {
                    target: RouteTarget::Combined {
                        id: acquired.id,
                        members: *members,
                    },
                    created,
                };
            }
        };
        Placement { target, created: None }
    }

    /// Drop whatever reference `target` holds. Returns a combined device that
    /// must now be torn down.
    pub fn release(&mut self, target: &RouteTarget) -> Option<CombinedDevice> {
        target.combined_id().and_then(|id| self.combined.release(id))
    }

    pub fn combined(&self) -> &CombinedDevices {
        &self.combined
    }
}

use crate::models::device::{DeviceId, Direction};
use crate::models::error::RouteError;
use crate::models::route::RouteType;
use crate::models::stream::{FocusMask, GroupId, StreamId};
use crate::traits::device_registry::DeviceRegistry;
use crate::traits::hal_executor::HalExecutor;

use super::engine::RoutePolicy;

impl<R: DeviceRegistry, H: HalExecutor> RoutePolicy<R, H> {
    /// Returns false if the group already existed.
    pub fn register_group(&mut self, group: GroupId) -> bool {
        let added = self.groups.register(group);
        if added {
            log::debug!("registered {}", group);
        }
        added
    }

    /// Forget a group. Its streams stay alive but lose their parent and focus.
    pub fn unregister_group(&mut self, group: GroupId) -> Result<(), RouteError> {
        let removed = self.groups.unregister(group).ok_or(RouteError::UnknownGroup(group.0))?;

        for direction in Direction::ALL {
            let owned: Vec<StreamId> = removed.streams(direction).iter().copied().collect();
            if owned.is_empty() {
                continue;
            }
            for id in owned {
                if let Some(stream) = self.streams.get_mut(id) {
                    stream.parent_group = None;
                    stream.focus_acquired = false;
                }
            }
            self.rescan(direction);
            self.verify_winner(direction);
        }
        log::debug!("unregistered {}", group);
        Ok(())
    }

    /// Propagate a group's focus bits to its streams and re-arbitrate each
    /// direction once, after its last owned stream has been updated.
    pub fn update_focus(&mut self, group: GroupId, mask: FocusMask) -> Result<(), RouteError> {
        let entry = self.groups.get_mut(group).ok_or(RouteError::UnknownGroup(group.0))?;
        entry.set_focus(mask);
        let owned: Vec<(Direction, Vec<StreamId>)> = Direction::ALL
            .iter()
            .map(|d| (*d, entry.streams(*d).iter().copied().collect()))
            .collect();

        log::debug!("{} focus mask {:#x}", group, mask.0);
        for (direction, streams) in owned {
            let acquired = mask.contains(direction);
            let mut remaining = streams.len();
            for id in streams {
                if let Some(stream) = self.streams.get_mut(id) {
                    stream.focus_acquired = acquired;
                }
                remaining -= 1;
                if remaining == 0 {
                    self.rescan(direction);
                    self.verify_winner(direction);
                }
            }
        }
        Ok(())
    }

    /// Replace a group's manual device lists.
    ///
    /// Returns `Ok(false)` when both lists are unchanged. A MANUAL winner owned
    /// by the group is re-routed at once; started MANUAL_EXT streams are
    /// re-placed. Other streams pick the lists up on their next start.
    pub fn assign_devices(
        &mut self,
        group: GroupId,
        input: Vec<DeviceId>,
        output: Vec<DeviceId>,
    ) -> Result<bool, RouteError> {
        let entry = self.groups.get_mut(group).ok_or(RouteError::UnknownGroup(group.0))?;
        if !entry.replace_devices(input, output) {
            log::debug!("{} device lists unchanged", group);
            return Ok(false);
        }
        log::info!(
            "{} manual devices in={:?} out={:?}",
            group,
            entry.manual_devices(Direction::Capture),
            entry.manual_devices(Direction::Playback)
        );

        let devices = self.registry.devices();
        for direction in Direction::ALL {
            let external: Vec<StreamId> = self
                .streams
                .iter()
                .filter(|s| s.parent_group() == Some(group) && s.direction() == direction)
                .filter(|s| s.is_started() && s.participates() && s.route_type() == RouteType::ManualExt)
                .map(|s| s.id())
                .collect();
            for id in external {
                if let Some(selection) = self.selection_for(id, &self.disconnected, &devices) {
                    self.move_stream(id, &selection, &devices);
                }
            }

            let manual_winner = self.winners[direction.index()]
                .and_then(|id| self.streams.get(id))
                .is_some_and(|s| s.parent_group() == Some(group) && s.route_type() == RouteType::Manual);
            if manual_winner {
                self.refresh_route(direction);
                self.verify_winner(direction);
            }
        }
        Ok(true)
    }

    /// Store a route option on the group and forward it to the HAL when the
    /// group currently owns a winner. HAL failures are logged, not returned.
    pub fn set_route_option(&mut self, group: GroupId, name: &str, value: i32) -> Result<(), RouteError> {
        let entry = self.groups.get_mut(group).ok_or(RouteError::UnknownGroup(group.0))?;
        entry.set_route_option(name, value);

        for direction in Direction::ALL {
            let role = self.winners[direction.index()]
                .and_then(|id| self.streams.get(id))
                .filter(|s| s.parent_group() == Some(group))
                .map(|s| s.role().to_string());
            if let Some(role) = role {
                log::debug!("route option {}={} for {}", name, value, role);
                Self::log_hal(self.hal.apply_route_option(&role, name, value), "route option");
            }
        }
        Ok(())
    }

    /// Enable or clear a named restriction. Enabling terminates every live
    /// stream it matches; the terminated ids are returned.
    pub fn set_restriction(&mut self, name: &str, enabled: bool) -> Result<Vec<StreamId>, RouteError> {
        let restriction = self.restrictions.set(name, enabled)?;
        if !enabled {
            log::info!("restriction {} cleared", name);
            return Ok(Vec::new());
        }

        let victims: Vec<StreamId> = self
            .streams
            .iter()
            .filter(|s| restriction.matches(s.direction(), s.role()))
            .map(|s| s.id())
            .collect();
        log::info!("restriction {} enabled, terminating {} stream(s)", name, victims.len());

        for id in &victims {
            self.notify(|d| d.on_stream_terminated(*id, name));
            self.ended(*id)?;
        }
        Ok(victims)
    }
}

use crate::models::device::DeviceInfo;
use crate::models::error::RouteError;
use crate::models::events::{ConnectivityReport, MuteEventId};
use crate::models::route::{RouteTarget, RouteType};
use crate::models::stream::StreamId;
use crate::processing::arbitration;
use crate::processing::selector::{affinity_rank, Selection};
use crate::traits::device_registry::DeviceRegistry;
use crate::traits::hal_executor::HalExecutor;

use super::engine::RoutePolicy;

impl<R: DeviceRegistry, H: HalExecutor> RoutePolicy<R, H> {
    /// React to a device appearing.
    ///
    /// Streams move only when the new device is a better fit for their route
    /// type; the winner is re-derived when something moved or when it sits on
    /// the neutral or an external device and an internal-codec device arrived.
    /// The registry must already list the device as connected.
    pub fn device_connected(&mut self, device: &DeviceInfo) -> Result<ConnectivityReport, RouteError> {
        self.disconnected.remove(&device.id);
        let direction = device.direction;
        let devices = self.registry.devices();
        let mut report = ConnectivityReport::empty(device.id);
        log::info!("{} ({}) connected for {}", device.id, device.device_type, direction);

        let candidates: Vec<StreamId> = self
            .streams
            .iter()
            .filter(|s| s.direction() == direction && s.is_started() && s.participates())
            .filter(|s| self.should_follow(s.id(), device, &devices))
            .map(|s| s.id())
            .collect();

        for id in candidates {
            let Some(selection) = self.selection_for(id, &self.disconnected, &devices) else {
                continue;
            };
            if let Some(moved) = self.stage_move(id, &selection, &devices) {
                report.moved.push(moved);
            }
        }

        let winner_idle = match self.winners[direction.index()].and_then(|id| self.streams.get(id)) {
            None => true,
            Some(w) => w.target().is_null() || arbitration::is_external_only(w.target(), &devices),
        };
        if !report.moved.is_empty() || (winner_idle && device.uses_internal_codec) {
            self.rescan(direction);
        }
        self.verify_winner(direction);
        self.settle(&mut report.moved);
        Ok(report)
    }

    /// Whether a started stream should be re-placed because `device` arrived.
    fn should_follow(&self, id: StreamId, device: &DeviceInfo, devices: &[DeviceInfo]) -> bool {
        let Some(stream) = self.streams.get(id) else {
            return false;
        };
        let wanted = affinity_rank(stream.avail_devices(), device.device_type).is_some();

        match stream.route_type() {
            RouteType::Auto => {
                let Some(new_rank) = affinity_rank(stream.avail_devices(), device.device_type) else {
                    return false;
                };
                let current_rank = Self::tag_for(stream.target(), devices)
                    .and_then(|t| affinity_rank(stream.avail_devices(), t))
                    .unwrap_or(usize::MAX);
                new_rank < current_rank
            }
            RouteType::AutoLastConnected => {
                wanted
                    && stream
                        .target()
                        .device_ids()
                        .first()
                        .and_then(|id| devices.iter().find(|d| d.id == *id))
                        .map_or(true, |current| current.connected_at < device.connected_at)
            }
            RouteType::AutoAll => wanted && !matches!(stream.target(), RouteTarget::Combined { .. }),
            RouteType::Manual | RouteType::ManualExt => stream
                .parent_group()
                .and_then(|g| self.groups.get(g))
                .is_some_and(|g| g.manual_devices(stream.direction()).contains(&device.id)),
        }
    }

    /// React to a device going away.
    ///
    /// Idempotent: a second notification for the same device, with no connect
    /// in between, changes nothing. Streams attached to the device are muted
    /// under a fresh [`MuteEventId`] before being moved.
    pub fn device_disconnected(&mut self, device: &DeviceInfo) -> Result<ConnectivityReport, RouteError> {
        let mut report = ConnectivityReport::empty(device.id);
        if !self.disconnected.insert(device.id) {
            log::debug!("{} disconnect already handled", device.id);
            return Ok(report);
        }
        let direction = device.direction;
        let devices = self.registry.devices();
        // Forget devices the registry dropped; they can no longer reconnect under that id.
        self.disconnected
            .retain(|id| *id == device.id || devices.iter().any(|d| d.id == *id));
        log::info!("{} ({}) disconnected from {}", device.id, device.device_type, direction);

        let attached: Vec<StreamId> = self
            .streams
            .iter()
            .filter(|s| s.is_started() && s.participates() && s.target().references(device.id))
            .map(|s| s.id())
            .collect();

        if !attached.is_empty() && self.config.mute_on_disconnect {
            let event = MuteEventId::new();
            for id in &attached {
                Self::log_hal(self.hal.set_stream_muted(*id, true), "mute");
            }
            log::debug!("{} muted {} stream(s)", event, attached.len());
            self.notify(|d| d.on_streams_muted(event, device.id, &attached));
            self.mutes.insert(event, attached.clone());
            report.mute_event = Some(event);
            report.muted = attached.clone();
        }

        let winner_attached = self.winners[direction.index()].is_some_and(|w| attached.contains(&w));

        let affected: Vec<(StreamId, RouteType)> = self
            .streams
            .iter()
            .filter(|s| s.direction() == direction && s.is_started() && s.participates())
            .filter(|s| match s.route_type() {
                RouteType::Auto | RouteType::AutoLastConnected => s.avail_devices().contains(&device.device_type),
                RouteType::AutoAll | RouteType::Manual | RouteType::ManualExt => s.target().references(device.id),
            })
            .map(|s| (s.id(), s.route_type()))
            .collect();

        for (id, route_type) in affected {
            let selection = if route_type == RouteType::ManualExt {
                Some(Selection::Null)
            } else {
                self.selection_for(id, &self.disconnected, &devices)
            };
            let Some(selection) = selection else {
                continue;
            };
            if let Some(moved) = self.stage_move(id, &selection, &devices) {
                report.moved.push(moved);
            }
        }

        if winner_attached || !report.moved.is_empty() {
            self.rescan(direction);
        } else {
            self.refresh_route(direction);
        }
        self.verify_winner(direction);
        self.settle(&mut report.moved);
        Ok(report)
    }

    /// Release the mute taken by one disconnect. Returns the streams that
    /// were unmuted; a repeated or unknown id unmutes nothing.
    ///
    /// Mute events are held until acknowledged, even after all their streams
    /// have ended, so an observer that never acknowledges grows
    /// [`pending_mutes`](Self::pending_mutes) by one entry per disconnect.
    pub fn acknowledge_mute(&mut self, event: MuteEventId) -> Vec<StreamId> {
        let Some(streams) = self.mutes.remove(&event) else {
            log::debug!("{} unknown or already released", event);
            return Vec::new();
        };
        let live: Vec<StreamId> = streams.into_iter().filter(|id| self.streams.contains(*id)).collect();
        for id in &live {
            Self::log_hal(self.hal.set_stream_muted(*id, false), "unmute");
        }
        log::debug!("{} released, unmuted {} stream(s)", event, live.len());
        live
    }
}

use chrono::Utc;

use crate::models::device::EndpointHandle;
use crate::models::error::RouteError;
use crate::models::route::{RouteTarget, RouteType};
use crate::models::stream::{Stream, StreamId, StreamRequest, StreamState};
use crate::traits::device_registry::DeviceRegistry;
use crate::traits::hal_executor::HalExecutor;

use super::engine::RoutePolicy;

impl<R: DeviceRegistry, H: HalExecutor> RoutePolicy<R, H> {
    /// Register a new stream and resolve its static policy.
    ///
    /// Never fails on policy gaps: a missing role falls back to the default
    /// role, an unknown role or probe name leaves the stream bound to the
    /// neutral device, and missing priority or route type fields use the
    /// configured fallbacks.
    pub fn prepare(&mut self, request: StreamRequest) -> Result<StreamId, RouteError> {
        let StreamRequest {
            direction,
            role,
            name,
            parent_group,
        } = request;

        let role = match role.filter(|r| !r.is_empty()) {
            Some(role) => role,
            None => {
                log::debug!("stream without role, using '{}'", self.config.default_role);
                self.config.default_role.clone()
            }
        };
        let probe = name.as_deref().is_some_and(|n| self.config.is_skipped_name(n));

        let definition = self.roles.get(&role);
        if definition.is_none() {
            log::warn!("role '{}' not in stream map, binding to null", role);
        }
        let skipped = probe || definition.is_none();

        let (priority, route_type, volume_type, avail_devices) = match definition {
            Some(def) => {
                let priority = def.priority.unwrap_or_else(|| {
                    log::warn!("role '{}' has no priority, using {}", role, self.config.fallback_priority);
                    self.config.fallback_priority
                });
                let route_type = def.route_type.unwrap_or_else(|| {
                    log::warn!("role '{}' has no route type, using {}", role, self.config.fallback_route_type);
                    self.config.fallback_route_type
                });
                (
                    priority,
                    route_type,
                    def.volume_type(direction).map(str::to_string),
                    def.avail_devices(direction).to_vec(),
                )
            }
            None => (self.config.fallback_priority, self.config.fallback_route_type, None, Vec::new()),
        };

        let restricted = !skipped && self.restrictions.is_restricted(direction, &role);
        let parent_group = match parent_group {
            Some(g) if self.groups.contains(g) => Some(g),
            Some(g) => {
                log::warn!("{} is not registered, stream has no parent", g);
                None
            }
            None => None,
        };
        let focus_acquired = parent_group
            .and_then(|g| self.groups.get(g))
            .is_some_and(|g| g.focus().contains(direction));

        let id = self.streams.insert_with(|id| Stream {
            id,
            direction,
            role,
            name,
            priority,
            route_type,
            volume_type,
            avail_devices,
            parent_group,
            focus_acquired,
            active_device: None,
            target: RouteTarget::Null,
            endpoint: EndpointHandle::null(),
            state: StreamState::Prepared,
            skipped,
            restricted,
            created_at: Utc::now(),
            start_seq: 0,
        });

        if let Some(group) = parent_group.and_then(|g| self.groups.get_mut(g)) {
            group.attach(id, direction);
        }

        if let Some(stream) = self.streams.get(id) {
            log::info!(
                "prepared {} {} role={} priority={} route={}{}{}",
                id,
                direction,
                stream.role(),
                priority,
                route_type,
                if skipped { " skipped" } else { "" },
                if restricted { " restricted" } else { "" }
            );
        }
        Ok(id)
    }

    /// Place a stream on its devices and let it challenge the current winner.
    pub fn started(&mut self, id: StreamId) -> Result<(), RouteError> {
        let restricted_now = {
            let stream = self.streams.get(id).ok_or_else(|| RouteError::UnknownStream(id.to_string()))?;
            if stream.state() != StreamState::Prepared {
                return Err(RouteError::InvalidTransition(format!("{} already started", id)));
            }
            !stream.is_skipped() && self.restrictions.is_restricted(stream.direction(), stream.role())
        };

        let seq = self.streams.next_start_seq();
        let Some(stream) = self.streams.get_mut(id) else {
            return Err(RouteError::UnknownStream(id.to_string()));
        };
        stream.state = StreamState::Started;
        stream.start_seq = seq;
        stream.restricted |= restricted_now;
        if !stream.participates() {
            log::debug!("{} started outside arbitration", id);
            return Ok(());
        }
        let (direction, route_type, role) = (stream.direction(), stream.route_type(), stream.role().to_string());

        let devices = self.registry.devices();
        if let Some(selection) = self.selection_for(id, &self.disconnected, &devices) {
            self.stage_move(id, &selection, &devices);
        }

        if route_type == RouteType::ManualExt {
            self.staged.clear();
            log::debug!("{} routed outside the internal codec", id);
            return Ok(());
        }
        if route_type == RouteType::AutoAll {
            self.gather_auto_all(id, direction, &devices);
        }

        Self::log_hal(
            self.hal.notify_stream_connection(&role, direction, id.index, true),
            "stream connection notice",
        );
        self.challenge(id, &devices);
        self.verify_winner(direction);
        self.staged.clear();
        Ok(())
    }

    /// Remove a stream; re-arbitrate if it was the winner.
    pub fn ended(&mut self, id: StreamId) -> Result<(), RouteError> {
        let stream = self
            .streams
            .remove(id)
            .ok_or_else(|| RouteError::UnknownStream(id.to_string()))?;
        let direction = stream.direction();

        if let Some(group) = stream.parent_group().and_then(|g| self.groups.get_mut(g)) {
            group.detach(id);
        }
        for streams in self.mutes.values_mut() {
            streams.retain(|s| *s != id);
        }
        if let Some(dead) = self.selector.release(stream.target()) {
            Self::log_hal(self.hal.release_combined(dead.id), "release combined device");
        }

        let was_started = stream.start_seq() > 0;
        if !was_started || !stream.participates() {
            log::info!("{} ended", id);
            return Ok(());
        }
        if stream.route_type() != RouteType::ManualExt {
            Self::log_hal(
                self.hal.notify_stream_connection(stream.role(), direction, id.index, false),
                "stream disconnection notice",
            );
        }
        log::info!("{} ended, was on {}", id, stream.target());

        self.rescan(direction);
        self.verify_winner(direction);
        Ok(())
    }
}

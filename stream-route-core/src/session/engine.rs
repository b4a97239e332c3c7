use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::models::config::PolicyConfig;
use crate::models::device::{DeviceId, DeviceInfo, DeviceType, Direction, EndpointHandle};
use crate::models::error::RouteError;
use crate::models::events::{MuteEventId, PolicyEvent, PolicyOutcome, StreamMove};
use crate::models::role_table::{RoleTable, RouteTypeDefinition};
use crate::models::route::{RouteChange, RouteCommand, RouteDevice, RouteTarget, RouteType};
use crate::models::stream::{GroupId, Stream, StreamId};
use crate::processing::arbitration::{self, Contender};
use crate::processing::combined::CombinedDevice;
use crate::processing::selector::{RouteSelector, Selection, SelectionRequest};
use crate::registry::groups::{GroupTracker, ParentGroup};
use crate::registry::restriction::RestrictionGate;
use crate::registry::streams::StreamRegistry;
use crate::traits::device_registry::DeviceRegistry;
use crate::traits::hal_executor::HalExecutor;
use crate::traits::policy_delegate::PolicyDelegate;

/// Single-threaded stream routing policy engine.
///
/// Generic over the device registry and HAL backends. Every entry point
/// takes `&mut self` and runs to completion, so arbitration, selection and
/// activation bookkeeping for one event never interleave with another.
///
/// ```text
/// lifecycle events ──→ [Arbitrator] ──winner change──→ [RouteSelector] ──→ HalExecutor
/// device events ─────→ [Reactor] ──re-place streams──→ [Arbitrator]
/// ```
pub struct RoutePolicy<R: DeviceRegistry, H: HalExecutor> {
    pub(super) registry: R,
    pub(super) hal: H,
    pub(super) roles: RoleTable,
    pub(super) config: PolicyConfig,
    pub(super) streams: StreamRegistry,
    pub(super) groups: GroupTracker,
    pub(super) restrictions: RestrictionGate,
    pub(super) selector: RouteSelector,
    pub(super) winners: [Option<StreamId>; 2],
    // Last command sent per direction, for suppressing duplicates.
    pub(super) last_commands: [Option<RouteCommand>; 2],
    pub(super) mutes: HashMap<MuteEventId, Vec<StreamId>>,
    // Devices whose disconnect has been handled and not yet undone by a connect.
    pub(super) disconnected: HashSet<DeviceId>,
    // Targets streams held before being moved in the current event. A winner
    // whose route the HAL rejects goes back to its entry.
    pub(super) staged: HashMap<StreamId, RouteTarget>,
    pub(super) delegate: Option<Arc<dyn PolicyDelegate>>,
}

impl<R: DeviceRegistry, H: HalExecutor> RoutePolicy<R, H> {
    pub fn new(registry: R, hal: H, roles: RoleTable, config: PolicyConfig) -> Result<Self, RouteError> {
        config.validate().map_err(RouteError::Config)?;
        if !roles.contains(&config.default_role) {
            return Err(RouteError::Config(format!(
                "default role '{}' missing from stream map",
                config.default_role
            )));
        }

        Ok(Self {
            registry,
            hal,
            roles,
            config,
            streams: StreamRegistry::new(),
            groups: GroupTracker::new(),
            restrictions: RestrictionGate::new(),
            selector: RouteSelector::new(),
            winners: [None, None],
            last_commands: [None, None],
            mutes: HashMap::new(),
            disconnected: HashSet::new(),
            staged: HashMap::new(),
            delegate: None,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn PolicyDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Tagged-union entry point; dispatches to the named operations.
    pub fn handle(&mut self, event: PolicyEvent) -> Result<PolicyOutcome, RouteError> {
        log::trace!("handling {:?}", event);
        match event {
            PolicyEvent::RegisterGroup { group } => {
                self.register_group(group);
                Ok(PolicyOutcome::Done)
            }
            PolicyEvent::UnregisterGroup { group } => {
                self.unregister_group(group)?;
                Ok(PolicyOutcome::Done)
            }
            PolicyEvent::Prepare { request } => {
                let stream = self.prepare(request)?;
                Ok(PolicyOutcome::Prepared { stream })
            }
            PolicyEvent::Started { stream } => {
                self.started(stream)?;
                Ok(PolicyOutcome::Done)
            }
            PolicyEvent::Ended { stream } => {
                self.ended(stream)?;
                Ok(PolicyOutcome::Done)
            }
            PolicyEvent::FocusChanged { group, mask } => {
                self.update_focus(group, mask)?;
                Ok(PolicyOutcome::Done)
            }
            PolicyEvent::AssignDevices { group, input, output } => {
                if self.assign_devices(group, input, output)? {
                    Ok(PolicyOutcome::Done)
                } else {
                    Ok(PolicyOutcome::Unchanged)
                }
            }
            PolicyEvent::SetRouteOption { group, name, value } => {
                self.set_route_option(group, &name, value)?;
                Ok(PolicyOutcome::Done)
            }
            PolicyEvent::SetRestriction { name, enabled } => {
                let streams = self.set_restriction(&name, enabled)?;
                Ok(PolicyOutcome::Terminated { streams })
            }
            PolicyEvent::DeviceConnected { device } => {
                let report = self.device_connected(&device)?;
                Ok(PolicyOutcome::Connectivity { report })
            }
            PolicyEvent::DeviceDisconnected { device } => {
                let report = self.device_disconnected(&device)?;
                Ok(PolicyOutcome::Connectivity { report })
            }
            PolicyEvent::AcknowledgeMute { mute } => {
                let streams = self.acknowledge_mute(mute);
                Ok(PolicyOutcome::Unmuted { streams })
            }
        }
    }

    // --- Queries ---

    pub fn winner(&self, direction: Direction) -> Option<StreamId> {
        self.winners[direction.index()]
    }

    pub fn stream(&self, id: StreamId) -> Option<&Stream> {
        self.streams.get(id)
    }

    pub fn streams(&self) -> impl Iterator<Item = &Stream> {
        self.streams.iter()
    }

    pub fn group(&self, id: GroupId) -> Option<&ParentGroup> {
        self.groups.get(id)
    }

    /// Static policy for a role, as loaded from the stream map.
    pub fn stream_info(&self, role: &str) -> Option<&RouteTypeDefinition> {
        self.roles.get(role)
    }

    /// Volume type of the current winner for `direction`.
    pub fn current_volume_type(&self, direction: Direction) -> Option<&str> {
        self.winner(direction)
            .and_then(|id| self.streams.get(id))
            .and_then(|s| s.volume_type())
    }

    /// Most recently started stream in `direction` whose role is in `roles`
    /// (any role when `roles` is empty).
    pub fn latest_stream(&self, direction: Direction, roles: &[&str]) -> Option<StreamId> {
        self.streams
            .iter()
            .filter(|s| s.direction() == direction && s.is_started())
            .filter(|s| roles.is_empty() || roles.contains(&s.role()))
            .max_by_key(|s| s.start_seq())
            .map(|s| s.id())
    }

    pub fn combined_devices(&self) -> impl Iterator<Item = &CombinedDevice> {
        self.selector.combined().iter()
    }

    /// Number of started streams whose placement references `device`.
    pub fn device_use_count(&self, device: DeviceId) -> usize {
        self.use_count_excluding(device, None)
    }

    pub fn pending_mutes(&self) -> Vec<MuteEventId> {
        self.mutes.keys().copied().collect()
    }

    pub fn is_restricted(&self, direction: Direction, role: &str) -> bool {
        self.restrictions.is_restricted(direction, role)
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    // --- Placement ---

    pub(super) fn notify(&self, f: impl FnOnce(&dyn PolicyDelegate)) {
        if let Some(ref delegate) = self.delegate {
            f(delegate.as_ref());
        }
    }

    pub(super) fn log_hal(result: Result<(), RouteError>, what: &str) {
        if let Err(e) = result {
            log::warn!("HAL {} failed: {}", what, e);
        }
    }

    pub(super) fn use_count_excluding(&self, device: DeviceId, exclude: Option<StreamId>) -> usize {
        self.streams
            .iter()
            .filter(|s| Some(s.id()) != exclude && s.is_started() && s.participates())
            .filter(|s| s.target().references(device))
            .count()
    }

    /// Pure selection for a live stream with its group's manual list.
    pub(super) fn selection_for(
        &self,
        id: StreamId,
        exclude: &HashSet<DeviceId>,
        devices: &[DeviceInfo],
    ) -> Option<Selection> {
        let stream = self.streams.get(id)?;
        let manual = stream
            .parent_group()
            .and_then(|g| self.groups.get(g))
            .map(|g| g.manual_devices(stream.direction()))
            .unwrap_or(&[]);

        let request = SelectionRequest {
            direction: stream.direction(),
            route_type: stream.route_type(),
            avail: stream.avail_devices(),
            manual,
            exclude,
        };
        Some(self.selector.select(&request, devices))
    }

    fn endpoint_for(&self, target: &RouteTarget, role: &str) -> EndpointHandle {
        match target {
            RouteTarget::Null => EndpointHandle::null(),
            RouteTarget::Device { id } => self.registry.endpoint(*id, role).unwrap_or_else(EndpointHandle::null),
            RouteTarget::Devices { ids } => ids
                .first()
                .and_then(|id| self.registry.endpoint(*id, role))
                .unwrap_or_else(EndpointHandle::null),
            RouteTarget::Combined { id, .. } => self
                .selector
                .combined()
                .get(*id)
                .map(|c| EndpointHandle(c.name()))
                .unwrap_or_else(EndpointHandle::null),
        }
    }

    pub(super) fn tag_for(target: &RouteTarget, devices: &[DeviceInfo]) -> Option<DeviceType> {
        let first = target.device_ids().into_iter().next()?;
        devices.iter().find(|d| d.id == first).map(|d| d.device_type)
    }

    /// Attach a stream to `selection`, releasing its previous target.
    /// Returns `None` when the stream already sits there.
    pub(super) fn move_stream(
        &mut self,
        id: StreamId,
        selection: &Selection,
        devices: &[DeviceInfo],
    ) -> Option<StreamMove> {
        let (route_type, direction, role) = {
            let stream = self.streams.get(id)?;
            if selection.matches(stream.target()) {
                return None;
            }
            (stream.route_type(), stream.direction(), stream.role().to_string())
        };

        let placement = self.selector.place(route_type, direction, selection);
        if let Some(ref created) = placement.created {
            Self::log_hal(self.hal.instantiate_combined(created), "instantiate combined device");
        }
        let endpoint = self.endpoint_for(&placement.target, &role);
        let tag = Self::tag_for(&placement.target, devices);

        let stream = self.streams.get_mut(id)?;
        let from = std::mem::replace(&mut stream.target, placement.target.clone());
        stream.endpoint = endpoint;
        stream.active_device = tag;

        if let Some(dead) = self.selector.release(&from) {
            Self::log_hal(self.hal.release_combined(dead.id), "release combined device");
        }

        log::info!("{} moved {} -> {}", id, from, placement.target);
        self.notify(|d| d.on_stream_moved(id, &placement.target));
        Some(StreamMove {
            stream: id,
            from,
            to: placement.target,
        })
    }

    /// [`move_stream`](Self::move_stream) ahead of routing: the previous
    /// target is kept until the event settles.
    pub(super) fn stage_move(&mut self, id: StreamId, selection: &Selection, devices: &[DeviceInfo]) -> Option<StreamMove> {
        let previous = self.streams.get(id)?.target().clone();
        let moved = self.move_stream(id, selection, devices)?;
        self.staged.entry(id).or_insert(previous);
        Some(moved)
    }

    /// Close an event: forget staged targets and drop reported moves that
    /// were rolled back.
    pub(super) fn settle(&mut self, moves: &mut Vec<StreamMove>) {
        self.staged.clear();
        moves.retain(|m| self.streams.get(m.stream).is_some_and(|s| s.target() == &m.to));
    }

    /// Re-place every other started AUTO_ALL stream of the direction, so they
    /// join a combined device as it forms.
    pub(super) fn gather_auto_all(&mut self, trigger: StreamId, direction: Direction, devices: &[DeviceInfo]) -> Vec<StreamMove> {
        let others: Vec<StreamId> = self
            .streams
            .iter()
            .filter(|s| s.id() != trigger && s.direction() == direction)
            .filter(|s| s.is_started() && s.participates() && s.route_type() == RouteType::AutoAll)
            .map(|s| s.id())
            .collect();

        let mut moves = Vec::new();
        for other in others {
            let Some(selection) = self.selection_for(other, &self.disconnected, devices) else {
                continue;
            };
            if let Some(m) = self.stage_move(other, &selection, devices) {
                moves.push(m);
            }
        }
        moves
    }

    // --- Arbitration ---

    /// Whether a stream may hold the winner slot of its direction.
    pub(super) fn is_candidate(&self, stream: &Stream, devices: &[DeviceInfo]) -> bool {
        stream.is_started()
            && stream.participates()
            && stream.route_type() != RouteType::ManualExt
            && !arbitration::is_external_only(stream.target(), devices)
    }

    /// A stream started or gained relevance: compare it with the incumbent only.
    pub(super) fn challenge(&mut self, challenger: StreamId, devices: &[DeviceInfo]) {
        let Some(stream) = self.streams.get(challenger) else {
            return;
        };
        if !self.is_candidate(stream, devices) {
            log::debug!("{} not eligible for arbitration", challenger);
            return;
        }
        let direction = stream.direction();
        let contender = Contender::of(stream);

        let incumbent = self.winners[direction.index()].and_then(|id| self.streams.get(id));
        match incumbent {
            None => self.set_winner(direction, Some(challenger)),
            Some(current) if current.id() == challenger => self.refresh_route(direction),
            Some(current) => {
                if arbitration::outranks(&contender, &Contender::of(current)) {
                    self.set_winner(direction, Some(challenger));
                    return;
                }
                let (holder, tag) = (current.id(), current.active_device());
                if let Some(stream) = self.streams.get_mut(challenger) {
                    if stream.route_type.is_auto() {
                        stream.active_device = tag;
                    }
                }
                log::debug!("{} keeps {}; {} loses", direction, holder, challenger);
            }
        }
    }

    /// Re-derive the winner from every eligible stream of the direction.
    pub(super) fn rescan(&mut self, direction: Direction) {
        let devices = self.registry.devices();
        let current = self.winners[direction.index()];

        let incumbent = current
            .and_then(|id| self.streams.get(id))
            .filter(|s| self.is_candidate(s, &devices))
            .map(Contender::of);
        let candidates: Vec<Contender> = self
            .streams
            .iter()
            .filter(|s| s.direction() == direction && self.is_candidate(s, &devices))
            .map(Contender::of)
            .collect();

        let next = arbitration::pick_winner(incumbent, candidates);
        if next != current {
            self.set_winner(direction, next);
        } else {
            self.refresh_route(direction);
        }
    }

    pub(super) fn set_winner(&mut self, direction: Direction, winner: Option<StreamId>) {
        let previous = std::mem::replace(&mut self.winners[direction.index()], winner);
        log::info!(
            "{} winner {} -> {}",
            direction,
            previous.map_or("none".to_string(), |id| id.to_string()),
            winner.map_or("none".to_string(), |id| id.to_string())
        );
        self.notify(|d| d.on_winner_changed(direction, winner));

        match winner {
            Some(id) => self.route_change_start(id, true),
            None => self.route_change_end(direction),
        }
    }

    /// Re-apply the current winner's route, or the reset if there is none.
    pub(super) fn refresh_route(&mut self, direction: Direction) {
        match self.winners[direction.index()] {
            Some(id) => self.route_change_start(id, false),
            None => self.route_change_end(direction),
        }
    }

    /// Program the HAL for the winner: plan target and active device set,
    /// send one aggregated command, then commit placement and activation.
    fn route_change_start(&mut self, winner: StreamId, fresh: bool) {
        let devices = self.registry.devices();
        let Some(selection) = self.selection_for(winner, &self.disconnected, &devices) else {
            return;
        };
        let Some(stream) = self.streams.get(winner) else {
            return;
        };
        let direction = stream.direction();
        let role = stream.role().to_string();
        let group = stream.parent_group();

        let internal = |id: &DeviceId| {
            devices
                .iter()
                .any(|d| d.id == *id && d.uses_internal_codec)
        };
        let mut active: Vec<DeviceId> = selection_ids(&selection).into_iter().filter(|id| internal(id)).collect();
        let kept: Vec<DeviceId> = devices
            .iter()
            .filter(|d| d.direction == direction && d.uses_internal_codec && d.activated && d.connected)
            .filter(|d| !self.disconnected.contains(&d.id) && !active.contains(&d.id))
            .filter(|d| self.use_count_excluding(d.id, Some(winner)) > 0)
            .map(|d| d.id)
            .collect();
        active.extend(kept);

        let command = RouteCommand {
            role: role.clone(),
            direction,
            change: RouteChange::Start,
            devices: active
                .iter()
                .filter_map(|id| devices.iter().find(|d| d.id == *id))
                .map(|d| RouteDevice {
                    device_type: d.device_type,
                    direction: d.direction,
                    id: d.id,
                })
                .collect(),
            stream_index: Some(winner.index),
        };

        if !self.send_command(command) {
            match self.staged.remove(&winner) {
                Some(previous) => {
                    log::warn!("{} back on {} after rejected route", winner, previous);
                    self.move_stream(winner, &Selection::from(&previous), &devices);
                }
                None => {
                    if let Some(s) = self.streams.get(winner) {
                        log::warn!("{} stays on {} after rejected route", winner, s.target());
                    }
                }
            }
            return;
        }

        self.staged.remove(&winner);
        self.move_stream(winner, &selection, &devices);
        self.commit_activation(direction, &active);

        if fresh {
            self.replay_route_options(group, &role);
        }
    }

    /// Tell the HAL nothing needs the internal codec in this direction.
    fn route_change_end(&mut self, direction: Direction) {
        let role = self.last_commands[direction.index()]
            .as_ref()
            .map_or_else(|| self.config.default_role.clone(), |c| c.role.clone());
        self.send_command(RouteCommand::reset(&role, direction));

        let devices = self.registry.devices();
        let kept: Vec<DeviceId> = devices
            .iter()
            .filter(|d| d.direction == direction && d.uses_internal_codec && d.activated && d.connected)
            .filter(|d| !self.disconnected.contains(&d.id) && self.use_count_excluding(d.id, None) > 0)
            .map(|d| d.id)
            .collect();
        self.commit_activation(direction, &kept);
    }

    /// Send a command unless it repeats the last one. Returns false if the
    /// HAL rejected it.
    fn send_command(&mut self, command: RouteCommand) -> bool {
        let slot = command.direction.index();
        if let Some(ref last) = self.last_commands[slot] {
            if last.same_route(&command) {
                log::trace!("suppressing duplicate {:?} route for {}", command.change, command.direction);
                return true;
            }
        }

        match self.hal.apply_route(&command) {
            Ok(()) => {
                log::debug!(
                    "route {:?} {} role={} devices={:?}",
                    command.change,
                    command.direction,
                    command.role,
                    command.devices.iter().map(|d| d.device_type.as_str()).collect::<Vec<_>>()
                );
                self.last_commands[slot] = Some(command);
                true
            }
            Err(e) => {
                log::warn!("HAL rejected {:?} route for {}: {}", command.change, command.direction, e);
                false
            }
        }
    }

    /// Make exactly `active` the activated internal-codec devices of `direction`.
    fn commit_activation(&mut self, direction: Direction, active: &[DeviceId]) {
        let devices = self.registry.devices();
        for device in devices.iter().filter(|d| d.direction == direction && d.uses_internal_codec) {
            let wanted = active.contains(&device.id);
            if wanted == device.activated {
                continue;
            }
            match self.registry.set_activated(device.id, wanted) {
                Ok(()) => {
                    log::debug!("{} ({}) activated={}", device.id, device.device_type, wanted);
                    self.notify(|d| d.on_device_activation_changed(device.id, wanted));
                }
                Err(e) => log::warn!("failed to set activation of {}: {}", device.id, e),
            }
        }
    }

    fn replay_route_options(&mut self, group: Option<GroupId>, role: &str) {
        let Some(options) = group.and_then(|g| self.groups.get(g)).map(|g| g.route_options().clone()) else {
            return;
        };
        for (name, value) in options {
            Self::log_hal(self.hal.apply_route_option(role, &name, value), "route option");
        }
    }

    /// Check the winner slot. A violation is a defect: it asserts in debug
    /// builds and forces a rescan otherwise.
    pub(super) fn verify_winner(&mut self, direction: Direction) {
        let Some(winner) = self.winners[direction.index()] else {
            return;
        };
        let problem = match self.streams.get(winner) {
            None => Some("winner no longer exists"),
            Some(s) if s.direction() != direction => Some("winner has the wrong direction"),
            Some(s) if !s.is_started() => Some("winner is not started"),
            Some(s) if !s.participates() => Some("winner is excluded from arbitration"),
            Some(s) if s.route_type() == RouteType::ManualExt => Some("winner uses an external-only route"),
            Some(_) => None,
        };
        let Some(problem) = problem else {
            return;
        };

        let err = RouteError::InconsistentState(format!("{}: {} ({})", direction, problem, winner));
        debug_assert!(false, "{}", err);
        log::error!("{}; forcing re-arbitration", err);
        self.winners[direction.index()] = None;
        self.rescan(direction);
    }
}

fn selection_ids(selection: &Selection) -> Vec<DeviceId> {
    match selection {
        Selection::Null => Vec::new(),
        Selection::Single(id) => vec![*id],
        Selection::Multiple(ids) => ids.clone(),
        Selection::Combine(members) => members.to_vec(),
    }
}

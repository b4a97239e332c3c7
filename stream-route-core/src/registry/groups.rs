use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::device::{DeviceId, Direction};
use crate::models::stream::{FocusMask, GroupId, StreamId};

/// Streams owned by one external client session, plus the session's manual
/// device assignment, focus and route options.
#[derive(Debug, Clone)]
pub struct ParentGroup {
    id: GroupId,
    playback: BTreeSet<StreamId>,
    capture: BTreeSet<StreamId>,
    manual_in: Vec<DeviceId>,
    manual_out: Vec<DeviceId>,
    focus: FocusMask,
    route_options: BTreeMap<String, i32>,
}

impl ParentGroup {
    pub fn new(id: GroupId) -> Self {
        Self {
            id,
            playback: BTreeSet::new(),
            capture: BTreeSet::new(),
            manual_in: Vec::new(),
            manual_out: Vec::new(),
            focus: FocusMask::NONE,
            route_options: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn streams(&self, direction: Direction) -> &BTreeSet<StreamId> {
        match direction {
            Direction::Playback => &self.playback,
            Direction::Capture => &self.capture,
        }
    }

    pub fn owns(&self, stream: StreamId) -> bool {
        self.playback.contains(&stream) || self.capture.contains(&stream)
    }

    pub fn manual_devices(&self, direction: Direction) -> &[DeviceId] {
        match direction {
            Direction::Playback => &self.manual_out,
            Direction::Capture => &self.manual_in,
        }
    }

    pub fn focus(&self) -> FocusMask {
        self.focus
    }

    pub fn route_options(&self) -> &BTreeMap<String, i32> {
        &self.route_options
    }

    pub(crate) fn attach(&mut self, stream: StreamId, direction: Direction) {
        match direction {
            Direction::Playback => self.playback.insert(stream),
            Direction::Capture => self.capture.insert(stream),
        };
    }

    pub(crate) fn detach(&mut self, stream: StreamId) {
        self.playback.remove(&stream);
        self.capture.remove(&stream);
    }

    /// Replace both manual lists. Returns false when nothing changed.
    pub(crate) fn replace_devices(&mut self, input: Vec<DeviceId>, output: Vec<DeviceId>) -> bool {
        if self.manual_in == input && self.manual_out == output {
            return false;
        }
        self.manual_in = input;
        self.manual_out = output;
        true
    }

    pub(crate) fn set_focus(&mut self, mask: FocusMask) {
        self.focus = mask;
    }

    pub(crate) fn set_route_option(&mut self, name: &str, value: i32) {
        self.route_options.insert(name.to_string(), value);
    }
}

/// Registered parent groups.
#[derive(Debug, Default)]
pub struct GroupTracker {
    groups: HashMap<GroupId, ParentGroup>,
}

impl GroupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the group was already registered.
    pub fn register(&mut self, id: GroupId) -> bool {
        if self.groups.contains_key(&id) {
            return false;
        }
        self.groups.insert(id, ParentGroup::new(id));
        true
    }

    pub fn unregister(&mut self, id: GroupId) -> Option<ParentGroup> {
        self.groups.remove(&id)
    }

    pub fn get(&self, id: GroupId) -> Option<&ParentGroup> {
        self.groups.get(&id)
    }

    pub fn get_mut(&mut self, id: GroupId) -> Option<&mut ParentGroup> {
        self.groups.get_mut(&id)
    }

    pub fn contains(&self, id: GroupId) -> bool {
        self.groups.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(index: u32) -> StreamId {
        StreamId { index, generation: 0 }
    }

    #[test]
    fn register_is_idempotent() {
        let mut tracker = GroupTracker::new();
        assert!(tracker.register(GroupId(1)));
        assert!(!tracker.register(GroupId(1)));
        assert_eq!(tracker.len(), 1);
        assert!(tracker.unregister(GroupId(1)).is_some());
        assert!(tracker.is_empty());
    }

    #[test]
    fn attach_and_detach_by_direction() {
        let mut group = ParentGroup::new(GroupId(1));
        group.attach(sid(1), Direction::Playback);
        group.attach(sid(2), Direction::Capture);

        assert!(group.streams(Direction::Playback).contains(&sid(1)));
        assert!(group.owns(sid(2)));

        group.detach(sid(2));
        assert!(group.streams(Direction::Capture).is_empty());
    }

    #[test]
    fn replace_devices_reports_changes() {
        let mut group = ParentGroup::new(GroupId(1));
        assert!(group.replace_devices(vec![DeviceId(5)], vec![DeviceId(1), DeviceId(2)]));
        assert!(!group.replace_devices(vec![DeviceId(5)], vec![DeviceId(1), DeviceId(2)]));
        assert_eq!(group.manual_devices(Direction::Playback), &[DeviceId(1), DeviceId(2)]);
        assert_eq!(group.manual_devices(Direction::Capture), &[DeviceId(5)]);
    }
}

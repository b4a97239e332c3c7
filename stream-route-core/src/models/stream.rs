use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::device::{DeviceType, Direction, EndpointHandle};
use super::route::{RouteTarget, RouteType};

/// Generation-checked handle into the stream arena.
///
/// A handle outlives its stream safely: once the slot is reused the
/// generation no longer matches and lookups return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream#{}.{}", self.index, self.generation)
    }
}

/// Identity of an external client session owning streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

/// Focus-acquired bits, one per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FocusMask(pub u8);

impl FocusMask {
    pub const NONE: FocusMask = FocusMask(0);
    pub const PLAYBACK: FocusMask = FocusMask(0x1);
    pub const CAPTURE: FocusMask = FocusMask(0x2);
    pub const BOTH: FocusMask = FocusMask(0x3);

    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Playback => Self::PLAYBACK,
            Direction::Capture => Self::CAPTURE,
        }
    }

    pub fn contains(self, direction: Direction) -> bool {
        self.0 & Self::for_direction(direction).0 != 0
    }
}

/// Stream lifecycle. Ending a stream removes it from the arena from
/// either state, so a stale handle resolves to nothing.
///
/// ```text
/// prepared → started
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Prepared,
    Started,
}

/// What a producer supplies when opening a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRequest {
    pub direction: Direction,
    #[serde(default)]
    pub role: Option<String>,
    /// Media name, used to recognise internal probe streams.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_group: Option<GroupId>,
}

impl StreamRequest {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            role: None,
            name: None,
            parent_group: None,
        }
    }

    pub fn playback(role: &str) -> Self {
        Self::new(Direction::Playback).role(role)
    }

    pub fn capture(role: &str) -> Self {
        Self::new(Direction::Capture).role(role)
    }

    pub fn role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn group(mut self, group: GroupId) -> Self {
        self.parent_group = Some(group);
        self
    }
}

/// One live playback or capture stream.
///
/// Role, priority and route type are fixed at prepare time; only focus,
/// the active-device tag and the placement change afterwards.
#[derive(Debug, Clone)]
pub struct Stream {
    pub(crate) id: StreamId,
    pub(crate) direction: Direction,
    pub(crate) role: String,
    pub(crate) name: Option<String>,
    pub(crate) priority: i32,
    pub(crate) route_type: RouteType,
    pub(crate) volume_type: Option<String>,
    pub(crate) avail_devices: Vec<DeviceType>,
    pub(crate) parent_group: Option<GroupId>,
    pub(crate) focus_acquired: bool,
    pub(crate) active_device: Option<DeviceType>,
    pub(crate) target: RouteTarget,
    pub(crate) endpoint: EndpointHandle,
    pub(crate) state: StreamState,
    pub(crate) skipped: bool,
    pub(crate) restricted: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) start_seq: u64,
}

impl Stream {
    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn route_type(&self) -> RouteType {
        self.route_type
    }

    pub fn volume_type(&self) -> Option<&str> {
        self.volume_type.as_deref()
    }

    /// Affinity list for this stream's direction, in preference order.
    pub fn avail_devices(&self) -> &[DeviceType] {
        &self.avail_devices
    }

    pub fn parent_group(&self) -> Option<GroupId> {
        self.parent_group
    }

    pub fn focus_acquired(&self) -> bool {
        self.focus_acquired
    }

    /// Device type the stream is reported as playing on.
    pub fn active_device(&self) -> Option<DeviceType> {
        self.active_device
    }

    pub fn target(&self) -> &RouteTarget {
        &self.target
    }

    pub fn endpoint(&self) -> &EndpointHandle {
        &self.endpoint
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_started(&self) -> bool {
        self.state == StreamState::Started
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    /// Whether the stream takes part in placement and arbitration at all.
    pub fn participates(&self) -> bool {
        !self.skipped && !self.restricted
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Monotonic start order; zero until started.
    pub fn start_seq(&self) -> u64 {
        self.start_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_mask_bits() {
        assert!(FocusMask::BOTH.contains(Direction::Playback));
        assert!(FocusMask::BOTH.contains(Direction::Capture));
        assert!(FocusMask::PLAYBACK.contains(Direction::Playback));
        assert!(!FocusMask::PLAYBACK.contains(Direction::Capture));
        assert!(!FocusMask::NONE.contains(Direction::Capture));
    }

    #[test]
    fn request_builder() {
        let req = StreamRequest::capture("voice-recognition")
            .name("probe")
            .group(GroupId(9));
        assert_eq!(req.direction, Direction::Capture);
        assert_eq!(req.role.as_deref(), Some("voice-recognition"));
        assert_eq!(req.name.as_deref(), Some("probe"));
        assert_eq!(req.parent_group, Some(GroupId(9)));
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::device::{DeviceId, DeviceInfo};
use super::route::RouteTarget;
use super::stream::{FocusMask, GroupId, StreamId, StreamRequest};

/// Identifies one disconnect-triggered mute so it can be released exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MuteEventId(pub Uuid);

impl MuteEventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MuteEventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MuteEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mute-{}", self.0)
    }
}

/// A stream placement change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamMove {
    pub stream: StreamId,
    pub from: RouteTarget,
    pub to: RouteTarget,
}

/// What a connect/disconnect event did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityReport {
    pub device: DeviceId,
    /// Set when streams were muted; release with `acknowledge_mute`.
    pub mute_event: Option<MuteEventId>,
    pub muted: Vec<StreamId>,
    pub moved: Vec<StreamMove>,
}

impl ConnectivityReport {
    pub fn empty(device: DeviceId) -> Self {
        Self {
            device,
            mute_event: None,
            muted: Vec::new(),
            moved: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.muted.is_empty() && self.moved.is_empty()
    }
}

/// Every input the policy engine reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum PolicyEvent {
    RegisterGroup { group: GroupId },
    UnregisterGroup { group: GroupId },
    Prepare { request: StreamRequest },
    Started { stream: StreamId },
    Ended { stream: StreamId },
    FocusChanged { group: GroupId, mask: FocusMask },
    AssignDevices {
        group: GroupId,
        #[serde(default)]
        input: Vec<DeviceId>,
        #[serde(default)]
        output: Vec<DeviceId>,
    },
    SetRouteOption { group: GroupId, name: String, value: i32 },
    SetRestriction { name: String, enabled: bool },
    DeviceConnected { device: DeviceInfo },
    DeviceDisconnected { device: DeviceInfo },
    AcknowledgeMute { mute: MuteEventId },
}

/// Result of `RoutePolicy::handle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum PolicyOutcome {
    Done,
    Prepared { stream: StreamId },
    /// `assign_devices` with lists identical to the current ones.
    Unchanged,
    Terminated { streams: Vec<StreamId> },
    Connectivity { report: ConnectivityReport },
    Unmuted { streams: Vec<StreamId> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::Direction;

    #[test]
    fn parses_tagged_events() {
        let json = r#"{"event": "prepare", "request": {"direction": "capture", "role": "media"}}"#;
        let event: PolicyEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            PolicyEvent::Prepare {
                request: StreamRequest::new(Direction::Capture).role("media")
            }
        );

        let json = r#"{"event": "assign-devices", "group": 4, "output": [1, 2]}"#;
        let event: PolicyEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            PolicyEvent::AssignDevices {
                group: GroupId(4),
                input: vec![],
                output: vec![DeviceId(1), DeviceId(2)],
            }
        );
    }

    #[test]
    fn mute_ids_are_unique() {
        assert_ne!(MuteEventId::new(), MuteEventId::new());
    }
}

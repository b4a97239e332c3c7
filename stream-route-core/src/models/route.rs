use std::fmt;

use serde::{Deserialize, Serialize};

use super::device::{DeviceId, DeviceType, Direction};

/// Policy used to pick device(s) for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteType {
    /// First connected device in affinity order.
    Auto,
    /// Most recently connected device in the affinity list.
    AutoLastConnected,
    /// Up to two connected devices, combined into one virtual sink.
    AutoAll,
    /// Devices assigned by the owning parent group.
    Manual,
    /// Like `Manual`, restricted to external-codec devices.
    ManualExt,
}

impl RouteType {
    pub fn is_auto(self) -> bool {
        matches!(self, Self::Auto | Self::AutoLastConnected | Self::AutoAll)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::AutoLastConnected => "auto-last-connected",
            Self::AutoAll => "auto-all",
            Self::Manual => "manual",
            Self::ManualExt => "manual-ext",
        }
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a synthesized two-device virtual endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombinedId(pub u32);

impl fmt::Display for CombinedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "combined#{}", self.0)
    }
}

/// Where a stream currently plays / records.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RouteTarget {
    /// Neutral silent sink/source.
    #[default]
    Null,
    Device { id: DeviceId },
    /// Several devices driven at once through the codec (MANUAL).
    Devices { ids: Vec<DeviceId> },
    Combined { id: CombinedId, members: [DeviceId; 2] },
}

impl RouteTarget {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn references(&self, device: DeviceId) -> bool {
        match self {
            Self::Null => false,
            Self::Device { id } => *id == device,
            Self::Devices { ids } => ids.contains(&device),
            Self::Combined { members, .. } => members.contains(&device),
        }
    }

    pub fn device_ids(&self) -> Vec<DeviceId> {
        match self {
            Self::Null => Vec::new(),
            Self::Device { id } => vec![*id],
            Self::Devices { ids } => ids.clone(),
            Self::Combined { members, .. } => members.to_vec(),
        }
    }

    pub fn combined_id(&self) -> Option<CombinedId> {
        match self {
            Self::Combined { id, .. } => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Device { id } => write!(f, "{}", id),
            Self::Devices { ids } => {
                let names: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                write!(f, "[{}]", names.join(", "))
            }
            Self::Combined { id, members } => {
                write!(f, "{}({}, {})", id, members[0], members[1])
            }
        }
    }
}

/// Whether a routing command starts or resets the internal-codec path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteChange {
    Start,
    /// No stream needs the internal codec in this direction anymore.
    End,
}

/// One device entry in a routing command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDevice {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub direction: Direction,
    pub id: DeviceId,
}

/// Aggregated routing command handed to the HAL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCommand {
    pub role: String,
    pub direction: Direction,
    pub change: RouteChange,
    pub devices: Vec<RouteDevice>,
    /// Arena index of the stream that triggered the command, if any.
    pub stream_index: Option<u32>,
}

impl RouteCommand {
    pub fn reset(role: &str, direction: Direction) -> Self {
        Self {
            role: role.to_string(),
            direction,
            change: RouteChange::End,
            devices: Vec::new(),
            stream_index: None,
        }
    }

    /// Two commands are equivalent when they would program the HAL the same way.
    pub fn same_route(&self, other: &RouteCommand) -> bool {
        self.direction == other.direction
            && self.change == other.change
            && self.role == other.role
            && self.devices == other.devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_type_names() {
        let parsed: RouteType = serde_json::from_str("\"auto-last-connected\"").unwrap();
        assert_eq!(parsed, RouteType::AutoLastConnected);
        assert_eq!(RouteType::ManualExt.to_string(), "manual-ext");
        assert!(RouteType::AutoAll.is_auto());
        assert!(!RouteType::Manual.is_auto());
    }

    #[test]
    fn target_references() {
        let combined = RouteTarget::Combined {
            id: CombinedId(1),
            members: [DeviceId(3), DeviceId(4)],
        };
        assert!(combined.references(DeviceId(4)));
        assert!(!combined.references(DeviceId(5)));
        assert_eq!(combined.combined_id(), Some(CombinedId(1)));

        let manual = RouteTarget::Devices {
            ids: vec![DeviceId(1), DeviceId(2)],
        };
        assert_eq!(manual.device_ids(), vec![DeviceId(1), DeviceId(2)]);
        assert!(!RouteTarget::Null.references(DeviceId(1)));
    }

    #[test]
    fn same_route_ignores_stream_index() {
        let mut a = RouteCommand::reset("media", Direction::Playback);
        let mut b = a.clone();
        a.stream_index = Some(1);
        b.stream_index = Some(7);
        assert!(a.same_route(&b));

        b.role = "call".into();
        assert!(!a.same_route(&b));
    }
}

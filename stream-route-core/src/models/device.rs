use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stream / device direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Playback,
    Capture,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Playback, Direction::Capture];

    /// Slot index for per-direction arrays.
    pub fn index(self) -> usize {
        match self {
            Self::Playback => 0,
            Self::Capture => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Playback => "playback",
            Self::Capture => "capture",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of audio endpoint, as named in the stream map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    #[serde(rename = "builtin-speaker")]
    Speaker,
    #[serde(rename = "builtin-receiver")]
    Receiver,
    #[serde(rename = "builtin-mic")]
    Mic,
    #[serde(rename = "audio-jack")]
    AudioJack,
    #[serde(rename = "bt-a2dp")]
    BtA2dp,
    #[serde(rename = "bt-sco")]
    BtSco,
    #[serde(rename = "hdmi")]
    Hdmi,
    #[serde(rename = "usb-audio")]
    UsbAudio,
    #[serde(rename = "forwarding")]
    Forwarding,
    #[serde(rename = "network")]
    Network,
}

impl DeviceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Speaker => "builtin-speaker",
            Self::Receiver => "builtin-receiver",
            Self::Mic => "builtin-mic",
            Self::AudioJack => "audio-jack",
            Self::BtA2dp => "bt-a2dp",
            Self::BtSco => "bt-sco",
            Self::Hdmi => "hdmi",
            Self::UsbAudio => "usb-audio",
            Self::Forwarding => "forwarding",
            Self::Network => "network",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry-assigned device identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev#{}", self.0)
    }
}

/// Name of the sink/source a stream is attached to on a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointHandle(pub String);

impl EndpointHandle {
    /// The neutral sink/source streams fall back to when nothing is routable.
    pub fn null() -> Self {
        Self("null".into())
    }
}

/// Snapshot of one endpoint as reported by the device registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub direction: Direction,
    #[serde(default)]
    pub name: String,
    pub connected: bool,
    /// Only meaningful when `uses_internal_codec` is set.
    #[serde(default)]
    pub activated: bool,
    pub connected_at: DateTime<Utc>,
    /// False for devices that do their own decode (BT, USB).
    pub uses_internal_codec: bool,
}

impl DeviceInfo {
    pub fn new(
        id: u32,
        device_type: DeviceType,
        direction: Direction,
        uses_internal_codec: bool,
    ) -> Self {
        Self {
            id: DeviceId(id),
            device_type,
            direction,
            name: format!("{}-{}", device_type, direction),
            connected: true,
            activated: false,
            connected_at: Utc::now(),
            uses_internal_codec,
        }
    }

    /// Builder-style override of the connection timestamp.
    pub fn connected_at(mut self, at: DateTime<Utc>) -> Self {
        self.connected_at = at;
        self
    }

    pub fn is_eligible_for(&self, direction: Direction) -> bool {
        self.connected && self.direction == direction
    }
}

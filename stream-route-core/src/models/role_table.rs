use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::device::{DeviceType, Direction};
use super::error::RouteError;
use super::route::RouteType;

/// Volume type per direction. `"none"` in the stream map means no volume type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeTypes {
    #[serde(rename = "in", default)]
    pub input: Option<String>,
    #[serde(rename = "out", default)]
    pub output: Option<String>,
}

/// Static routing policy for one stream role.
///
/// `priority` and `route_type` are optional so that a malformed entry still
/// loads; the engine degrades such streams instead of refusing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RouteTypeDefinition {
    pub role: String,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub route_type: Option<RouteType>,
    #[serde(default)]
    pub volume_types: VolumeTypes,
    /// Capture devices in preference order.
    #[serde(default)]
    pub avail_in_devices: Vec<DeviceType>,
    /// Playback devices in preference order.
    #[serde(default)]
    pub avail_out_devices: Vec<DeviceType>,
    #[serde(default)]
    pub avail_frameworks: Vec<String>,
}

impl RouteTypeDefinition {
    pub fn avail_devices(&self, direction: Direction) -> &[DeviceType] {
        match direction {
            Direction::Playback => &self.avail_out_devices,
            Direction::Capture => &self.avail_in_devices,
        }
    }

    pub fn volume_type(&self, direction: Direction) -> Option<&str> {
        let value = match direction {
            Direction::Playback => self.volume_types.output.as_deref(),
            Direction::Capture => self.volume_types.input.as_deref(),
        };
        value.filter(|v| *v != "none")
    }
}

#[derive(Debug, Deserialize)]
struct StreamMap {
    streams: Vec<RouteTypeDefinition>,
}

/// Role → policy lookup, loaded once at start.
#[derive(Debug, Clone, Default)]
pub struct RoleTable {
    roles: HashMap<String, RouteTypeDefinition>,
}

impl RoleTable {
    pub fn new(definitions: impl IntoIterator<Item = RouteTypeDefinition>) -> Result<Self, RouteError> {
        let mut roles = HashMap::new();
        for definition in definitions {
            if definition.role.trim().is_empty() {
                return Err(RouteError::Config("stream entry with empty role".into()));
            }
            let role = definition.role.clone();
            if roles.insert(role.clone(), definition).is_some() {
                return Err(RouteError::Config(format!("duplicate role: {}", role)));
            }
        }
        Ok(Self { roles })
    }

    /// Parse a stream map document: `{"streams": [ {...}, ... ]}`.
    pub fn from_json(json: &str) -> Result<Self, RouteError> {
        let map: StreamMap = serde_json::from_str(json)
            .map_err(|e| RouteError::Config(format!("failed to parse stream map: {}", e)))?;
        let table = Self::new(map.streams)?;
        log::info!("loaded stream map with {} roles", table.len());
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, RouteError> {
        let json = fs::read_to_string(path).map_err(|e| {
            RouteError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn get(&self, role: &str) -> Option<&RouteTypeDefinition> {
        self.roles.get(role)
    }

    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = r#"{
        "streams": [
            {
                "role": "media",
                "priority": 3,
                "route-type": "auto",
                "volume-types": { "in": "none", "out": "media" },
                "avail-in-devices": ["builtin-mic"],
                "avail-out-devices": ["builtin-speaker", "bt-a2dp"],
                "avail-frameworks": ["player", "wav-player"]
            },
            {
                "role": "broken"
            }
        ]
    }"#;

    #[test]
    fn parses_stream_map() {
        let table = RoleTable::from_json(MAP).unwrap();
        assert_eq!(table.len(), 2);

        let media = table.get("media").unwrap();
        assert_eq!(media.priority, Some(3));
        assert_eq!(media.route_type, Some(RouteType::Auto));
        assert_eq!(
            media.avail_devices(Direction::Playback),
            &[DeviceType::Speaker, DeviceType::BtA2dp]
        );
        assert_eq!(media.volume_type(Direction::Playback), Some("media"));
        assert_eq!(media.volume_type(Direction::Capture), None);
    }

    #[test]
    fn missing_fields_load_as_none() {
        let table = RoleTable::from_json(MAP).unwrap();
        let broken = table.get("broken").unwrap();
        assert_eq!(broken.priority, None);
        assert_eq!(broken.route_type, None);
        assert!(broken.avail_devices(Direction::Capture).is_empty());
    }

    #[test]
    fn duplicate_roles_rejected() {
        let json = r#"{"streams": [{"role": "a"}, {"role": "a"}]}"#;
        let err = RoleTable::from_json(json).unwrap_err();
        assert!(matches!(err, RouteError::Config(_)));
    }

    #[test]
    fn unknown_device_type_rejected() {
        let json = r#"{"streams": [{"role": "a", "avail-out-devices": ["toaster"]}]}"#;
        assert!(RoleTable::from_json(json).is_err());
    }
}

use std::collections::BTreeMap;

use crate::models::device::Direction;
use crate::models::error::RouteError;

/// A parsed restriction such as `block_capture_media`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Restriction {
    pub direction: Direction,
    pub role: String,
}

impl Restriction {
    /// Accepts `block_capture_<role>`, `block_recording_<role>` and
    /// `block_playback_<role>`.
    pub fn parse(name: &str) -> Result<Self, RouteError> {
        const PREFIXES: [(&str, Direction); 3] = [
            ("block_capture_", Direction::Capture),
            ("block_recording_", Direction::Capture),
            ("block_playback_", Direction::Playback),
        ];

        for (prefix, direction) in PREFIXES {
            if let Some(role) = name.strip_prefix(prefix) {
                if role.is_empty() {
                    break;
                }
                return Ok(Self {
                    direction,
                    role: role.to_string(),
                });
            }
        }
        Err(RouteError::InvalidRestriction(name.to_string()))
    }

    pub fn matches(&self, direction: Direction, role: &str) -> bool {
        self.direction == direction && self.role == role
    }
}

/// Set of currently enabled restrictions, keyed by name.
#[derive(Debug, Default)]
pub struct RestrictionGate {
    active: BTreeMap<String, Restriction>,
}

impl RestrictionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or clear a restriction. Returns the parsed restriction.
    pub fn set(&mut self, name: &str, enabled: bool) -> Result<Restriction, RouteError> {
        let restriction = Restriction::parse(name)?;
        if enabled {
            self.active.insert(name.to_string(), restriction.clone());
        } else {
            self.active.remove(name);
        }
        Ok(restriction)
    }

    pub fn is_restricted(&self, direction: Direction, role: &str) -> bool {
        self.active.values().any(|r| r.matches(direction, role))
    }

    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.active.keys().map(String::as_str)
    }
}
